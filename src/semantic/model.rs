use crate::semantic::binding::{Binding, BindingId};
use crate::semantic::scope::{MODULE_SCOPE, Scope, ScopeId};
use ruff_text_size::TextRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamRole {
    Positional,
    PositionalOnly,
    KeywordOnly,
    VarArgs,
    KwArgs,
}

#[derive(Debug)]
pub struct ParamInfo {
    pub name: String,
    pub range: TextRange,
    pub role: ParamRole,
    /// Position among all parameters, receiver included.
    pub index: usize,
}

#[derive(Debug)]
pub struct FunctionInfo {
    pub name: String,
    pub binding: BindingId,
    pub body_scope: ScopeId,
    pub parent_scope: ScopeId,
    /// Dotted decorator names as written (`property`, `celsius.setter`,
    /// `functools.lru_cache`); calls are reduced to their callee.
    pub decorators: Vec<String>,
    pub params: Vec<ParamInfo>,
    pub is_async: bool,
    /// Defined directly inside a class body.
    pub is_method: bool,
    pub is_static: bool,
    /// Body is a bare `...`, `pass`, or `raise NotImplementedError`.
    pub is_stub: bool,
    pub name_range: TextRange,
}

#[derive(Debug)]
pub struct ClassInfo {
    pub name: String,
    pub binding: BindingId,
    pub body_scope: ScopeId,
    pub parent_scope: ScopeId,
    pub decorators: Vec<String>,
    pub name_range: TextRange,
}

#[derive(Debug)]
pub enum ImportTarget {
    /// `import a.b [as x]`: the dotted module the binding refers to
    /// (the root package when there is no alias).
    Module { dotted: String },
    /// `from m import n [as x]` with the original relative level.
    Symbol {
        level: u32,
        module: Option<String>,
        name: String,
    },
    /// `from m import *`.
    Star { level: u32, module: Option<String> },
}

#[derive(Debug)]
pub struct ImportRecord {
    pub binding: Option<BindingId>,
    pub target: ImportTarget,
    pub range: TextRange,
}

#[derive(Debug)]
pub struct DunderAll {
    pub names: Vec<String>,
    pub range: TextRange,
}

/// The owned semantic model of one module: scope arena, bindings, and the
/// per-module facts rule checkers query. Built once by the semantic index
/// builder and immutable afterwards.
#[derive(Debug, Default)]
pub struct ModuleIndex {
    pub scopes: Vec<Scope>,
    pub bindings: Vec<Binding>,
    pub functions: Vec<FunctionInfo>,
    pub classes: Vec<ClassInfo>,
    pub imports: Vec<ImportRecord>,
    pub dunder_all: Option<DunderAll>,
    pub has_star_import: bool,
    /// The module calls `getattr`, `globals`, `vars`, or `locals`
    /// somewhere; definition-level unused rules go quiet.
    pub has_dynamic_access: bool,
    /// `nonlocal` declarations with no matching enclosing binding.
    pub nonlocal_errors: Vec<(String, TextRange)>,
    /// Reads that resolved to no binding, no builtin, and no star-import
    /// spillover. Kept for inspection; not a diagnostic by itself.
    pub unresolved_reads: Vec<(String, TextRange)>,
}

impl ModuleIndex {
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id]
    }

    pub fn module_scope(&self) -> &Scope {
        &self.scopes[MODULE_SCOPE]
    }

    /// Whether `scope` is `ancestor` or lexically nested inside it.
    pub fn scope_contains(&self, ancestor: ScopeId, scope: ScopeId) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.scopes[id].parent;
        }
        false
    }

    /// RP002 suppression: the binding's function body (or the body of the
    /// nearest enclosing function) calls `locals()` or `vars()`.
    pub fn suppressed_by_locals(&self, scope: ScopeId) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id];
            if s.kind.is_function() {
                return s.uses_locals;
            }
            current = s.parent;
        }
        false
    }

    /// Whether the module's `__all__`, if statically declared, lists `name`.
    pub fn exported(&self, name: &str) -> bool {
        self.dunder_all
            .as_ref()
            .is_some_and(|all| all.names.iter().any(|n| n == name))
    }

    /// A name another module would receive from `from m import *`.
    pub fn exportable(&self, name: &str) -> bool {
        match &self.dunder_all {
            Some(all) => all.names.iter().any(|n| n == name),
            None => !name.starts_with('_'),
        }
    }

    /// Arena consistency check run before the rules phase; a failure here
    /// aborts the run with an internal error.
    pub fn validate(&self) -> bool {
        if self.scopes.is_empty() {
            return false;
        }
        for (id, scope) in self.scopes.iter().enumerate() {
            match scope.parent {
                None if id != MODULE_SCOPE => return false,
                Some(parent) if parent >= self.scopes.len() || parent == id => return false,
                _ => {}
            }
            if scope.symbols.values().any(|&b| b >= self.bindings.len()) {
                return false;
            }
        }
        for binding in &self.bindings {
            if binding.scope >= self.scopes.len() {
                return false;
            }
        }
        self.functions
            .iter()
            .all(|f| f.binding < self.bindings.len() && f.body_scope < self.scopes.len())
            && self
                .classes
                .iter()
                .all(|c| c.binding < self.bindings.len() && c.body_scope < self.scopes.len())
    }
}
