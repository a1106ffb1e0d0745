use crate::reachability::{Truthiness, static_truthiness};
use crate::semantic::binding::{Binding, BindingId, BindingKind, DefSite, UseKind, UseSite};
use crate::semantic::dunder_all::extract_dunder_all;
use crate::semantic::model::{
    ClassInfo, DunderAll, FunctionInfo, ImportRecord, ImportTarget, ModuleIndex, ParamInfo,
    ParamRole,
};
use crate::semantic::scope::{MODULE_SCOPE, Scope, ScopeId, ScopeKind};
use log::debug;
use ruff_python_ast::visitor::source_order::{
    SourceOrderVisitor, walk_expr, walk_stmt,
};
use ruff_python_ast::{self as ast, Expr, ExprContext, Stmt};
use ruff_python_stdlib::builtins::{MAGIC_GLOBALS, python_builtins};
use ruff_text_size::{Ranged, TextRange, TextSize};
use std::collections::{HashMap, HashSet};

/// Build the semantic index for one module body. The traversal collects
/// scopes and raw definition/use events; materialization then applies
/// `global`/`nonlocal` redirection and resolves every read against the
/// completed scope tree, which is what lets a function body reference a
/// module-level name defined further down the file.
pub fn build_module_index(suite: &[Stmt], python_minor: u8) -> ModuleIndex {
    let mut builder = SemanticIndexBuilder::new(python_minor, suite_range(suite));
    builder.visit_body(suite);
    builder.finish()
}

fn suite_range(suite: &[Stmt]) -> TextRange {
    match (suite.first(), suite.last()) {
        (Some(first), Some(last)) => TextRange::new(first.range().start(), last.range().end()),
        _ => TextRange::default(),
    }
}

struct RawDef {
    scope: ScopeId,
    name: String,
    kind: BindingKind,
    range: TextRange,
    stmt_end: TextSize,
    has_value: bool,
    in_type_checking: bool,
    in_dead_branch: bool,
}

struct RawRead {
    scope: ScopeId,
    name: String,
    range: TextRange,
    kind: UseKind,
    attr: Option<String>,
}

struct NonlocalDecl {
    scope: ScopeId,
    name: String,
    range: TextRange,
}

struct PendingFunction {
    name: String,
    parent_scope: ScopeId,
    body_scope: ScopeId,
    decorators: Vec<String>,
    params: Vec<ParamInfo>,
    is_async: bool,
    is_method: bool,
    is_static: bool,
    is_stub: bool,
    name_range: TextRange,
}

struct PendingClass {
    name: String,
    parent_scope: ScopeId,
    body_scope: ScopeId,
    decorators: Vec<String>,
    name_range: TextRange,
}

struct PendingImport {
    def_index: Option<usize>,
    target: ImportTarget,
    range: TextRange,
}

pub struct SemanticIndexBuilder {
    scopes: Vec<Scope>,
    scope_stack: Vec<ScopeId>,
    raw_defs: Vec<RawDef>,
    raw_reads: Vec<RawRead>,
    nonlocal_decls: Vec<NonlocalDecl>,
    pending_functions: Vec<PendingFunction>,
    pending_classes: Vec<PendingClass>,
    pending_imports: Vec<PendingImport>,
    dunder_all: Option<DunderAll>,
    has_star_import: bool,
    has_dynamic_access: bool,
    type_checking_depth: u32,
    dead_branch_depth: u32,
    stmt_ends: Vec<TextSize>,
    builtins: HashSet<&'static str>,
}

impl SemanticIndexBuilder {
    fn new(python_minor: u8, module_range: TextRange) -> Self {
        let mut builtins: HashSet<&'static str> =
            python_builtins(python_minor, false).collect();
        builtins.extend(MAGIC_GLOBALS);
        let mut this = Self {
            scopes: Vec::with_capacity(16),
            scope_stack: Vec::with_capacity(8),
            raw_defs: Vec::new(),
            raw_reads: Vec::new(),
            nonlocal_decls: Vec::new(),
            pending_functions: Vec::new(),
            pending_classes: Vec::new(),
            pending_imports: Vec::new(),
            dunder_all: None,
            has_star_import: false,
            has_dynamic_access: false,
            type_checking_depth: 0,
            dead_branch_depth: 0,
            stmt_ends: Vec::with_capacity(8),
            builtins,
        };
        this.push_scope(ScopeKind::Module, module_range);
        this
    }

    fn current_scope(&self) -> ScopeId {
        *self
            .scope_stack
            .last()
            .expect("there is always at least the module scope")
    }

    fn push_scope(&mut self, kind: ScopeKind, range: TextRange) {
        let parent = self.scope_stack.last().copied();
        let id = self.scopes.len();
        self.scopes.push(Scope::new(kind, parent, range));
        if let Some(parent) = parent {
            self.scopes[parent].children.push(id);
        }
        self.scope_stack.push(id);
    }

    fn pop_scope(&mut self) {
        self.scope_stack.pop();
    }

    fn current_stmt_end(&self, fallback: TextRange) -> TextSize {
        self.stmt_ends.last().copied().unwrap_or_else(|| fallback.end())
    }

    fn declare(&mut self, name: &str, kind: BindingKind, range: TextRange, has_value: bool) {
        let scope = self.current_scope();
        self.push_raw_def(scope, name, kind, range, has_value);
    }

    /// Walrus targets bind in the nearest enclosing non-comprehension scope.
    fn declare_walrus(&mut self, name: &str, range: TextRange) {
        let mut scope = self.current_scope();
        while self.scopes[scope].kind == ScopeKind::Comprehension {
            match self.scopes[scope].parent {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        self.push_raw_def(scope, name, BindingKind::WalrusTarget, range, true);
    }

    fn push_raw_def(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: BindingKind,
        range: TextRange,
        has_value: bool,
    ) {
        self.raw_defs.push(RawDef {
            scope,
            name: name.to_string(),
            kind,
            range,
            stmt_end: self.current_stmt_end(range),
            has_value,
            in_type_checking: self.type_checking_depth > 0,
            in_dead_branch: self.dead_branch_depth > 0,
        });
    }

    fn record_read(&mut self, name: &str, range: TextRange, kind: UseKind, attr: Option<String>) {
        self.raw_reads.push(RawRead {
            scope: self.current_scope(),
            name: name.to_string(),
            range,
            kind,
            attr,
        });
    }

    fn mark_locals_use(&mut self) {
        for &id in self.scope_stack.iter().rev() {
            if self.scopes[id].kind.is_function() {
                self.scopes[id].uses_locals = true;
                return;
            }
        }
        // `locals()` at module level is `globals()`
        self.has_dynamic_access = true;
    }

    fn bind_target(&mut self, target: &Expr, kind: BindingKind) {
        match target {
            Expr::Name(name) => self.declare(name.id.as_str(), kind, name.range(), true),
            Expr::Tuple(ast::ExprTuple { elts, .. }) | Expr::List(ast::ExprList { elts, .. }) => {
                for element in elts {
                    self.bind_target(element, kind);
                }
            }
            Expr::Starred(starred) => {
                let kind = if kind == BindingKind::LocalAssign {
                    BindingKind::StarUnpackTarget
                } else {
                    kind
                };
                self.bind_target(&starred.value, kind);
            }
            // attribute/subscript targets read their base instead of binding
            other => self.visit_expr(other),
        }
    }

    fn bind_pattern(&mut self, pattern: &ast::Pattern) {
        match pattern {
            ast::Pattern::MatchValue(p) => self.visit_expr(&p.value),
            ast::Pattern::MatchSingleton(_) => {}
            ast::Pattern::MatchSequence(p) => {
                for inner in &p.patterns {
                    self.bind_pattern(inner);
                }
            }
            ast::Pattern::MatchMapping(p) => {
                for key in &p.keys {
                    self.visit_expr(key);
                }
                for inner in &p.patterns {
                    self.bind_pattern(inner);
                }
                if let Some(rest) = &p.rest {
                    self.declare(rest.as_str(), BindingKind::LocalAssign, rest.range(), true);
                }
            }
            ast::Pattern::MatchClass(p) => {
                self.visit_expr(&p.cls);
                for inner in &p.arguments.patterns {
                    self.bind_pattern(inner);
                }
                for keyword in &p.arguments.keywords {
                    self.bind_pattern(&keyword.pattern);
                }
            }
            ast::Pattern::MatchStar(p) => {
                if let Some(name) = &p.name {
                    self.declare(name.as_str(), BindingKind::LocalAssign, name.range(), true);
                }
            }
            ast::Pattern::MatchAs(p) => {
                if let Some(inner) = &p.pattern {
                    self.bind_pattern(inner);
                }
                if let Some(name) = &p.name {
                    self.declare(name.as_str(), BindingKind::LocalAssign, name.range(), true);
                }
            }
            ast::Pattern::MatchOr(p) => {
                for inner in &p.patterns {
                    self.bind_pattern(inner);
                }
            }
        }
    }

    fn visit_parameter_annotations(&mut self, parameters: &ast::Parameters) {
        for parameter in parameters
            .posonlyargs
            .iter()
            .chain(parameters.args.iter())
            .chain(parameters.kwonlyargs.iter())
        {
            if let Some(annotation) = &parameter.parameter.annotation {
                self.visit_expr(annotation);
            }
        }
        if let Some(vararg) = &parameters.vararg
            && let Some(annotation) = &vararg.annotation
        {
            self.visit_expr(annotation);
        }
        if let Some(kwarg) = &parameters.kwarg
            && let Some(annotation) = &kwarg.annotation
        {
            self.visit_expr(annotation);
        }
    }

    fn visit_parameter_defaults(&mut self, parameters: &ast::Parameters) {
        for parameter in parameters
            .posonlyargs
            .iter()
            .chain(parameters.args.iter())
            .chain(parameters.kwonlyargs.iter())
        {
            if let Some(default) = &parameter.default {
                self.visit_expr(default);
            }
        }
    }

    fn bind_parameters(&mut self, parameters: &ast::Parameters) -> Vec<ParamInfo> {
        let mut params = Vec::new();
        for parameter in &parameters.posonlyargs {
            self.bind_parameter(&parameter.parameter, ParamRole::PositionalOnly, &mut params);
        }
        for parameter in &parameters.args {
            self.bind_parameter(&parameter.parameter, ParamRole::Positional, &mut params);
        }
        if let Some(vararg) = &parameters.vararg {
            self.bind_parameter(vararg, ParamRole::VarArgs, &mut params);
        }
        for parameter in &parameters.kwonlyargs {
            self.bind_parameter(&parameter.parameter, ParamRole::KeywordOnly, &mut params);
        }
        if let Some(kwarg) = &parameters.kwarg {
            self.bind_parameter(kwarg, ParamRole::KwArgs, &mut params);
        }
        params
    }

    fn bind_parameter(
        &mut self,
        parameter: &ast::Parameter,
        role: ParamRole,
        params: &mut Vec<ParamInfo>,
    ) {
        self.declare(
            parameter.name.as_str(),
            BindingKind::Parameter,
            parameter.name.range(),
            true,
        );
        params.push(ParamInfo {
            name: parameter.name.to_string(),
            range: parameter.name.range(),
            role,
            index: params.len(),
        });
    }

    fn enter_comprehension(&mut self, range: TextRange, generators: &[ast::Comprehension]) {
        // the first iterable evaluates in the enclosing scope
        if let Some(first) = generators.first() {
            self.visit_expr(&first.iter);
        }
        self.push_scope(ScopeKind::Comprehension, range);
        for (i, generator) in generators.iter().enumerate() {
            if i > 0 {
                self.visit_expr(&generator.iter);
            }
            self.bind_target(&generator.target, BindingKind::ComprehensionTarget);
            for condition in &generator.ifs {
                self.visit_expr(condition);
            }
        }
    }

    fn handle_function_def(&mut self, node: &ast::StmtFunctionDef) {
        let mut decorators = Vec::new();
        for decorator in &node.decorator_list {
            self.visit_expr(&decorator.expression);
            if let Some(name) = decorator_name(&decorator.expression) {
                decorators.push(name);
            }
        }
        self.visit_parameter_annotations(&node.parameters);
        self.visit_parameter_defaults(&node.parameters);
        if let Some(returns) = &node.returns {
            self.visit_expr(returns);
        }
        let parent_scope = self.current_scope();
        self.declare(
            node.name.as_str(),
            BindingKind::FunctionDef,
            node.name.range(),
            true,
        );
        self.push_scope(ScopeKind::Function, node.range());
        let body_scope = self.current_scope();
        let params = self.bind_parameters(&node.parameters);
        self.visit_body(&node.body);
        self.pop_scope();

        let is_method = self.scopes[parent_scope].kind.is_class();
        let is_static = decorators.iter().any(|d| d == "staticmethod");
        self.pending_functions.push(PendingFunction {
            name: node.name.to_string(),
            parent_scope,
            body_scope,
            decorators,
            params,
            is_async: node.is_async,
            is_method,
            is_static,
            is_stub: is_stub_body(&node.body),
            name_range: node.name.range(),
        });
    }

    fn handle_class_def(&mut self, node: &ast::StmtClassDef) {
        let mut decorators = Vec::new();
        for decorator in &node.decorator_list {
            self.visit_expr(&decorator.expression);
            if let Some(name) = decorator_name(&decorator.expression) {
                decorators.push(name);
            }
        }
        if let Some(arguments) = &node.arguments {
            for base in arguments.args.iter() {
                self.visit_expr(base);
            }
            for keyword in arguments.keywords.iter() {
                self.visit_expr(&keyword.value);
            }
        }
        let parent_scope = self.current_scope();
        self.declare(
            node.name.as_str(),
            BindingKind::ClassDef,
            node.name.range(),
            true,
        );
        self.push_scope(ScopeKind::Class, node.range());
        let body_scope = self.current_scope();
        self.visit_body(&node.body);
        self.pop_scope();

        self.pending_classes.push(PendingClass {
            name: node.name.to_string(),
            parent_scope,
            body_scope,
            decorators,
            name_range: node.name.range(),
        });
    }

    fn handle_import(&mut self, node: &ast::StmtImport) {
        for alias in &node.names {
            let full = alias.name.as_str();
            let (local, target) = match &alias.asname {
                Some(asname) => (asname.as_str(), full.to_string()),
                None => {
                    let root = full.split('.').next().unwrap_or(full);
                    (root, root.to_string())
                }
            };
            let def_index = self.raw_defs.len();
            self.declare(local, BindingKind::Import, alias.range(), true);
            self.pending_imports.push(PendingImport {
                def_index: Some(def_index),
                target: ImportTarget::Module { dotted: target },
                range: alias.range(),
            });
        }
    }

    fn handle_import_from(&mut self, node: &ast::StmtImportFrom) {
        let module = node.module.as_ref().map(|m| m.as_str().to_string());
        if node.level == 0 && module.as_deref() == Some("__future__") {
            // compiler directive, not a bindable name
            return;
        }
        for alias in &node.names {
            if alias.name.as_str() == "*" {
                self.has_star_import = true;
                self.pending_imports.push(PendingImport {
                    def_index: None,
                    target: ImportTarget::Star {
                        level: node.level,
                        module: module.clone(),
                    },
                    range: alias.range(),
                });
                continue;
            }
            let local = alias.asname.as_ref().unwrap_or(&alias.name);
            let def_index = self.raw_defs.len();
            self.declare(local.as_str(), BindingKind::ImportFrom, alias.range(), true);
            self.pending_imports.push(PendingImport {
                def_index: Some(def_index),
                target: ImportTarget::Symbol {
                    level: node.level,
                    module: module.clone(),
                    name: alias.name.as_str().to_string(),
                },
                range: alias.range(),
            });
        }
    }

    fn handle_if(&mut self, node: &ast::StmtIf) {
        self.visit_expr(&node.test);
        let type_checking = is_type_checking_test(&node.test);
        let mut prior_true = static_truthiness(&node.test) == Truthiness::AlwaysTrue;
        let main_dead = static_truthiness(&node.test) == Truthiness::AlwaysFalse;
        if type_checking {
            self.type_checking_depth += 1;
        }
        if main_dead {
            self.dead_branch_depth += 1;
        }
        self.visit_body(&node.body);
        if main_dead {
            self.dead_branch_depth -= 1;
        }
        if type_checking {
            self.type_checking_depth -= 1;
        }
        for clause in &node.elif_else_clauses {
            let dead = match &clause.test {
                Some(test) => {
                    self.visit_expr(test);
                    let truth = static_truthiness(test);
                    let dead = prior_true || truth == Truthiness::AlwaysFalse;
                    if truth == Truthiness::AlwaysTrue {
                        prior_true = true;
                    }
                    dead
                }
                None => prior_true,
            };
            if dead {
                self.dead_branch_depth += 1;
            }
            self.visit_body(&clause.body);
            if dead {
                self.dead_branch_depth -= 1;
            }
        }
    }

    fn handle_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FunctionDef(node) => self.handle_function_def(node),
            Stmt::ClassDef(node) => self.handle_class_def(node),
            Stmt::Import(node) => self.handle_import(node),
            Stmt::ImportFrom(node) => self.handle_import_from(node),
            Stmt::If(node) => self.handle_if(node),
            Stmt::Assign(node) => {
                self.visit_expr(&node.value);
                if self.current_scope() == MODULE_SCOPE
                    && let [Expr::Name(target)] = node.targets.as_slice()
                    && target.id.as_str() == "__all__"
                    && let Some(names) = extract_dunder_all(&node.value)
                {
                    self.dunder_all = Some(DunderAll {
                        names,
                        range: node.range(),
                    });
                }
                for target in &node.targets {
                    self.bind_target(target, BindingKind::LocalAssign);
                }
            }
            Stmt::AugAssign(node) => {
                self.visit_expr(&node.value);
                match node.target.as_ref() {
                    Expr::Name(name) => {
                        self.record_read(name.id.as_str(), name.range(), UseKind::ReadWrite, None);
                        self.declare(name.id.as_str(), BindingKind::AugAssign, name.range(), true);
                    }
                    other => self.visit_expr(other),
                }
            }
            Stmt::AnnAssign(node) => {
                self.visit_expr(&node.annotation);
                if let Some(value) = &node.value {
                    self.visit_expr(value);
                }
                match node.target.as_ref() {
                    Expr::Name(name) => {
                        let (kind, has_value) = if node.value.is_some() {
                            (BindingKind::LocalAssign, true)
                        } else {
                            (BindingKind::AnnOnly, false)
                        };
                        self.declare(name.id.as_str(), kind, name.range(), has_value);
                    }
                    other => self.visit_expr(other),
                }
            }
            Stmt::For(node) => {
                self.visit_expr(&node.iter);
                self.bind_target(&node.target, BindingKind::ForTarget);
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::With(node) => {
                for item in &node.items {
                    self.visit_expr(&item.context_expr);
                    if let Some(vars) = &item.optional_vars {
                        self.bind_target(vars, BindingKind::WithTarget);
                    }
                }
                self.visit_body(&node.body);
            }
            Stmt::Match(node) => {
                self.visit_expr(&node.subject);
                for case in &node.cases {
                    self.bind_pattern(&case.pattern);
                    if let Some(guard) = &case.guard {
                        self.visit_expr(guard);
                    }
                    self.visit_body(&case.body);
                }
            }
            Stmt::Global(node) => {
                let scope = self.current_scope();
                for name in &node.names {
                    self.scopes[scope].globals.insert(name.as_str().to_string());
                }
            }
            Stmt::Nonlocal(node) => {
                let scope = self.current_scope();
                for name in &node.names {
                    self.scopes[scope]
                        .nonlocals
                        .insert(name.as_str().to_string());
                    self.nonlocal_decls.push(NonlocalDecl {
                        scope,
                        name: name.as_str().to_string(),
                        range: name.range(),
                    });
                }
            }
            other => walk_stmt(self, other),
        }
    }

    fn handle_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Name(node) => match node.ctx {
                ExprContext::Load | ExprContext::Del => {
                    self.record_read(node.id.as_str(), node.range(), UseKind::Read, None);
                }
                ExprContext::Store => {
                    self.declare(node.id.as_str(), BindingKind::LocalAssign, node.range(), true);
                }
                ExprContext::Invalid => {}
            },
            Expr::Attribute(node) => {
                if let Expr::Name(base) = node.value.as_ref()
                    && matches!(base.ctx, ExprContext::Load)
                {
                    let attr = matches!(node.ctx, ExprContext::Load)
                        .then(|| node.attr.as_str().to_string());
                    let kind = if attr.is_some() {
                        UseKind::Attribute
                    } else {
                        UseKind::Read
                    };
                    self.record_read(base.id.as_str(), base.range(), kind, attr);
                } else {
                    self.visit_expr(&node.value);
                }
            }
            Expr::Subscript(node) => {
                if let Expr::Name(base) = node.value.as_ref()
                    && matches!(base.ctx, ExprContext::Load)
                {
                    self.record_read(base.id.as_str(), base.range(), UseKind::Subscript, None);
                } else {
                    self.visit_expr(&node.value);
                }
                self.visit_expr(&node.slice);
            }
            Expr::Call(node) => {
                if let Expr::Name(func) = node.func.as_ref() {
                    match func.id.as_str() {
                        "locals" => self.mark_locals_use(),
                        "vars" => {
                            self.mark_locals_use();
                            self.has_dynamic_access = true;
                        }
                        "globals" | "getattr" => self.has_dynamic_access = true,
                        _ => {}
                    }
                    if matches!(func.id.as_str(), "getattr" | "hasattr")
                        && let [Expr::Name(obj), Expr::StringLiteral(lit), rest @ ..] =
                            &*node.arguments.args
                        && matches!(obj.ctx, ExprContext::Load)
                    {
                        self.record_read(
                            obj.id.as_str(),
                            obj.range(),
                            UseKind::Attribute,
                            Some(lit.value.to_string()),
                        );
                        self.visit_expr(&node.func);
                        for arg in rest {
                            self.visit_expr(arg);
                        }
                        for keyword in node.arguments.keywords.iter() {
                            self.visit_expr(&keyword.value);
                        }
                        return;
                    }
                }
                walk_expr(self, expr);
            }
            Expr::Lambda(node) => {
                if let Some(parameters) = &node.parameters {
                    self.visit_parameter_defaults(parameters);
                }
                self.push_scope(ScopeKind::Function, node.range());
                if let Some(parameters) = &node.parameters {
                    self.bind_parameters(parameters);
                }
                self.visit_expr(&node.body);
                self.pop_scope();
            }
            Expr::Named(node) => {
                self.visit_expr(&node.value);
                match node.target.as_ref() {
                    Expr::Name(target) => self.declare_walrus(target.id.as_str(), target.range()),
                    other => self.visit_expr(other),
                }
            }
            Expr::ListComp(node) => {
                self.enter_comprehension(node.range(), &node.generators);
                self.visit_expr(&node.elt);
                self.pop_scope();
            }
            Expr::SetComp(node) => {
                self.enter_comprehension(node.range(), &node.generators);
                self.visit_expr(&node.elt);
                self.pop_scope();
            }
            Expr::Generator(node) => {
                self.enter_comprehension(node.range(), &node.generators);
                self.visit_expr(&node.elt);
                self.pop_scope();
            }
            Expr::DictComp(node) => {
                self.enter_comprehension(node.range(), &node.generators);
                self.visit_expr(&node.key);
                self.visit_expr(&node.value);
                self.pop_scope();
            }
            other => walk_expr(self, other),
        }
    }

    fn finish(mut self) -> ModuleIndex {
        // names that are genuinely local to a scope, declarations aside
        let mut local_defs: HashSet<(ScopeId, String)> = HashSet::new();
        for def in &self.raw_defs {
            let scope = &self.scopes[def.scope];
            if !scope.globals.contains(&def.name) && !scope.nonlocals.contains(&def.name) {
                local_defs.insert((def.scope, def.name.clone()));
            }
        }

        let mut nonlocal_targets: HashMap<(ScopeId, String), ScopeId> = HashMap::new();
        let mut nonlocal_errors: Vec<(String, TextRange)> = Vec::new();
        let mut failed: Vec<(ScopeId, String)> = Vec::new();
        for decl in &self.nonlocal_decls {
            let mut found = None;
            let mut current = self.scopes[decl.scope].parent;
            while let Some(id) = current {
                let scope = &self.scopes[id];
                if scope.kind == ScopeKind::Module {
                    break;
                }
                if scope.kind.is_function()
                    && !scope.nonlocals.contains(&decl.name)
                    && local_defs.contains(&(id, decl.name.clone()))
                {
                    found = Some(id);
                    break;
                }
                current = scope.parent;
            }
            match found {
                Some(target) => {
                    nonlocal_targets.insert((decl.scope, decl.name.clone()), target);
                }
                None => {
                    nonlocal_errors.push((decl.name.clone(), decl.range));
                    failed.push((decl.scope, decl.name.clone()));
                }
            }
        }
        // an unresolved nonlocal falls back to binding locally
        for (scope, name) in failed {
            self.scopes[scope].nonlocals.remove(&name);
        }

        let mut bindings: Vec<Binding> = Vec::new();
        let mut def_binding: Vec<BindingId> = Vec::with_capacity(self.raw_defs.len());
        for def in &self.raw_defs {
            let scope = effective_scope(&self.scopes, &nonlocal_targets, def.scope, &def.name);
            let id = match self.scopes[scope].symbols.get(&def.name) {
                Some(&id) => id,
                None => {
                    let id = bindings.len();
                    bindings.push(Binding::new(def.name.clone(), scope));
                    self.scopes[scope].symbols.insert(def.name.clone(), id);
                    id
                }
            };
            bindings[id].def_sites.push(DefSite {
                range: def.range,
                stmt_end: def.stmt_end,
                kind: def.kind,
                has_value: def.has_value,
                in_type_checking: def.in_type_checking,
                in_dead_branch: def.in_dead_branch,
            });
            def_binding.push(id);
        }

        let mut unresolved_reads: Vec<(String, TextRange)> = Vec::new();
        for read in &self.raw_reads {
            let mut sid = read.scope;
            let mut first = true;
            let resolved: Option<BindingId> = loop {
                let scope = &self.scopes[sid];
                if scope.globals.contains(&read.name) {
                    break self.scopes[MODULE_SCOPE].symbols.get(&read.name).copied();
                }
                if scope.nonlocals.contains(&read.name) {
                    break nonlocal_targets
                        .get(&(sid, read.name.clone()))
                        .and_then(|&target| {
                            self.scopes[target].symbols.get(&read.name).copied()
                        });
                }
                // class scopes are invisible to nested scopes
                if (first || !scope.kind.is_class())
                    && let Some(&id) = scope.symbols.get(&read.name)
                {
                    break Some(id);
                }
                match scope.parent {
                    Some(parent) => {
                        sid = parent;
                        first = false;
                    }
                    None => break None,
                }
            };
            match resolved {
                Some(id) => bindings[id].use_sites.push(UseSite {
                    range: read.range,
                    scope: read.scope,
                    kind: read.kind,
                    attr: read.attr.clone(),
                }),
                None => {
                    if !self.builtins.contains(read.name.as_str()) && !self.has_star_import {
                        unresolved_reads.push((read.name.clone(), read.range));
                    }
                }
            }
        }

        let mut functions = Vec::with_capacity(self.pending_functions.len());
        for pending in self.pending_functions.drain(..) {
            let scope = effective_scope(
                &self.scopes,
                &nonlocal_targets,
                pending.parent_scope,
                &pending.name,
            );
            let Some(&binding) = self.scopes[scope].symbols.get(&pending.name) else {
                debug!("missing binding for function {}", pending.name);
                continue;
            };
            functions.push(FunctionInfo {
                name: pending.name,
                binding,
                body_scope: pending.body_scope,
                parent_scope: pending.parent_scope,
                decorators: pending.decorators,
                params: pending.params,
                is_async: pending.is_async,
                is_method: pending.is_method,
                is_static: pending.is_static,
                is_stub: pending.is_stub,
                name_range: pending.name_range,
            });
        }

        let mut classes = Vec::with_capacity(self.pending_classes.len());
        for pending in self.pending_classes.drain(..) {
            let scope = effective_scope(
                &self.scopes,
                &nonlocal_targets,
                pending.parent_scope,
                &pending.name,
            );
            let Some(&binding) = self.scopes[scope].symbols.get(&pending.name) else {
                debug!("missing binding for class {}", pending.name);
                continue;
            };
            classes.push(ClassInfo {
                name: pending.name,
                binding,
                body_scope: pending.body_scope,
                parent_scope: pending.parent_scope,
                decorators: pending.decorators,
                name_range: pending.name_range,
            });
        }

        let imports = self
            .pending_imports
            .into_iter()
            .map(|pending| ImportRecord {
                binding: pending.def_index.map(|i| def_binding[i]),
                target: pending.target,
                range: pending.range,
            })
            .collect();

        ModuleIndex {
            scopes: self.scopes,
            bindings,
            functions,
            classes,
            imports,
            dunder_all: self.dunder_all,
            has_star_import: self.has_star_import,
            has_dynamic_access: self.has_dynamic_access,
            nonlocal_errors,
            unresolved_reads,
        }
    }
}

impl<'a> SourceOrderVisitor<'a> for SemanticIndexBuilder {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        self.stmt_ends.push(stmt.range().end());
        self.handle_stmt(stmt);
        self.stmt_ends.pop();
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        self.handle_expr(expr);
    }

    fn visit_except_handler(&mut self, except_handler: &'a ast::ExceptHandler) {
        let ast::ExceptHandler::ExceptHandler(handler) = except_handler;
        if let Some(type_) = &handler.type_ {
            self.visit_expr(type_);
        }
        if let Some(name) = &handler.name {
            self.declare(name.as_str(), BindingKind::ExceptAlias, name.range(), true);
        }
        self.visit_body(&handler.body);
    }
}

fn effective_scope(
    scopes: &[Scope],
    nonlocal_targets: &HashMap<(ScopeId, String), ScopeId>,
    scope: ScopeId,
    name: &str,
) -> ScopeId {
    if scopes[scope].globals.contains(name) {
        return MODULE_SCOPE;
    }
    if scopes[scope].nonlocals.contains(name)
        && let Some(&target) = nonlocal_targets.get(&(scope, name.to_string()))
    {
        return target;
    }
    scope
}

/// Dotted name of a decorator expression; calls reduce to their callee.
fn decorator_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Name(name) => Some(name.id.to_string()),
        Expr::Attribute(attribute) => {
            decorator_name(&attribute.value).map(|base| format!("{base}.{}", attribute.attr.as_str()))
        }
        Expr::Call(call) => decorator_name(&call.func),
        _ => None,
    }
}

fn is_type_checking_test(expr: &Expr) -> bool {
    match expr {
        Expr::Name(name) => name.id.as_str() == "TYPE_CHECKING",
        Expr::Attribute(attribute) => attribute.attr.as_str() == "TYPE_CHECKING",
        _ => false,
    }
}

/// `...`, `pass`, or `raise NotImplementedError`, ignoring a docstring.
fn is_stub_body(body: &[Stmt]) -> bool {
    let mut stmts = body.iter();
    let mut first = stmts.next();
    if let Some(Stmt::Expr(docstring)) = first
        && matches!(docstring.value.as_ref(), Expr::StringLiteral(_))
    {
        first = stmts.next();
    }
    if stmts.next().is_some() {
        return false;
    }
    match first {
        Some(Stmt::Pass(_)) => true,
        Some(Stmt::Expr(stmt)) => matches!(stmt.value.as_ref(), Expr::EllipsisLiteral(_)),
        Some(Stmt::Raise(stmt)) => match stmt.exc.as_deref() {
            Some(Expr::Name(name)) => name.id.as_str() == "NotImplementedError",
            Some(Expr::Call(call)) => {
                matches!(call.func.as_ref(), Expr::Name(name) if name.id.as_str() == "NotImplementedError")
            }
            _ => false,
        },
        _ => false,
    }
}
