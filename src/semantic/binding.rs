use crate::semantic::scope::ScopeId;
use ruff_text_size::{TextRange, TextSize};

pub type BindingId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Import,
    ImportFrom,
    ImportStar,
    FunctionDef,
    ClassDef,
    Parameter,
    LocalAssign,
    AnnOnly,
    AugAssign,
    ForTarget,
    WithTarget,
    ComprehensionTarget,
    ExceptAlias,
    WalrusTarget,
    StarUnpackTarget,
    Global,
    Nonlocal,
}

impl BindingKind {
    pub fn is_import(self) -> bool {
        matches!(self, BindingKind::Import | BindingKind::ImportFrom)
    }
}

/// One definition event for a binding.
#[derive(Debug, Clone, Copy)]
pub struct DefSite {
    /// Span of the bound name (or the import alias).
    pub range: TextRange,
    /// End of the enclosing statement; lets RP007 treat a read on the
    /// right-hand side of the clobbering assignment as happening first.
    pub stmt_end: TextSize,
    pub kind: BindingKind,
    /// Whether the site carries a value (`x: T` alone does not).
    pub has_value: bool,
    /// The site sits inside an `if TYPE_CHECKING:` body.
    pub in_type_checking: bool,
    /// The site sits inside a statically dead `if` branch.
    pub in_dead_branch: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseKind {
    Read,
    /// Augmented assignment: the name is read and written in one event.
    ReadWrite,
    /// The name is the base of an attribute access.
    Attribute,
    /// The name is the base of a subscript.
    Subscript,
}

#[derive(Debug, Clone)]
pub struct UseSite {
    pub range: TextRange,
    /// Scope the use occurs in (not necessarily the binding's own scope).
    pub scope: ScopeId,
    pub kind: UseKind,
    /// Statically known attribute name for `Attribute` uses, including
    /// `getattr(x, "lit")` / `hasattr(x, "lit")`.
    pub attr: Option<String>,
}

/// A name introduced in a scope, with every definition and use event.
/// There is exactly one binding per `(scope, name)` pair; a try/except
/// import fallback or an import-then-assign sequence contributes multiple
/// definition sites to the same binding.
#[derive(Debug)]
pub struct Binding {
    pub name: String,
    pub scope: ScopeId,
    pub def_sites: Vec<DefSite>,
    pub use_sites: Vec<UseSite>,
}

impl Binding {
    pub fn new(name: String, scope: ScopeId) -> Self {
        Self {
            name,
            scope,
            def_sites: Vec::new(),
            use_sites: Vec::new(),
        }
    }

    pub fn is_underscore(&self) -> bool {
        self.name.starts_with('_')
    }

    pub fn is_read(&self) -> bool {
        !self.use_sites.is_empty()
    }

    pub fn has_import_def(&self) -> bool {
        self.def_sites.iter().any(|site| site.kind.is_import())
    }

    pub fn first_value_def(&self) -> Option<&DefSite> {
        self.def_sites.iter().find(|site| site.has_value)
    }
}
