use crate::analyze::report::Rule;
use std::collections::BTreeSet;
use std::str::FromStr;

/// How per-module work is scheduled. Both modes produce byte-identical
/// diagnostic streams; `Sequential` is the deterministic-by-construction
/// default used in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "parallel" => Ok(ExecutionMode::Parallel),
            _ => Err(format!("invalid execution mode: {s}")),
        }
    }
}

/// Whether a static `__all__` literal decides public-export membership.
/// Under `Strict` (the default) a declared `__all__` is authoritative;
/// under `Advisory` public-ness falls back to the underscore convention
/// even when `__all__` is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DunderAllAuthority {
    #[default]
    Strict,
    Advisory,
}

impl FromStr for DunderAllAuthority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(DunderAllAuthority::Strict),
            "advisory" => Ok(DunderAllAuthority::Advisory),
            _ => Err(format!("invalid __all__ authority: {s}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Subset of the nine `RP` rules to run. `ParseError` and
    /// `UnresolvedNonlocal` are always emitted.
    pub enabled_rules: BTreeSet<Rule>,
    /// Additional decorator qualified-name prefixes treated as
    /// registration-style (opaque) for RP003/RP004.
    pub extra_exempt_decorators: Vec<String>,
    /// Substring that suppresses every diagnostic on a line it appears on,
    /// in addition to the built-in `# noqa` directive.
    pub extra_noqa_marker: Option<String>,
    /// When set, unresolved reads in a module with a star import resolve
    /// opaquely, and star-importing an analyzed module marks the target's
    /// exportable names as used.
    pub treat_star_import_as_opaque: bool,
    pub dunder_all_authority: DunderAllAuthority,
    /// Target `(major, minor)` Python version handed to the parser; gates
    /// version-dependent grammar such as `match` statements.
    pub python_version: (u8, u8),
    pub execution: ExecutionMode,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled_rules: Rule::all_configurable(),
            extra_exempt_decorators: Vec::new(),
            extra_noqa_marker: None,
            treat_star_import_as_opaque: true,
            dunder_all_authority: DunderAllAuthority::default(),
            python_version: (3, 12),
            execution: ExecutionMode::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn is_enabled(&self, rule: Rule) -> bool {
        !rule.is_configurable() || self.enabled_rules.contains(&rule)
    }
}
