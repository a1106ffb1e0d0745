use ruff_source_file::LineIndex;
use ruff_text_size::TextRange;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// Diagnostic rule identifiers. The nine `RP` codes are the analyzer's
/// contract; `ParseError` and `UnresolvedNonlocal` surface per-module
/// failures that are not rule findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter)]
pub enum Rule {
    UnusedImport,
    UnusedBinding,
    UnusedPublicFunction,
    UnusedClass,
    UnreachableStatement,
    DeadBranch,
    ClobberedImport,
    UnusedParameter,
    UnusedLoopVariable,
    ParseError,
    UnresolvedNonlocal,
}

impl Rule {
    pub fn iter() -> impl Iterator<Item = Rule> {
        <Self as IntoEnumIterator>::iter()
    }

    pub fn code(&self) -> &'static str {
        match self {
            Rule::UnusedImport => "RP001",
            Rule::UnusedBinding => "RP002",
            Rule::UnusedPublicFunction => "RP003",
            Rule::UnusedClass => "RP004",
            Rule::UnreachableStatement => "RP005",
            Rule::DeadBranch => "RP006",
            Rule::ClobberedImport => "RP007",
            Rule::UnusedParameter => "RP008",
            Rule::UnusedLoopVariable => "RP009",
            Rule::ParseError => "ParseError",
            Rule::UnresolvedNonlocal => "UnresolvedNonlocal",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Rule::UnusedImport => "Imported name is never read in its module.",
            Rule::UnusedBinding => "Local binding is assigned but never read.",
            Rule::UnusedPublicFunction => {
                "Public module-level function is never referenced by any analyzed module."
            }
            Rule::UnusedClass => {
                "Module-level class is never referenced by any analyzed module."
            }
            Rule::UnreachableStatement => {
                "Statement follows an unconditional control transfer in the same block."
            }
            Rule::DeadBranch => "Branch condition is a statically false literal.",
            Rule::ClobberedImport => {
                "Imported name is overwritten by an assignment before it is ever read."
            }
            Rule::UnusedParameter => "Function parameter is never read in the body.",
            Rule::UnusedLoopVariable => "Loop variable is never read.",
            Rule::ParseError => "Source file could not be parsed.",
            Rule::UnresolvedNonlocal => {
                "A `nonlocal` declaration has no matching binding in an enclosing function."
            }
        }
    }

    /// The `RP` rules can be toggled through `enabled_rules`; parse errors
    /// and resolution anomalies are always reported.
    pub fn is_configurable(&self) -> bool {
        !matches!(self, Rule::ParseError | Rule::UnresolvedNonlocal)
    }

    pub fn all_configurable() -> BTreeSet<Rule> {
        Rule::iter().filter(|rule| rule.is_configurable()).collect()
    }
}

impl Serialize for Rule {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Rule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rule::iter()
            .find(|rule| rule.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown rule id: {s}"))
    }
}

/// 1-based source span, columns counted in bytes within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn from_range(range: TextRange, index: &LineIndex, source: &str) -> Self {
        let (start_line, start_col) = line_col(range.start(), index, source);
        let (end_line, end_col) = line_col(range.end(), index, source);
        Span {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

fn line_col(
    offset: ruff_text_size::TextSize,
    index: &LineIndex,
    source: &str,
) -> (u32, u32) {
    let line = index.line_index(offset);
    let line_start = index.line_start(line, source);
    let col = (offset - line_start).to_u32() + 1;
    (line.get() as u32, col)
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub rule: Rule,
    pub module_path: String,
    pub span: Span,
    pub name: String,
    pub message: String,
}

/// The complete result of one analysis run. Diagnostics are grouped by
/// module in input order; within a module they are sorted by span start
/// and tie-broken by rule id.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub diagnostics: Vec<Diagnostic>,
    pub modules: usize,
}

impl AnalysisReport {
    /// JSON rendering of the diagnostic stream, the interchange format
    /// external reporters consume.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parse,
    Bind,
    Resolve,
    Rules,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Parse => "parse",
            Phase::Bind => "bind",
            Phase::Resolve => "resolve",
            Phase::Rules => "rules",
        };
        f.write_str(name)
    }
}

/// Run-level failures. Parse errors are diagnostics, not errors; an
/// `Internal` error means an invariant that should be unreachable on
/// well-formed Python was violated, and the run produced no diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    Cancelled,
    Internal { phase: Phase, module_path: String },
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::Cancelled => f.write_str("analysis cancelled"),
            AnalysisError::Internal { phase, module_path } => {
                write!(f, "internal error in {phase} phase for module {module_path}")
            }
        }
    }
}

impl std::error::Error for AnalysisError {}
