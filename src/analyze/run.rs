//! Pipeline driver. Per-module work (parse, semantic index, reachability)
//! runs either sequentially or fanned out on the rayon pool; the registry
//! build and rule dispatch always run sequentially after the barrier, since
//! RP003/RP004 need the global view. No diagnostics are emitted for a
//! cancelled run.

use crate::analyze::report::{
    AnalysisError, AnalysisReport, Diagnostic, Phase, Rule, Span,
};
use crate::config::{AnalysisConfig, ExecutionMode};
use crate::reachability::{self, ReachabilityResult};
use crate::registry::{ModuleRegistry, RegistryInput, module_dotted_name};
use crate::rules;
use crate::rules::noqa::NoqaIndex;
use crate::semantic::builder::build_module_index;
use crate::semantic::model::ModuleIndex;
use log::debug;
use rayon::prelude::*;
use ruff_python_ast::{PySourceType, PythonVersion};
use ruff_python_parser::ParseOptions;
use ruff_source_file::LineIndex;
use ruff_text_size::TextRange;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One input to the analyzer: a path (used for module identity and
/// reporting) and the file's UTF-8 contents. The core does no I/O.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub source: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Cooperative cancellation. The driver may cancel between modules;
/// in-flight per-module work completes but no new modules are scheduled,
/// and the run yields `AnalysisError::Cancelled` instead of a report.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything the rule checkers need for one module.
pub struct ModuleAnalysis<'a> {
    pub file: &'a SourceFile,
    pub dotted: String,
    pub is_package: bool,
    pub index: ModuleIndex,
    pub reach: ReachabilityResult,
    pub lines: LineIndex,
    pub noqa: NoqaIndex,
}

impl ModuleAnalysis<'_> {
    pub fn span(&self, range: TextRange) -> Span {
        Span::from_range(range, &self.lines, &self.file.source)
    }

    pub fn slice(&self, range: TextRange) -> &str {
        &self.file.source[range]
    }
}

enum ModuleOutcome<'a> {
    Analyzed(Box<ModuleAnalysis<'a>>),
    Failed(Diagnostic),
}

pub fn analyze(
    files: &[SourceFile],
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError> {
    analyze_with_cancellation(files, config, &CancellationToken::new())
}

pub fn analyze_with_cancellation(
    files: &[SourceFile],
    config: &AnalysisConfig,
    token: &CancellationToken,
) -> Result<AnalysisReport, AnalysisError> {
    let outcomes: Vec<ModuleOutcome> = match config.execution {
        ExecutionMode::Sequential => {
            let mut outcomes = Vec::with_capacity(files.len());
            for file in files {
                if token.is_cancelled() {
                    return Err(AnalysisError::Cancelled);
                }
                outcomes.push(analyze_one(file, config));
            }
            outcomes
        }
        ExecutionMode::Parallel => {
            let outcomes: Vec<Option<ModuleOutcome>> = files
                .par_iter()
                .map(|file| {
                    if token.is_cancelled() {
                        None
                    } else {
                        Some(analyze_one(file, config))
                    }
                })
                .collect();
            if outcomes.iter().any(Option::is_none) {
                return Err(AnalysisError::Cancelled);
            }
            outcomes.into_iter().flatten().collect()
        }
    };
    if token.is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }

    let inputs: Vec<RegistryInput> = outcomes
        .iter()
        .enumerate()
        .filter_map(|(slot, outcome)| match outcome {
            ModuleOutcome::Analyzed(module) => Some(RegistryInput {
                slot,
                dotted: &module.dotted,
                is_package: module.is_package,
                index: &module.index,
            }),
            ModuleOutcome::Failed(_) => None,
        })
        .collect();
    let registry =
        ModuleRegistry::build(outcomes.len(), &inputs, config.treat_star_import_as_opaque);

    let mut diagnostics = Vec::new();
    for (slot, outcome) in outcomes.iter().enumerate() {
        match outcome {
            ModuleOutcome::Failed(diagnostic) => diagnostics.push(diagnostic.clone()),
            ModuleOutcome::Analyzed(module) => {
                if !module.index.validate() {
                    return Err(AnalysisError::Internal {
                        phase: Phase::Resolve,
                        module_path: module.file.path.clone(),
                    });
                }
                diagnostics.extend(rules::check_module(module, slot, &registry, config));
            }
        }
    }
    Ok(AnalysisReport {
        diagnostics,
        modules: outcomes.len(),
    })
}

fn analyze_one<'a>(file: &'a SourceFile, config: &AnalysisConfig) -> ModuleOutcome<'a> {
    debug!("analyzing module {}", file.path);
    let (major, minor) = config.python_version;
    let options = ParseOptions::from(PySourceType::Python)
        .with_target_version(PythonVersion { major, minor });
    let parsed = ruff_python_parser::parse_unchecked(&file.source, options)
        .try_into_module()
        .expect("Python source mode always parses to a module");
    let lines = LineIndex::from_source_text(&file.source);

    // a module that fails to parse contributes exactly one diagnostic
    if let Some(error) = parsed.errors().first() {
        return ModuleOutcome::Failed(parse_error(
            file,
            &lines,
            error.location,
            error.error.to_string(),
        ));
    }
    if let Some(error) = parsed.unsupported_syntax_errors().first() {
        return ModuleOutcome::Failed(parse_error(
            file,
            &lines,
            error.range,
            error.to_string(),
        ));
    }

    let suite = parsed.suite();
    let index = build_module_index(suite, minor);
    let reach = reachability::analyze_module(suite);
    let noqa = NoqaIndex::build(
        parsed.tokens(),
        &file.source,
        &lines,
        config.extra_noqa_marker.as_deref(),
    );
    ModuleOutcome::Analyzed(Box::new(ModuleAnalysis {
        file,
        dotted: module_dotted_name(&file.path),
        is_package: file.path.ends_with("__init__.py"),
        index,
        reach,
        lines,
        noqa,
    }))
}

fn parse_error(
    file: &SourceFile,
    lines: &LineIndex,
    range: TextRange,
    message: String,
) -> Diagnostic {
    Diagnostic {
        rule: Rule::ParseError,
        module_path: file.path.clone(),
        span: Span::from_range(range, lines, &file.source),
        name: String::new(),
        message,
    }
}
