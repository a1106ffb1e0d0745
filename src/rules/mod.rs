pub mod bindings;
pub mod definitions;
pub mod imports;
pub mod loops;
pub mod noqa;
pub mod parameters;
pub mod unreachable;


use crate::analyze::report::{Diagnostic, Rule};
use crate::analyze::run::ModuleAnalysis;
use crate::config::AnalysisConfig;
use crate::registry::ModuleRegistry;
use crate::semantic::model::ModuleIndex;
use ruff_text_size::TextRange;

/// Shared state for one module's rule pass. Checkers push diagnostics
/// through [`Checker::push`], which applies rule enablement and per-line
/// suppression; dispatch sorts the result.
pub struct Checker<'a> {
    pub module: &'a ModuleAnalysis<'a>,
    pub slot: usize,
    pub registry: &'a ModuleRegistry,
    pub config: &'a AnalysisConfig,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> Checker<'a> {
    pub fn new(
        module: &'a ModuleAnalysis<'a>,
        slot: usize,
        registry: &'a ModuleRegistry,
        config: &'a AnalysisConfig,
    ) -> Self {
        Self {
            module,
            slot,
            registry,
            config,
            diagnostics: Vec::new(),
        }
    }

    pub fn index(&self) -> &ModuleIndex {
        &self.module.index
    }

    pub fn push(&mut self, rule: Rule, range: TextRange, name: &str, message: String) {
        if !self.config.is_enabled(rule) {
            return;
        }
        let span = self.module.span(range);
        if self
            .module
            .noqa
            .is_suppressed(span.start_line as usize, rule)
        {
            return;
        }
        self.diagnostics.push(Diagnostic {
            rule,
            module_path: self.module.file.path.clone(),
            span,
            name: name.to_string(),
            message,
        });
    }
}

/// Run every checker over one module and return its diagnostics sorted by
/// span start, tie-broken by rule id.
pub fn check_module(
    module: &ModuleAnalysis<'_>,
    slot: usize,
    registry: &ModuleRegistry,
    config: &AnalysisConfig,
) -> Vec<Diagnostic> {
    let mut checker = Checker::new(module, slot, registry, config);
    imports::unused_imports(&mut checker);
    imports::clobbered_imports(&mut checker);
    bindings::unused_bindings(&mut checker);
    definitions::unused_public_functions(&mut checker);
    definitions::unused_classes(&mut checker);
    unreachable::unreachable_statements(&mut checker);
    unreachable::dead_branches(&mut checker);
    parameters::unused_parameters(&mut checker);
    loops::unused_loop_variables(&mut checker);

    for (name, range) in &module.index.nonlocal_errors {
        let name = name.clone();
        checker.push(
            Rule::UnresolvedNonlocal,
            *range,
            &name,
            format!("no binding for nonlocal `{name}` found in an enclosing function"),
        );
    }

    let mut diagnostics = checker.diagnostics;
    diagnostics.sort_by(|a, b| {
        (a.span.start_line, a.span.start_col, a.rule.code()).cmp(&(
            b.span.start_line,
            b.span.start_col,
            b.rule.code(),
        ))
    });
    diagnostics
}
