//! RP009: unused loop variable.

use crate::analyze::report::Rule;
use crate::rules::Checker;
use crate::semantic::binding::BindingKind;

/// A `for` target name with no reads at all. Underscore names are exempt;
/// tuple targets are checked per component, so `for i, v in …` flags only
/// the unread, non-underscore components. A loop that immediately
/// `break`s is still flagged.
pub(crate) fn unused_loop_variables(checker: &mut Checker) {
    let index = checker.index();
    let mut findings = Vec::new();
    for binding in &index.bindings {
        let Some(site) = binding
            .def_sites
            .iter()
            .find(|site| site.kind == BindingKind::ForTarget)
        else {
            continue;
        };
        if binding.is_underscore() || binding.is_read() {
            continue;
        }
        if site.in_dead_branch {
            continue;
        }
        findings.push((site.range, binding.name.clone()));
    }
    for (range, name) in findings {
        checker.push(
            Rule::UnusedLoopVariable,
            range,
            &name,
            format!("Loop variable `{name}` is never used"),
        );
    }
}
