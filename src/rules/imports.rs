//! RP001 (unused import) and RP007 (import clobbered by assignment).

use crate::analyze::report::Rule;
use crate::rules::Checker;
use crate::semantic::binding::{Binding, BindingKind, DefSite};

/// RP001: an import binding whose local name is never read. A try/except
/// import fallback contributes several definition sites to one binding, so
/// the union of reads applies across both branches. Star imports never
/// flag; names listed in `__all__` and names bound only under
/// `if TYPE_CHECKING:` are exempt. An import inside a statically dead
/// branch is only reported when it is the module's sole binding of that
/// name.
pub(crate) fn unused_imports(checker: &mut Checker) {
    let index = checker.index();
    let mut findings = Vec::new();
    for binding in &index.bindings {
        if !binding.has_import_def() || binding.is_read() {
            continue;
        }
        if index.exported(&binding.name) {
            continue;
        }
        let import_defs: Vec<&DefSite> = binding
            .def_sites
            .iter()
            .filter(|site| site.kind.is_import())
            .collect();
        if import_defs.iter().all(|site| site.in_type_checking) {
            continue;
        }
        let live = import_defs
            .iter()
            .find(|site| !site.in_dead_branch && !site.in_type_checking)
            .or_else(|| import_defs.iter().find(|site| !site.in_dead_branch));
        let site = match live {
            Some(site) => *site,
            None => {
                if binding.def_sites.len() == import_defs.len() {
                    import_defs[0]
                } else {
                    continue;
                }
            }
        };
        findings.push((site.range, binding.name.clone()));
    }
    for (range, name) in findings {
        checker.push(
            Rule::UnusedImport,
            range,
            &name,
            format!("Import `{name}` is never used"),
        );
    }
}

/// RP007: the first event after an import of a name is a plain assignment
/// to that same name, with no intervening read. A read on the right-hand
/// side of the assignment (`re = re.compile(...)`) counts as a read of the
/// import and defuses the rule.
pub(crate) fn clobbered_imports(checker: &mut Checker) {
    let index = checker.index();
    let mut findings = Vec::new();
    for binding in &index.bindings {
        let Some(import_def) = binding
            .def_sites
            .iter()
            .find(|site| site.kind.is_import())
        else {
            continue;
        };
        let Some(next_def) = binding
            .def_sites
            .iter()
            .filter(|site| site.range.start() > import_def.range.start())
            .min_by_key(|site| site.range.start())
        else {
            continue;
        };
        if next_def.kind != BindingKind::LocalAssign {
            continue;
        }
        if read_before(binding, next_def) {
            continue;
        }
        findings.push((import_def.range, binding.name.clone()));
    }
    for (range, name) in findings {
        checker.push(
            Rule::ClobberedImport,
            range,
            &name,
            format!("Import `{name}` is reassigned before it is ever read"),
        );
    }
}

/// Any read up to the end of the clobbering statement counts: that covers
/// both reads between the two statements and a self-reference on the
/// assignment's right-hand side.
fn read_before(binding: &Binding, assignment: &DefSite) -> bool {
    binding
        .use_sites
        .iter()
        .any(|site| site.range.start() < assignment.stmt_end)
}

#[cfg(test)]
mod tests {
    use crate::analyze::report::Rule;
    use crate::rules::test::{names_for_rule, run_on_source};
    use test_case::test_case;

    #[test]
    fn aliased_imports_check_the_local_name() {
        let report = run_on_source(
            r#"
            import numpy as np
            import os as operating_sys
            import sys as system
            from pathlib import Path as P
            from collections import OrderedDict as OD

            print(system.version)
            p = P("/tmp")
            print(p)
            "#,
        );
        assert_eq!(
            names_for_rule(&report, Rule::UnusedImport),
            vec!["np", "operating_sys", "OD"]
        );
    }

    #[test]
    fn type_checking_imports_are_exempt() {
        let report = run_on_source(
            r#"
            from __future__ import annotations
            from typing import TYPE_CHECKING

            if TYPE_CHECKING:
                import json
                from pathlib import Path
                from collections.abc import Mapping

            def greet(name: str) -> str:
                return f"hello {name}"

            print(greet("world"))
            "#,
        );
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn try_except_fallback_is_one_binding() {
        let report = run_on_source(
            r#"
            try:
                import ujson as json
            except ImportError:
                import json

            try:
                from functools import cache
            except ImportError:
                from functools import lru_cache as cache

            data = json.dumps({"key": "value"})

            @cache
            def fib(n: int) -> int:
                if n < 2:
                    return n
                return fib(n - 1) + fib(n - 2)

            print(data, fib(10))
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedImport).is_empty());
    }

    #[test]
    fn unused_fallback_flags_once() {
        let report = run_on_source(
            r#"
            try:
                import ujson as json
            except ImportError:
                import json
            "#,
        );
        assert_eq!(names_for_rule(&report, Rule::UnusedImport), vec!["json"]);
    }

    #[test]
    fn names_in_dunder_all_are_exempt() {
        let report = run_on_source(
            r#"
            import re
            import sys
            import os

            __all__ = ["re", "os"]
            "#,
        );
        assert_eq!(names_for_rule(&report, Rule::UnusedImport), vec!["sys"]);
    }

    #[test]
    fn noqa_suppresses_an_unused_import() {
        let report = run_on_source(
            r#"
            import os  # noqa
            import sys
            "#,
        );
        assert_eq!(names_for_rule(&report, Rule::UnusedImport), vec!["sys"]);
    }

    #[test]
    fn dead_branch_import_defers_to_other_bindings() {
        let report = run_on_source(
            r#"
            if False:
                import os
            os = "shadow"
            print(os)
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedImport).is_empty());

        let report = run_on_source(
            r#"
            if False:
                import os
            "#,
        );
        assert_eq!(names_for_rule(&report, Rule::UnusedImport), vec!["os"]);
    }

    #[test]
    fn function_local_imports_are_checked() {
        let report = run_on_source(
            r#"
            def reader():
                import io
                import struct
                return io.StringIO("x").read()

            print(reader())
            "#,
        );
        assert_eq!(names_for_rule(&report, Rule::UnusedImport), vec!["struct"]);
    }

    #[test_case("import os\nprint(os.sep)\n", &[]; "attribute read keeps import alive")]
    #[test_case("import os\n", &["os"]; "plain unused import")]
    #[test_case("import os.path\n", &["os"]; "dotted import binds the root")]
    fn unused_import_cases(source: &str, expected: &[&str]) {
        let report = run_on_source(source);
        assert_eq!(names_for_rule(&report, Rule::UnusedImport), expected);
    }

    #[test]
    fn clobbered_import_matches_corpus() {
        let report = run_on_source(
            r#"
            import os
            import sys
            import re

            print(sys.version)

            re = re.compile(r"\d+")
            os = "overwritten"

            print(re, os, sys)
            "#,
        );
        assert_eq!(names_for_rule(&report, Rule::ClobberedImport), vec!["os"]);
        // every import ends up read, so RP001 stays quiet
        assert!(names_for_rule(&report, Rule::UnusedImport).is_empty());
    }

    #[test]
    fn read_between_import_and_assignment_defuses_rp007() {
        let report = run_on_source(
            r#"
            import os
            print(os.sep)
            os = "overwritten"
            print(os)
            "#,
        );
        assert!(names_for_rule(&report, Rule::ClobberedImport).is_empty());
    }

    #[test]
    fn redefinition_by_def_is_not_a_clobber() {
        let report = run_on_source(
            r#"
            import os

            def os():
                return 1

            print(os())
            "#,
        );
        assert!(names_for_rule(&report, Rule::ClobberedImport).is_empty());
    }
}
