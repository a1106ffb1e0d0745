//! RP003 (unused public function) and RP004 (unused class).

use crate::analyze::report::Rule;
use crate::rules::Checker;
use crate::semantic::binding::BindingId;
use crate::semantic::model::ModuleIndex;
use crate::semantic::scope::{MODULE_SCOPE, ScopeId};
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Decorators that mark a definition as reachable through a framework or
/// typing machinery rather than direct calls. Any decorator with a dotted
/// path (`app.route`, `pytest.fixture`, `celsius.setter`) is treated as
/// registration-style and therefore opaque.
static EXEMPT_DECORATORS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "property",
        "staticmethod",
        "classmethod",
        "abstractmethod",
        "overload",
    ])
});

fn decorator_exempt(checker: &Checker, decorators: &[String]) -> bool {
    decorators.iter().any(|decorator| {
        EXEMPT_DECORATORS.contains(decorator.as_str())
            || decorator.contains('.')
            || checker
                .config
                .extra_exempt_decorators
                .iter()
                .any(|prefix| decorator.starts_with(prefix.as_str()))
    })
}

fn is_public(checker: &Checker, name: &str) -> bool {
    use crate::config::DunderAllAuthority;
    let index = checker.index();
    match (&checker.config.dunder_all_authority, &index.dunder_all) {
        (DunderAllAuthority::Strict, Some(all)) => all.names.iter().any(|n| n == name),
        _ => !name.starts_with('_'),
    }
}

/// A definition is used when it is referenced from outside its own scope
/// subtree within the module, referenced by another analyzed module, or
/// reachable through a star import of this module.
fn is_used(checker: &Checker, binding: BindingId, own_scope: ScopeId) -> bool {
    let index = checker.index();
    let binding = index.binding(binding);
    if binding
        .use_sites
        .iter()
        .any(|site| !index.scope_contains(own_scope, site.scope))
    {
        return true;
    }
    if checker.registry.externally_used(checker.slot, &binding.name) {
        return true;
    }
    checker.registry.star_imported(checker.slot) && index.exportable(&binding.name)
}

fn module_is_opaque(index: &ModuleIndex) -> bool {
    index.has_dynamic_access
}

pub(crate) fn unused_public_functions(checker: &mut Checker) {
    if module_is_opaque(checker.index()) {
        return;
    }
    let mut findings = Vec::new();
    for function in &checker.index().functions {
        // methods resolve dynamically; only module-level defs are candidates
        if function.parent_scope != MODULE_SCOPE {
            continue;
        }
        if !is_public(checker, &function.name) {
            continue;
        }
        if checker.index().exported(&function.name) {
            continue;
        }
        if decorator_exempt(checker, &function.decorators) {
            continue;
        }
        if is_used(checker, function.binding, function.body_scope) {
            continue;
        }
        findings.push((function.name_range, function.name.clone()));
    }
    for (range, name) in findings {
        checker.push(
            Rule::UnusedPublicFunction,
            range,
            &name,
            format!("Public function `{name}` is never used"),
        );
    }
}

pub(crate) fn unused_classes(checker: &mut Checker) {
    if module_is_opaque(checker.index()) {
        return;
    }
    let mut findings = Vec::new();
    for class in &checker.index().classes {
        if class.parent_scope != MODULE_SCOPE {
            continue;
        }
        if !is_public(checker, &class.name) {
            continue;
        }
        if checker.index().exported(&class.name) {
            continue;
        }
        if decorator_exempt(checker, &class.decorators) {
            continue;
        }
        // a subclass's base list is an ordinary read of this name, so
        // subclass presence is already covered by the use check
        if is_used(checker, class.binding, class.body_scope) {
            continue;
        }
        findings.push((class.name_range, class.name.clone()));
    }
    for (range, name) in findings {
        checker.push(
            Rule::UnusedClass,
            range,
            &name,
            format!("Class `{name}` is never used"),
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::analyze::report::Rule;
    use crate::config::AnalysisConfig;
    use crate::rules::test::{names_for_rule, run_on_files, run_on_source, run_with_config};

    #[test]
    fn unused_public_definitions_are_flagged() {
        let report = run_on_source(
            r#"
            def used_function():
                return 1

            def unused_function():
                return 2

            class UsedClass:
                pass

            class UnusedClass:
                pass

            print(used_function(), UsedClass())
            "#,
        );
        assert_eq!(
            names_for_rule(&report, Rule::UnusedPublicFunction),
            vec!["unused_function"]
        );
        assert_eq!(names_for_rule(&report, Rule::UnusedClass), vec!["UnusedClass"]);
    }

    #[test]
    fn private_names_are_not_candidates() {
        let report = run_on_source(
            r#"
            def _private_helper(x):
                return x + 1

            class _Hidden:
                pass
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedPublicFunction).is_empty());
        assert!(names_for_rule(&report, Rule::UnusedClass).is_empty());
    }

    #[test]
    fn registration_style_decorators_are_opaque() {
        let report = run_on_source(
            r#"
            import functools

            @property
            def prop_like():
                return 1

            @functools.lru_cache(maxsize=None)
            def cached_lookup(key):
                return key

            @overload
            def parse(value):
                ...
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedPublicFunction).is_empty());
    }

    #[test]
    fn plain_decorators_do_not_exempt() {
        let report = run_on_source(
            r#"
            import functools
            import time

            def timed(fn):
                @functools.wraps(fn)
                def wrapper(*args, **kwargs):
                    t0 = time.monotonic()
                    result = fn(*args, **kwargs)
                    print(time.monotonic() - t0)
                    return result
                return wrapper

            @timed
            def fetch(url):
                return f"fetched:{url}"
            "#,
        );
        // `timed` is used as a decorator; `fetch` is decorated but never
        // called, and a plain local decorator does not exempt it
        assert_eq!(
            names_for_rule(&report, Rule::UnusedPublicFunction),
            vec!["fetch"]
        );
    }

    #[test]
    fn extra_exempt_decorators_extend_the_set() {
        let source = r#"
        def register(fn):
            return fn

        @register
        def hook():
            return 1
        "#;
        let report = run_on_source(source);
        assert_eq!(names_for_rule(&report, Rule::UnusedPublicFunction), vec!["hook"]);

        let config = AnalysisConfig {
            extra_exempt_decorators: vec!["register".to_string()],
            ..AnalysisConfig::default()
        };
        let report = run_with_config(source, &config);
        assert!(names_for_rule(&report, Rule::UnusedPublicFunction).is_empty());
    }

    #[test]
    fn methods_are_not_candidates() {
        let report = run_on_source(
            r#"
            class Service:
                def handle(self, request):
                    return request

            print(Service)
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedPublicFunction).is_empty());
    }

    #[test]
    fn nested_functions_are_not_candidates() {
        let report = run_on_source(
            r#"
            def outer():
                def inner():
                    return 1
                return inner()

            print(outer())
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedPublicFunction).is_empty());
    }

    #[test]
    fn recursion_does_not_count_as_use() {
        let report = run_on_source(
            r#"
            def lonely(n):
                if n <= 0:
                    return 0
                return lonely(n - 1)
            "#,
        );
        assert_eq!(
            names_for_rule(&report, Rule::UnusedPublicFunction),
            vec!["lonely"]
        );
    }

    #[test]
    fn subclassing_keeps_a_class_alive() {
        let report = run_on_source(
            r#"
            class Base:
                pass

            class Child(Base):
                pass

            print(Child())
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedClass).is_empty());
    }

    #[test]
    fn self_reference_inside_methods_does_not_count() {
        let report = run_on_source(
            r#"
            class Cycle:
                def clone(self):
                    return Cycle()
            "#,
        );
        assert_eq!(names_for_rule(&report, Rule::UnusedClass), vec!["Cycle"]);
    }

    #[test]
    fn dynamic_access_makes_the_module_opaque() {
        let report = run_on_source(
            r#"
            import os
            import sys

            modules = [os, sys]
            for mod in modules:
                print(getattr(mod, "sep", "/"))

            def slice_assign():
                arr = [1, 2, 3, 4, 5]
                arr[1:3] = [9, 9]
                return arr

            def comprehension_var():
                return [x * 2 for x in range(10) if x % 2 == 0]
            "#,
        );
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn dunder_all_protects_listed_definitions() {
        let report = run_on_source(
            r#"
            def exported():
                return 1

            class Exported:
                pass

            __all__ = ["exported", "Exported"]
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedPublicFunction).is_empty());
        assert!(names_for_rule(&report, Rule::UnusedClass).is_empty());
    }

    #[test]
    fn star_import_of_an_analyzed_module_keeps_exports_alive() {
        let report = run_on_files(&[
            (
                "lib.py",
                r#"
                def tool():
                    return 1

                def _private():
                    return 2
                "#,
            ),
            (
                "app.py",
                r#"
                from lib import *

                print(tool())
                "#,
            ),
        ]);
        assert!(names_for_rule(&report, Rule::UnusedPublicFunction).is_empty());
    }

    #[test]
    fn async_functions_follow_the_same_rule() {
        let report = run_on_source(
            r#"
            import asyncio

            async def unused_fetcher(endpoint):
                await asyncio.sleep(0)
                return endpoint

            async def main():
                await asyncio.sleep(0)

            asyncio.run(main())
            "#,
        );
        assert_eq!(
            names_for_rule(&report, Rule::UnusedPublicFunction),
            vec!["unused_fetcher"]
        );
    }
}
