//! RP002: unused local binding.

use crate::analyze::report::Rule;
use crate::rules::Checker;
use crate::semantic::binding::BindingKind;

/// Value-carrying bindings in function scopes that are never read.
/// Underscore names are exempt, as is any binding in a function whose body
/// calls `locals()` or `vars()`. Annotation-only declarations have no
/// value and cannot fire. Bindings whose definitions are the domain of
/// other rules (parameters, imports, `for` targets, defs) are skipped
/// here, and assignments inside statically dead branches stay quiet;
/// RP006 already covers the branch itself.
pub(crate) fn unused_bindings(checker: &mut Checker) {
    let index = checker.index();
    let mut findings = Vec::new();
    for binding in &index.bindings {
        if !index.scope(binding.scope).kind.is_function() {
            continue;
        }
        if binding.is_underscore() || binding.is_read() {
            continue;
        }
        if binding.def_sites.iter().any(|site| {
            !matches!(
                site.kind,
                BindingKind::LocalAssign
                    | BindingKind::AnnOnly
                    | BindingKind::AugAssign
                    | BindingKind::WalrusTarget
                    | BindingKind::StarUnpackTarget
                    | BindingKind::WithTarget
                    | BindingKind::ExceptAlias
            )
        }) {
            continue;
        }
        let Some(site) = binding
            .def_sites
            .iter()
            .find(|site| site.has_value && !site.in_dead_branch)
        else {
            continue;
        };
        if index.suppressed_by_locals(binding.scope) {
            continue;
        }
        findings.push((site.range, binding.name.clone()));
    }
    for (range, name) in findings {
        checker.push(
            Rule::UnusedBinding,
            range,
            &name,
            format!("Local variable `{name}` is assigned but never read"),
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::analyze::report::Rule;
    use crate::rules::test::{names_for_rule, run_on_source};
    use test_case::test_case;

    #[test]
    fn annotation_only_declarations_do_not_fire() {
        let report = run_on_source(
            r#"
            def func_with_pure_annotations():
                x: int
                y: str
                z: list[int]
                x = 1
                return x

            def func_with_typed_assign():
                result: int = 0
                return result

            def func_unused_typed():
                dead: int = 42
                return 0
            "#,
        );
        assert_eq!(names_for_rule(&report, Rule::UnusedBinding), vec!["dead"]);
    }

    #[test]
    fn augmented_assignment_counts_as_use() {
        let report = run_on_source(
            r#"
            def counters():
                total = 0
                total += 10
                total -= 3
                total *= 2
                return total

            def bitwise_ops():
                flags = 0xFF
                flags &= 0x0F
                return flags
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedBinding).is_empty());
    }

    #[test]
    fn walrus_contexts() {
        let report = run_on_source(
            r#"
            import io

            def walrus_in_while():
                buf = io.StringIO("hello world foo")
                results = []
                while chunk := buf.read(5):
                    results.append(chunk)
                return results

            def walrus_in_if():
                data = [1, 2, 3, 4]
                if (n := len(data)) > 2:
                    return n
                return 0

            def walrus_in_comprehension():
                nums = range(20)
                return [y for x in nums if (y := x * x) < 100]

            def walrus_unused():
                data = [1, 2, 3]
                (n := len(data))
                return 0
            "#,
        );
        assert_eq!(names_for_rule(&report, Rule::UnusedBinding), vec!["n"]);
    }

    #[test]
    fn underscore_names_are_exempt() {
        let report = run_on_source(
            r#"
            def discard_unpack():
                pair = (1, 2, 3)
                a, _, c = pair
                return a + c

            def discard_private():
                _tmp = 0
                return 0
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedBinding).is_empty());
    }

    #[test]
    fn locals_and_vars_suppress_the_whole_function() {
        let report = run_on_source(
            r#"
            def uses_locals():
                x = 1
                y = 2
                z = 3
                return locals()

            def uses_vars():
                a = "hello"
                b = [1, 2, 3]
                return vars()

            def normal_func():
                dead = 99
                return 0
            "#,
        );
        assert_eq!(names_for_rule(&report, Rule::UnusedBinding), vec!["dead"]);
    }

    #[test]
    fn closure_captures_are_reads() {
        let report = run_on_source(
            r#"
            def outer_used_in_closure():
                items = []
                count = 0

                def add(x):
                    items.append(x)
                    nonlocal count
                    count += 1

                add(1)
                add(2)
                return items, count

            def outer_genuinely_unused():
                dead = "never captured"
                captured = "used"

                def inner():
                    return captured

                return inner
            "#,
        );
        assert_eq!(names_for_rule(&report, Rule::UnusedBinding), vec!["dead"]);
    }

    #[test]
    fn global_and_nonlocal_mutations_do_not_fire() {
        let report = run_on_source(
            r#"
            _STATE = 0

            def increment(n=1):
                global _STATE
                _STATE += n
                return _STATE

            def make_counter(start):
                count = start

                def bump(by=1):
                    nonlocal count
                    count += by
                    return count

                return bump

            counter = make_counter(10)
            increment(5)
            print(counter(1))
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedBinding).is_empty());
    }

    #[test]
    fn star_unpack_targets() {
        let report = run_on_source(
            r#"
            def head_tail_unused_middle():
                head, *_middle, tail = [1, 2, 3, 4, 5]
                return head + tail

            def star_unused():
                x, *dead_rest = [1, 2, 3]
                return x

            print(head_tail_unused_middle(), star_unused())
            "#,
        );
        assert_eq!(
            names_for_rule(&report, Rule::UnusedBinding),
            vec!["dead_rest"]
        );
    }

    #[test]
    fn with_targets_and_except_aliases() {
        let report = run_on_source(
            r#"
            def with_unused(path):
                with open(path) as handle:
                    pass
                return 0

            def exc_used():
                try:
                    int("bad")
                except ValueError as e:
                    print(e)

            def exc_unused():
                try:
                    int("bad")
                except ValueError as err:
                    pass
            "#,
        );
        assert_eq!(
            names_for_rule(&report, Rule::UnusedBinding),
            vec!["handle", "err"]
        );
    }

    #[test]
    fn module_level_assignments_are_exports_not_locals() {
        let report = run_on_source(
            r#"
            EXPORTED_CONST = "hello"
            another_value = 42
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedBinding).is_empty());
    }

    #[test]
    fn match_captures_follow_local_rules() {
        let report = run_on_source(
            r#"
            def describe(shape):
                match shape:
                    case {"x": x, "y": y}:
                        return f"point({x}, {y})"
                    case [first, *rest]:
                        return f"seq: {first} + {len(rest)} more"
                    case _:
                        return "unknown"

            print(describe({"x": 1, "y": 2}))
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedBinding).is_empty());
    }

    #[test_case("def f():\n    dead = 1\n    return 0\n", &["dead"]; "plain dead assignment")]
    #[test_case("def f():\n    kept = 1\n    return kept\n", &[]; "read defuses")]
    #[test_case("def f():\n    arr = [1, 2, 3]\n    arr[1:3] = [9, 9]\n    return arr\n", &[]; "slice assignment reads the base")]
    fn unused_binding_cases(source: &str, expected: &[&str]) {
        let report = run_on_source(source);
        assert_eq!(names_for_rule(&report, Rule::UnusedBinding), expected);
    }
}
