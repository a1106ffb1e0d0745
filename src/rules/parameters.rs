//! RP008: unused parameter.

use crate::analyze::report::Rule;
use crate::rules::Checker;
use crate::semantic::model::{FunctionInfo, ParamRole};

fn function_exempt(function: &FunctionInfo) -> bool {
    if function.is_stub {
        return true;
    }
    function.decorators.iter().any(|decorator| {
        decorator == "abstractmethod"
            || decorator.ends_with(".abstractmethod")
            || decorator == "overload"
            || decorator.ends_with(".overload")
            || decorator.ends_with(".setter")
            || decorator.ends_with(".deleter")
    })
}

/// Parameters never read in the function body. Underscore-prefixed names,
/// `*args`/`**kwargs`, the receiver of a bound method, stubs, abstract and
/// overload declarations, and property setter/deleter arguments are all
/// exempt.
pub(crate) fn unused_parameters(checker: &mut Checker) {
    let index = checker.index();
    let mut findings = Vec::new();
    for function in &index.functions {
        if function_exempt(function) {
            continue;
        }
        let scope = index.scope(function.body_scope);
        if scope.uses_locals {
            continue;
        }
        for param in &function.params {
            if param.name.starts_with('_') {
                continue;
            }
            if matches!(param.role, ParamRole::VarArgs | ParamRole::KwArgs) {
                continue;
            }
            if param.index == 0 && function.is_method && !function.is_static {
                continue;
            }
            let Some(&binding) = scope.symbols.get(&param.name) else {
                continue;
            };
            if index.binding(binding).is_read() {
                continue;
            }
            findings.push((param.range, param.name.clone()));
        }
    }
    for (range, name) in findings {
        checker.push(
            Rule::UnusedParameter,
            range,
            &name,
            format!("Parameter `{name}` is never used"),
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::analyze::report::Rule;
    use crate::rules::test::{names_for_rule, run_on_source};
    use test_case::test_case;

    #[test]
    fn corpus_exemption_patterns() {
        let report = run_on_source(
            r#"
            from abc import ABC, abstractmethod

            def simple(used, unused):
                return used * 2

            def underscore_ok(_skip, used):
                return used

            def varargs_ok(*args, **kwargs):
                return args, kwargs

            def default_still_flagged(x, extra=""):
                return x

            class Base(ABC):
                @abstractmethod
                def iface(self, arg):
                    ...

            class Impl(Base):
                def iface(self, arg):
                    return 42

            print(simple(1, "a"), underscore_ok("s", 2), varargs_ok(), default_still_flagged(1))
            print(Impl().iface(0))
            "#,
        );
        assert_eq!(
            names_for_rule(&report, Rule::UnusedParameter),
            vec!["unused", "extra", "arg"]
        );
    }

    #[test]
    fn property_accessors_are_exempt() {
        let report = run_on_source(
            r#"
            class Temperature:
                def __init__(self, celsius=0.0):
                    self._celsius = celsius

                @property
                def celsius(self):
                    return self._celsius

                @celsius.setter
                def celsius(self, value):
                    self._celsius = max(value, -273.15)

                @celsius.deleter
                def celsius(self):
                    self._celsius = 0.0

                @property
                def fahrenheit(self):
                    return self._celsius * 9 / 5 + 32

                @fahrenheit.setter
                def fahrenheit(self, value):
                    self.celsius = (value - 32) * 5 / 9

            t = Temperature(100.0)
            print(t.fahrenheit)
            t.celsius = 0.0
            del t.celsius
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedParameter).is_empty());
    }

    #[test]
    fn unused_setter_value_is_exempt_even_when_ignored() {
        let report = run_on_source(
            r#"
            class WithProperty:
                @property
                def value(self):
                    return 0

                @value.setter
                def value(self, v):
                    pass

            w = WithProperty()
            print(w.value)
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedParameter).is_empty());
    }

    #[test]
    fn stubs_are_exempt() {
        let report = run_on_source(
            r#"
            from typing import Protocol

            class ProtocolLike(Protocol):
                def transform(self, item, context): ...

            class Stubby:
                def todo(self, flags):
                    raise NotImplementedError

                def placeholder(self, data):
                    pass

            print(ProtocolLike, Stubby)
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedParameter).is_empty());
    }

    #[test]
    fn receiver_is_never_flagged() {
        let report = run_on_source(
            r#"
            class Greeter:
                def hello(self):
                    return "hi"

                @classmethod
                def build(cls):
                    return "built"

                @staticmethod
                def helper(value):
                    return 1

            print(Greeter)
            "#,
        );
        // `self`/`cls` are exempt; a staticmethod's first parameter is not
        assert_eq!(names_for_rule(&report, Rule::UnusedParameter), vec!["value"]);
    }

    #[test]
    fn keyword_only_and_positional_only_parameters_count() {
        let report = run_on_source(
            r#"
            def mixed(a, /, b, *, c):
                return a + b

            print(mixed(1, 2, c=3))
            "#,
        );
        assert_eq!(names_for_rule(&report, Rule::UnusedParameter), vec!["c"]);
    }

    #[test]
    fn lambda_parameters_are_not_flagged() {
        let report = run_on_source(
            r#"
            constant = lambda x: 99
            print(constant(1))
            "#,
        );
        assert!(names_for_rule(&report, Rule::UnusedParameter).is_empty());
    }

    #[test_case("def f(used):\n    return used\n", &[]; "read parameter")]
    #[test_case("def f(a, b):\n    return a\n", &["b"]; "one of two unused")]
    #[test_case("def f(x):\n    x = 1\n    return x\n", &[]; "reassigned and read")]
    fn unused_parameter_cases(source: &str, expected: &[&str]) {
        let report = run_on_source(source);
        assert_eq!(names_for_rule(&report, Rule::UnusedParameter), expected);
    }
}
