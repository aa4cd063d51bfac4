//! Guard matchers: side conditions on metavariable bindings.
//!
//! A rule parameter may require (`matches`) or forbid (`not_matches`) that its
//! bound expression satisfies a named [`GuardMatcher`]. Guards run only after
//! a structural match succeeded, and a guard that cannot decide rejects the
//! match.

mod builtin;

pub use builtin::{
    IsArray, IsEmpty, IsLikelyTrivialComputation, IsLiteral, IsSideEffectFree,
    RequiresComputation,
};

use crate::ast::{CompilationUnit, Expr, JavaType, Span};
use crate::error::GuardError;
use crate::matcher::{Bound, Binding};
use crate::rule::Rule;
use crate::types::TypeOracle;
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::warn;

/// What a guard sees: the bound expression and its semantic context.
pub struct GuardContext<'a> {
    pub expr: &'a Expr,
    pub ty: Option<&'a JavaType>,
    pub unit: &'a CompilationUnit,
    pub oracle: &'a dyn TypeOracle,
}

impl GuardContext<'_> {
    /// Static type of some other expression in the same unit.
    pub fn type_of(&self, expr: &Expr) -> Option<JavaType> {
        self.oracle.static_type(expr, self.unit)
    }
}

/// A named predicate over bound expressions.
///
/// Implementations must be pure: the same context always gives the same answer.
pub trait GuardMatcher: Send + Sync {
    /// The name rules refer to this guard by.
    fn name(&self) -> &'static str;

    fn matches(&self, cx: &GuardContext<'_>) -> Result<bool, GuardError>;
}

/// The set of guards rules may refer to.
#[derive(Default)]
pub struct GuardRegistry {
    matchers: Vec<Box<dyn GuardMatcher>>,
}

impl GuardRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in guard.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(IsEmpty));
        registry.register(Box::new(IsArray));
        registry.register(Box::new(IsLikelyTrivialComputation));
        registry.register(Box::new(RequiresComputation));
        registry.register(Box::new(IsSideEffectFree));
        registry.register(Box::new(IsLiteral));
        registry
    }

    /// Registers a guard, replacing any guard of the same name.
    pub fn register(&mut self, matcher: Box<dyn GuardMatcher>) {
        self.matchers.retain(|m| m.name() != matcher.name());
        self.matchers.push(matcher);
    }

    pub fn get(&self, name: &str) -> Option<&dyn GuardMatcher> {
        self.matchers
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.matchers.iter().map(|m| m.name())
    }
}

/// Evaluates rule guards for one compilation unit, caching results per
/// (guard, source span).
pub struct GuardEvaluator<'a> {
    registry: &'a GuardRegistry,
    unit: &'a CompilationUnit,
    oracle: &'a dyn TypeOracle,
    cache: RefCell<HashMap<(&'static str, Span), Result<bool, GuardError>>>,
}

impl<'a> GuardEvaluator<'a> {
    pub fn new(
        registry: &'a GuardRegistry,
        unit: &'a CompilationUnit,
        oracle: &'a dyn TypeOracle,
    ) -> Self {
        Self {
            registry,
            unit,
            oracle,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Returns true if every guard of `rule` holds for `binding`.
    ///
    /// Guards on repeated variables must hold for each element. Unknown guards,
    /// unbound variables and guard faults all reject the binding.
    pub fn apply_guards(&self, rule: &Rule, binding: &Binding) -> bool {
        rule.guards.iter().all(|guard| {
            let Some(matcher) = self.registry.get(&guard.matcher) else {
                warn!(rule = %rule.qualified_name(), guard = %guard.matcher, "unknown guard");
                return false;
            };
            let Some(bound) = binding.get(&guard.var) else {
                warn!(rule = %rule.qualified_name(), var = %guard.var, "guard on unbound variable");
                return false;
            };
            let items = match bound {
                Bound::Single(b) => std::slice::from_ref(b),
                Bound::Repeated(items) => items.as_slice(),
            };
            items.iter().all(|item| {
                match self.evaluate(matcher, &item.expr, item.ty.as_ref()) {
                    Ok(result) => result != guard.negate,
                    Err(e) => {
                        warn!(rule = %rule.qualified_name(), error = %e, "guard failed, skipping match");
                        false
                    }
                }
            })
        })
    }

    fn evaluate(
        &self,
        matcher: &dyn GuardMatcher,
        expr: &Expr,
        ty: Option<&JavaType>,
    ) -> Result<bool, GuardError> {
        let key = expr.span.map(|span| (matcher.name(), span));
        if let Some(key) = key {
            if let Some(cached) = self.cache.borrow().get(&key) {
                return cached.clone();
            }
        }
        let cx = GuardContext {
            expr,
            ty,
            unit: self.unit,
            oracle: self.oracle,
        };
        let result = matcher.matches(&cx);
        if let Some(key) = key {
            self.cache.borrow_mut().insert(key, result.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleSpec;
    use crate::template::compile_rule;
    use crate::types::{DeclaredTypeOracle, TypeHierarchy};
    use crate::matcher::Unifier;

    const SOURCE: &str = r#"
import java.util.*;

class A {
    void run(List<String> list, String[] names) {
        foo(new ArrayList<>());
        foo(list);
        bar(names, "a", "b");
        bar(names, compute(), "b");
    }
}
"#;

    fn rule(yaml: &str, registry: &GuardRegistry) -> Rule {
        let spec: RuleSpec = serde_yaml::from_str(yaml).unwrap();
        compile_rule(&spec, "Test", 0, registry, &TypeHierarchy::jdk()).unwrap()
    }

    fn guarded(rule: &Rule, registry: &GuardRegistry, text: &str) -> bool {
        let unit = CompilationUnit::parse(SOURCE).unwrap();
        let oracle = DeclaredTypeOracle::default().lenient(true);
        let unifier = Unifier::new(rule, &oracle, &unit);
        let evaluator = GuardEvaluator::new(registry, &unit, &oracle);
        let target = crate::ast::parse_expression(text).unwrap();
        unifier
            .match_alternatives_with(&target, |b| evaluator.apply_guards(rule, b))
            .is_some()
    }

    #[test]
    fn test_builtin_registry() {
        let registry = GuardRegistry::builtin();
        for name in [
            "is_empty",
            "is_array",
            "is_likely_trivial_computation",
            "requires_computation",
            "is_side_effect_free",
            "is_literal",
        ] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert!(!registry.contains("is_nonsense"));
    }

    #[test]
    fn test_matches_and_not_matches() {
        let registry = GuardRegistry::builtin();
        let required = rule(
            r#"
name: FooEmpty
params: [{name: c, type: Object, matches: [is_empty]}]
before: ["foo(c)"]
after: foo()
"#,
            &registry,
        );
        assert!(guarded(&required, &registry, "foo(new ArrayList<>())"));
        assert!(!guarded(&required, &registry, "foo(list)"));

        let negated = rule(
            r#"
name: FooNonEmpty
params: [{name: c, type: Object, not_matches: [is_empty]}]
before: ["foo(c)"]
after: foo()
"#,
            &registry,
        );
        assert!(!guarded(&negated, &registry, "foo(new ArrayList<>())"));
        assert!(guarded(&negated, &registry, "foo(list)"));
    }

    #[test]
    fn test_repeated_guard_holds_for_every_element() {
        let registry = GuardRegistry::builtin();
        let literals = rule(
            r#"
name: BarLiterals
params:
  - {name: first, type: Object}
  - {name: rest, type: "Object...", repeated: true, matches: [is_literal]}
before: ["bar(first, rest)"]
after: baz(first, rest)
"#,
            &registry,
        );
        assert!(guarded(&literals, &registry, "bar(names, \"a\", \"b\")"));
        assert!(!guarded(&literals, &registry, "bar(names, compute(), \"b\")"));
    }

    struct AlwaysFails;

    impl GuardMatcher for AlwaysFails {
        fn name(&self) -> &'static str {
            "always_fails"
        }

        fn matches(&self, _cx: &GuardContext<'_>) -> Result<bool, GuardError> {
            Err(GuardError::Failed {
                guard: self.name().to_string(),
                message: "boom".to_string(),
            })
        }
    }

    #[test]
    fn test_guard_errors_fail_closed() {
        let mut registry = GuardRegistry::builtin();
        registry.register(Box::new(AlwaysFails));
        for key in ["matches", "not_matches"] {
            let yaml = format!(
                "name: Faulty\nparams: [{{name: c, type: Object, {key}: [always_fails]}}]\nbefore: [\"foo(c)\"]\nafter: foo()\n"
            );
            let faulty = rule(&yaml, &registry);
            assert!(!guarded(&faulty, &registry, "foo(list)"));
        }
    }
}
