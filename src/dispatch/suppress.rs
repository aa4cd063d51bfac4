//! Per-site suppression of rules.

use crate::ast::{CompilationUnit, Span};
use crate::rule::Rule;

/// Decides whether a rule may rewrite a given source range.
pub trait SuppressionRegistry: Send + Sync {
    fn is_suppressed(&self, rule: &Rule, span: Span, unit: &CompilationUnit) -> bool;
}

/// Honors `@SuppressWarnings` on enclosing declarations.
///
/// A declaration is exempt from a rule when the annotation names the rule
/// (`"ListGetFirst"` or `"CollectionRules.ListGetFirst"`), its group,
/// `"Refaster"` or `"all"`.
#[derive(Debug, Clone, Default)]
pub struct AnnotationSuppressions;

impl SuppressionRegistry for AnnotationSuppressions {
    fn is_suppressed(&self, rule: &Rule, span: Span, unit: &CompilationUnit) -> bool {
        let qualified = rule.qualified_name();
        unit.suppressions()
            .iter()
            .filter(|s| s.span.contains(&span))
            .flat_map(|s| s.names.iter())
            .any(|name| {
                name == "all"
                    || name == "Refaster"
                    || *name == rule.name
                    || *name == qualified
                    || (!rule.group.is_empty() && *name == rule.group)
            })
    }
}

/// Never suppresses anything.
#[derive(Debug, Clone, Default)]
pub struct NoSuppressions;

impl SuppressionRegistry for NoSuppressions {
    fn is_suppressed(&self, _rule: &Rule, _span: Span, _unit: &CompilationUnit) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::GuardRegistry;
    use crate::rule::RuleSpec;
    use crate::template::compile_rule;
    use crate::types::TypeHierarchy;

    const SOURCE: &str = r#"
class A {
    @SuppressWarnings("CollectionRules")
    String first(List<String> list) {
        return list.get(0);
    }

    String other(List<String> list) {
        return list.get(0);
    }
}
"#;

    fn list_rule() -> Rule {
        let spec: RuleSpec = serde_yaml::from_str(
            r#"
name: ListGetFirst
type_params: [T]
params: [{name: list, type: List<T>}]
before: ["list.get(0)"]
after: list.getFirst()
"#,
        )
        .unwrap();
        compile_rule(
            &spec,
            "CollectionRules",
            0,
            &GuardRegistry::builtin(),
            &TypeHierarchy::jdk(),
        )
        .unwrap()
    }

    fn span_of(source: &str, needle: &str, nth: usize) -> Span {
        let start = source.match_indices(needle).nth(nth).unwrap().0;
        Span::new(start, start + needle.len())
    }

    #[test]
    fn test_group_suppression_covers_annotated_method_only() {
        let unit = CompilationUnit::parse(SOURCE).unwrap();
        let rule = list_rule();
        let registry = AnnotationSuppressions;

        assert!(registry.is_suppressed(&rule, span_of(SOURCE, "list.get(0)", 0), &unit));
        assert!(!registry.is_suppressed(&rule, span_of(SOURCE, "list.get(0)", 1), &unit));
        assert!(!NoSuppressions.is_suppressed(&rule, span_of(SOURCE, "list.get(0)", 0), &unit));
    }
}
