//! Choosing one rule per target node.

use crate::matcher::Binding;
use crate::rule::{Rule, Specificity};
use std::cmp::Ordering;
use tracing::warn;

/// A rule that matched a node, with the alternative that matched it.
#[derive(Debug, Clone)]
pub struct Candidate<'r> {
    pub rule: &'r Rule,
    pub alternative: usize,
    pub binding: Binding,
    /// The node matched the logical negation of the alternative.
    pub negated: bool,
}

impl Candidate<'_> {
    pub fn specificity(&self) -> Specificity {
        self.rule
            .before
            .get(self.alternative)
            .map(|a| a.specificity)
            .unwrap_or_default()
    }

    fn rank(&self) -> (i32, Specificity) {
        (self.rule.priority, self.specificity())
    }
}

/// Picks the winner among rules matching the same node.
///
/// Higher priority wins, then higher specificity (more fixed structure,
/// narrower type bounds). Remaining ties go to the rule loaded first.
pub fn select_winner(candidates: Vec<Candidate<'_>>) -> Option<Candidate<'_>> {
    let best = candidates
        .iter()
        .map(Candidate::rank)
        .max()?;
    let tied: Vec<_> = candidates.into_iter().filter(|c| c.rank() == best).collect();
    if tied.len() > 1 {
        let names: Vec<_> = tied.iter().map(|c| c.rule.qualified_name()).collect();
        warn!(rules = ?names, "unresolved tie between rules, using the first loaded");
    }
    tied.into_iter().min_by(|a, b| match a.rule.id.cmp(&b.rule.id) {
        Ordering::Equal => a.alternative.cmp(&b.alternative),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::GuardRegistry;
    use crate::rule::RuleSpec;
    use crate::template::compile_rule;
    use crate::types::TypeHierarchy;

    fn compiled(yaml: &str, id: usize) -> Rule {
        let spec: RuleSpec = serde_yaml::from_str(yaml).unwrap();
        compile_rule(&spec, "Test", id, &GuardRegistry::builtin(), &TypeHierarchy::jdk()).unwrap()
    }

    fn candidate(rule: &Rule) -> Candidate<'_> {
        Candidate {
            rule,
            alternative: 0,
            binding: Binding::new(),
            negated: false,
        }
    }

    #[test]
    fn test_specificity_then_priority() {
        let general = compiled(
            r#"
name: AnyGet
params: [{name: c, type: Object}, {name: i, type: int}]
before: ["c.get(i)"]
after: c.fetch(i)
"#,
            0,
        );
        let narrow = compiled(
            r#"
name: ListGetFirst
type_params: [T]
params: [{name: list, type: List<T>}]
before: ["list.get(0)"]
after: list.getFirst()
"#,
            1,
        );
        let winner = select_winner(vec![candidate(&general), candidate(&narrow)]).unwrap();
        assert_eq!(winner.rule.name, "ListGetFirst");

        let urgent = compiled(
            r#"
name: Urgent
params: [{name: c, type: Object}, {name: i, type: int}]
before: ["c.get(i)"]
after: c.at(i)
priority: 10
"#,
            2,
        );
        let winner =
            select_winner(vec![candidate(&general), candidate(&narrow), candidate(&urgent)]).unwrap();
        assert_eq!(winner.rule.name, "Urgent");
    }

    #[test]
    fn test_tie_goes_to_first_loaded() {
        let first = compiled(
            r#"
name: First
params: [{name: s, type: String}]
before: ["s.length() == 0"]
after: s.isEmpty()
"#,
            3,
        );
        let second = compiled(
            r#"
name: Second
params: [{name: s, type: String}]
before: ["s.length() == 0"]
after: s.isBlank()
"#,
            4,
        );
        let winner = select_winner(vec![candidate(&second), candidate(&first)]).unwrap();
        assert_eq!(winner.rule.name, "First");
        assert!(select_winner(Vec::new()).is_none());
    }
}
