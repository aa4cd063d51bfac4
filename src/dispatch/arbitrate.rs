//! Arbitration between overlapping replacements of one pass.

use crate::transform::Replacement;
use std::cmp::Reverse;

/// Accepted replacements of a pass, plus how many were deferred.
#[derive(Debug, Clone, Default)]
pub struct Arbitration {
    /// Non-overlapping replacements in source order.
    pub accepted: Vec<Replacement>,
    /// Replacements that lost to an overlapping one; the next pass retries them.
    pub deferred: usize,
}

/// Keeps at most one replacement per overlapping range.
///
/// Preference order: higher rule priority, larger range (the enclosing
/// rewrite carries the inner code along for the next pass), higher
/// specificity, shorter text, earlier position.
pub fn arbitrate(mut candidates: Vec<Replacement>) -> Arbitration {
    candidates.sort_by_key(|r| {
        (
            Reverse(r.priority),
            Reverse(r.span.len()),
            Reverse(r.specificity),
            r.text.len(),
            r.span.start,
        )
    });

    let mut result = Arbitration::default();
    for candidate in candidates {
        if result.accepted.iter().any(|a| a.overlaps(&candidate)) {
            result.deferred += 1;
        } else {
            result.accepted.push(candidate);
        }
    }
    result.accepted.sort_by_key(|r| r.span.start);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;
    use crate::rule::Specificity;

    fn replacement(start: usize, end: usize, text: &str, priority: i32) -> Replacement {
        Replacement {
            span: Span::new(start, end),
            text: text.to_string(),
            imports: Vec::new(),
            removable_imports: Vec::new(),
            rule: format!("R{start}"),
            priority,
            specificity: Specificity::default(),
            behavior_preserving: true,
            notes: Vec::new(),
        }
    }

    #[test]
    fn test_disjoint_replacements_all_accepted() {
        let result = arbitrate(vec![replacement(20, 30, "b", 0), replacement(0, 10, "a", 0)]);
        assert_eq!(result.deferred, 0);
        assert_eq!(result.accepted.len(), 2);
        assert_eq!(result.accepted[0].span.start, 0);
    }

    #[test]
    fn test_enclosing_range_wins_at_equal_priority() {
        let result = arbitrate(vec![replacement(5, 10, "inner", 0), replacement(0, 20, "outer", 0)]);
        assert_eq!(result.deferred, 1);
        assert_eq!(result.accepted.len(), 1);
        assert_eq!(result.accepted[0].text, "outer");
    }

    #[test]
    fn test_priority_beats_range() {
        let result = arbitrate(vec![replacement(5, 10, "inner", 5), replacement(0, 20, "outer", 0)]);
        assert_eq!(result.accepted.len(), 1);
        assert_eq!(result.accepted[0].text, "inner");
    }
}
