//! Rule repository and per-node dispatch.
//!
//! The repository compiles catalogs into rules, rejects malformed ones with a
//! [`RuleDefinitionError`] each, and indexes the survivors by the root shape of
//! their before-templates so a target node only meets rules that could match it.

mod arbitrate;
mod select;
mod suppress;

pub use arbitrate::{Arbitration, arbitrate};
pub use select::{Candidate, select_winner};
pub use suppress::{AnnotationSuppressions, NoSuppressions, SuppressionRegistry};

use crate::ast::{CompilationUnit, Expr, ExprKind, simple_name};
use crate::error::RuleDefinitionError;
use crate::guard::GuardRegistry;
use crate::matcher::Unifier;
use crate::rule::{Multiplicity, Rule, RuleCatalog};
use crate::template::{Pattern, compile_rule, shape_key};
use crate::types::{DeclaredTypeOracle, TypeHierarchy};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Discriminator shared by every `!x` target.
const NOT_KEY: &str = "unary:!";

/// The loaded, validated rule set.
#[derive(Debug, Clone, Default)]
pub struct RuleRepository {
    rules: Vec<Rule>,
    index: HashMap<String, Vec<usize>>,
    /// Rules with an alternative whose root is a metavariable.
    unindexed: Vec<usize>,
    errors: Vec<RuleDefinitionError>,
}

impl RuleRepository {
    /// Compiles every rule of `catalogs`; malformed rules are logged and skipped.
    ///
    /// Rule ids follow declaration order across catalogs, so ties between
    /// otherwise equal rules resolve the same way on every run.
    pub fn load(catalogs: &[RuleCatalog], guards: &GuardRegistry, hierarchy: &TypeHierarchy) -> Self {
        let checks = LoadChecks::new(hierarchy);
        let mut rules: Vec<Rule> = Vec::new();
        let mut errors = Vec::new();
        let mut id = 0;

        for catalog in catalogs {
            for spec in &catalog.rules {
                let compiled = compile_rule(spec, &catalog.group, id, guards, hierarchy)
                    .and_then(|r| checks.check_idempotent(&r).map(|_| r))
                    .and_then(|r| checks.check_distinct(&r, &rules).map(|_| r));
                id += 1;
                match compiled {
                    Ok(r) => rules.push(r),
                    Err(e) => {
                        warn!(rule = %e.rule(), error = %e, "rejecting rule");
                        errors.push(e);
                    }
                }
            }
        }

        debug!(loaded = rules.len(), rejected = errors.len(), "rule repository loaded");
        Self::indexed(rules, errors)
    }

    fn indexed(rules: Vec<Rule>, errors: Vec<RuleDefinitionError>) -> Self {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        let mut unindexed = Vec::new();

        for (pos, r) in rules.iter().enumerate() {
            let mut keys = BTreeSet::new();
            let mut anywhere = false;
            for alt in &r.before {
                match &alt.discriminator {
                    Some(key) => {
                        keys.insert(key.clone());
                    }
                    None => anywhere = true,
                }
                if r.also_negation {
                    keys.insert(NOT_KEY.to_string());
                    if let Some(key) = alt.pattern.negated().and_then(|p| p.discriminator()) {
                        keys.insert(key);
                    }
                }
            }
            if anywhere {
                unindexed.push(pos);
            } else {
                for key in keys {
                    index.entry(key).or_default().push(pos);
                }
            }
        }

        Self {
            rules,
            index,
            unindexed,
            errors,
        }
    }

    /// Keeps only the rules `keep` accepts; load errors are preserved.
    pub fn retain(self, keep: impl Fn(&Rule) -> bool) -> Self {
        let rules = self.rules.into_iter().filter(|r| keep(r)).collect();
        Self::indexed(rules, self.errors)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Errors of the rules rejected at load.
    pub fn errors(&self) -> &[RuleDefinitionError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Looks a rule up by simple or qualified name.
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|r| r.name == name || r.qualified_name() == name)
    }

    /// Rules whose before-templates could match `expr`, in load order.
    pub fn find_applicable_rules(&self, expr: &Expr) -> Vec<&Rule> {
        let mut positions: Vec<usize> = self
            .index
            .get(&shape_key(expr))
            .into_iter()
            .flatten()
            .chain(&self.unindexed)
            .copied()
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions.into_iter().map(|pos| &self.rules[pos]).collect()
    }

    /// Whether `rule` could match anywhere in `unit`.
    ///
    /// Some alternative must have every identifier it requires present in the
    /// unit. Qualified names only need their last segment.
    pub fn may_apply(rule: &Rule, unit: &CompilationUnit) -> bool {
        rule.before.iter().any(|alt| {
            alt.identifiers
                .iter()
                .all(|ident| unit.has_identifier(simple_name(ident)))
        })
    }

    /// `(rule name, example before, example after)` for every rule.
    pub fn documentation(&self) -> Vec<(String, String, String)> {
        self.rules.iter().map(Rule::documentation).collect()
    }
}

/// Load-time checks, run against an empty compilation unit with a lenient oracle.
struct LoadChecks {
    unit: Option<CompilationUnit>,
    oracle: DeclaredTypeOracle,
}

impl LoadChecks {
    fn new(hierarchy: &TypeHierarchy) -> Self {
        Self {
            unit: CompilationUnit::parse("class Scratch {}").ok(),
            oracle: DeclaredTypeOracle::new(hierarchy.clone()).lenient(true),
        }
    }

    /// Rejects a rule whose before-templates match anywhere in its own after-template.
    fn check_idempotent(&self, r: &Rule) -> Result<(), RuleDefinitionError> {
        let Some(unit) = &self.unit else {
            return Ok(());
        };
        let output = r.after.skeleton();
        let unifier = Unifier::new(r, &self.oracle, unit);
        for (index, alt) in r.before.iter().enumerate() {
            let mut rematched = false;
            output.visit(&mut |node| {
                if !rematched && !matches!(node.kind, ExprKind::Paren(_)) {
                    rematched = unifier.match_pattern(&alt.pattern, node).is_some();
                }
            });
            if rematched {
                return Err(RuleDefinitionError::NotIdempotent {
                    rule: r.qualified_name(),
                    index,
                });
            }
        }
        Ok(())
    }

    /// Rejects a rule that reuses a name, or that no tie breaker can separate from
    /// an accepted rule.
    ///
    /// Alternatives at equal priority and specificity clash when one of them
    /// matches the other's before-template, read as an expression whose
    /// metavariables hold values of their declared types.
    fn check_distinct(&self, r: &Rule, accepted: &[Rule]) -> Result<(), RuleDefinitionError> {
        let name = r.qualified_name();
        if accepted.iter().any(|other| other.qualified_name() == name) {
            return Err(RuleDefinitionError::DuplicateName { rule: name });
        }

        for (index, alt) in r.before.iter().enumerate() {
            let shape = canonical(r, &alt.pattern);
            let example = typed_example(r, &alt.pattern);
            for other in accepted.iter().filter(|o| o.priority == r.priority) {
                let clash = other
                    .before
                    .iter()
                    .filter(|o| o.specificity == alt.specificity)
                    .any(|o| {
                        canonical(other, &o.pattern) == shape
                            || self.unifies(other, &o.pattern, &example)
                            || self.unifies(r, &alt.pattern, &typed_example(other, &o.pattern))
                    });
                if clash {
                    return Err(RuleDefinitionError::AmbiguousWith {
                        rule: name,
                        index,
                        other: other.qualified_name(),
                    });
                }
            }
        }
        Ok(())
    }

    fn unifies(&self, r: &Rule, pattern: &Pattern, target: &Expr) -> bool {
        self.unit.as_ref().is_some_and(|unit| {
            Unifier::new(r, &self.oracle, unit)
                .match_pattern(pattern, target)
                .is_some()
        })
    }
}

/// The before-template as code, each metavariable cast to its declared type.
fn typed_example(r: &Rule, pattern: &Pattern) -> Expr {
    pattern.skeleton_with(&mut |p| match p {
        Pattern::Metavar(name) => r.param(name).map(|param| {
            Expr::synthetic(ExprKind::Cast {
                ty: param.ty.clone(),
                expr: Box::new(Expr::name(name.clone())),
            })
        }),
        _ => None,
    })
}

/// Pattern text with metavariables replaced by their declared types.
fn canonical(r: &Rule, pattern: &Pattern) -> String {
    pattern
        .skeleton_with(&mut |p| match p {
            Pattern::Metavar(name) => {
                let label = match r.param(name) {
                    Some(param) if param.multiplicity == Multiplicity::Repeated => {
                        format!("${}...", param.ty)
                    }
                    Some(param) => format!("${}", param.ty),
                    None => "$".to_string(),
                };
                Some(Expr::name(label))
            }
            Pattern::LambdaParam(_) => Some(Expr::name("$lambda")),
            Pattern::Placeholder(call) => Some(Expr::name(format!("${}", call.decl.params.len()))),
            _ => None,
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository(yaml: &str) -> RuleRepository {
        let catalog = RuleCatalog::from_yaml(yaml).unwrap();
        RuleRepository::load(&[catalog], &GuardRegistry::builtin(), &TypeHierarchy::jdk())
    }

    const CATALOG: &str = r#"
group: Sample
rules:
  - name: ListGetFirst
    type_params: [T]
    params: [{name: list, type: List<T>}]
    before: ["list.get(0)"]
    after: list.getFirst()
  - name: InstantIsBefore
    params: [{name: a, type: Instant}, {name: b, type: Instant}]
    before: ["a.compareTo(b) < 0"]
    after: a.isBefore(b)
    also_negation: true
"#;

    #[test]
    fn test_load_and_index() {
        let repo = repository(CATALOG);
        assert!(repo.errors().is_empty(), "{:?}", repo.errors());
        assert_eq!(repo.len(), 2);
        assert!(repo.get("Sample.ListGetFirst").is_some());

        let get = crate::ast::parse_expression("names.get(0)").unwrap();
        let names: Vec<_> = repo
            .find_applicable_rules(&get)
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["ListGetFirst"]);

        let negated = crate::ast::parse_expression("!(x.compareTo(y) < 0)").unwrap();
        let names: Vec<_> = repo
            .find_applicable_rules(&negated)
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["InstantIsBefore"]);

        let flipped = crate::ast::parse_expression("x.compareTo(y) >= 0").unwrap();
        assert_eq!(repo.find_applicable_rules(&flipped)[0].name, "InstantIsBefore");
    }

    #[test]
    fn test_rejects_malformed_rules_individually() {
        let repo = repository(
            r#"
group: Broken
rules:
  - name: Good
    params: [{name: s, type: String}]
    before: ["s.length() == 0"]
    after: s.isEmpty()
  - name: Loops
    params: [{name: s, type: String}]
    before: ["s.trim()"]
    after: s.trim().trim()
  - name: Good
    params: [{name: s, type: String}]
    before: ["s.equals(\"\")"]
    after: s.isEmpty()
  - name: SameAsGood
    params: [{name: t, type: String}]
    before: ["t.length() == 0"]
    after: t.isBlank()
"#,
        );
        assert_eq!(repo.len(), 1);
        let errors = repo.errors();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], RuleDefinitionError::NotIdempotent { .. }));
        assert!(matches!(errors[1], RuleDefinitionError::DuplicateName { .. }));
        assert!(matches!(errors[2], RuleDefinitionError::AmbiguousWith { .. }));
    }

    #[test]
    fn test_rejects_overlapping_templates() {
        let repo = repository(
            r#"
group: Wrappers
rules:
  - name: UnwrapObject
    params: [{name: x, type: Object}]
    before: ["wrap(x)"]
    after: unwrapA(x)
  - name: UnwrapAny
    type_params: [T]
    params: [{name: x, type: T}]
    before: ["wrap(x)"]
    after: unwrapB(x)
"#,
        );
        assert_eq!(repo.len(), 1);
        assert!(matches!(
            &repo.errors()[0],
            RuleDefinitionError::AmbiguousWith { rule, other, .. }
                if rule == "Wrappers.UnwrapAny" && other == "Wrappers.UnwrapObject"
        ));
    }

    #[test]
    fn test_same_shape_over_unrelated_types_is_distinct() {
        let repo = repository(
            r#"
group: Emptiness
rules:
  - name: MapIsEmpty
    type_params: [K, V]
    params: [{name: map, type: "Map<K, V>"}]
    before: ["assertThat(map.isEmpty()).isTrue()"]
    after: assertThat(map).isEmpty()
  - name: OptionalIsEmpty
    type_params: [T]
    params: [{name: optional, type: "Optional<T>"}]
    before: ["assertThat(optional.isEmpty()).isTrue()"]
    after: assertThat(optional).isEmpty()
  - name: StringIsEmpty
    params: [{name: s, type: String}]
    before: ["s.length() == 0"]
    after: s.isEmpty()
  - name: CollectionIsEmpty
    type_params: [T]
    params: [{name: c, type: "Collection<T>"}]
    before: ["c.size() == 0"]
    after: c.isEmpty()
"#,
        );
        assert!(repo.errors().is_empty(), "{:?}", repo.errors());
        assert_eq!(repo.len(), 4);
    }

    #[test]
    fn test_identifier_prefilter() {
        let repo = repository(CATALOG);
        let unit = CompilationUnit::parse("class A { int f(List<String> l) { return l.size(); } }")
            .unwrap();
        let list = repo.get("ListGetFirst").unwrap();
        let instant = repo.get("InstantIsBefore").unwrap();
        assert!(!RuleRepository::may_apply(list, &unit));
        assert!(!RuleRepository::may_apply(instant, &unit));

        let unit = CompilationUnit::parse("class A { Object f(List<String> l) { return l.get(0); } }")
            .unwrap();
        assert!(RuleRepository::may_apply(list, &unit));
    }

    #[test]
    fn test_retain() {
        let repo = repository(CATALOG).retain(|r| r.name != "ListGetFirst");
        assert_eq!(repo.len(), 1);
        let get = crate::ast::parse_expression("names.get(0)").unwrap();
        assert!(repo.find_applicable_rules(&get).is_empty());
        assert_eq!(repo.documentation()[0].1, "a.compareTo(b) < 0");
    }
}
