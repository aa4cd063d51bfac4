//! The rewrite driver.
//!
//! For each compilation unit the engine walks every expression, asks the
//! repository for the rules that could match it, unifies, evaluates guards,
//! picks one winner per node and instantiates its after-template. Overlapping
//! replacements are arbitrated, the survivors spliced in, and the file is
//! re-parsed for another pass until nothing changes or `max_passes` is hit.

use crate::apply::{AcceptAll, SourceVerifier, SyntaxVerifier, apply_replacements};
use crate::ast::{CompilationUnit, Expr, ExprKind, Printer};
use crate::config::EngineConfig;
use crate::dispatch::{
    AnnotationSuppressions, Arbitration, Candidate, RuleRepository, SuppressionRegistry,
    arbitrate, select_winner,
};
use crate::error::{RefasterError, Result, RuleDefinitionError};
use crate::guard::{GuardEvaluator, GuardMatcher, GuardRegistry};
use crate::matcher::Unifier;
use crate::rule::{Rule, RuleCatalog};
use crate::transform::{
    FileChange, Instantiation, Replacement, Transform, instantiate, plan_imports,
    removable_imports,
};
use crate::types::{DeclaredTypeOracle, TypeOracle};
use rayon::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// The outcome of rewriting one source text.
#[derive(Debug, Clone)]
pub struct Rewrite {
    pub source: String,
    /// Applied replacements, pass by pass; spans refer to the text of their pass.
    pub replacements: Vec<Replacement>,
    /// Passes that found something to rewrite.
    pub passes: usize,
}

impl Rewrite {
    pub fn is_modified(&self) -> bool {
        !self.replacements.is_empty()
    }
}

/// A configured, immutable rewrite engine; shareable across threads.
pub struct Engine {
    repository: RuleRepository,
    guards: GuardRegistry,
    oracle: Box<dyn TypeOracle>,
    suppressions: Box<dyn SuppressionRegistry>,
    verifier: Box<dyn SourceVerifier>,
    max_passes: usize,
}

/// Per-unit state of one pass.
struct Pass<'a> {
    unit: &'a CompilationUnit,
    active: HashSet<usize>,
    guards: GuardEvaluator<'a>,
    printer: Printer<'a>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn repository(&self) -> &RuleRepository {
        &self.repository
    }

    pub fn rules(&self) -> &[Rule] {
        self.repository.rules()
    }

    /// Errors of rules rejected while loading.
    pub fn load_errors(&self) -> &[RuleDefinitionError] {
        self.repository.errors()
    }

    /// Every replacement one pass would propose, before arbitration.
    pub fn find_replacements(&self, unit: &CompilationUnit) -> Vec<Replacement> {
        let active: HashSet<usize> = self
            .repository
            .rules()
            .iter()
            .filter(|r| RuleRepository::may_apply(r, unit))
            .map(|r| r.id)
            .collect();
        if active.is_empty() {
            return Vec::new();
        }

        let pass = Pass {
            unit,
            active,
            guards: GuardEvaluator::new(&self.guards, unit, self.oracle.as_ref()),
            printer: Printer::with_source(unit.source()),
        };
        let mut found = Vec::new();
        for root in unit.roots() {
            self.visit(&pass, root, true, &mut found);
        }
        found
    }

    /// `bare` is true where any expression may stand without parentheses.
    fn visit(&self, pass: &Pass<'_>, node: &Expr, bare: bool, found: &mut Vec<Replacement>) {
        if let ExprKind::Paren(inner) = &node.kind {
            self.visit(pass, inner, true, found);
            return;
        }
        if let Some(replacement) = self.rewrite_node(pass, node, bare) {
            found.push(replacement);
        }
        for (child, child_bare) in children_in_context(node) {
            self.visit(pass, child, child_bare, found);
        }
    }

    fn rewrite_node(&self, pass: &Pass<'_>, node: &Expr, bare: bool) -> Option<Replacement> {
        let span = node.span?;
        let mut candidates = Vec::new();
        for rule in self.repository.find_applicable_rules(node) {
            if !pass.active.contains(&rule.id)
                || self.suppressions.is_suppressed(rule, span, pass.unit)
            {
                continue;
            }
            let unifier = Unifier::new(rule, self.oracle.as_ref(), pass.unit);
            let found = unifier
                .match_alternatives_with(node, |b| pass.guards.apply_guards(rule, b))
                .map(|(i, b)| (i, b, false))
                .or_else(|| {
                    if rule.also_negation {
                        unifier
                            .match_negated(node, |b| pass.guards.apply_guards(rule, b))
                            .map(|(i, b)| (i, b, true))
                    } else {
                        None
                    }
                });
            if let Some((alternative, binding, negated)) = found {
                candidates.push(Candidate {
                    rule,
                    alternative,
                    binding,
                    negated,
                });
            }
        }

        let winner = select_winner(candidates)?;
        let rule = winner.rule;
        let Instantiation { expr, notes } = instantiate(rule, &winner.binding, winner.negated);
        let (expr, imports) = plan_imports(rule, pass.unit, expr);

        let mut text = pass.printer.render(&expr);
        if !bare && expr.precedence() < node.precedence() {
            text = format!("({text})");
        }
        if text == pass.unit.source()[span.range()] {
            return None;
        }

        Some(Replacement {
            span,
            removable_imports: removable_imports(pass.unit, node, &expr),
            text,
            imports,
            rule: rule.qualified_name(),
            priority: rule.priority,
            specificity: winner.specificity(),
            behavior_preserving: rule.behavior_preserving,
            notes: rule.risk.iter().cloned().chain(notes).collect(),
        })
    }

    /// Rewrites a source text, pass by pass.
    pub fn rewrite_source(&self, source: &str) -> Result<Rewrite> {
        let mut current = source.to_string();
        let mut replacements = Vec::new();
        let mut passes = 0;

        for pass in 1..=self.max_passes {
            let unit = CompilationUnit::parse(&current)?;
            let candidates = self.find_replacements(&unit);
            if candidates.is_empty() {
                break;
            }
            passes = pass;

            let Arbitration { accepted, deferred } = arbitrate(candidates);
            let applied = apply_replacements(&unit, accepted, self.verifier.as_ref())?;
            debug!(
                pass,
                applied = applied.applied.len(),
                deferred,
                rolled_back = applied.rolled_back.len(),
                "rewrite pass"
            );
            if applied.applied.is_empty() {
                break;
            }
            current = applied.source;
            replacements.extend(applied.applied);
        }

        Ok(Rewrite {
            source: current,
            replacements,
            passes,
        })
    }

    /// Rewrites one file without writing it back.
    pub fn rewrite_file(&self, path: &Path) -> Result<FileChange> {
        if !path.exists() {
            return Err(RefasterError::FileNotFound(path.to_path_buf()));
        }
        let original = std::fs::read_to_string(path)?;
        let rewrite = self.rewrite_source(&original).map_err(|e| match e {
            RefasterError::Parse { message, .. } => RefasterError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        Ok(FileChange {
            path: path.to_path_buf(),
            original,
            transformed: rewrite.source,
            replacements: rewrite.replacements,
        })
    }

    /// Rewrites files in parallel; results keep the input order.
    pub fn rewrite_files(&self, paths: &[PathBuf]) -> Vec<Result<FileChange>> {
        paths.par_iter().map(|path| self.rewrite_file(path)).collect()
    }

    /// `(rule name, example before, example after)` for every active rule.
    pub fn documentation(&self) -> Vec<(String, String, String)> {
        self.repository.documentation()
    }
}

/// Direct children, each flagged whether it sits where no parentheses are needed.
fn children_in_context(node: &Expr) -> Vec<(&Expr, bool)> {
    match &node.kind {
        ExprKind::Call { receiver, args, .. } => receiver
            .iter()
            .map(|r| (r.as_ref(), false))
            .chain(args.iter().map(|a| (a, true)))
            .collect(),
        ExprKind::New { .. } | ExprKind::NewArray { .. } | ExprKind::Lambda { .. } => {
            node.children().into_iter().map(|c| (c, true)).collect()
        }
        ExprKind::ArrayAccess { array, index } => {
            vec![(array.as_ref(), false), (index.as_ref(), true)]
        }
        _ => node.children().into_iter().map(|c| (c, false)).collect(),
    }
}

/// Builds an [`Engine`] from configuration, catalogs and collaborators.
pub struct EngineBuilder {
    config: EngineConfig,
    catalogs: Vec<RuleCatalog>,
    guards: GuardRegistry,
    oracle: Option<Box<dyn TypeOracle>>,
    suppressions: Option<Box<dyn SuppressionRegistry>>,
    verifier: Option<Box<dyn SourceVerifier>>,
    strict: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            catalogs: Vec::new(),
            guards: GuardRegistry::builtin(),
            oracle: None,
            suppressions: None,
            verifier: None,
            strict: false,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a rule catalog on top of the configured ones.
    pub fn catalog(mut self, catalog: RuleCatalog) -> Self {
        self.catalogs.push(catalog);
        self
    }

    /// Skips the bundled catalogs.
    pub fn without_builtin_rules(mut self) -> Self {
        self.config.builtin_rules = false;
        self
    }

    /// Registers a guard matcher, replacing a built-in one of the same name.
    pub fn guard(mut self, matcher: impl GuardMatcher + 'static) -> Self {
        self.guards.register(Box::new(matcher));
        self
    }

    /// Replaces the declaration-based type oracle.
    pub fn oracle(mut self, oracle: impl TypeOracle + 'static) -> Self {
        self.oracle = Some(Box::new(oracle));
        self
    }

    /// Replaces the `@SuppressWarnings` based suppression lookup.
    pub fn suppressions(mut self, suppressions: impl SuppressionRegistry + 'static) -> Self {
        self.suppressions = Some(Box::new(suppressions));
        self
    }

    /// Replaces the syntax re-check applied to rewritten files.
    pub fn verifier(mut self, verifier: impl SourceVerifier + 'static) -> Self {
        self.verifier = Some(Box::new(verifier));
        self
    }

    /// Fail [`EngineBuilder::build`] if any rule is rejected.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn build(self) -> Result<Engine> {
        let EngineBuilder {
            config,
            catalogs: extra,
            guards,
            oracle,
            suppressions,
            verifier,
            strict,
        } = self;

        let mut catalogs = Vec::new();
        if config.builtin_rules {
            catalogs.extend(RuleCatalog::builtin()?);
        }
        for path in &config.rule_files {
            catalogs.push(RuleCatalog::from_file(path)?);
        }
        catalogs.extend(extra);

        let hierarchy = config.hierarchy();
        let include = config
            .include_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()?;
        let repository = RuleRepository::load(&catalogs, &guards, &hierarchy)
            .retain(|r| config.enables(include.as_ref(), &r.name, &r.qualified_name()));
        if strict && !repository.errors().is_empty() {
            return Err(RefasterError::RulesRejected {
                count: repository.errors().len(),
            });
        }
        info!(
            rules = repository.len(),
            rejected = repository.errors().len(),
            "engine ready"
        );

        let oracle = oracle.unwrap_or_else(|| {
            Box::new(DeclaredTypeOracle::new(hierarchy).lenient(config.lenient_types))
        });
        let verifier = verifier.unwrap_or_else(|| {
            if config.verify_syntax {
                Box::new(SyntaxVerifier)
            } else {
                Box::new(AcceptAll)
            }
        });

        Ok(Engine {
            repository,
            guards,
            oracle,
            suppressions: suppressions.unwrap_or_else(|| Box::new(AnnotationSuppressions)),
            verifier,
            max_passes: config.max_passes.max(1),
        })
    }
}

/// Plugs an [`Engine`] into the file-level [`Transform`] pipeline.
#[derive(Clone)]
pub struct RefasterTransform {
    engine: Arc<Engine>,
}

impl RefasterTransform {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

impl Transform for RefasterTransform {
    fn apply(&self, source: &str, _path: &Path) -> Result<String> {
        Ok(self.engine.rewrite_source(source)?.source)
    }

    fn describe(&self) -> String {
        format!("Template rewrites ({} rules)", self.engine.rules().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = r#"
group: Sample
rules:
  - name: ListGetFirst
    type_params: [T]
    params: [{name: list, type: List<T>}]
    before: ["list.get(0)"]
    after: list.getFirst()
  - name: StringIsEmpty
    params: [{name: s, type: String}]
    before: ["s.length() == 0"]
    after: s.isEmpty()
    also_negation: true
"#;

    fn engine() -> Engine {
        Engine::builder()
            .without_builtin_rules()
            .catalog(RuleCatalog::from_yaml(RULES).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_rewrites_source() {
        let source = "import java.util.List;\n\nclass A {\n    String f(List<String> names) {\n        return names.get(0);\n    }\n}\n";
        let rewrite = engine().rewrite_source(source).unwrap();
        assert!(rewrite.source.contains("return names.getFirst();"));
        assert_eq!(rewrite.replacements.len(), 1);
        assert_eq!(rewrite.replacements[0].rule, "Sample.ListGetFirst");
        assert_eq!(rewrite.passes, 1);
    }

    #[test]
    fn test_negated_match_and_parenthesization() {
        let source = "class A {\n    boolean f(String s) {\n        return s.length() != 0;\n    }\n    boolean g(String s, boolean b) {\n        return !(s.length() == 0) && b;\n    }\n}\n";
        let rewrite = engine().rewrite_source(source).unwrap();
        assert!(rewrite.source.contains("return !s.isEmpty();"), "{}", rewrite.source);
        assert!(rewrite.source.contains("return !s.isEmpty() && b;"), "{}", rewrite.source);
    }

    #[test]
    fn test_no_rewrite_leaves_source_untouched() {
        let source = "class A { int f(String s) { return s.length(); } }";
        let rewrite = engine().rewrite_source(source).unwrap();
        assert_eq!(rewrite.source, source);
        assert!(!rewrite.is_modified());
        assert_eq!(rewrite.passes, 0);
    }

    #[test]
    fn test_strict_build_rejects_bad_rules() {
        let broken = RuleCatalog::from_yaml(
            r#"
group: Broken
rules:
  - name: Unparsable
    params: [{name: s, type: String}]
    before: ["s.length( == 0"]
    after: s.isEmpty()
"#,
        )
        .unwrap();
        let lenient = Engine::builder()
            .without_builtin_rules()
            .catalog(broken.clone())
            .build()
            .unwrap();
        assert_eq!(lenient.load_errors().len(), 1);
        assert!(lenient.rules().is_empty());

        let strict = Engine::builder()
            .without_builtin_rules()
            .catalog(broken)
            .strict(true)
            .build();
        assert!(matches!(strict, Err(RefasterError::RulesRejected { count: 1 })));
    }

    #[test]
    fn test_transform_adapter() {
        let transform = RefasterTransform::new(Arc::new(engine()));
        let out = transform
            .apply(
                "class A { boolean f(String s) { return s.length() == 0; } }",
                Path::new("A.java"),
            )
            .unwrap();
        assert_eq!(out, "class A { boolean f(String s) { return s.isEmpty(); } }");
        assert_eq!(transform.describe(), "Template rewrites (2 rules)");
    }
}
