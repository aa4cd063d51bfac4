//! # Refaster DSL
//!
//! A template-based rewrite engine for Java sources.
//!
//! Rules are written as pairs of Java expression templates: one or more
//! *before* templates and one *after* template, over typed parameters. The
//! engine finds code matching a before template (respecting the parameter
//! types), and replaces it with the after template instantiated from what
//! the parameters matched.
//!
//! This crate provides:
//! - Rule catalogs in YAML, compiled into canonical patterns at load time
//! - Typed structural matching with repeated parameters, placeholders and
//!   lambda parameters matched up to renaming
//! - Guards on parameters (`is_empty`, `is_literal`, ...) through a plugin registry
//! - Import management, logical negation and multi-pass application
//! - A fluent project-level API and the `refaster` command line tool
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use refaster_dsl::prelude::*;
//! use std::sync::Arc;
//!
//! let catalog = RuleCatalog::from_yaml(r#"
//! group: CollectionRules
//! rules:
//!   - name: ListGetFirst
//!     type_params: [T]
//!     params: [{name: list, type: List<T>}]
//!     before: ["list.get(0)"]
//!     after: list.getFirst()
//! "#)?;
//!
//! let engine = Engine::builder()
//!     .without_builtin_rules()
//!     .catalog(catalog)
//!     .build()?;
//!
//! let rewrite = engine.rewrite_source(
//!     "class A { Object f(java.util.List<String> l) { return l.get(0); } }",
//! )?;
//! assert!(rewrite.source.contains("l.getFirst()"));
//!
//! // Or rewrite a whole project
//! let result = Refactor::in_repo("./my-project")
//!     .rules(Arc::new(engine))
//!     .dry_run()
//!     .apply()?;
//! println!("{}", result.diff());
//! # Ok::<(), refaster_dsl::error::RefasterError>(())
//! ```
//!
//! ## Matching one expression
//!
//! ```rust
//! use refaster_dsl::prelude::*;
//!
//! let catalog = RuleCatalog::from_yaml(r#"
//! group: TimeRules
//! rules:
//!   - name: InstantIsBefore
//!     params: [{name: a, type: Instant}, {name: b, type: Instant}]
//!     before: ["a.compareTo(b) < 0"]
//!     after: a.isBefore(b)
//!     also_negation: true
//! "#)?;
//! let repository =
//!     RuleRepository::load(&[catalog], &GuardRegistry::builtin(), &TypeHierarchy::jdk());
//! let rule = &repository.rules()[0];
//!
//! let unit = CompilationUnit::parse(
//!     "import java.time.Instant;\nclass A { boolean f(Instant x, Instant y) { return x.compareTo(y) < 0; } }",
//! )?;
//! let oracle = DeclaredTypeOracle::default();
//! let unifier = Unifier::new(rule, &oracle, &unit);
//! let target = &unit.roots()[0];
//! let (_, binding) = unifier.match_alternatives(target).unwrap();
//! assert_eq!(instantiate(rule, &binding, false).expr.to_string(), "x.isBefore(y)");
//! # Ok::<(), refaster_dsl::error::RefasterError>(())
//! ```

pub mod apply;
pub mod ast;
pub mod config;
pub mod diff;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod guard;
pub mod lang;
pub mod matcher;
pub mod refactor;
pub mod rule;
pub mod template;
pub mod transform;
pub mod types;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::apply::{AcceptAll, SourceVerifier, SyntaxVerifier};
    pub use crate::ast::{CompilationUnit, Expr, ExprKind, JavaType, Span, parse_expression};
    pub use crate::config::EngineConfig;
    pub use crate::dispatch::{AnnotationSuppressions, RuleRepository, SuppressionRegistry};
    pub use crate::engine::{Engine, EngineBuilder, RefasterTransform, Rewrite};
    pub use crate::error::{GuardError, RefasterError, Result, RuleDefinitionError};
    pub use crate::guard::{GuardContext, GuardMatcher, GuardRegistry};
    pub use crate::lang::{Java, Language};
    pub use crate::matcher::{Binding, FileMatcher, Unifier};
    pub use crate::refactor::{Refactor, RefactorResult};
    pub use crate::rule::{ImportPolicy, Rule, RuleCatalog, RuleSpec};
    pub use crate::template::Pattern;
    pub use crate::transform::{
        FileChange, Replacement, Transform, TransformBuilder, instantiate,
    };
    pub use crate::types::{DeclaredTypeOracle, TypeHierarchy, TypeOracle};
}

pub use prelude::*;
