//! Error types for the rewrite engine.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for engine operations.
#[derive(Error, Debug)]
pub enum RefasterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Tree-sitter parse error for {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Tree-sitter query error: {0}")]
    Query(#[from] tree_sitter::QueryError),

    #[error("No files matched the specified criteria")]
    NoFilesMatched,

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Rule catalog rejected: {count} rule(s) failed to load")]
    RulesRejected { count: usize },
}

/// A malformed rule, detected at load time.
///
/// Fatal only for the offending rule; the rest of the catalog keeps loading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleDefinitionError {
    #[error("rule '{rule}': template '{template}' does not parse as a Java expression")]
    Syntax { rule: String, template: String },

    #[error("rule '{rule}': invalid type '{ty}' for parameter '{param}'")]
    InvalidType {
        rule: String,
        param: String,
        ty: String,
    },

    #[error("rule '{rule}': no before-template declared")]
    NoBeforeTemplate { rule: String },

    #[error("rule '{rule}': parameter '{param}' is used by the after-template but not bound by before-template #{index}")]
    UnboundInAfter {
        rule: String,
        param: String,
        index: usize,
    },

    #[error("rule '{rule}': parameter '{param}' is used with inconsistent multiplicity: {detail}")]
    InconsistentMultiplicity {
        rule: String,
        param: String,
        detail: String,
    },

    #[error("rule '{rule}': parameter '{param}' is declared more than once")]
    DuplicateParameter { rule: String, param: String },

    #[error("rule '{rule}': unknown guard matcher '{matcher}'")]
    UnknownGuard { rule: String, matcher: String },

    #[error("rule '{rule}': placeholder '{placeholder}' invoked with {found} argument(s), declared with {expected}")]
    PlaceholderArity {
        rule: String,
        placeholder: String,
        expected: usize,
        found: usize,
    },

    #[error("rule '{rule}': placeholder '{placeholder}' is used by the after-template but not by every before-template")]
    UnboundPlaceholder { rule: String, placeholder: String },

    #[error("rule '{rule}': invalid import '{import}'")]
    InvalidImport { rule: String, import: String },

    #[error("rule '{rule}': before-template #{index} matches the rule's own output")]
    NotIdempotent { rule: String, index: usize },

    #[error("rule '{rule}': before-template #{index} is indistinguishable from rule '{other}' at equal priority")]
    AmbiguousWith {
        rule: String,
        index: usize,
        other: String,
    },

    #[error("rule '{rule}': name is already taken by another rule")]
    DuplicateName { rule: String },
}

impl RuleDefinitionError {
    /// Returns the name of the rule this error belongs to.
    pub fn rule(&self) -> &str {
        match self {
            RuleDefinitionError::Syntax { rule, .. }
            | RuleDefinitionError::InvalidType { rule, .. }
            | RuleDefinitionError::NoBeforeTemplate { rule }
            | RuleDefinitionError::UnboundInAfter { rule, .. }
            | RuleDefinitionError::InconsistentMultiplicity { rule, .. }
            | RuleDefinitionError::DuplicateParameter { rule, .. }
            | RuleDefinitionError::UnknownGuard { rule, .. }
            | RuleDefinitionError::PlaceholderArity { rule, .. }
            | RuleDefinitionError::UnboundPlaceholder { rule, .. }
            | RuleDefinitionError::InvalidImport { rule, .. }
            | RuleDefinitionError::NotIdempotent { rule, .. }
            | RuleDefinitionError::AmbiguousWith { rule, .. }
            | RuleDefinitionError::DuplicateName { rule } => rule,
        }
    }
}

/// A fault raised by a guard plugin while evaluating a binding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("guard '{guard}' cannot evaluate {what}")]
    Unsupported { guard: String, what: String },

    #[error("guard '{guard}' failed: {message}")]
    Failed { guard: String, message: String },
}

/// A specialized Result type for engine operations.
pub type Result<T> = std::result::Result<T, RefasterError>;
