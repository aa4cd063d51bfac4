//! Serializable rule catalogs.

use super::ImportPolicy;
use crate::error::{RefasterError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A named group of rules, usually one file.
///
/// # Example YAML
///
/// ```yaml
/// group: CollectionRules
/// rules:
///   - name: ListGetFirst
///     type_params: [T]
///     params:
///       - name: list
///         type: List<T>
///     before:
///       - list.get(0)
///     after: list.getFirst()
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleCatalog {
    pub group: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// A rule as written in a catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Rule type parameters, e.g. `T` or `T extends Comparable<? super T>`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<String>,

    #[serde(default)]
    pub params: Vec<ParamSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub placeholders: Vec<PlaceholderSpec>,

    /// Alternative before-templates, tried in order.
    pub before: Vec<String>,

    pub after: String,

    /// Imports the after-template relies on; prefix static members with `static `.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,

    #[serde(default)]
    pub import_policy: ImportPolicy,

    /// Also rewrite the logical negation of the before-templates.
    #[serde(default)]
    pub also_negation: bool,

    #[serde(default)]
    pub priority: i32,

    /// Whether the rewrite is known to preserve behavior in every context.
    #[serde(default = "default_true")]
    pub behavior_preserving: bool,

    /// Known ways the rewrite may change behavior.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<String>,
}

/// A rule parameter, bound to target expressions as a metavariable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: String,

    /// Binds a run of zero or more arguments.
    #[serde(default)]
    pub repeated: bool,

    /// Guard matchers that must accept the bound expression.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<String>,

    /// Guard matchers that must reject the bound expression.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_matches: Vec<String>,
}

/// A placeholder method whose body is captured from the target code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderSpec {
    pub name: String,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,

    #[serde(default)]
    pub params: Vec<PlaceholderParamSpec>,
}

/// A formal parameter of a placeholder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderParamSpec {
    pub name: String,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,

    /// The captured body may ignore this parameter.
    #[serde(default)]
    pub optional: bool,
}

fn default_true() -> bool {
    true
}

const BUILTIN: &[(&str, &str)] = &[
    (
        "assertj_optional.yaml",
        include_str!("../../rules/assertj_optional.yaml"),
    ),
    (
        "assertj_map.yaml",
        include_str!("../../rules/assertj_map.yaml"),
    ),
    ("collections.yaml", include_str!("../../rules/collections.yaml")),
    ("time.yaml", include_str!("../../rules/time.yaml")),
    ("misc.yaml", include_str!("../../rules/misc.yaml")),
];

impl RuleCatalog {
    /// Parses a catalog from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parses a catalog from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a catalog from a `.yaml`, `.yml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RefasterError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Err(RefasterError::InvalidConfig(format!(
                "unsupported rule file format: {}",
                path.display()
            ))),
        }
    }

    /// Serializes this catalog to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Returns the catalogs bundled with the crate.
    pub fn builtin() -> Result<Vec<Self>> {
        BUILTIN
            .iter()
            .map(|(file, yaml)| {
                Self::from_yaml(yaml).map_err(|e| {
                    RefasterError::InvalidConfig(format!("bundled catalog {file}: {e}"))
                })
            })
            .collect()
    }
}
