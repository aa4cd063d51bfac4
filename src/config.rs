//! Serializable engine configuration.

use crate::error::{RefasterError, Result};
use crate::types::TypeHierarchy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Settings for an [`Engine`](crate::engine::Engine).
///
/// Can be saved to and loaded from YAML or JSON files.
///
/// # Example YAML
///
/// ```yaml
/// max_passes: 4
/// lenient_types: false
/// include_pattern: "^Collection"
/// disabled_rules:
///   - AssertJMapRules.AssertThatMapIsEmpty
/// type_hierarchy:
///   MyList: [List]
/// rule_files:
///   - rules/team.yaml
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on rewrite passes per file.
    pub max_passes: usize,

    /// Let expressions of unknown static type satisfy concrete type bounds.
    pub lenient_types: bool,

    /// Only rules whose qualified name matches this regex are active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_pattern: Option<String>,

    /// Rules switched off by simple or qualified name.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disabled_rules: Vec<String>,

    /// Re-parse rewritten files and roll back rewrites that break the syntax.
    pub verify_syntax: bool,

    /// Extra supertype edges, by simple type name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub type_hierarchy: BTreeMap<String, Vec<String>>,

    /// Additional rule catalogs to load.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rule_files: Vec<PathBuf>,

    /// Whether the bundled catalogs are loaded.
    pub builtin_rules: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_passes: 4,
            lenient_types: false,
            include_pattern: None,
            disabled_rules: Vec::new(),
            verify_syntax: true,
            type_hierarchy: BTreeMap::new(),
            rule_files: Vec::new(),
            builtin_rules: true,
        }
    }
}

impl EngineConfig {
    /// Load config from a YAML file.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = read(path.as_ref())?;
        serde_yaml::from_str(&content)
            .map_err(|e| RefasterError::InvalidConfig(format!("Failed to parse YAML config: {e}")))
    }

    /// Load config from a JSON file.
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = read(path.as_ref())?;
        serde_json::from_str(&content)
            .map_err(|e| RefasterError::InvalidConfig(format!("Failed to parse JSON config: {e}")))
    }

    /// Load config from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(path),
            _ => Self::from_yaml(path),
        }
    }

    /// Save config to a YAML file.
    pub fn to_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| RefasterError::InvalidConfig(format!("Failed to serialize config: {e}")))?;
        write(path.as_ref(), content)
    }

    /// Save config to a JSON file.
    pub fn to_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RefasterError::InvalidConfig(format!("Failed to serialize config: {e}")))?;
        write(path.as_ref(), content)
    }

    /// The bundled type hierarchy extended with the configured edges.
    pub fn hierarchy(&self) -> TypeHierarchy {
        let mut hierarchy = TypeHierarchy::jdk();
        for (ty, supers) in &self.type_hierarchy {
            hierarchy.add(ty, supers.iter().map(String::as_str));
        }
        hierarchy
    }

    /// Whether a rule is switched on by `include_pattern` and `disabled_rules`.
    pub fn enables(&self, include: Option<&regex::Regex>, name: &str, qualified: &str) -> bool {
        let disabled = self
            .disabled_rules
            .iter()
            .any(|d| d == name || d == qualified);
        !disabled && include.is_none_or(|re| re.is_match(qualified))
    }
}

fn read(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(RefasterError::FileNotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|e| {
        RefasterError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read config file: {e}"),
        ))
    })
}

fn write(path: &Path, content: String) -> Result<()> {
    std::fs::write(path, content).map_err(|e| {
        RefasterError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to write config file: {e}"),
        ))
    })
}
