//! The in-memory rule model.
//!
//! A [`Rule`] is built once from a catalog entry and never mutated afterwards.
//! Rules and their patterns are shared read-only between threads.

mod catalog;

pub use catalog::{ParamSpec, PlaceholderParamSpec, PlaceholderSpec, RuleCatalog, RuleSpec};

use crate::ast::JavaType;
use crate::template::{Pattern, PlaceholderDecl};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// How often a metavariable binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    Single,
    /// Binds a run of zero or more sibling expressions.
    Repeated,
}

/// A declared rule parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: JavaType,
    pub multiplicity: Multiplicity,
}

/// A rule type parameter such as `T extends Comparable<? super T>`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: String,
    pub bound: Option<JavaType>,
}

/// A side condition on one metavariable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    pub var: String,
    pub matcher: String,
    pub negate: bool,
}

/// How the after-template's names are brought into scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPolicy {
    /// Static members are always imported statically.
    StaticImportAlways,
    /// Import when the simple name is free, otherwise qualify the use.
    #[default]
    ImportIfUnambiguous,
}

/// An import the after-template relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Import {
    pub path: String,
    pub is_static: bool,
}

impl Import {
    /// Parses `java.util.List` or `static org.assertj.core.api.Assertions.assertThat`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().trim_end_matches(';').trim();
        let text = text.strip_prefix("import ").map(str::trim).unwrap_or(text);
        let (is_static, path) = match text.strip_prefix("static ") {
            Some(rest) => (true, rest.trim()),
            None => (false, text),
        };
        let valid = path.contains('.')
            && path.split('.').all(|segment| {
                segment
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
                    && segment.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
            });
        valid.then(|| Self {
            path: path.to_string(),
            is_static,
        })
    }

    pub fn simple_name(&self) -> &str {
        crate::ast::simple_name(&self.path)
    }

    /// The class that declares a static member, e.g. `org.assertj.core.api.Assertions`.
    pub fn owner(&self) -> Option<&str> {
        self.path.rsplit_once('.').map(|(owner, _)| owner)
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_static {
            write!(f, "import static {};", self.path)
        } else {
            write!(f, "import {};", self.path)
        }
    }
}

/// Orders competing rules on the same node; larger is more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Specificity {
    /// Number of fixed (non-metavariable) pattern nodes.
    pub literal_weight: usize,
    /// Summed hierarchy depth of the metavariable type bounds.
    pub bound_depth: usize,
}

/// One before-template alternative with its precomputed dispatch data.
#[derive(Debug, Clone)]
pub struct Alternative {
    pub pattern: Pattern,
    pub specificity: Specificity,
    /// Identifiers and operators a matching compilation unit must contain.
    pub identifiers: BTreeSet<String>,
    /// Root shape key; `None` when the root is a metavariable.
    pub discriminator: Option<String>,
}

/// A compiled rewrite rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: usize,
    pub name: String,
    pub group: String,
    pub description: Option<String>,
    pub type_params: Vec<TypeParam>,
    pub params: HashMap<String, Param>,
    pub placeholders: HashMap<String, Arc<PlaceholderDecl>>,
    pub before: Vec<Alternative>,
    pub after: Pattern,
    pub guards: Vec<Guard>,
    pub also_negation: bool,
    pub import_policy: ImportPolicy,
    pub imports: Vec<Import>,
    pub priority: i32,
    pub behavior_preserving: bool,
    pub risk: Option<String>,
}

impl Rule {
    /// Returns the fully qualified rule name, `Group.Name`.
    pub fn qualified_name(&self) -> String {
        if self.group.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.group, self.name)
        }
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.get(name)
    }

    pub fn is_type_param(&self, name: &str) -> bool {
        self.type_params.iter().any(|t| t.name == name)
    }

    pub fn type_param(&self, name: &str) -> Option<&TypeParam> {
        self.type_params.iter().find(|t| t.name == name)
    }

    pub fn is_repeated(&self, name: &str) -> bool {
        self.params
            .get(name)
            .is_some_and(|p| p.multiplicity == Multiplicity::Repeated)
    }

    /// Highest specificity over all alternatives.
    pub fn specificity(&self) -> Specificity {
        self.before
            .iter()
            .map(|a| a.specificity)
            .max()
            .unwrap_or_default()
    }

    /// Returns `(name, example before, example after)` for documentation.
    pub fn documentation(&self) -> (String, String, String) {
        let before = self
            .before
            .first()
            .map(|a| a.pattern.skeleton_text())
            .unwrap_or_default();
        (self.qualified_name(), before, self.after.skeleton_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_parse() {
        let import = Import::parse("static org.assertj.core.api.Assertions.assertThat").unwrap();
        assert!(import.is_static);
        assert_eq!(import.simple_name(), "assertThat");
        assert_eq!(import.owner(), Some("org.assertj.core.api.Assertions"));

        let import = Import::parse("import java.util.List;").unwrap();
        assert!(!import.is_static);
        assert_eq!(import.to_string(), "import java.util.List;");

        assert!(Import::parse("List").is_none());
        assert!(Import::parse("java.util.*").is_none());
        assert!(Import::parse("java..List").is_none());
    }

    #[test]
    fn test_specificity_order() {
        let narrow = Specificity {
            literal_weight: 4,
            bound_depth: 0,
        };
        let wide = Specificity {
            literal_weight: 3,
            bound_depth: 5,
        };
        assert!(narrow > wide);
    }
}
