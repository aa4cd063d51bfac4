//! Building replacements and applying transformations to source files.

mod imports;
mod negate;
mod substitute;

pub use imports::{plan_imports, removable_imports};
pub use negate::negate;
pub use substitute::{Instantiation, instantiate};

use crate::ast::Span;
use crate::error::Result;
use crate::rule::{Import, Specificity};
use std::path::Path;

/// A code transformation that can be applied to source files.
pub trait Transform: Send + Sync {
    /// Applies the transformation to the given source code.
    fn apply(&self, source: &str, path: &Path) -> Result<String>;

    /// Returns a description of the transformation.
    fn describe(&self) -> String;
}

/// Combines several transformations, applied in order.
#[derive(Default)]
pub struct TransformBuilder {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a transformation.
    pub fn custom<T: Transform + 'static>(mut self, transform: T) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    /// Applies all transformations to the source code in order.
    pub fn apply(&self, source: &str, path: &Path) -> Result<String> {
        let mut result = source.to_string();
        for transform in &self.transforms {
            result = transform.apply(&result, path)?;
        }
        Ok(result)
    }

    /// Returns descriptions of all transformations.
    pub fn describe(&self) -> Vec<String> {
        self.transforms.iter().map(|t| t.describe()).collect()
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

/// One proposed rewrite of a source range.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    /// The replaced byte range of the original source.
    pub span: Span,
    pub text: String,
    /// Imports the new text relies on.
    pub imports: Vec<Import>,
    /// Imports only the replaced text used; dropped if nothing else needs them.
    pub removable_imports: Vec<Import>,
    /// Qualified name of the rule that produced this replacement.
    pub rule: String,
    pub priority: i32,
    pub specificity: Specificity,
    pub behavior_preserving: bool,
    /// The rule's risk note followed by notes raised while instantiating.
    pub notes: Vec<String>,
}

impl Replacement {
    pub fn overlaps(&self, other: &Replacement) -> bool {
        self.span.overlaps(&other.span)
    }
}

/// Represents a change to be applied to a file.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: std::path::PathBuf,
    pub original: String,
    pub transformed: String,
    /// The replacements that produced `transformed`, over all passes.
    pub replacements: Vec<Replacement>,
}

impl FileChange {
    /// Returns true if the content was modified.
    pub fn is_modified(&self) -> bool {
        self.original != self.transformed
    }

    /// Writes the transformed content to disk.
    pub fn apply(&self) -> Result<()> {
        if self.is_modified() {
            std::fs::write(&self.path, &self.transformed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Upper;

    impl Transform for Upper {
        fn apply(&self, source: &str, _path: &Path) -> Result<String> {
            Ok(source.to_uppercase())
        }

        fn describe(&self) -> String {
            "uppercase".to_string()
        }
    }

    #[test]
    fn test_builder_applies_in_order() {
        let builder = TransformBuilder::new().custom(Upper);
        assert_eq!(builder.len(), 1);
        assert_eq!(builder.apply("abc", Path::new("A.java")).unwrap(), "ABC");
        assert_eq!(builder.describe(), vec!["uppercase"]);
        assert!(TransformBuilder::new().is_empty());
    }

    #[test]
    fn test_file_change_writes_only_when_modified() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("A.java");
        std::fs::write(&path, "class A {}").unwrap();

        let unchanged = FileChange {
            path: path.clone(),
            original: "class A {}".to_string(),
            transformed: "class A {}".to_string(),
            replacements: Vec::new(),
        };
        assert!(!unchanged.is_modified());
        unchanged.apply().unwrap();

        let changed = FileChange {
            transformed: "class B {}".to_string(),
            ..unchanged
        };
        changed.apply().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "class B {}");
    }
}
