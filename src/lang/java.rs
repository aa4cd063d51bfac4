//! Java language support.

use super::Language;
use crate::error::Result;
use tree_sitter::{Language as TsLanguage, Node};

/// The Java programming language, parsed with tree-sitter-java.
pub struct Java;

impl Java {
    /// Counts the error and missing nodes tree-sitter recovered from.
    pub fn syntax_errors(&self, source: &str) -> Result<usize> {
        let tree = self.parse(source)?;
        Ok(count_errors(tree.root_node()))
    }
}

fn count_errors(node: Node<'_>) -> usize {
    if !node.has_error() {
        return 0;
    }
    let own = usize::from(node.is_error() || node.is_missing());
    let mut cursor = node.walk();
    let children: usize = node.children(&mut cursor).map(count_errors).sum();
    own + children
}

impl Language for Java {
    fn extensions(&self) -> &[&'static str] {
        &["java"]
    }

    fn grammar(&self) -> TsLanguage {
        tree_sitter_java::LANGUAGE.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_errors() {
        assert_eq!(Java.syntax_errors("class A { int x = 1; }").unwrap(), 0);
        assert!(Java.syntax_errors("class A { int x = ; }").unwrap() > 0);
        assert!(Java.syntax_errors("class A { void f() { g(; } }").unwrap() > 0);
    }
}
