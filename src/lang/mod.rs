//! Tree-sitter front end for the target language.

mod java;

pub use java::Java;

use crate::error::{RefasterError, Result};
use std::path::PathBuf;
use tree_sitter::{Language as TsLanguage, Parser, Query, Tree};

/// A grammar the engine can read sources and templates with.
pub trait Language: Send + Sync {
    /// File extensions of sources in this language, without dot.
    fn extensions(&self) -> &[&'static str];

    fn grammar(&self) -> TsLanguage;

    /// Parses a whole source text. Syntax errors are kept in the tree as
    /// error nodes; only a grammar mismatch fails.
    fn parse(&self, source: &str) -> Result<Tree> {
        let parse_error = |message: String| RefasterError::Parse {
            path: PathBuf::from("<memory>"),
            message,
        };
        let mut parser = Parser::new();
        parser
            .set_language(&self.grammar())
            .map_err(|e| parse_error(format!("grammar rejected: {e}")))?;
        parser
            .parse(source, None)
            .ok_or_else(|| parse_error("parser gave no tree".to_string()))
    }

    /// Compiles a tree-sitter query against this grammar.
    fn query(&self, pattern: &str) -> Result<Query> {
        Ok(Query::new(&self.grammar(), pattern)?)
    }
}
