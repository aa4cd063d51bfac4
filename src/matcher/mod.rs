//! Matching: source files by path and content, expressions by template.
//!
//! - [`FileMatcher`] selects the files a run looks at
//! - [`Unifier`] unifies a rule's before-templates with target expressions and
//!   produces a [`Binding`]

mod binding;
mod file;
mod unify;

pub use binding::{Bound, BoundExpr, Binding, PlaceholderFn};
pub use file::FileMatcher;
pub use unify::Unifier;
