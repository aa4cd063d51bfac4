//! Project-level entry point: pick files, rewrite them, write or preview.

use crate::diff::{DiffSummary, colorized_diff, unified_diff};
use crate::engine::Engine;
use crate::error::{RefasterError, Result};
use crate::matcher::FileMatcher;
use crate::transform::{FileChange, Replacement, TransformBuilder};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// The result of rewriting a project.
#[derive(Debug)]
pub struct RefactorResult {
    pub changes: Vec<FileChange>,
    pub summary: DiffSummary,
}

impl RefactorResult {
    /// Returns the number of files that were modified.
    pub fn files_modified(&self) -> usize {
        self.changes.iter().filter(|c| c.is_modified()).count()
    }

    /// All applied replacements with the file they belong to.
    pub fn replacements(&self) -> impl Iterator<Item = (&Path, &Replacement)> {
        self.changes
            .iter()
            .flat_map(|c| c.replacements.iter().map(move |r| (c.path.as_path(), r)))
    }

    /// Generates a unified diff of all changes.
    pub fn diff(&self) -> String {
        self.changes
            .iter()
            .filter(|c| c.is_modified())
            .map(|c| unified_diff(&c.original, &c.transformed, &c.path))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Generates a colorized diff for terminal display.
    pub fn colorized_diff(&self) -> String {
        self.changes
            .iter()
            .filter(|c| c.is_modified())
            .map(|c| colorized_diff(&c.original, &c.transformed, &c.path))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Rewrites every matching file under a root directory.
///
/// ```rust,no_run
/// use refaster_dsl::prelude::*;
/// use std::sync::Arc;
///
/// let engine = Arc::new(Engine::builder().build()?);
/// let result = Refactor::in_repo("./my-project")
///     .matching(|f| f.exclude("**/generated/**"))
///     .rules(engine)
///     .dry_run()
///     .apply()?;
///
/// println!("{}", result.diff());
/// # Ok::<(), refaster_dsl::error::RefasterError>(())
/// ```
pub struct Refactor {
    root: PathBuf,
    matcher: FileMatcher,
    engine: Option<Arc<Engine>>,
    transform: Option<TransformBuilder>,
    dry_run: bool,
}

impl Refactor {
    /// Creates a refactoring rooted at `path`, matching `.java` sources.
    pub fn in_repo(path: impl Into<PathBuf>) -> Self {
        Self {
            root: path.into(),
            matcher: FileMatcher::java(),
            engine: None,
            transform: None,
            dry_run: false,
        }
    }

    /// Creates a refactoring in the current directory.
    pub fn current_dir() -> Result<Self> {
        Ok(Self::in_repo(std::env::current_dir()?))
    }

    /// Refines the file selection, starting from the `.java` preset.
    pub fn matching<F>(mut self, f: F) -> Self
    where
        F: FnOnce(FileMatcher) -> FileMatcher,
    {
        self.matcher = f(self.matcher);
        self
    }

    /// Sets the rule engine.
    pub fn rules(mut self, engine: Arc<Engine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Adds transformations applied after the rule engine.
    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: FnOnce(TransformBuilder) -> TransformBuilder,
    {
        self.transform = Some(f(TransformBuilder::new()));
        self
    }

    /// Enables dry-run mode (preview changes without writing them).
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Rewrites the matching files, in parallel, and writes them back unless dry-run.
    pub fn apply(self) -> Result<RefactorResult> {
        let files = self.matcher.collect(&self.root)?;
        if files.is_empty() {
            return Err(RefasterError::NoFilesMatched);
        }
        debug!(files = files.len(), root = %self.root.display(), "rewriting files");

        let changes = files
            .par_iter()
            .map(|path| self.rewrite(path))
            .collect::<Result<Vec<_>>>()?;

        let mut summary = DiffSummary::default();
        for change in &changes {
            summary.merge(&DiffSummary::from_diff(&change.original, &change.transformed));
        }

        if !self.dry_run {
            for change in &changes {
                change.apply()?;
            }
        }

        Ok(RefactorResult { changes, summary })
    }

    fn rewrite(&self, path: &Path) -> Result<FileChange> {
        let mut change = match &self.engine {
            Some(engine) => engine.rewrite_file(path)?,
            None => {
                let original = fs::read_to_string(path)?;
                FileChange {
                    path: path.to_path_buf(),
                    transformed: original.clone(),
                    original,
                    replacements: Vec::new(),
                }
            }
        };
        if let Some(transform) = &self.transform {
            change.transformed = transform.apply(&change.transformed, path)?;
        }
        Ok(change)
    }

    /// Runs in preview mode and returns the diff.
    pub fn preview(self) -> Result<String> {
        let result = self.dry_run().apply()?;
        Ok(result.diff())
    }

    /// Returns the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
