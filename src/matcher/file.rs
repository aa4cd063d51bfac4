//! Selecting the source files to rewrite.

use crate::error::Result;
use crate::lang::{Java, Language};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories that hold build output rather than sources.
const BUILD_DIRS: &[&str] = &["**/target/**", "**/build/**", "**/out/**", "**/.git/**"];

/// Predicates for matching files in a project.
#[derive(Default, Clone, Debug)]
pub struct FileMatcher {
    extensions: Vec<String>,
    include_globs: Vec<String>,
    exclude_globs: Vec<String>,
    content_patterns: Vec<String>,
    name_patterns: Vec<String>,
    max_size: Option<u64>,
}

impl FileMatcher {
    /// Creates a matcher that accepts every file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches Java sources outside of common build output directories.
    pub fn java() -> Self {
        let matcher = Java
            .extensions()
            .iter()
            .fold(Self::new(), |m, ext| m.extension(*ext));
        BUILD_DIRS.iter().fold(matcher, |m, dir| m.exclude(*dir))
    }

    /// Matches files with the given extension (without dot).
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.extensions.push(ext.into());
        self
    }

    /// Includes files matching the glob pattern.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include_globs.push(pattern.into());
        self
    }

    /// Excludes files matching the glob pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_globs.push(pattern.into());
        self
    }

    /// Matches files containing the given regex pattern.
    pub fn contains_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.content_patterns.push(pattern.into());
        self
    }

    /// Matches files whose name matches the regex pattern.
    pub fn name_matches(mut self, pattern: impl Into<String>) -> Self {
        self.name_patterns.push(pattern.into());
        self
    }

    /// Skips files larger than the given size in bytes.
    pub fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    /// Collects matching files under `root`, sorted by path.
    ///
    /// A `root` that is itself a file is returned as is when it matches.
    pub fn collect(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let include_set = build_glob_set(&self.include_globs)?;
        let exclude_set = build_glob_set(&self.exclude_globs)?;
        let content_regexes = compile_patterns(&self.content_patterns)?;
        let name_regexes = compile_patterns(&self.name_patterns)?;

        let mut matched = Vec::new();
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            if !self.extensions.is_empty() {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                if !self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
                    continue;
                }
            }

            let rel_path = path.strip_prefix(root).unwrap_or(path);
            if !self.include_globs.is_empty() && !include_set.is_match(rel_path) {
                continue;
            }
            if exclude_set.is_match(rel_path) {
                continue;
            }

            if !name_regexes.is_empty() {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if !name_regexes.iter().any(|re| re.is_match(name)) {
                    continue;
                }
            }

            let too_large = match (self.max_size, fs::metadata(path)) {
                (Some(max), Ok(metadata)) => metadata.len() > max,
                _ => false,
            };
            if too_large {
                continue;
            }

            // content last, it needs a read
            if !content_regexes.is_empty() {
                let Ok(content) = fs::read_to_string(path) else {
                    continue;
                };
                if !content_regexes.iter().any(|re| re.is_match(&content)) {
                    continue;
                }
            }

            matched.push(path.to_path_buf());
        }

        matched.sort();
        Ok(matched)
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| Ok(Regex::new(p)?)).collect()
}
