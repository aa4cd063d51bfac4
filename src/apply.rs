//! Splicing accepted replacements into source text.

use crate::ast::{CompilationUnit, ImportAnchor, simple_name};
use crate::error::Result;
use crate::lang::Java;
use crate::rule::Import;
use crate::transform::Replacement;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::warn;

/// Checks rewritten source before it is accepted.
///
/// Stands in for recompiling the output: a rejected rewrite is rolled back.
pub trait SourceVerifier: Send + Sync {
    fn verify(&self, original: &str, rewritten: &str) -> Result<bool>;
}

/// Rejects rewrites that introduce syntax errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxVerifier;

impl SourceVerifier for SyntaxVerifier {
    fn verify(&self, original: &str, rewritten: &str) -> Result<bool> {
        Ok(Java.syntax_errors(rewritten)? <= Java.syntax_errors(original)?)
    }
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl SourceVerifier for AcceptAll {
    fn verify(&self, _original: &str, _rewritten: &str) -> Result<bool> {
        Ok(true)
    }
}

/// The result of applying one pass worth of replacements.
#[derive(Debug, Clone)]
pub struct Applied {
    pub source: String,
    pub applied: Vec<Replacement>,
    pub rolled_back: Vec<Replacement>,
}

/// Applies non-overlapping replacements to the unit's source, then edits imports.
///
/// If the verifier rejects the combined result, each replacement is retried
/// on its own and only the ones that verify are kept.
pub fn apply_replacements(
    unit: &CompilationUnit,
    replacements: Vec<Replacement>,
    verifier: &dyn SourceVerifier,
) -> Result<Applied> {
    let original = unit.source();
    if replacements.is_empty() {
        return Ok(Applied {
            source: original.to_string(),
            applied: Vec::new(),
            rolled_back: Vec::new(),
        });
    }

    let source = rewrite(unit, &replacements);
    if verifier.verify(original, &source)? {
        return Ok(Applied {
            source,
            applied: replacements,
            rolled_back: Vec::new(),
        });
    }

    let mut applied = Vec::new();
    let mut rolled_back = Vec::new();
    for replacement in replacements {
        let single = rewrite(unit, std::slice::from_ref(&replacement));
        if verifier.verify(original, &single)? {
            applied.push(replacement);
        } else {
            warn!(
                rule = %replacement.rule,
                offset = replacement.span.start,
                "rewrite rejected by verifier, rolling back"
            );
            rolled_back.push(replacement);
        }
    }

    let source = rewrite(unit, &applied);
    if !applied.is_empty() && !verifier.verify(original, &source)? {
        warn!(count = applied.len(), "combined rewrites rejected by verifier, rolling back");
        rolled_back.append(&mut applied);
        return Ok(Applied {
            source: original.to_string(),
            applied,
            rolled_back,
        });
    }
    Ok(Applied {
        source,
        applied,
        rolled_back,
    })
}

fn rewrite(unit: &CompilationUnit, replacements: &[Replacement]) -> String {
    let mut text = unit.source().to_string();
    let mut ordered: Vec<_> = replacements.iter().collect();
    ordered.sort_by_key(|r| std::cmp::Reverse(r.span.start));
    for r in ordered {
        text.replace_range(r.span.range(), &r.text);
    }
    edit_imports(unit, replacements, text)
}

/// Adds required imports and drops imports the rewrite left unused.
///
/// Expression replacements never touch the import section, so import spans of
/// the original unit still hold in `text`.
fn edit_imports(unit: &CompilationUnit, replacements: &[Replacement], mut text: String) -> String {
    let additions: BTreeSet<&Import> = replacements
        .iter()
        .flat_map(|r| &r.imports)
        .filter(|i| {
            !unit
                .imports()
                .iter()
                .any(|d| d.is_static == i.is_static && !d.wildcard && d.path == i.path)
        })
        .collect();

    let body_start = match unit.import_anchor() {
        ImportAnchor::AfterImports(end) => end,
        _ => 0,
    };
    let removals: BTreeSet<&Import> = replacements
        .iter()
        .flat_map(|r| &r.removable_imports)
        .filter(|i| !additions.contains(i))
        .filter(|i| !mentions(&text[body_start.min(text.len())..], simple_name(&i.path)))
        .collect();

    let mut edits: Vec<(std::ops::Range<usize>, String)> = Vec::new();
    if !additions.is_empty() {
        let lines: Vec<String> = additions.iter().map(|i| i.to_string()).collect();
        let block = lines.join("\n");
        let (at, inserted) = match unit.import_anchor() {
            ImportAnchor::AfterImports(end) => (end, format!("\n{block}")),
            ImportAnchor::AfterPackage(end) => (end, format!("\n\n{block}")),
            ImportAnchor::Start => (0, format!("{block}\n\n")),
        };
        edits.push((at..at, inserted));
    }
    for decl in unit.imports() {
        let removed = removals
            .iter()
            .any(|i| i.is_static == decl.is_static && i.path == decl.path && !decl.wildcard);
        if removed {
            let mut end = decl.span.end;
            if text[end..].starts_with('\n') {
                end += 1;
            }
            edits.push((decl.span.start..end, String::new()));
        }
    }

    // insertion at the anchor goes first: it sits at or after every removal
    edits.sort_by_key(|(range, _)| std::cmp::Reverse((range.start, range.end)));
    for (range, replacement) in edits {
        text.replace_range(range, &replacement);
    }
    text
}

fn mentions(text: &str, name: &str) -> bool {
    Regex::new(&format!(r"\b{}\b", regex::escape(name)))
        .map(|re| re.is_match(text))
        .unwrap_or(true)
}
