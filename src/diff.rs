//! Diff generation for previewing rewrites.

use similar::{ChangeTag, TextDiff};
use std::fmt::Write;
use std::path::Path;

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Generates a unified diff between two strings.
pub fn unified_diff(original: &str, modified: &str, path: &Path) -> String {
    render(original, modified, path, false)
}

/// Unified diff with ANSI colors for terminal display.
pub fn colorized_diff(original: &str, modified: &str, path: &Path) -> String {
    render(original, modified, path, true)
}

fn render(original: &str, modified: &str, path: &Path, color: bool) -> String {
    let diff = TextDiff::from_lines(original, modified);
    let paint = |code: &'static str| if color { code } else { "" };
    let mut output = String::new();

    // writing into a String cannot fail
    let _ = writeln!(output, "{}--- a/{}{}", paint(CYAN), path.display(), paint(RESET));
    let _ = writeln!(output, "{}+++ b/{}{}", paint(CYAN), path.display(), paint(RESET));

    for group in diff.grouped_ops(3) {
        if let (Some(first), Some(last)) = (group.first(), group.last()) {
            let old = first.old_range().start..last.old_range().end;
            let new = first.new_range().start..last.new_range().end;
            let _ = writeln!(
                output,
                "@@ -{},{} +{},{} @@",
                old.start + 1,
                old.len(),
                new.start + 1,
                new.len()
            );
        }
        for op in &group {
            for change in diff.iter_changes(op) {
                let (sign, code) = match change.tag() {
                    ChangeTag::Delete => ("-", RED),
                    ChangeTag::Insert => ("+", GREEN),
                    ChangeTag::Equal => (" ", ""),
                };
                let value = change.value();
                let newline = if value.ends_with('\n') { "" } else { "\n" };
                if code.is_empty() || !color {
                    let _ = write!(output, "{sign}{value}{newline}");
                } else {
                    let _ = writeln!(output, "{code}{sign}{}{RESET}", value.trim_end_matches('\n'));
                }
            }
        }
    }

    output
}

/// Line counts of a set of changes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffSummary {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

impl DiffSummary {
    /// Creates a summary from original and modified content.
    pub fn from_diff(original: &str, modified: &str) -> Self {
        let diff = TextDiff::from_lines(original, modified);
        let mut summary = Self::default();
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => summary.insertions += 1,
                ChangeTag::Delete => summary.deletions += 1,
                ChangeTag::Equal => {}
            }
        }
        if summary.insertions > 0 || summary.deletions > 0 {
            summary.files_changed = 1;
        }
        summary
    }

    /// Combines two summaries.
    pub fn merge(&mut self, other: &DiffSummary) {
        self.files_changed += other.files_changed;
        self.insertions += other.insertions;
        self.deletions += other.deletions;
    }
}

impl std::fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} file(s) changed, {} insertions(+), {} deletions(-)",
            self.files_changed, self.insertions, self.deletions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEFORE: &str = "class A {\n    Object f() { return l.get(0); }\n}\n";
    const AFTER: &str = "class A {\n    Object f() { return l.getFirst(); }\n}\n";

    #[test]
    fn test_unified_diff() {
        let diff = unified_diff(BEFORE, AFTER, Path::new("A.java"));
        assert!(diff.starts_with("--- a/A.java\n+++ b/A.java\n@@ -1,3 +1,3 @@\n"));
        assert!(diff.contains("-    Object f() { return l.get(0); }\n"));
        assert!(diff.contains("+    Object f() { return l.getFirst(); }\n"));
        assert!(unified_diff(BEFORE, BEFORE, Path::new("A.java")).ends_with("+++ b/A.java\n"));
    }

    #[test]
    fn test_colorized_diff_marks_changes() {
        let diff = colorized_diff(BEFORE, AFTER, Path::new("A.java"));
        assert!(diff.contains(&format!("{RED}-    Object f() {{ return l.get(0); }}{RESET}")));
        assert!(diff.contains(GREEN));
    }

    #[test]
    fn test_summary() {
        let mut summary = DiffSummary::from_diff(BEFORE, AFTER);
        assert_eq!(summary.insertions, 1);
        assert_eq!(summary.deletions, 1);
        summary.merge(&DiffSummary::from_diff(BEFORE, BEFORE));
        assert_eq!(summary.files_changed, 1);
        assert_eq!(
            summary.to_string(),
            "1 file(s) changed, 1 insertions(+), 1 deletions(-)"
        );
    }
}
