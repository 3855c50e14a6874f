//! Colorized template diffs
//!
//! Renders unified diffs between a previously synthesized template and a
//! fresh one using the similar crate.

use colored::Colorize;
use similar::{ChangeTag, DiffOp, TextDiff};
use std::fmt::Write;

/// Extract hunk range information from diff operations
/// Returns (old_start, old_len, new_start, new_len) in 1-based line numbers for display
fn hunk_ranges(ops: &[DiffOp]) -> (usize, usize, usize, usize) {
    let (Some(first), Some(last)) = (ops.first(), ops.last()) else {
        return (1, 0, 1, 0);
    };
    let old_start = first.old_range().start;
    let new_start = first.new_range().start;
    let old_len = last.old_range().end.saturating_sub(old_start);
    let new_len = last.new_range().end.saturating_sub(new_start);
    (old_start + 1, old_len, new_start + 1, new_len)
}

/// Diff display options
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Number of context lines to show
    pub context_lines: usize,
    /// Use colors
    pub use_color: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            context_lines: 3,
            use_color: true,
        }
    }
}

/// Colorized diff generator
pub struct ColorizedDiff {
    options: DiffOptions,
}

impl ColorizedDiff {
    /// Create a new colorized diff with custom options
    pub fn with_options(options: DiffOptions) -> Self {
        Self { options }
    }

    /// Generate a unified diff between two strings
    pub fn diff(&self, old: &str, new: &str, old_name: &str, new_name: &str) -> String {
        let diff = TextDiff::from_lines(old, new);
        let mut output = String::new();
        let color = self.options.use_color;

        // Writing into a String cannot fail
        let _ = writeln!(output, "{}", paint(&format!("--- {}", old_name), color, |s: &str| s.red()));
        let _ = writeln!(output, "{}", paint(&format!("+++ {}", new_name), color, |s: &str| s.green()));

        for hunk in diff
            .unified_diff()
            .context_radius(self.options.context_lines)
            .iter_hunks()
        {
            let (old_start, old_len, new_start, new_len) = hunk_ranges(hunk.ops());
            let header = format!("@@ -{},{} +{},{} @@", old_start, old_len, new_start, new_len);
            let _ = writeln!(output, "{}", paint(&header, color, |s: &str| s.cyan()));

            for change in hunk.iter_changes() {
                let line = change.value();
                let line_display = if line.ends_with('\n') {
                    line.to_string()
                } else {
                    format!("{}\n\\ No newline at end of file\n", line)
                };

                let rendered = match change.tag() {
                    ChangeTag::Delete => paint(&format!("-{}", line_display), color, |s: &str| s.red()),
                    ChangeTag::Insert => paint(&format!("+{}", line_display), color, |s: &str| s.green()),
                    ChangeTag::Equal => paint(&format!(" {}", line_display), color, |s: &str| s.dimmed()),
                };
                output.push_str(&rendered);
            }
        }

        output
    }

    /// Generate a simple diff summary
    pub fn summary(&self, old: &str, new: &str) -> DiffSummary {
        let diff = TextDiff::from_lines(old, new);
        let mut additions = 0;
        let mut deletions = 0;

        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => additions += 1,
                ChangeTag::Delete => deletions += 1,
                ChangeTag::Equal => {}
            }
        }

        // Count changes as min of additions and deletions (rough estimate)
        let changes = additions.min(deletions);

        DiffSummary {
            additions: additions - changes,
            deletions: deletions - changes,
            changes,
        }
    }
}

fn paint(text: &str, color: bool, style: fn(&str) -> colored::ColoredString) -> String {
    if color {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of lines added
    pub additions: usize,
    /// Number of lines deleted
    pub deletions: usize,
    /// Number of lines changed
    pub changes: usize,
}

impl DiffSummary {
    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.additions > 0 || self.deletions > 0 || self.changes > 0
    }

    /// Format as a colored string
    pub fn format(&self, use_color: bool) -> String {
        let mut parts = Vec::new();

        if self.additions > 0 {
            let s = format!("+{}", self.additions);
            parts.push(if use_color { s.green().to_string() } else { s });
        }

        if self.deletions > 0 {
            let s = format!("-{}", self.deletions);
            parts.push(if use_color { s.red().to_string() } else { s });
        }

        if self.changes > 0 {
            let s = format!("~{}", self.changes);
            parts.push(if use_color { s.yellow().to_string() } else { s });
        }

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> ColorizedDiff {
        ColorizedDiff::with_options(DiffOptions {
            use_color: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_unified_diff() {
        let old = "{\n  \"Enabled\": true\n}\n";
        let new = "{\n  \"Enabled\": false\n}\n";

        let diff = plain().diff(old, new, "a.template.json", "a.template.json (synthesized)");
        assert!(diff.contains("--- a.template.json"));
        assert!(diff.contains("+++ a.template.json (synthesized)"));
        assert!(diff.contains("-  \"Enabled\": true"));
        assert!(diff.contains("+  \"Enabled\": false"));
        assert!(diff.contains("@@ -1,3 +1,3 @@"));
    }

    #[test]
    fn test_diff_summary() {
        let old = "line 1\nline 2\nline 3\n";
        let new = "line 1\nmodified\nline 3\nnew line\n";

        let summary = plain().summary(old, new);
        assert_eq!(
            summary,
            DiffSummary {
                additions: 1,
                deletions: 0,
                changes: 1
            }
        );
        assert_eq!(summary.format(false), "+1, ~1");
    }

    #[test]
    fn test_no_changes() {
        let content = "same content\n";
        let summary = plain().summary(content, content);
        assert!(!summary.has_changes());
        assert_eq!(summary.format(false), "no changes");
        assert!(!plain().diff(content, content, "a", "b").contains("@@"));
    }
}
