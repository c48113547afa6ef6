//! Unified diff generation for fixed snapshot files.
//!
//! Edits are whole-line hunks without context lines: each edit is widened
//! to the lines it touches, and edits sharing a line land in one hunk.

use docphrase_core::rewrite::DiffEntry;
use docphrase_core::text::LineIndex;

/// Generate a unified diff of `source` under `edits` (original coordinates).
///
/// Returns an empty string when there are no edits.
pub fn generate_unified_diff(file: &str, source: &str, edits: &[DiffEntry]) -> String {
    if edits.is_empty() {
        return String::new();
    }
    let index = LineIndex::new(source);
    let mut sorted: Vec<&DiffEntry> = edits.iter().collect();
    sorted.sort_by_key(|e| (e.original.start, e.original.end()));

    // Group edits whose widened line ranges overlap or touch.
    let mut hunks: Vec<(usize, usize, Vec<&DiffEntry>)> = Vec::new();
    for edit in sorted {
        let (start, end) = widen(source, edit.original.start, edit.original.end());
        match hunks.last_mut() {
            Some((_, hunk_end, members)) if start <= *hunk_end => {
                *hunk_end = (*hunk_end).max(end);
                members.push(edit);
            }
            _ => hunks.push((start, end, vec![edit])),
        }
    }

    let mut diff = format!("--- a/{}\n+++ b/{}\n", file, file);
    let mut shift: i64 = 0;
    for (start, end, members) in hunks {
        let old_block = &source[start..end];
        let mut new_block = old_block.to_string();
        for edit in members.iter().rev() {
            let from = edit.original.start - start;
            let to = (edit.original.end() - start).min(new_block.len());
            new_block.replace_range(from..to, &edit.replacement);
        }
        let old_lines: Vec<&str> = old_block.lines().collect();
        let new_lines: Vec<&str> = new_block.lines().collect();
        let old_start = index.line_of(start) as i64;
        let new_start = old_start + shift;
        diff.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            old_start,
            old_lines.len(),
            new_start,
            new_lines.len()
        ));
        for line in &old_lines {
            diff.push_str(&format!("-{}\n", line));
        }
        for line in &new_lines {
            diff.push_str(&format!("+{}\n", line));
        }
        shift += new_lines.len() as i64 - old_lines.len() as i64;
    }
    diff
}

/// Widen `[start, end)` to whole lines.
fn widen(source: &str, start: usize, end: usize) -> (usize, usize) {
    let line_start = source[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    if end > start && source.as_bytes()[end - 1] == b'\n' {
        return (line_start, end);
    }
    let line_end = source[end..].find('\n').map(|i| end + i + 1).unwrap_or(source.len());
    (line_start, line_end)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use docphrase_core::span::{BufferId, Generation, TextSpan};

    fn edit(source: &str, old: &str, new: &str) -> DiffEntry {
        let start = source.find(old).unwrap();
        DiffEntry {
            original: TextSpan::new(BufferId(0), Generation(0), start, old.len()),
            replacement: new.to_string(),
        }
    }

    #[test]
    fn generate_diff_single_edit() {
        let source = "class A {\n    /// <summary>Checks it.</summary>\n    bool X();\n}\n";
        let diff = generate_unified_diff("a.cs", source, &[edit(source, "Checks", "Determines whether")]);

        assert!(diff.starts_with("--- a/a.cs\n+++ b/a.cs\n"));
        assert!(diff.contains("@@ -2,1 +2,1 @@"));
        assert!(diff.contains("-    /// <summary>Checks it.</summary>\n"));
        assert!(diff.contains("+    /// <summary>Determines whether it.</summary>\n"));
    }

    #[test]
    fn generate_diff_edits_on_one_line_share_a_hunk() {
        let source = "/// <summary>Gets e.g. a, i.e. b</summary>\n";
        let edits = [edit(source, "e.g.", "for example"), edit(source, "i.e.", "that is")];
        let diff = generate_unified_diff("a.cs", source, &edits);

        assert_eq!(diff.matches("@@ -").count(), 1);
        assert!(diff.contains("+/// <summary>Gets for example a, that is b</summary>"));
    }

    #[test]
    fn generate_diff_tracks_line_shift() {
        let source = "/// a\n///\n/// b\nx\n/// c\n";
        let removal = DiffEntry {
            original: TextSpan::new(BufferId(0), Generation(0), 6, 4),
            replacement: String::new(),
        };
        let diff = generate_unified_diff("f", source, &[removal, edit(source, "c", "d")]);

        assert!(diff.contains("@@ -2,1 +2,0 @@"));
        assert!(diff.contains("@@ -5,1 +4,1 @@"));
    }

    #[test]
    fn generate_diff_empty_edits() {
        assert!(generate_unified_diff("f", "text", &[]).is_empty());
    }
}
