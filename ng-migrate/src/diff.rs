use crate::tree::FileChange;
use similar::{ChangeTag, TextDiff};

/// Line statistics over one or more changed files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffStats {
    pub files_changed: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
}

impl DiffStats {
    pub fn add(&mut self, other: &DiffStats) {
        self.files_changed += other.files_changed;
        self.lines_added += other.lines_added;
        self.lines_removed += other.lines_removed;
    }

    pub fn print_summary(&self) {
        println!("\nSummary:");
        println!("Files changed: {}", self.files_changed);
        println!("Lines added: {}", self.lines_added);
        println!("Lines removed: {}", self.lines_removed);
    }
}

/// Unified diff of one file, with `a/` and `b/` prefixed headers.
///
/// # Arguments
/// * `path` - Tree path of the file, used in the headers
/// * `original` - Content before the migration
/// * `modified` - Content after the migration
/// * `context_lines` - Unchanged lines shown around each hunk
pub fn generate_unified_diff(
    path: &str,
    original: &str,
    modified: &str,
    context_lines: usize,
) -> (String, DiffStats) {
    let diff = TextDiff::from_lines(original, modified);

    let mut stats = DiffStats::default();
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => stats.lines_added += 1,
            ChangeTag::Delete => stats.lines_removed += 1,
            ChangeTag::Equal => {}
        }
    }
    if stats.lines_added == 0 && stats.lines_removed == 0 {
        return (String::new(), stats);
    }
    stats.files_changed = 1;

    let output = diff
        .unified_diff()
        .context_radius(context_lines)
        .header(&format!("a/{}", path), &format!("b/{}", path))
        .to_string();
    (output, stats)
}

/// Diff of a staged change. Non-UTF-8 content is reported as binary.
pub fn diff_change(change: &FileChange, context_lines: usize) -> (String, DiffStats) {
    let text = |bytes: &Option<Vec<u8>>| match bytes {
        Some(bytes) => std::str::from_utf8(bytes).map(str::to_string).ok(),
        None => Some(String::new()),
    };
    match (text(&change.original), text(&change.content)) {
        (Some(original), Some(modified)) => {
            generate_unified_diff(&change.path, &original, &modified, context_lines)
        }
        _ => (
            format!("Binary file {} changed\n", change.path),
            DiffStats { files_changed: 1, ..Default::default() },
        ),
    }
}

/// Print the diff of every change and return the combined statistics.
pub fn print_changes(changes: &[FileChange]) -> DiffStats {
    let mut total = DiffStats::default();
    for change in changes {
        let (output, stats) = diff_change(change, 3);
        print!("{}", output);
        total.add(&stats);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ChangeKind;

    #[test]
    fn test_generate_unified_diff() {
        let original = "<x-widget\n  readonly=\"true\">\n</x-widget>\n";
        let modified = "<x-widget\n  disabled=\"true\">\n</x-widget>\n";

        let (diff, stats) = generate_unified_diff("src/app.html", original, modified, 3);

        assert!(diff.contains("--- a/src/app.html"));
        assert!(diff.contains("+++ b/src/app.html"));
        assert!(diff.contains("-  readonly=\"true\">"));
        assert!(diff.contains("+  disabled=\"true\">"));
        assert_eq!(stats, DiffStats { files_changed: 1, lines_added: 1, lines_removed: 1 });
    }

    #[test]
    fn test_generate_unified_diff_no_changes() {
        let content = "export class A {}\n";
        let (diff, stats) = generate_unified_diff("a.ts", content, content, 3);
        assert!(diff.is_empty());
        assert_eq!(stats, DiffStats::default());
    }

    #[test]
    fn test_diff_created_and_binary_changes() {
        let created = FileChange {
            path: "src/new.ts".into(),
            kind: ChangeKind::Created,
            original: None,
            content: Some(b"export {};\n".to_vec()),
        };
        let (diff, stats) = diff_change(&created, 3);
        assert!(diff.contains("+export {};"));
        assert_eq!(stats.lines_added, 1);

        let binary = FileChange {
            path: "logo.png".into(),
            kind: ChangeKind::Modified,
            original: Some(vec![0xff, 0xfe]),
            content: Some(vec![0xff]),
        };
        let (diff, stats) = diff_change(&binary, 3);
        assert_eq!(diff, "Binary file logo.png changed\n");
        assert_eq!(stats.files_changed, 1);
    }

    #[test]
    fn test_diff_stats_add() {
        let mut total = DiffStats { files_changed: 1, lines_added: 5, lines_removed: 2 };
        total.add(&DiffStats { files_changed: 2, lines_added: 3, lines_removed: 1 });
        assert_eq!(total, DiffStats { files_changed: 3, lines_added: 8, lines_removed: 3 });
    }
}
