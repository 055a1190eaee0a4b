//! Regular-expression rewrites over raw file text.
//!
//! All pattern rules of a catalog run in sequence on the text; the result is
//! then diffed against the original so only changed spans become edits.

use super::Edits;
use crate::catalog::PatternReplacement;
use crate::matchers::imports_symbols;
use crate::program::SourceFile;
use similar::{capture_diff_slices, Algorithm, DiffTag};
use tracing::debug;

pub fn replace_patterns(file: &SourceFile, instructions: &[&PatternReplacement]) -> Edits {
    let mut text = file.text.clone();
    for instruction in instructions {
        if !imports_symbols(file, &instruction.module, &instruction.requires_symbols) {
            continue;
        }
        for rule in &instruction.patterns {
            text = rule.pattern.replace_all(&text, rule.replacement.as_str()).into_owned();
        }
    }
    if text == file.text {
        return Edits::new();
    }
    debug!(path = %file.path, "pattern replacements matched");
    diff_edits(&file.text, &text)
}

/// Edits turning `old` into `new`, computed on characters so every offset
/// stays on a UTF-8 boundary.
fn diff_edits(old: &str, new: &str) -> Edits {
    let old_chars: Vec<(usize, char)> = old.char_indices().collect();
    let new_chars: Vec<char> = new.chars().collect();
    let old_only: Vec<char> = old_chars.iter().map(|(_, c)| *c).collect();
    let byte_at = |index: usize| old_chars.get(index).map_or(old.len(), |(b, _)| *b);

    let mut edits = Edits::new();
    for op in capture_diff_slices(Algorithm::Myers, &old_only, &new_chars) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        let start = byte_at(old_range.start);
        let len = byte_at(old_range.end) - start;
        let inserted: String = new_chars[new_range].iter().collect();
        match tag {
            DiffTag::Equal => {}
            DiffTag::Delete => edits.remove(start, len),
            DiffTag::Insert => edits.insert_left(start, inserted),
            DiffTag::Replace => edits.replace(start, len, inserted),
        }
    }
    edits
}
