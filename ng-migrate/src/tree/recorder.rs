//! Positional edit recording for a single file.
//!
//! Edits are expressed as byte offsets into the snapshot the recorder was
//! opened against. Nothing touches the snapshot until the recorder is
//! committed, at which point every operation is applied in one walk over the
//! original text. This keeps the offsets reported by independent matchers
//! valid no matter how many of them fire in the same file.

use crate::error::{MigrationError, OverlapError, Result};
use std::cmp::Ordering;
use std::fmt;

/// Which side of an offset an insertion sticks to when several land on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InsertSide {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    Remove { start: usize, len: usize },
    Insert { at: usize, text: String, side: InsertSide },
}

impl EditOperation {
    fn position(&self) -> usize {
        match self {
            EditOperation::Remove { start, .. } => *start,
            EditOperation::Insert { at, .. } => *at,
        }
    }
}

impl fmt::Display for EditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOperation::Remove { start, len } => write!(f, "remove {}..{}", start, start + len),
            EditOperation::Insert { at, text, .. } => write!(f, "insert {:?} at {}", text, at),
        }
    }
}

/// A sequenced operation; the sequence number preserves call order.
#[derive(Debug, Clone)]
struct Recorded {
    seq: usize,
    op: EditOperation,
}

/// Staged edits for one file, tied to the content it was opened against.
#[derive(Debug, Clone)]
pub struct UpdateRecorder {
    path: String,
    snapshot: String,
    ops: Vec<Recorded>,
}

impl UpdateRecorder {
    pub fn new(path: impl Into<String>, snapshot: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            snapshot: snapshot.into(),
            ops: Vec::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn operations(&self) -> impl Iterator<Item = &EditOperation> {
        self.ops.iter().map(|r| &r.op)
    }

    pub fn remove(&mut self, start: usize, len: usize) -> &mut Self {
        self.push(EditOperation::Remove { start, len })
    }

    pub fn insert_left(&mut self, at: usize, text: impl Into<String>) -> &mut Self {
        self.push(EditOperation::Insert { at, text: text.into(), side: InsertSide::Left })
    }

    pub fn insert_right(&mut self, at: usize, text: impl Into<String>) -> &mut Self {
        self.push(EditOperation::Insert { at, text: text.into(), side: InsertSide::Right })
    }

    /// Remove `len` bytes at `start` and put `text` in their place.
    pub fn replace(&mut self, start: usize, len: usize, text: impl Into<String>) -> &mut Self {
        self.remove(start, len);
        self.insert_right(start, text)
    }

    /// Record an operation built elsewhere.
    pub fn push(&mut self, op: EditOperation) -> &mut Self {
        let seq = self.ops.len();
        self.ops.push(Recorded { seq, op });
        self
    }

    /// Produce the edited text without consuming the recorder.
    pub fn apply(&self) -> Result<String> {
        apply_edits(&self.path, &self.snapshot, self.ops.iter().map(|r| r.op.clone()))
    }

    pub fn into_parts(self) -> (String, String) {
        (self.path, self.snapshot)
    }
}

impl Ord for Recorded {
    fn cmp(&self, other: &Self) -> Ordering {
        self.op
            .position()
            .cmp(&other.op.position())
            .then_with(|| side_rank(&self.op).cmp(&side_rank(&other.op)))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Recorded {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Recorded {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Recorded {}

fn side_rank(op: &EditOperation) -> u8 {
    match op {
        EditOperation::Insert { side: InsertSide::Left, .. } => 0,
        EditOperation::Insert { side: InsertSide::Right, .. } => 1,
        EditOperation::Remove { .. } => 2,
    }
}

/// Apply positional edits to `snapshot` in a single pass.
///
/// Operations may arrive in any order. Remove ranges must be disjoint and no
/// insertion may land strictly inside a removed range. Insertions that share an
/// offset keep their call order, left-side ones first, and are emitted before a
/// removal starting at the same offset.
///
/// # Example
/// ```
/// use ng_migrate::tree::recorder::{apply_edits, EditOperation, InsertSide};
///
/// let out = apply_edits(
///     "app.ts",
///     "let x = old;",
///     vec![
///         EditOperation::Remove { start: 8, len: 3 },
///         EditOperation::Insert { at: 8, text: "new".into(), side: InsertSide::Right },
///     ],
/// )
/// .unwrap();
/// assert_eq!(out, "let x = new;");
/// ```
pub fn apply_edits(
    path: &str,
    snapshot: &str,
    ops: impl IntoIterator<Item = EditOperation>,
) -> Result<String> {
    let mut removes = Vec::new();
    let mut inserts = Vec::new();

    for (seq, op) in ops.into_iter().enumerate() {
        match &op {
            EditOperation::Remove { start, len } => {
                check_offset(path, snapshot, *start)?;
                check_offset(path, snapshot, start + len)?;
                if *len > 0 {
                    removes.push(Recorded { seq, op });
                }
            }
            EditOperation::Insert { at, .. } => {
                check_offset(path, snapshot, *at)?;
                inserts.push(Recorded { seq, op });
            }
        }
    }

    if removes.is_empty() && inserts.is_empty() {
        return Ok(snapshot.to_string());
    }

    removes.sort();
    inserts.sort();

    let ranges: Vec<(usize, usize)> = removes
        .iter()
        .map(|r| match r.op {
            EditOperation::Remove { start, len } => (start, start + len),
            EditOperation::Insert { .. } => unreachable!("only removes are collected here"),
        })
        .collect();

    for i in 1..ranges.len() {
        if ranges[i - 1].1 > ranges[i].0 {
            return Err(overlap(path, &removes[i - 1].op, &removes[i].op));
        }
    }

    for insert in &inserts {
        let at = insert.op.position();
        // ranges are sorted and disjoint, so the candidate is the last one starting before `at`
        let idx = ranges.partition_point(|(start, _)| *start < at);
        if idx > 0 && ranges[idx - 1].1 > at {
            return Err(overlap(path, &removes[idx - 1].op, &insert.op));
        }
    }

    let added: usize = inserts
        .iter()
        .map(|r| match &r.op {
            EditOperation::Insert { text, .. } => text.len(),
            EditOperation::Remove { .. } => 0,
        })
        .sum();
    let mut result = String::with_capacity(snapshot.len() + added);
    let mut cursor = 0usize;
    let mut pending = ranges.iter().peekable();

    for insert in &inserts {
        let EditOperation::Insert { at, text, .. } = &insert.op else {
            continue;
        };
        while let Some(&&(start, end)) = pending.peek() {
            if start >= *at {
                break;
            }
            result.push_str(&snapshot[cursor..start]);
            cursor = end;
            pending.next();
        }
        result.push_str(&snapshot[cursor..*at]);
        cursor = *at;
        result.push_str(text);
    }

    for &(start, end) in pending {
        result.push_str(&snapshot[cursor..start]);
        cursor = end;
    }
    result.push_str(&snapshot[cursor..]);

    Ok(result)
}

fn check_offset(path: &str, snapshot: &str, offset: usize) -> Result<()> {
    if offset > snapshot.len() || !snapshot.is_char_boundary(offset) {
        return Err(MigrationError::InvalidOffset {
            path: path.to_string(),
            offset,
        });
    }
    Ok(())
}

fn overlap(path: &str, first: &EditOperation, second: &EditOperation) -> MigrationError {
    MigrationError::Overlap(OverlapError {
        path: path.to_string(),
        first: first.to_string(),
        second: second.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(text: &str) -> UpdateRecorder {
        UpdateRecorder::new("src/app.ts", text)
    }

    #[test]
    fn test_single_replacement() {
        let mut rec = recorder("let x = 1;");
        rec.replace(8, 1, "42");
        assert_eq!(rec.apply().unwrap(), "let x = 42;");
    }

    #[test]
    fn test_no_operations_returns_snapshot() {
        let rec = recorder("const a = 1;\n");
        assert!(rec.is_empty());
        assert_eq!(rec.apply().unwrap(), "const a = 1;\n");
    }

    #[test]
    fn test_call_order_does_not_matter_for_disjoint_edits() {
        let source = "let a = 1; let b = 2;";

        let mut forward = recorder(source);
        forward.replace(8, 1, "10").replace(19, 1, "20");

        let mut backward = recorder(source);
        backward.replace(19, 1, "20").replace(8, 1, "10");

        assert_eq!(forward.apply().unwrap(), "let a = 10; let b = 20;");
        assert_eq!(backward.apply().unwrap(), forward.apply().unwrap());
    }

    #[test]
    fn test_inserts_at_same_offset_keep_call_order() {
        let mut rec = recorder("<a>");
        rec.insert_right(2, " y")
            .insert_left(2, " x")
            .insert_right(2, " z");
        assert_eq!(rec.apply().unwrap(), "<a x y z>");
    }

    #[test]
    fn test_insert_at_removed_range_edges() {
        let mut rec = recorder("<old-tag>");
        rec.remove(1, 7)
            .insert_right(1, "new-tag")
            .insert_right(8, " a=\"b\"");
        assert_eq!(rec.apply().unwrap(), "<new-tag a=\"b\">");
    }

    #[test]
    fn test_overlapping_removes_fail() {
        let mut rec = recorder("0123456789");
        rec.remove(2, 4).remove(4, 3);
        let err = rec.apply().unwrap_err();
        assert!(matches!(err, MigrationError::Overlap(_)));
    }

    #[test]
    fn test_insert_inside_removed_range_fails() {
        let mut rec = recorder("0123456789");
        rec.remove(2, 4).insert_left(3, "x");
        assert!(matches!(rec.apply(), Err(MigrationError::Overlap(_))));
    }

    #[test]
    fn test_adjacent_removes_are_allowed() {
        let mut rec = recorder("0123456789");
        rec.remove(2, 2).remove(4, 2);
        assert_eq!(rec.apply().unwrap(), "016789");
    }

    #[test]
    fn test_offset_outside_snapshot_fails() {
        let mut rec = recorder("abc");
        rec.insert_left(4, "x");
        assert!(matches!(
            rec.apply(),
            Err(MigrationError::InvalidOffset { offset: 4, .. })
        ));
    }

    #[test]
    fn test_offset_inside_multibyte_char_fails() {
        let mut rec = recorder("aé b");
        rec.remove(2, 1);
        assert!(matches!(rec.apply(), Err(MigrationError::InvalidOffset { .. })));
    }

    #[test]
    fn test_zero_length_remove_is_ignored() {
        let mut rec = recorder("abc");
        rec.remove(1, 0).insert_left(1, "X");
        assert_eq!(rec.apply().unwrap(), "aXbc");
    }
}
