//! Instruction appliers.
//!
//! Each applier looks at one source file or one template and returns the
//! [`Edits`] it wants, already translated to offsets of the file that will
//! be committed. The orchestrator decides which recorder they go to.

pub mod markup;
pub mod members;
pub mod patterns;
pub mod symbols;

use crate::tree::{EditOperation, InsertSide, UpdateRecorder};

pub use markup::TemplateSource;

/// Edits collected by an applier before a recorder is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Edits {
    ops: Vec<EditOperation>,
}

impl Edits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn remove(&mut self, start: usize, len: usize) {
        self.ops.push(EditOperation::Remove { start, len });
    }

    pub fn insert_left(&mut self, at: usize, text: impl Into<String>) {
        self.ops.push(EditOperation::Insert { at, text: text.into(), side: InsertSide::Left });
    }

    /// Same layout as [`UpdateRecorder::replace`].
    pub fn replace(&mut self, start: usize, len: usize, text: impl Into<String>) {
        self.remove(start, len);
        self.ops.push(EditOperation::Insert { at: start, text: text.into(), side: InsertSide::Right });
    }

    pub fn extend(&mut self, other: Edits) {
        self.ops.extend(other.ops);
    }

    pub fn operations(&self) -> &[EditOperation] {
        &self.ops
    }

    pub fn record_into(self, recorder: &mut UpdateRecorder) {
        for op in self.ops {
            recorder.push(op);
        }
    }
}
