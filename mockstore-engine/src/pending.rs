//! Buffered write sets shared by the transaction and batch coordinators.
//!
//! Operations buffer keyed by document path, in first-touched order; several
//! operations against the same path layer in the order they were recorded
//! and are folded together at commit time against the live data underneath.

use indexmap::IndexMap;

use mockstore_core::{
    path::FieldPath,
    value::{FieldValue, WriteData},
};

/// One buffered operation against one document.
#[derive(Debug, Clone)]
pub(crate) enum BufferedOp {
    /// Replace or merge the document's data.
    Set { data: WriteData, merge: bool },
    /// Apply a field-path update list.
    Update(Vec<(FieldPath, FieldValue)>),
    /// Clear the document's data.
    Delete,
}

/// The accumulated operations of one coordinator, keyed by document path.
#[derive(Debug, Default)]
pub(crate) struct PendingWriteSet {
    ops: IndexMap<String, Vec<BufferedOp>>,
}

impl PendingWriteSet {
    pub fn new() -> Self {
        PendingWriteSet::default()
    }

    /// Buffers one operation, layering over any prior ops for the path.
    pub fn push(&mut self, document_path: String, op: BufferedOp) {
        self.ops.entry(document_path).or_default().push(op);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consumes the set for commit, paths in first-touched order.
    pub fn into_ops(self) -> IndexMap<String, Vec<BufferedOp>> {
        self.ops
    }
}
