//! Write-only batches.
//!
//! A batch is pure accumulate-then-commit: no reads, no ordering
//! restriction. Commit applies every buffered operation through the store's
//! staged commit path, then fires document listeners and one batched change
//! set per affected collection, exactly once each.

use mockstore_core::{
    error::StoreResult,
    path::FieldRef,
    value::{FieldValue, WriteData},
};

use crate::{
    pending::{BufferedOp, PendingWriteSet},
    reference::{DocumentRef, parse_update_pairs},
    store::MemoryStore,
};

/// A buffered multi-document write, committed as one unit.
///
/// # Example
///
/// ```ignore
/// let mut batch = store.batch();
/// batch.set(&alice, doc! { "name": "Alice" }.into());
/// batch.delete(&bob);
/// batch.commit().await?;
/// ```
#[derive(Debug)]
pub struct WriteBatch {
    store: MemoryStore,
    writes: PendingWriteSet,
}

impl WriteBatch {
    pub(crate) fn new(store: MemoryStore) -> Self {
        WriteBatch {
            store,
            writes: PendingWriteSet::new(),
        }
    }

    /// Buffers a full replace of `doc`'s data.
    pub fn set(&mut self, doc: &DocumentRef, data: WriteData) -> &mut Self {
        self.writes
            .push(doc.path().to_string(), BufferedOp::Set { data, merge: false });
        self
    }

    /// Buffers a merge into `doc`'s data.
    pub fn set_merge(&mut self, doc: &DocumentRef, data: WriteData) -> &mut Self {
        self.writes
            .push(doc.path().to_string(), BufferedOp::Set { data, merge: true });
        self
    }

    /// Buffers a field-path update list against `doc`.
    pub fn update<I, F>(&mut self, doc: &DocumentRef, pairs: I) -> StoreResult<&mut Self>
    where
        I: IntoIterator<Item = (F, FieldValue)>,
        F: Into<FieldRef>,
    {
        let pairs = parse_update_pairs(pairs)?;
        self.writes
            .push(doc.path().to_string(), BufferedOp::Update(pairs));
        Ok(self)
    }

    /// Buffers a delete of `doc`.
    pub fn delete(&mut self, doc: &DocumentRef) -> &mut Self {
        self.writes.push(doc.path().to_string(), BufferedOp::Delete);
        self
    }

    /// Whether no writes have been buffered yet.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Applies the buffered writes atomically and fans out notifications.
    ///
    /// A failure while staging aborts the whole batch with nothing
    /// applied.
    pub async fn commit(self) -> StoreResult<()> {
        if self.writes.is_empty() {
            return Ok(());
        }
        self.store.commit_writes(self.writes.into_ops()).await
    }
}
