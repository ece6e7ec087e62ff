//! Read-then-write transactions.
//!
//! A transaction buffers writes and commits them as one unit through the
//! store's staged commit path. Reads go straight to live data and are only
//! legal before the first write is buffered; afterwards `get` fails with
//! `ReadAfterWrite`, which forces the all-reads-then-all-writes shape
//! optimistic transactions require. A transaction whose body or commit
//! fails applies nothing, and commit consumes the transaction so a failed
//! or finished one can never commit again.

use mockstore_core::{
    error::{StoreError, StoreResult},
    path::FieldRef,
    value::{FieldValue, WriteData},
};

use crate::{
    pending::{BufferedOp, PendingWriteSet},
    reference::{DocumentRef, parse_update_pairs},
    snapshot::DocumentSnapshot,
    store::MemoryStore,
};

/// A buffered read-then-write unit of work.
///
/// Obtained inside [`MemoryStore::run_transaction`]'s body closure.
#[derive(Debug)]
pub struct Transaction {
    store: MemoryStore,
    writes: PendingWriteSet,
    modified: bool,
}

impl Transaction {
    pub(crate) fn new(store: MemoryStore) -> Self {
        Transaction {
            store,
            writes: PendingWriteSet::new(),
            modified: false,
        }
    }

    /// Reads a document's live state.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::ReadAfterWrite`] once any write has been
    /// buffered on this transaction.
    pub async fn get(&self, doc: &DocumentRef) -> StoreResult<DocumentSnapshot> {
        if self.modified {
            return Err(StoreError::ReadAfterWrite);
        }
        doc.get().await
    }

    /// Buffers a full replace of `doc`'s data.
    pub fn set(&mut self, doc: &DocumentRef, data: WriteData) {
        self.buffer(doc, BufferedOp::Set { data, merge: false });
    }

    /// Buffers a merge into `doc`'s data.
    pub fn set_merge(&mut self, doc: &DocumentRef, data: WriteData) {
        self.buffer(doc, BufferedOp::Set { data, merge: true });
    }

    /// Buffers a field-path update list against `doc`.
    ///
    /// Dotted paths are parsed (and rejected) here; `NoDocumentToUpdate`
    /// surfaces at commit, evaluated against the live data layered under
    /// any prior buffered ops for the same document.
    pub fn update<I, F>(&mut self, doc: &DocumentRef, pairs: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = (F, FieldValue)>,
        F: Into<FieldRef>,
    {
        let pairs = parse_update_pairs(pairs)?;
        self.buffer(doc, BufferedOp::Update(pairs));
        Ok(())
    }

    /// Buffers a delete of `doc`.
    pub fn delete(&mut self, doc: &DocumentRef) {
        self.buffer(doc, BufferedOp::Delete);
    }

    /// Applies the buffered writes atomically and fans out notifications.
    pub(crate) async fn commit(self) -> StoreResult<()> {
        if self.writes.is_empty() {
            return Ok(());
        }
        self.store.commit_writes(self.writes.into_ops()).await
    }

    fn buffer(&mut self, doc: &DocumentRef, op: BufferedOp) {
        self.modified = true;
        self.writes.push(doc.path().to_string(), op);
    }
}
