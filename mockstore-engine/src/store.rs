//! The store instance: shared tree state and the single commit path.
//!
//! All mutations — direct document writes, batch commits, transaction
//! commits — funnel through [`MemoryStore::commit_writes`]. The commit is
//! two-phased: phase one folds every buffered operation over the live data
//! it would land on, producing staged results without touching the tree, so
//! any failure aborts with nothing applied; phase two swaps the staged data
//! in, computes change records, and fans out notifications after the lock
//! is released. No await point separates the swap from the fan-out, so the
//! pair is one indivisible step to every other queued operation.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use mea::rwlock::RwLock;
use tracing::debug;

use mockstore_core::{
    change::{ChangeSet, ChangeType, DocumentChange},
    error::StoreResult,
    listener::{Callback, CallbackRegistry, ListenerId},
    path::{ReferenceKind, split_reference_path},
};

use crate::{
    batch::WriteBatch,
    clock::{IdSource, ServerClock},
    mutate,
    node::DocumentNode,
    pending::BufferedOp,
    reference::{CollectionRef, DocumentRef},
    resolve,
    snapshot::DocumentSnapshot,
    transaction::Transaction,
};

pub(crate) struct StoreState {
    pub root: DocumentNode,
    pub clock: ServerClock,
    pub ids: IdSource,
}

struct StoreInner {
    state: RwLock<StoreState>,
}

/// An in-memory emulation of a hierarchical document database.
///
/// The store is cloneable; clones share the same tree. Every reference,
/// query, and coordinator object holds a clone, so there is no implicit
/// global registry of instances.
///
/// # Example
///
/// ```ignore
/// use mockstore_engine::MemoryStore;
/// use bson::doc;
///
/// let store = MemoryStore::new();
/// let alice = store.doc("users/alice")?;
/// alice.set(doc! { "name": "Alice" }.into()).await?;
/// assert!(alice.get().await?.exists());
/// ```
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

/// One staged result of commit phase one.
struct StagedWrite {
    path: String,
    segments: Vec<String>,
    before_exists: bool,
    after: Option<bson::Document>,
}

impl MemoryStore {
    /// Creates an empty store with a wall clock and random document ids.
    pub fn new() -> Self {
        MemoryStore::builder().build()
    }

    /// Creates a builder for a store with a pinned clock or id source.
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::default()
    }

    /// Returns a reference to the collection at `path`.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidReference` for malformed paths or an even
    /// segment count. Referencing a never-written path succeeds.
    pub fn collection(&self, path: &str) -> StoreResult<CollectionRef> {
        let segments = split_reference_path(path, ReferenceKind::Collection)?;
        Ok(CollectionRef::new(self.clone(), path.to_string(), segments))
    }

    /// Returns a reference to the document at `path`.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidReference` for malformed paths or an odd segment
    /// count. Referencing a never-written path succeeds.
    pub fn doc(&self, path: &str) -> StoreResult<DocumentRef> {
        let segments = split_reference_path(path, ReferenceKind::Document)?;
        Ok(DocumentRef::new(self.clone(), path.to_string(), segments))
    }

    /// Starts an empty write batch bound to this store.
    pub fn batch(&self) -> WriteBatch {
        WriteBatch::new(self.clone())
    }

    /// Runs `body` against a fresh transaction and commits its buffered
    /// writes when the body succeeds.
    ///
    /// Reads must precede writes within the transaction; the body's error
    /// (or a commit failure) is returned with nothing applied.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let total = store
    ///     .run_transaction(|tx| {
    ///         Box::pin(async move {
    ///             let account = tx.get(&account_ref).await?;
    ///             tx.set(&audit_ref, doc! { "seen": true }.into());
    ///             Ok(account.exists())
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn run_transaction<T, F>(&self, body: F) -> StoreResult<T>
    where
        F: for<'a> FnOnce(&'a mut Transaction) -> BoxFuture<'a, StoreResult<T>>,
    {
        let mut tx = Transaction::new(self.clone());
        let value = body(&mut tx).await?;
        tx.commit().await?;
        Ok(value)
    }

    /// Clears the whole tree: all documents, subcollections, and listener
    /// registrations.
    pub async fn reset(&self) {
        let mut state = self.inner.state.write().await;
        state.root = DocumentNode::default();
    }

    /// Replaces the server clock used for timestamp sentinels.
    pub async fn set_clock(&self, clock: ServerClock) {
        self.inner.state.write().await.clock = clock;
    }

    /// Queues ids for subsequent `add`-style inserts; the queue falls back
    /// to random ids once drained.
    pub async fn set_id_queue<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.state.write().await.ids =
            IdSource::Queue(ids.into_iter().map(Into::into).collect());
    }

    /// Replaces the id source with a producing closure.
    pub async fn set_id_source(&self, source: impl FnMut() -> String + Send + Sync + 'static) {
        self.inner.state.write().await.ids = IdSource::Source(Box::new(source));
    }

    pub(crate) async fn next_id(&self) -> String {
        self.inner.state.write().await.ids.next_id()
    }

    /// Reads one document without materializing anything.
    pub(crate) async fn read_document(&self, segments: &[String], path: &str) -> DocumentSnapshot {
        let state = self.inner.state.read().await;
        let data = resolve::document(&state.root, segments).and_then(|node| node.data.clone());
        DocumentSnapshot::new(path, data)
    }

    /// Snapshots every existing document of a collection, insertion order.
    pub(crate) async fn existing_snapshots(
        &self,
        segments: &[String],
        collection_path: &str,
    ) -> Vec<DocumentSnapshot> {
        let state = self.inner.state.read().await;
        match resolve::collection(&state.root, segments) {
            Some(collection) => collection
                .existing()
                .map(|(id, data)| {
                    DocumentSnapshot::new(format!("{collection_path}/{id}"), Some(data.clone()))
                })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Registers a document listener and fires its synthetic initial
    /// snapshot before returning.
    pub(crate) async fn add_document_listener(
        &self,
        segments: &[String],
        path: &str,
        callback: Callback<DocumentSnapshot>,
    ) -> ListenerId {
        let (id, registry, initial) = {
            let mut state = self.inner.state.write().await;
            let node = resolve::document_mut(&mut state.root, segments);
            let id = node.listeners.add(callback);
            let initial = DocumentSnapshot::new(path, node.data.clone());
            (id, node.listeners.clone(), initial)
        };
        registry.fire(&initial);
        id
    }

    /// Registers a collection listener and fires its synthetic all-added
    /// change set before returning.
    pub(crate) async fn add_collection_listener(
        &self,
        segments: &[String],
        callback: Callback<ChangeSet>,
    ) -> ListenerId {
        let (id, registry, initial) = {
            let mut state = self.inner.state.write().await;
            let collection = resolve::collection_mut(&mut state.root, segments);
            let id = collection.listeners.add(callback);
            let changes = collection
                .existing()
                .enumerate()
                .map(|(index, (doc_id, data))| DocumentChange {
                    change_type: ChangeType::Added,
                    document_id: doc_id.clone(),
                    old_index: None,
                    new_index: Some(index),
                    data: Some(data.clone()),
                })
                .collect();
            (id, collection.listeners.clone(), ChangeSet::new(changes))
        };
        registry.fire(&initial);
        id
    }

    pub(crate) async fn remove_document_listener(&self, segments: &[String], id: ListenerId) {
        let mut state = self.inner.state.write().await;
        let node = resolve::document_mut(&mut state.root, segments);
        node.listeners.remove(id);
    }

    pub(crate) async fn remove_collection_listener(&self, segments: &[String], id: ListenerId) {
        let mut state = self.inner.state.write().await;
        let collection = resolve::collection_mut(&mut state.root, segments);
        collection.listeners.remove(id);
    }

    /// Applies a buffered write set atomically and fans out notifications.
    ///
    /// Phase one folds every path's operations over its live data, erroring
    /// before anything is applied; phase two swaps staged results in and
    /// collects listener payloads, which fire after the lock is released —
    /// document listeners first, then one batched change set per affected
    /// collection.
    pub(crate) async fn commit_writes(
        &self,
        ops: IndexMap<String, Vec<BufferedOp>>,
    ) -> StoreResult<()> {
        let mut document_fires: Vec<(CallbackRegistry<DocumentSnapshot>, DocumentSnapshot)> =
            Vec::new();
        let mut collection_fires: IndexMap<String, (CallbackRegistry<ChangeSet>, ChangeSet)> =
            IndexMap::new();

        {
            let mut state = self.inner.state.write().await;

            let mut staged = Vec::with_capacity(ops.len());
            for (path, path_ops) in &ops {
                let segments: Vec<String> = path.split('/').map(str::to_string).collect();
                let mut current =
                    resolve::document(&state.root, &segments).and_then(|node| node.data.clone());
                let before_exists = current.is_some();

                for op in path_ops {
                    current = match op {
                        BufferedOp::Set { data, merge } => {
                            Some(mutate::apply_set(current.as_ref(), data, *merge, &state.clock))
                        }
                        BufferedOp::Update(pairs) => Some(mutate::apply_update(
                            current.as_ref(),
                            path,
                            pairs,
                            &state.clock,
                        )?),
                        BufferedOp::Delete => None,
                    };
                }
                staged.push(StagedWrite {
                    path: path.clone(),
                    segments,
                    before_exists,
                    after: current,
                });
            }

            debug!(writes = staged.len(), "committing staged write set");

            for write in staged {
                let (doc_id, collection_segments) = write
                    .segments
                    .split_last()
                    .expect("document paths are non-empty");
                let old_index = resolve::collection(&state.root, collection_segments)
                    .and_then(|collection| collection.existing_index(doc_id));

                let registry = {
                    let node = resolve::document_mut(&mut state.root, &write.segments);
                    node.data = write.after.clone();
                    node.listeners.clone()
                };

                let change_type = match (write.before_exists, write.after.is_some()) {
                    (false, true) => ChangeType::Added,
                    (true, true) => ChangeType::Modified,
                    (true, false) => ChangeType::Removed,
                    // Deleting a document that never existed changes
                    // nothing; no notification goes out.
                    (false, false) => continue,
                };

                let collection = resolve::collection(&state.root, collection_segments)
                    .expect("parent collection was materialized by the write");
                let new_index = collection.existing_index(doc_id);
                let collection_path = collection_segments.join("/");

                document_fires.push((
                    registry,
                    DocumentSnapshot::new(write.path.clone(), write.after.clone()),
                ));
                let entry = collection_fires
                    .entry(collection_path)
                    .or_insert_with(|| (collection.listeners.clone(), ChangeSet::default()));
                entry.1.changes.push(DocumentChange {
                    change_type,
                    document_id: doc_id.clone(),
                    old_index,
                    new_index,
                    data: write.after,
                });
            }
        }

        for (registry, snapshot) in &document_fires {
            registry.fire(snapshot);
        }
        for (registry, changes) in collection_fires.values() {
            registry.fire(changes);
        }
        Ok(())
    }

    pub(crate) async fn with_state<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        let state = self.inner.state.read().await;
        f(&state)
    }

    pub(crate) async fn with_state_mut<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let mut state = self.inner.state.write().await;
        f(&mut state)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

/// Builder for [`MemoryStore`] instances with a pinned clock or id source,
/// the knobs that make timestamp and `add` output deterministic in tests.
#[derive(Default)]
pub struct MemoryStoreBuilder {
    clock: ServerClock,
    ids: IdSource,
}

impl MemoryStoreBuilder {
    /// Pins the server clock.
    pub fn clock(mut self, clock: ServerClock) -> Self {
        self.clock = clock;
        self
    }

    /// Queues ids for `add`-style inserts.
    pub fn id_queue<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = IdSource::Queue(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Draws ids from a producing closure.
    pub fn id_source(mut self, source: impl FnMut() -> String + Send + Sync + 'static) -> Self {
        self.ids = IdSource::Source(Box::new(source));
        self
    }

    /// Builds the store.
    pub fn build(self) -> MemoryStore {
        MemoryStore {
            inner: Arc::new(StoreInner {
                state: RwLock::new(StoreState {
                    root: DocumentNode::default(),
                    clock: self.clock,
                    ids: self.ids,
                }),
            }),
        }
    }
}
