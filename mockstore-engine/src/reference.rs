//! Reference handles: the per-document and per-collection client surface.
//!
//! A reference is a store clone plus a validated path; it holds no node
//! pointers, so any number of references may outlive resets and address
//! paths nothing has written yet. Reads are side-effect free; writes and
//! listener registrations materialize missing nodes on the way down.

use std::sync::Arc;

use indexmap::IndexMap;

use mockstore_core::{
    change::ChangeSet,
    error::StoreResult,
    listener::ListenerId,
    path::{FieldRef, validate_id},
    query::{FieldOp, Query, SortDirection},
    value::{FieldValue, WriteData},
};

use crate::{
    pending::BufferedOp,
    query_exec,
    snapshot::DocumentSnapshot,
    store::MemoryStore,
};

/// A reference to one document, existing or not.
#[derive(Debug, Clone)]
pub struct DocumentRef {
    store: MemoryStore,
    path: String,
    segments: Vec<String>,
}

impl DocumentRef {
    pub(crate) fn new(store: MemoryStore, path: String, segments: Vec<String>) -> Self {
        DocumentRef {
            store,
            path,
            segments,
        }
    }

    /// The document's id within its collection.
    pub fn id(&self) -> &str {
        self.segments.last().expect("document paths are non-empty")
    }

    /// The full slash-delimited path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The parent collection.
    pub fn parent(&self) -> CollectionRef {
        let segments = self.segments[..self.segments.len() - 1].to_vec();
        CollectionRef::new(self.store.clone(), segments.join("/"), segments)
    }

    /// A subcollection under this document.
    ///
    /// Works whether or not the document currently exists; subcollections
    /// survive their parent's deletion.
    pub fn collection(&self, id: &str) -> StoreResult<CollectionRef> {
        validate_id(id)?;
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        Ok(CollectionRef::new(
            self.store.clone(),
            format!("{}/{id}", self.path),
            segments,
        ))
    }

    /// Reads the document's current state.
    pub async fn get(&self) -> StoreResult<DocumentSnapshot> {
        Ok(self.store.read_document(&self.segments, &self.path).await)
    }

    /// Replaces the document's data with `data` (sentinels resolved).
    pub async fn set(&self, data: WriteData) -> StoreResult<()> {
        self.commit_single(BufferedOp::Set { data, merge: false })
            .await
    }

    /// Merges `data` into the document's existing data.
    pub async fn set_merge(&self, data: WriteData) -> StoreResult<()> {
        self.commit_single(BufferedOp::Set { data, merge: true })
            .await
    }

    /// Applies a field-path update list to the existing document.
    ///
    /// Paths may be dotted strings or structured [`FieldPath`]s; parse
    /// errors surface here, `NoDocumentToUpdate` at apply time.
    ///
    /// [`FieldPath`]: mockstore_core::path::FieldPath
    pub async fn update<I, F>(&self, pairs: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = (F, FieldValue)>,
        F: Into<FieldRef>,
    {
        let pairs = parse_update_pairs(pairs)?;
        self.commit_single(BufferedOp::Update(pairs)).await
    }

    /// Clears the document's data; subcollections survive.
    pub async fn delete(&self) -> StoreResult<()> {
        self.commit_single(BufferedOp::Delete).await
    }

    /// Registers a snapshot listener.
    ///
    /// The callback synchronously receives one initial snapshot reflecting
    /// the state at registration (even for a non-existent document), then
    /// one snapshot per committed change, in commit order. Dropping the
    /// returned guard does nothing; call [`ListenerGuard::unsubscribe`] to
    /// stop delivery.
    pub async fn on_snapshot(
        &self,
        callback: impl Fn(&DocumentSnapshot) + Send + Sync + 'static,
    ) -> StoreResult<ListenerGuard> {
        let id = self
            .store
            .add_document_listener(&self.segments, &self.path, Arc::new(callback))
            .await;
        Ok(ListenerGuard {
            store: self.store.clone(),
            segments: self.segments.clone(),
            target: ListenerTarget::Document,
            id,
        })
    }

    async fn commit_single(&self, op: BufferedOp) -> StoreResult<()> {
        let mut ops = IndexMap::new();
        ops.insert(self.path.clone(), vec![op]);
        self.store.commit_writes(ops).await
    }
}

/// A reference to a collection of sibling documents.
#[derive(Debug, Clone)]
pub struct CollectionRef {
    store: MemoryStore,
    path: String,
    segments: Vec<String>,
}

impl CollectionRef {
    pub(crate) fn new(store: MemoryStore, path: String, segments: Vec<String>) -> Self {
        CollectionRef {
            store,
            path,
            segments,
        }
    }

    /// The collection's id (its last path segment).
    pub fn id(&self) -> &str {
        self.segments.last().expect("collection paths are non-empty")
    }

    /// The full slash-delimited path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The parent document, or `None` for a root collection.
    pub fn parent(&self) -> Option<DocumentRef> {
        if self.segments.len() == 1 {
            return None;
        }
        let segments = self.segments[..self.segments.len() - 1].to_vec();
        Some(DocumentRef::new(
            self.store.clone(),
            segments.join("/"),
            segments,
        ))
    }

    /// A reference to the document `id` within this collection.
    pub fn doc(&self, id: &str) -> StoreResult<DocumentRef> {
        validate_id(id)?;
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        Ok(DocumentRef::new(
            self.store.clone(),
            format!("{}/{id}", self.path),
            segments,
        ))
    }

    /// A reference to a not-yet-written document with a generated id.
    pub async fn new_doc(&self) -> StoreResult<DocumentRef> {
        let id = self.store.next_id().await;
        self.doc(&id)
    }

    /// Inserts `data` under a generated id and returns the new document's
    /// reference.
    pub async fn add(&self, data: WriteData) -> StoreResult<DocumentRef> {
        let doc = self.new_doc().await?;
        doc.set(data).await?;
        Ok(doc)
    }

    /// All existing documents, in insertion order.
    pub async fn get(&self) -> StoreResult<Vec<DocumentSnapshot>> {
        self.query().get().await
    }

    /// An empty query over this collection.
    pub fn query(&self) -> QueryRef {
        QueryRef {
            store: self.store.clone(),
            path: self.path.clone(),
            segments: self.segments.clone(),
            query: Query::new(),
        }
    }

    /// Starts a query with one filter clause.
    pub fn filter(
        &self,
        field: impl Into<FieldRef>,
        op: FieldOp,
        value: impl Into<bson::Bson>,
    ) -> StoreResult<QueryRef> {
        self.query().filter(field, op, value)
    }

    /// Starts a query with one order-by rule.
    pub fn order_by(
        &self,
        field: impl Into<FieldRef>,
        direction: SortDirection,
    ) -> StoreResult<QueryRef> {
        self.query().order_by(field, direction)
    }

    /// Starts a query with a result limit.
    pub fn limit(&self, limit: i64) -> StoreResult<QueryRef> {
        self.query().limit(limit)
    }

    /// Registers a change-set listener.
    ///
    /// The callback synchronously receives one synthetic all-added change
    /// set reflecting the existing documents, then one batched change set
    /// per commit that touches this collection.
    pub async fn on_snapshot(
        &self,
        callback: impl Fn(&ChangeSet) + Send + Sync + 'static,
    ) -> StoreResult<ListenerGuard> {
        let id = self
            .store
            .add_collection_listener(&self.segments, Arc::new(callback))
            .await;
        Ok(ListenerGuard {
            store: self.store.clone(),
            segments: self.segments.clone(),
            target: ListenerTarget::Collection,
            id,
        })
    }
}

/// A collection plus accumulated query rules.
///
/// Each builder call returns a new value with the rule appended; the
/// original query is reusable as a shared prefix.
#[derive(Debug, Clone)]
pub struct QueryRef {
    store: MemoryStore,
    path: String,
    segments: Vec<String>,
    query: Query,
}

impl QueryRef {
    /// Returns a new query with a filter clause appended.
    pub fn filter(
        &self,
        field: impl Into<FieldRef>,
        op: FieldOp,
        value: impl Into<bson::Bson>,
    ) -> StoreResult<QueryRef> {
        Ok(self.with_rules(self.query.filter(field, op, value)?))
    }

    /// Returns a new query with an order-by rule appended.
    pub fn order_by(
        &self,
        field: impl Into<FieldRef>,
        direction: SortDirection,
    ) -> StoreResult<QueryRef> {
        Ok(self.with_rules(self.query.order_by(field, direction)?))
    }

    /// Returns a new query with the result limit set.
    ///
    /// Fails with `InvalidQuery` immediately for a non-positive limit.
    pub fn limit(&self, limit: i64) -> StoreResult<QueryRef> {
        Ok(self.with_rules(self.query.limit(limit)?))
    }

    /// Cursor lower bound: deliberately unsupported.
    pub fn start_at(&self) -> StoreResult<QueryRef> {
        self.query.start_at().map(|q| self.with_rules(q))
    }

    /// Exclusive cursor lower bound: deliberately unsupported.
    pub fn start_after(&self) -> StoreResult<QueryRef> {
        self.query.start_after().map(|q| self.with_rules(q))
    }

    /// Cursor upper bound: deliberately unsupported.
    pub fn end_at(&self) -> StoreResult<QueryRef> {
        self.query.end_at().map(|q| self.with_rules(q))
    }

    /// Exclusive cursor upper bound: deliberately unsupported.
    pub fn end_before(&self) -> StoreResult<QueryRef> {
        self.query.end_before().map(|q| self.with_rules(q))
    }

    /// Executes the query against the current tree.
    pub async fn get(&self) -> StoreResult<Vec<DocumentSnapshot>> {
        let documents = self
            .store
            .existing_snapshots(&self.segments, &self.path)
            .await;
        query_exec::execute(documents, &self.query)
    }

    fn with_rules(&self, query: Query) -> QueryRef {
        QueryRef {
            store: self.store.clone(),
            path: self.path.clone(),
            segments: self.segments.clone(),
            query,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ListenerTarget {
    Document,
    Collection,
}

/// Handle for one snapshot-listener registration.
#[derive(Debug)]
pub struct ListenerGuard {
    store: MemoryStore,
    segments: Vec<String>,
    target: ListenerTarget,
    id: ListenerId,
}

impl ListenerGuard {
    /// Stops delivery to the registered callback.
    pub async fn unsubscribe(self) {
        match self.target {
            ListenerTarget::Document => {
                self.store
                    .remove_document_listener(&self.segments, self.id)
                    .await;
            }
            ListenerTarget::Collection => {
                self.store
                    .remove_collection_listener(&self.segments, self.id)
                    .await;
            }
        }
    }
}

pub(crate) fn parse_update_pairs<I, F>(pairs: I) -> StoreResult<Vec<(mockstore_core::path::FieldPath, FieldValue)>>
where
    I: IntoIterator<Item = (F, FieldValue)>,
    F: Into<FieldRef>,
{
    pairs
        .into_iter()
        .map(|(field, value)| Ok((field.into().into_path()?, value)))
        .collect()
}
