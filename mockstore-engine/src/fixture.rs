//! Bulk-load and dump: the store's test-setup surface.
//!
//! A fixture mirrors the tree shape — a document node is its optional data
//! plus named subcollections of child fixtures — and round-trips through
//! serde, so whole stores can be seeded from literal structures or JSON and
//! serialized back for golden comparisons. Listener registrations are
//! runtime-only and never appear in fixtures. Loading replaces state
//! silently: no change notifications fire.

use bson::Document;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use mockstore_core::{
    error::StoreResult,
    path::{ReferenceKind, split_reference_path, validate_id},
};

use crate::{
    node::{CollectionNode, DocumentNode},
    resolve,
    store::MemoryStore,
};

/// Serialized form of one document node: data plus subcollections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentFixture {
    /// The document's data; absent means the document does not exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Document>,
    /// Subcollections by id, each a map of document id to child fixture.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub collections: IndexMap<String, CollectionFixture>,
}

/// Serialized form of one collection: document id to fixture, in order.
pub type CollectionFixture = IndexMap<String, DocumentFixture>;

impl DocumentFixture {
    /// A fixture for an existing document with the given data.
    pub fn with_data(data: Document) -> Self {
        DocumentFixture {
            data: Some(data),
            collections: IndexMap::new(),
        }
    }

    /// Chainable subcollection attachment for building fixtures inline.
    pub fn with_collection(
        mut self,
        id: impl Into<String>,
        documents: CollectionFixture,
    ) -> Self {
        self.collections.insert(id.into(), documents);
        self
    }
}

fn build_document(fixture: &DocumentFixture) -> StoreResult<DocumentNode> {
    let mut node = DocumentNode {
        data: fixture.data.clone(),
        ..DocumentNode::default()
    };
    for (collection_id, documents) in &fixture.collections {
        validate_id(collection_id)?;
        let mut collection = CollectionNode::default();
        for (doc_id, child) in documents {
            validate_id(doc_id)?;
            collection
                .documents
                .insert(doc_id.clone(), build_document(child)?);
        }
        node.children.insert(collection_id.clone(), collection);
    }
    Ok(node)
}

fn dump_document(node: &DocumentNode) -> DocumentFixture {
    let mut fixture = DocumentFixture {
        data: node.data.clone(),
        collections: IndexMap::new(),
    };
    for (collection_id, collection) in &node.children {
        let documents = collection
            .documents
            .iter()
            .map(|(doc_id, child)| (doc_id.clone(), dump_document(child)))
            .collect();
        fixture.collections.insert(collection_id.clone(), documents);
    }
    fixture
}

impl MemoryStore {
    /// Replaces the entire tree with the given fixture.
    ///
    /// The fixture's top level plays the role of the root sentinel, so only
    /// its `collections` matter; root-level data is discarded. Every id is
    /// validated before anything is swapped in, so a malformed fixture
    /// leaves the store untouched.
    pub async fn load_tree(&self, fixture: &DocumentFixture) -> StoreResult<()> {
        let mut root = build_document(fixture)?;
        root.data = None;
        self.with_state_mut(|state| state.root = root).await;
        Ok(())
    }

    /// Loads a collection at `path` from a flat id-to-data map, merging
    /// into the existing tree.
    pub async fn load_collection<I, S>(&self, path: &str, documents: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = (S, Document)>,
        S: Into<String>,
    {
        let segments = split_reference_path(path, ReferenceKind::Collection)?;
        let documents: Vec<(String, Document)> = documents
            .into_iter()
            .map(|(id, data)| (id.into(), data))
            .collect();
        for (id, _) in &documents {
            validate_id(id)?;
        }

        self.with_state_mut(|state| {
            let collection = resolve::collection_mut(&mut state.root, &segments);
            for (id, data) in documents {
                collection.documents.entry(id).or_default().data = Some(data);
            }
        })
        .await;
        Ok(())
    }

    /// Loads a single document at `path`, merging into the existing tree.
    pub async fn load_document(&self, path: &str, data: Document) -> StoreResult<()> {
        let segments = split_reference_path(path, ReferenceKind::Document)?;
        self.with_state_mut(|state| {
            resolve::document_mut(&mut state.root, &segments).data = Some(data);
        })
        .await;
        Ok(())
    }

    /// Serializes the entire tree back to fixture form.
    pub async fn dump_tree(&self) -> DocumentFixture {
        self.with_state(|state| dump_document(&state.root)).await
    }

    /// Serializes the entire tree to a JSON string.
    pub async fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(&self.dump_tree().await)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn tree() -> DocumentFixture {
        DocumentFixture::default().with_collection(
            "users",
            IndexMap::from([
                (
                    "alice".to_string(),
                    DocumentFixture::with_data(doc! { "name": "Alice" }).with_collection(
                        "posts",
                        IndexMap::from([(
                            "p1".to_string(),
                            DocumentFixture::with_data(doc! { "title": "hello" }),
                        )]),
                    ),
                ),
                (
                    "bob".to_string(),
                    DocumentFixture::with_data(doc! { "name": "Bob" }),
                ),
            ]),
        )
    }

    #[tokio::test]
    async fn load_then_dump_round_trips() {
        let store = MemoryStore::new();
        let fixture = tree();
        store.load_tree(&fixture).await.unwrap();
        assert_eq!(store.dump_tree().await, fixture);
    }

    #[tokio::test]
    async fn loaded_documents_are_readable_through_references() {
        let store = MemoryStore::new();
        store.load_tree(&tree()).await.unwrap();

        let alice = store.doc("users/alice").unwrap().get().await.unwrap();
        assert_eq!(alice.data(), Some(&doc! { "name": "Alice" }));

        let post = store
            .doc("users/alice/posts/p1")
            .unwrap()
            .get()
            .await
            .unwrap();
        assert_eq!(post.data(), Some(&doc! { "title": "hello" }));
    }

    #[tokio::test]
    async fn malformed_fixture_ids_leave_the_store_untouched() {
        let store = MemoryStore::new();
        store.load_tree(&tree()).await.unwrap();

        let bad = DocumentFixture::default()
            .with_collection("bad/slash", IndexMap::new());
        assert!(store.load_tree(&bad).await.is_err());

        // The earlier tree is still in place.
        assert!(store.doc("users/alice").unwrap().get().await.unwrap().exists());
    }

    #[tokio::test]
    async fn flat_collection_loads_merge_into_the_tree() {
        let store = MemoryStore::new();
        store
            .load_collection(
                "users",
                [("alice".to_string(), doc! { "n": 1 }), ("bob".to_string(), doc! { "n": 2 })],
            )
            .await
            .unwrap();
        store
            .load_document("users/carol", doc! { "n": 3 })
            .await
            .unwrap();

        let all = store.collection("users").unwrap().get().await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn json_dump_contains_the_tree() {
        let store = MemoryStore::new();
        store.load_tree(&tree()).await.unwrap();
        let json = store.to_json().await.unwrap();
        assert!(json.contains("\"users\""));
        assert!(json.contains("\"Alice\""));
    }
}
