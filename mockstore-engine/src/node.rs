//! The document/collection node tree.
//!
//! A document node holds its data (or `None` when the document does not
//! exist), its subcollections, and its listeners. A collection node holds
//! its documents in insertion order plus its own listeners. Deleting a
//! document only clears `data`: the node stays in its parent's map and its
//! subcollections remain reachable. Nodes are only ever dropped by a
//! whole-tree reset.

use bson::Document;
use indexmap::IndexMap;

use mockstore_core::{change::ChangeSet, listener::CallbackRegistry};

use crate::snapshot::DocumentSnapshot;

/// One document's mutable state plus its subcollections.
#[derive(Debug, Default, Clone)]
pub(crate) struct DocumentNode {
    /// `None` means the document does not exist; distinct from existing
    /// with empty data.
    pub data: Option<Document>,
    pub children: IndexMap<String, CollectionNode>,
    pub listeners: CallbackRegistry<DocumentSnapshot>,
}

/// An insertion-ordered map of sibling documents.
#[derive(Debug, Default, Clone)]
pub(crate) struct CollectionNode {
    pub documents: IndexMap<String, DocumentNode>,
    pub listeners: CallbackRegistry<ChangeSet>,
}

impl CollectionNode {
    /// Iterates documents that currently exist, in insertion order.
    pub fn existing(&self) -> impl Iterator<Item = (&String, &Document)> {
        self.documents
            .iter()
            .filter_map(|(id, node)| node.data.as_ref().map(|data| (id, data)))
    }

    /// Position of `id` among existing documents, in insertion order.
    pub fn existing_index(&self, id: &str) -> Option<usize> {
        self.existing().position(|(doc_id, _)| doc_id == id)
    }
}
