//! Walks the node tree along validated reference paths.
//!
//! Two walks exist. The `*_mut` walks materialize missing nodes on the way
//! down, so writes and listener registrations can target paths nothing has
//! touched yet. The shared-reference walks return `None` for absent nodes
//! and never mutate the tree; reads and queries use them so a `get` against
//! a never-written path stays side-effect free.
//!
//! Segments are assumed to be pre-validated (parity and id rules are
//! checked at reference construction), so the walks themselves are
//! infallible.

use crate::node::{CollectionNode, DocumentNode};

/// Resolves a collection path (odd segment count), creating missing nodes.
pub(crate) fn collection_mut<'a>(
    root: &'a mut DocumentNode,
    segments: &[String],
) -> &'a mut CollectionNode {
    debug_assert!(segments.len() % 2 == 1);
    let mut collection = root.children.entry(segments[0].clone()).or_default();
    for pair in segments[1..].chunks(2) {
        let document = collection.documents.entry(pair[0].clone()).or_default();
        collection = document.children.entry(pair[1].clone()).or_default();
    }
    collection
}

/// Resolves a document path (even segment count), creating missing nodes.
pub(crate) fn document_mut<'a>(
    root: &'a mut DocumentNode,
    segments: &[String],
) -> &'a mut DocumentNode {
    debug_assert!(segments.len() % 2 == 0 && !segments.is_empty());
    let (doc_id, collection_path) = segments.split_last().expect("non-empty document path");
    let collection = collection_mut(root, collection_path);
    collection.documents.entry(doc_id.clone()).or_default()
}

/// Looks up a collection without creating anything.
pub(crate) fn collection<'a>(
    root: &'a DocumentNode,
    segments: &[String],
) -> Option<&'a CollectionNode> {
    debug_assert!(segments.len() % 2 == 1);
    let mut collection = root.children.get(&segments[0])?;
    for pair in segments[1..].chunks(2) {
        let document = collection.documents.get(&pair[0])?;
        collection = document.children.get(&pair[1])?;
    }
    Some(collection)
}

/// Looks up a document without creating anything.
pub(crate) fn document<'a>(
    root: &'a DocumentNode,
    segments: &[String],
) -> Option<&'a DocumentNode> {
    debug_assert!(segments.len() % 2 == 0 && !segments.is_empty());
    let (doc_id, collection_path) = segments.split_last()?;
    collection(root, collection_path)?.documents.get(doc_id)
}
