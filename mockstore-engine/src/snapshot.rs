//! Immutable document views handed to listeners and returned by reads.

use bson::{Bson, Document};

use mockstore_core::{
    error::StoreResult,
    path::FieldRef,
};

use crate::query_exec;

/// An immutable view of one document at one point in time.
///
/// A snapshot for a non-existent document has `exists() == false` and no
/// data; this is how reads against never-written or deleted paths report
/// themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    id: String,
    path: String,
    data: Option<Document>,
}

impl DocumentSnapshot {
    pub(crate) fn new(path: impl Into<String>, data: Option<Document>) -> Self {
        let path = path.into();
        let id = path
            .rsplit('/')
            .next()
            .unwrap_or(path.as_str())
            .to_string();
        DocumentSnapshot { id, path, data }
    }

    /// The document's id within its collection.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The full slash-delimited document path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the document existed when the snapshot was taken.
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// The document's data, if it existed.
    pub fn data(&self) -> Option<&Document> {
        self.data.as_ref()
    }

    /// Consumes the snapshot, yielding its data.
    pub fn into_data(self) -> Option<Document> {
        self.data
    }

    /// Looks up a (possibly nested) field value.
    ///
    /// Returns `Ok(None)` when the document or the field is absent.
    pub fn get(&self, field: impl Into<FieldRef>) -> StoreResult<Option<Bson>> {
        let path = field.into().into_path()?;
        Ok(self
            .data
            .as_ref()
            .and_then(|data| query_exec::lookup(data, &path))
            .cloned())
    }
}
