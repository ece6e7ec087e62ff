//! Error and result types for store operations.
//!
//! Every fallible operation in the workspace returns [`StoreResult<T>`].
//! Validation errors surface synchronously at the call that violates the
//! contract (reference construction, query building); data-dependent errors
//! surface when the offending data is actually examined (query execution,
//! commit time).

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors raised by the in-memory document store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A collection or document path is malformed: wrong segment parity,
    /// empty segments, forbidden characters, or an over-long path.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
    /// A field name violates the naming rules (empty, too long, or an
    /// unquoted name containing restricted characters).
    #[error("Invalid field name: {0}")]
    InvalidFieldName(String),
    /// A dotted field path could not be parsed into segments.
    #[error("Invalid field path: {0}")]
    InvalidFieldPath(String),
    /// An update was issued against a document that has no data.
    #[error("No document to update: {0}")]
    NoDocumentToUpdate(String),
    /// A field-path write tried to descend through a non-map value.
    #[error("Cannot write {path}: segment {segment:?} holds a non-map value")]
    IllegalFieldPath {
        /// The full field path of the attempted write.
        path: String,
        /// The intermediate segment occupied by a scalar.
        segment: String,
    },
    /// A query clause or execution step is invalid (non-positive limit,
    /// `array-contains` against a non-array field).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// An order-by rule encountered a value type with no defined ordering.
    #[error("Cannot order by {field}: {type_name} values have no defined ordering")]
    UnsupportedSortType {
        /// Canonical dotted form of the sort field.
        field: String,
        /// Name of the offending value type.
        type_name: &'static str,
    },
    /// A transaction read was issued after a write had been buffered.
    #[error("Transaction reads must be issued before any write")]
    ReadAfterWrite,
    /// The named operation is deliberately not provided by this store.
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),
    /// Serialization/deserialization failed while loading or dumping data.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A specialized `Result` type for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<SerdeJsonError> for StoreError {
    fn from(err: SerdeJsonError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
