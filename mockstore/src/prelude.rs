//! Convenient re-exports of the commonly used types.
//!
//! Import this module to access the store, references, query rules, write
//! values, and error types without importing from multiple sub-modules:
//!
//! ```ignore
//! use mockstore::prelude::*;
//! ```

pub use mockstore_core::{
    change::{ChangeSet, ChangeType, DocumentChange},
    error::{StoreError, StoreResult},
    path::{FieldPath, FieldRef},
    query::{FieldOp, Query, SortDirection},
    value::{FieldValue, WriteData},
};
pub use mockstore_engine::{
    CollectionFixture, CollectionRef, DocumentFixture, DocumentRef, DocumentSnapshot, IdSource,
    ListenerGuard, MemoryStore, MemoryStoreBuilder, QueryRef, ServerClock, Transaction,
    WriteBatch,
};
