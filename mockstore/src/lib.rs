//! An in-memory emulation of a hierarchical document database, for tests.
//!
//! Documents live in nested collections, are queried with filter/sort/limit
//! rules, mutated through path-addressed field updates, observed through
//! snapshot listeners, and written in all-or-nothing batches and
//! transactions — without a network or a server. Code written against a
//! real document-database client can run against a [`MemoryStore`]
//! unchanged in shape.
//!
//! # Quick start
//!
//! ```ignore
//! use mockstore::prelude::*;
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> StoreResult<()> {
//!     let store = MemoryStore::new();
//!
//!     // Path-addressed writes and reads.
//!     let alice = store.doc("users/alice")?;
//!     alice.set(doc! { "name": "Alice", "age": 30 }.into()).await?;
//!     assert!(alice.get().await?.exists());
//!
//!     // Field-path updates, with sentinels.
//!     alice
//!         .update([
//!             ("profile.city", FieldValue::value("Berlin")),
//!             ("age", FieldValue::Delete),
//!         ])
//!         .await?;
//!
//!     // Queries.
//!     let adults = store
//!         .collection("users")?
//!         .filter("age", FieldOp::Gte, 18)?
//!         .order_by("name", SortDirection::Asc)?
//!         .limit(10)?
//!         .get()
//!         .await?;
//!     println!("{} matches", adults.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Listeners
//!
//! `on_snapshot` registers a callback that synchronously receives one
//! initial notification reflecting current state, then one notification per
//! committed change. Document listeners get a [`DocumentSnapshot`];
//! collection listeners get a batched [`change::ChangeSet`] per commit.
//!
//! # Transactions and batches
//!
//! ```ignore
//! store
//!     .run_transaction(|tx| {
//!         Box::pin(async move {
//!             let before = tx.get(&counter_ref).await?;
//!             tx.update(&counter_ref, [("n", FieldValue::value(1))])?;
//!             Ok(before.exists())
//!         })
//!     })
//!     .await?;
//! ```
//!
//! Reads inside a transaction must precede all writes; a commit that fails
//! midway applies nothing. A [`WriteBatch`] is the write-only variant.
//!
//! # Deterministic tests
//!
//! The store builder pins the server clock and the auto-id source, and the
//! fixture interface bulk-loads and dumps whole trees:
//!
//! ```ignore
//! let store = MemoryStore::builder()
//!     .clock(ServerClock::Fixed(bson::DateTime::from_millis(0)))
//!     .id_queue(["doc-1", "doc-2"])
//!     .build();
//! ```

pub use mockstore_core::{change, error, listener, path, query, value};
pub use mockstore_engine::{
    CollectionRef, DocumentRef, DocumentSnapshot, IdSource, ListenerGuard, MemoryStore,
    MemoryStoreBuilder, QueryRef, ServerClock, Transaction, WriteBatch,
};
pub use mockstore_engine::{CollectionFixture, DocumentFixture};

// Re-export BSON types for convenience
pub use bson;

pub mod prelude;
