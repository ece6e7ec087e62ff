//! The in-memory store engine: node tree, mutation, queries, listeners, and
//! atomic multi-write coordinators.
//!
//! [`MemoryStore`] is the entry point. It owns a tree of collection and
//! document nodes behind an async read-write lock; [`CollectionRef`],
//! [`DocumentRef`], and [`QueryRef`] are cheap handles that carry a store
//! clone plus a validated path, so any number of them can be held and used
//! concurrently. Mutations funnel through a single commit path that stages
//! every resulting document before touching the tree, then swaps the staged
//! data in and fans out change notifications — one snapshot per affected
//! document, one batched change set per affected collection.

#[allow(unused_extern_crates)]
extern crate self as mockstore_engine;

mod batch;
mod clock;
mod fixture;
mod mutate;
mod node;
mod pending;
mod query_exec;
mod reference;
mod resolve;
mod snapshot;
mod store;
mod transaction;

pub use batch::WriteBatch;
pub use clock::{IdSource, ServerClock};
pub use fixture::{CollectionFixture, DocumentFixture};
pub use reference::{CollectionRef, DocumentRef, ListenerGuard, QueryRef};
pub use snapshot::DocumentSnapshot;
pub use store::{MemoryStore, MemoryStoreBuilder};
pub use transaction::Transaction;
