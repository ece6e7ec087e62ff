//! Document-level read/write semantics through the public surface.

use bson::{Bson, doc};
use mockstore::prelude::*;

#[tokio::test]
async fn set_then_get_round_trips() {
    let store = MemoryStore::new();
    let alice = store.doc("users/alice").unwrap();

    let data = doc! { "name": "Alice", "nested": { "a": [1, 2, 3] } };
    alice.set(data.clone().into()).await.unwrap();

    let snapshot = alice.get().await.unwrap();
    assert!(snapshot.exists());
    assert_eq!(snapshot.data(), Some(&data));
    assert_eq!(snapshot.id(), "alice");
    assert_eq!(snapshot.path(), "users/alice");
}

#[tokio::test]
async fn get_on_a_never_written_path_reports_absent() {
    let store = MemoryStore::new();
    let ghost = store.doc("users/ghost").unwrap();

    let snapshot = ghost.get().await.unwrap();
    assert!(!snapshot.exists());
    assert!(snapshot.data().is_none());
}

#[tokio::test]
async fn plain_set_overwrites_while_merge_preserves() {
    let store = MemoryStore::new();
    let alice = store.doc("users/alice").unwrap();
    alice
        .set(doc! { "name": "Alice", "age": 30 }.into())
        .await
        .unwrap();

    alice.set_merge(doc! { "age": 31 }.into()).await.unwrap();
    assert_eq!(
        alice.get().await.unwrap().data(),
        Some(&doc! { "name": "Alice", "age": 31 })
    );

    alice.set(doc! { "age": 32 }.into()).await.unwrap();
    assert_eq!(alice.get().await.unwrap().data(), Some(&doc! { "age": 32 }));
}

#[tokio::test]
async fn update_preserves_unnamed_fields() {
    let store = MemoryStore::new();
    let alice = store.doc("users/alice").unwrap();
    alice
        .set(doc! { "name": "Alice", "profile": { "city": "Berlin", "zip": "10115" } }.into())
        .await
        .unwrap();

    alice
        .update([("profile.city", FieldValue::value("Munich"))])
        .await
        .unwrap();

    assert_eq!(
        alice.get().await.unwrap().data(),
        Some(&doc! { "name": "Alice", "profile": { "city": "Munich", "zip": "10115" } })
    );
}

#[tokio::test]
async fn update_requires_an_existing_document() {
    let store = MemoryStore::new();
    let ghost = store.doc("users/ghost").unwrap();

    let err = ghost
        .update([("a", FieldValue::value(1))])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NoDocumentToUpdate(_)));
}

#[tokio::test]
async fn structured_and_dotted_paths_address_the_same_field() {
    let store = MemoryStore::new();
    let alice = store.doc("users/alice").unwrap();
    alice.set(doc! { "profile": { "age": 1 } }.into()).await.unwrap();

    let structured = FieldPath::new(["profile", "age"]).unwrap();
    alice
        .update([(structured, FieldValue::value(2))])
        .await
        .unwrap();
    alice
        .update([("profile.age", FieldValue::value(3))])
        .await
        .unwrap();

    assert_eq!(
        alice.get().await.unwrap().get("profile.age").unwrap(),
        Some(Bson::Int32(3))
    );
}

#[tokio::test]
async fn delete_clears_data_but_subcollections_survive() {
    let store = MemoryStore::new();
    let alice = store.doc("users/alice").unwrap();
    alice.set(doc! { "name": "Alice" }.into()).await.unwrap();

    let post = alice.collection("posts").unwrap().doc("p1").unwrap();
    post.set(doc! { "title": "hello" }.into()).await.unwrap();

    alice.delete().await.unwrap();
    assert!(!alice.get().await.unwrap().exists());

    // The parent collection no longer yields the document...
    let users = store.collection("users").unwrap().get().await.unwrap();
    assert!(users.is_empty());

    // ...but the subcollection under the absent parent is still reachable.
    let posts = store
        .collection("users/alice/posts")
        .unwrap()
        .get()
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id(), "p1");
}

#[tokio::test]
async fn delete_sentinel_is_never_observable() {
    let store = MemoryStore::new();
    let alice = store.doc("users/alice").unwrap();

    let payload = WriteData::from(doc! { "keep": 1 }).with("gone", FieldValue::Delete);
    alice.set(payload).await.unwrap();

    let snapshot = alice.get().await.unwrap();
    assert_eq!(snapshot.data(), Some(&doc! { "keep": 1 }));
    assert_eq!(snapshot.get("gone").unwrap(), None);
}

#[tokio::test]
async fn array_union_applied_twice_keeps_one_occurrence() {
    let store = MemoryStore::new();
    let alice = store.doc("users/alice").unwrap();
    alice.set(doc! { "tags": ["a"] }.into()).await.unwrap();

    let union = WriteData::new().with("tags", FieldValue::array_union(["x"]));
    alice.set_merge(union.clone()).await.unwrap();
    alice.set_merge(union).await.unwrap();

    assert_eq!(
        alice.get().await.unwrap().data(),
        Some(&doc! { "tags": ["a", "x"] })
    );
}

#[tokio::test]
async fn server_timestamps_follow_the_configured_clock() {
    let at = bson::DateTime::from_millis(1_700_000_000_000);
    let store = MemoryStore::builder().clock(ServerClock::Fixed(at)).build();
    let alice = store.doc("users/alice").unwrap();

    alice
        .set(WriteData::new().with("created", FieldValue::ServerTimestamp))
        .await
        .unwrap();

    assert_eq!(
        alice.get().await.unwrap().get("created").unwrap(),
        Some(Bson::DateTime(at))
    );
}

#[tokio::test]
async fn malformed_references_fail_synchronously() {
    let store = MemoryStore::new();

    assert!(matches!(
        store.doc("a//b").unwrap_err(),
        StoreError::InvalidReference(_)
    ));
    // Odd segment count requested as a document reference.
    assert!(matches!(
        store.doc("a/b/c").unwrap_err(),
        StoreError::InvalidReference(_)
    ));
    assert!(matches!(
        store.collection("a/b").unwrap_err(),
        StoreError::InvalidReference(_)
    ));
    assert!(matches!(
        store.collection("__meta__").unwrap_err(),
        StoreError::InvalidReference(_)
    ));
}

#[tokio::test]
async fn add_uses_the_queued_id_source() {
    let store = MemoryStore::builder().id_queue(["first", "second"]).build();
    let users = store.collection("users").unwrap();

    let a = users.add(doc! { "n": 1 }.into()).await.unwrap();
    let b = users.add(doc! { "n": 2 }.into()).await.unwrap();
    assert_eq!(a.id(), "first");
    assert_eq!(b.id(), "second");

    // Drained queue falls back to generated ids.
    let c = users.add(doc! { "n": 3 }.into()).await.unwrap();
    assert!(!c.id().is_empty());

    let all = users.get().await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn reset_empties_the_whole_tree() {
    let store = MemoryStore::new();
    store
        .doc("users/alice")
        .unwrap()
        .set(doc! { "n": 1 }.into())
        .await
        .unwrap();

    store.reset().await;

    assert!(!store.doc("users/alice").unwrap().get().await.unwrap().exists());
    assert!(store.collection("users").unwrap().get().await.unwrap().is_empty());
}
