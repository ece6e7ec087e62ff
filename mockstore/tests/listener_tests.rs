//! Snapshot-listener semantics: initial notifications, commit-order
//! delivery, batching per collection, and unsubscription.

use std::sync::{Arc, Mutex};

use bson::doc;
use mockstore::prelude::*;

type Log<T> = Arc<Mutex<Vec<T>>>;

fn log<T>() -> Log<T> {
    Arc::new(Mutex::new(Vec::new()))
}

#[tokio::test]
async fn document_listener_gets_one_initial_snapshot_even_when_absent() {
    let store = MemoryStore::new();
    let ghost = store.doc("users/ghost").unwrap();

    let seen: Log<bool> = log();
    let sink = Arc::clone(&seen);
    let _guard = ghost
        .on_snapshot(move |snapshot| sink.lock().unwrap().push(snapshot.exists()))
        .await
        .unwrap();

    // Exactly one synchronous initial callback, reflecting absence.
    assert_eq!(*seen.lock().unwrap(), [false]);
}

#[tokio::test]
async fn document_listener_sees_changes_in_commit_order() {
    let store = MemoryStore::new();
    let alice = store.doc("users/alice").unwrap();

    let seen: Log<Option<bson::Document>> = log();
    let sink = Arc::clone(&seen);
    let _guard = alice
        .on_snapshot(move |snapshot| sink.lock().unwrap().push(snapshot.data().cloned()))
        .await
        .unwrap();

    alice.set(doc! { "n": 1 }.into()).await.unwrap();
    alice.set(doc! { "n": 2 }.into()).await.unwrap();
    alice.delete().await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        [None, Some(doc! { "n": 1 }), Some(doc! { "n": 2 }), None]
    );
}

#[tokio::test]
async fn collection_listener_starts_with_a_synthetic_all_added_set() {
    let store = MemoryStore::new();
    store
        .load_collection(
            "users",
            [
                ("alice".to_string(), doc! { "n": 1 }),
                ("bob".to_string(), doc! { "n": 2 }),
            ],
        )
        .await
        .unwrap();

    let seen: Log<ChangeSet> = log();
    let sink = Arc::clone(&seen);
    let _guard = store
        .collection("users")
        .unwrap()
        .on_snapshot(move |changes| sink.lock().unwrap().push(changes.clone()))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    let initial = &seen[0];
    assert_eq!(initial.len(), 2);
    for (index, change) in initial.iter().enumerate() {
        assert_eq!(change.change_type, ChangeType::Added);
        assert_eq!(change.old_index, None);
        assert_eq!(change.new_index, Some(index));
    }
    assert_eq!(initial.changes[0].document_id, "alice");
    assert_eq!(initial.changes[1].document_id, "bob");
}

#[tokio::test]
async fn collection_listener_records_adds_modifies_and_removes() {
    let store = MemoryStore::new();
    let users = store.collection("users").unwrap();

    let seen: Log<ChangeSet> = log();
    let sink = Arc::clone(&seen);
    let _guard = users
        .on_snapshot(move |changes| sink.lock().unwrap().push(changes.clone()))
        .await
        .unwrap();

    let alice = users.doc("alice").unwrap();
    alice.set(doc! { "n": 1 }.into()).await.unwrap();
    alice.set(doc! { "n": 2 }.into()).await.unwrap();
    alice.delete().await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 4); // initial + three commits

    let added = &seen[1].changes[0];
    assert_eq!(added.change_type, ChangeType::Added);
    assert_eq!((added.old_index, added.new_index), (None, Some(0)));
    assert_eq!(added.data, Some(doc! { "n": 1 }));

    let modified = &seen[2].changes[0];
    assert_eq!(modified.change_type, ChangeType::Modified);
    assert_eq!((modified.old_index, modified.new_index), (Some(0), Some(0)));

    let removed = &seen[3].changes[0];
    assert_eq!(removed.change_type, ChangeType::Removed);
    assert_eq!((removed.old_index, removed.new_index), (Some(0), None));
    assert_eq!(removed.data, None);
}

#[tokio::test]
async fn unsubscribe_stops_delivery() {
    let store = MemoryStore::new();
    let alice = store.doc("users/alice").unwrap();

    let seen: Log<bool> = log();
    let sink = Arc::clone(&seen);
    let guard = alice
        .on_snapshot(move |snapshot| sink.lock().unwrap().push(snapshot.exists()))
        .await
        .unwrap();

    alice.set(doc! { "n": 1 }.into()).await.unwrap();
    guard.unsubscribe().await;
    alice.set(doc! { "n": 2 }.into()).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), [false, true]);
}

#[tokio::test]
async fn a_panicking_listener_fails_neither_the_write_nor_its_siblings() {
    let store = MemoryStore::new();
    let alice = store.doc("users/alice").unwrap();

    let _bomb = alice
        .on_snapshot(|snapshot| {
            if snapshot.exists() {
                panic!("listener bug");
            }
        })
        .await
        .unwrap();

    let seen: Log<bool> = log();
    let sink = Arc::clone(&seen);
    let _guard = alice
        .on_snapshot(move |snapshot| sink.lock().unwrap().push(snapshot.exists()))
        .await
        .unwrap();

    // The write itself must succeed and the second listener still fires.
    alice.set(doc! { "n": 1 }.into()).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), [false, true]);
}

#[tokio::test]
async fn subcollection_writes_do_not_notify_grandparent_collections() {
    let store = MemoryStore::new();
    let users = store.collection("users").unwrap();

    let seen: Log<ChangeSet> = log();
    let sink = Arc::clone(&seen);
    let _guard = users
        .on_snapshot(move |changes| sink.lock().unwrap().push(changes.clone()))
        .await
        .unwrap();

    store
        .doc("users/alice/posts/p1")
        .unwrap()
        .set(doc! { "title": "hello" }.into())
        .await
        .unwrap();

    // Only the initial (empty) change set was delivered.
    assert_eq!(seen.lock().unwrap().len(), 1);
}
