//! Tests for async sessions and async stores.
//!
//! These tests verify that:
//! 1. a batch owned by a future survives `await` points and worker moves
//! 2. `patch_do_async` loads, batches and commits through an `AsyncStore`
//! 3. concurrent sessions on shared roots stay isolated

use graft::{
    batch_async, patch_do_async, path, AsyncStore, GraftResult, MemStore, Value,
};
use serde_json::json;

#[tokio::test]
async fn test_batch_async_spans_await_points() {
    let root = Value::from_json(json!({"job": {"status": "queued", "attempts": 0}}));

    let next = batch_async(&root, |mut b| async move {
        b.set(&path!("job", "status"), "running")?;
        tokio::task::yield_now().await;
        b.update(&path!("job", "attempts"), |v| {
            Value::Int(v.as_int().unwrap_or(0) + 1)
        })?;
        tokio::task::yield_now().await;
        b.set(&path!("job", "status"), "done")?;
        Ok(b)
    })
    .await
    .unwrap();

    assert_eq!(next.get_at(&path!("job", "status")), Some(&Value::from("done")));
    assert_eq!(next.get_at(&path!("job", "attempts")), Some(&Value::Int(1)));
    assert_eq!(root.get_at(&path!("job", "status")), Some(&Value::from("queued")));
}

#[tokio::test]
async fn test_batch_async_error_discards_session() {
    let root = Value::from_json(json!({"a": 1}));
    let err = batch_async(&root, |mut b| async move {
        b.set(&path!("a"), 2)?;
        tokio::task::yield_now().await;
        b.set(&path!("ghost", "x"), 3)?;
        Ok(b)
    })
    .await
    .unwrap_err();

    assert!(err.to_string().contains("nothing"));
    assert_eq!(root.get_at(&path!("a")), Some(&Value::Int(1)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_sessions_are_isolated() {
    let root = Value::from_json(json!({"n": 0, "shared": {"big": [1, 2, 3]}}));

    let mut handles = Vec::new();
    for i in 0..8i64 {
        let root = root.clone();
        handles.push(tokio::spawn(async move {
            batch_async(&root, move |mut b| async move {
                b.set(&path!("n"), i)?;
                tokio::task::yield_now().await;
                b.update(&path!("n"), |v| Value::Int(v.as_int().unwrap_or(0) * 10))?;
                Ok(b)
            })
            .await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let next = handle.await.unwrap().unwrap();
        assert_eq!(next.get_at(&path!("n")), Some(&Value::Int(i as i64 * 10)));
        // the untouched branch is still the shared original container
        assert!(next
            .get_field("shared")
            .unwrap()
            .ptr_eq(root.get_field("shared").unwrap()));
    }
    assert_eq!(root.get_at(&path!("n")), Some(&Value::Int(0)));
}

#[tokio::test]
async fn test_patch_do_async_commits() {
    let mut store = MemStore::new(Value::from_json(json!({"visits": 0})));

    for _ in 0..3 {
        patch_do_async(&mut store, |mut b| async move {
            b.update(&path!("visits"), |v| {
                Value::Int(v.as_int().unwrap_or(0) + 1)
            })?;
            Ok(b)
        })
        .await
        .unwrap();
    }

    assert_eq!(store.root().get_at(&path!("visits")), Some(&Value::Int(3)));
}

#[tokio::test]
async fn test_patch_do_async_error_leaves_store() {
    let mut store = MemStore::new(Value::from_json(json!({"a": 1})));

    patch_do_async(&mut store, |mut b| async move {
        b.set(&path!("ghost", "x"), 1)?;
        Ok(b)
    })
    .await
    .unwrap_err();

    assert_eq!(store.root().get_at(&path!("a")), Some(&Value::Int(1)));
}

// A store whose loads and saves themselves await, to exercise the async
// seam end to end.
struct SlowStore {
    inner: MemStore,
}

impl AsyncStore for SlowStore {
    async fn get(&self) -> GraftResult<Value> {
        tokio::task::yield_now().await;
        AsyncStore::get(&self.inner).await
    }

    async fn set(&mut self, root: Value) -> GraftResult<()> {
        tokio::task::yield_now().await;
        AsyncStore::set(&mut self.inner, root).await
    }
}

#[tokio::test]
async fn test_custom_async_store_backend() {
    let mut store = SlowStore {
        inner: MemStore::new(Value::from_json(json!({"log": []}))),
    };

    let next = patch_do_async(&mut store, |mut b| async move {
        b.add(&path!("log"), "started")?;
        tokio::task::yield_now().await;
        b.add(&path!("log"), "finished")?;
        Ok(b)
    })
    .await
    .unwrap();

    assert_eq!(next.get_field("log").unwrap().len(), Some(2));
    assert_eq!(
        AsyncStore::get(&store.inner).await.unwrap().get_field("log").unwrap().len(),
        Some(2)
    );
}
