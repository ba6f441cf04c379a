//! Root storage seams.
//!
//! A [`Store`] holds the current root of a tree; [`patch_do`] runs a batch
//! against it and commits the result, so callers never juggle the old and
//! new roots themselves. [`AsyncStore`] / [`patch_do_async`] are the same
//! contract for backends that load and save asynchronously.

use crate::batch::{batch, batch_async, Batch};
use crate::error::GraftResult;
use crate::value::Value;
use std::future::Future;

/// Synchronous root storage.
pub trait Store {
    /// Load the current root.
    fn get(&self) -> GraftResult<Value>;
    /// Replace the current root.
    fn set(&mut self, root: Value) -> GraftResult<()>;
}

/// Asynchronous root storage.
#[allow(async_fn_in_trait)]
pub trait AsyncStore {
    /// Load the current root.
    async fn get(&self) -> GraftResult<Value>;
    /// Replace the current root.
    async fn set(&mut self, root: Value) -> GraftResult<()>;
}

/// An in-memory store; the reference backend and the one tests use.
#[derive(Debug, Default)]
pub struct MemStore {
    root: Value,
}

impl MemStore {
    /// Create a store holding `root`.
    pub fn new(root: Value) -> MemStore {
        MemStore { root }
    }

    /// The stored root, borrowed.
    pub fn root(&self) -> &Value {
        &self.root
    }
}

impl Store for MemStore {
    fn get(&self) -> GraftResult<Value> {
        Ok(self.root.clone())
    }

    fn set(&mut self, root: Value) -> GraftResult<()> {
        self.root = root;
        Ok(())
    }
}

impl AsyncStore for MemStore {
    async fn get(&self) -> GraftResult<Value> {
        Ok(self.root.clone())
    }

    async fn set(&mut self, root: Value) -> GraftResult<()> {
        self.root = root;
        Ok(())
    }
}

/// Load the store's root, run a batch against it, commit and return the new
/// root. An error from the batch leaves the store untouched.
pub fn patch_do<S, F>(store: &mut S, f: F) -> GraftResult<Value>
where
    S: Store,
    F: FnOnce(&mut Batch) -> GraftResult<()>,
{
    let root = store.get()?;
    let next = batch(&root, f)?;
    store.set(next.clone())?;
    Ok(next)
}

/// Async counterpart of [`patch_do`]: the batch future may await between
/// operations, and the commit itself is awaited.
pub async fn patch_do_async<S, F, Fut>(store: &mut S, f: F) -> GraftResult<Value>
where
    S: AsyncStore,
    F: FnOnce(Batch) -> Fut,
    Fut: Future<Output = GraftResult<Batch>>,
{
    let root = store.get().await?;
    let next = batch_async(&root, f).await?;
    store.set(next.clone()).await?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    #[test]
    fn test_patch_do_commits() {
        let mut store = MemStore::new(Value::from_json(json!({"n": 1})));
        let next = patch_do(&mut store, |b| b.set(&path!("n"), 2)).unwrap();
        assert_eq!(next.get_at(&path!("n")), Some(&Value::Int(2)));
        assert!(store.root().ptr_eq(&next));
    }

    #[test]
    fn test_patch_do_error_leaves_store_untouched() {
        let mut store = MemStore::new(Value::from_json(json!({"n": 1})));
        let err = patch_do(&mut store, |b| b.set(&path!("ghost", "x"), 2)).unwrap_err();
        assert!(err.to_string().contains("nothing"));
        assert_eq!(store.root().get_at(&path!("n")), Some(&Value::Int(1)));
    }
}
