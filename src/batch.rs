//! Multi-operation update sessions.
//!
//! A [`Batch`] owns a working copy of a root plus one clone registry, so a
//! run of operations clones each touched container once no matter how many
//! times it is written. [`batch`] drives a synchronous session; [`batch_async`]
//! hands the batch to a future so a session can span `await` points.
//!
//! The working root is a live draft: observing it through [`Batch::get`] /
//! [`Batch::root`] is fine, but opening an independent chain on it (outside
//! the batch) is a misuse the chain's terminal reports. [`Batch::scope`]
//! narrows a session to a subtree, the way nested writers narrow an output
//! stream.

use crate::error::{GraftError, GraftResult};
use crate::freeze;
use crate::path::Path;
use crate::rebuild::{self, LeafWrite, Probe};
use crate::registry::{CloneDepth, CloneRegistry};
use crate::value::Value;
use std::cell::RefCell;
use std::future::Future;

thread_local! {
    // Working-root addresses of batches currently in flight on this thread.
    static DRAFTS: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Whether `addr` is the working root of a live batch on this thread.
pub(crate) fn is_live_draft(addr: usize) -> bool {
    DRAFTS.with(|drafts| drafts.borrow().contains(&addr))
}

/// Run a batch of operations against `root`, returning the new root.
///
/// All operations share one clone registry: a container touched by several
/// operations is cloned once, on first touch. The original `root` is never
/// modified; an error from the closure discards the working copy.
///
/// # Examples
///
/// ```
/// use graft::{batch, path, Value};
/// use serde_json::json;
///
/// let root = Value::from_json(json!({"user": {"name": "John", "age": 30}}));
/// let next = batch(&root, |b| {
///     b.set(&path!("user", "name"), "Jane")?;
///     b.set(&path!("user", "age"), 31)?;
///     Ok(())
/// }).unwrap();
///
/// assert_eq!(next.get_at(&path!("user", "age")), Some(&Value::Int(31)));
/// assert_eq!(root.get_at(&path!("user", "age")), Some(&Value::Int(30)));
/// ```
pub fn batch<F>(root: &Value, f: F) -> GraftResult<Value>
where
    F: FnOnce(&mut Batch) -> GraftResult<()>,
{
    let mut session = Batch::attached(root.clone());
    f(&mut session)?;
    Ok(session.finish())
}

/// Run a batch whose closure is a future, so operations can interleave with
/// `await` points.
///
/// The batch is owned by the future rather than pinned to a thread, which is
/// what makes the session safe to resume on another worker. The future gives
/// the batch back when it is done.
///
/// # Examples
///
/// ```
/// use graft::{batch_async, path, Value};
/// use serde_json::json;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let root = Value::from_json(json!({"n": 1}));
/// let next = batch_async(&root, |mut b| async move {
///     b.set(&path!("n"), 2)?;
///     Ok(b)
/// }).await.unwrap();
/// assert_eq!(next.get_at(&path!("n")), Some(&Value::Int(2)));
/// # });
/// ```
pub async fn batch_async<F, Fut>(root: &Value, f: F) -> GraftResult<Value>
where
    F: FnOnce(Batch) -> Fut,
    Fut: Future<Output = GraftResult<Batch>>,
{
    let session = Batch::detached(root.clone());
    let session = f(session).await?;
    Ok(session.finish())
}

/// One in-flight update session. See [`batch`] / [`batch_async`].
#[derive(Debug)]
pub struct Batch {
    root: Value,
    /// Prefix every operation path is resolved under; grows inside `scope`.
    base: Path,
    registry: CloneRegistry,
    /// Our entry in the thread's live-draft list, if registered.
    slot: Option<usize>,
}

impl Batch {
    /// A batch registered on this thread, so stray chains opened on the
    /// working draft are caught.
    fn attached(root: Value) -> Batch {
        let slot = root.addr();
        if let Some(addr) = slot {
            DRAFTS.with(|drafts| drafts.borrow_mut().push(addr));
        }
        Batch {
            root,
            base: Path::root(),
            registry: CloneRegistry::default(),
            slot,
        }
    }

    /// A batch with no thread registration; used for async sessions that may
    /// migrate between workers.
    fn detached(root: Value) -> Batch {
        Batch {
            root,
            base: Path::root(),
            registry: CloneRegistry::default(),
            slot: None,
        }
    }

    // ===== Operations =====

    /// Replace the value at `path`. Every segment but the last must resolve;
    /// the final field or key is created if absent.
    pub fn set(&mut self, path: &Path, value: impl Into<Value>) -> GraftResult<()> {
        let full = self.base.join(path);
        if let Probe::Broken { at } = rebuild::probe(&self.root, full.segments())? {
            return Err(rebuild::broken_error(full.segments(), at));
        }
        self.apply(&full, LeafWrite::Assign(value.into())).map(|_| ())
    }

    /// Replace the value at `path` with one computed from the current value
    /// ([`Value::Null`] when the final link is absent).
    pub fn set_with(
        &mut self,
        path: &Path,
        f: impl FnOnce(&Value) -> Value,
    ) -> GraftResult<()> {
        let full = self.base.join(path);
        let next = match rebuild::probe(&self.root, full.segments())? {
            Probe::Broken { at } => return Err(rebuild::broken_error(full.segments(), at)),
            Probe::Present(current) => f(current),
            Probe::AbsentLeaf => f(&Value::Null),
        };
        self.apply(&full, LeafWrite::Assign(next)).map(|_| ())
    }

    /// Transform the value at `path`. Returns whether anything was written:
    /// a broken intermediate link makes this a no-op (`Ok(false)`), a missing
    /// final link hands `f` a [`Value::Null`].
    pub fn update(&mut self, path: &Path, f: impl FnOnce(&Value) -> Value) -> GraftResult<bool> {
        let full = self.base.join(path);
        let next = match rebuild::probe(&self.root, full.segments())? {
            Probe::Broken { .. } => return Ok(false),
            Probe::Present(current) => f(current),
            Probe::AbsentLeaf => f(&Value::Null),
        };
        self.apply(&full, LeafWrite::Assign(next))?;
        Ok(true)
    }

    /// Hand a shallow draft of the subtree at `path` to `f`. An absent
    /// target is a no-op (`Ok(false)`).
    pub fn mutate(&mut self, path: &Path, f: impl FnOnce(&mut Value)) -> GraftResult<bool> {
        self.mutate_depth(path, CloneDepth::Shallow, f)
    }

    /// Like [`Batch::mutate`] but the draft is deep: fully detached, safe to
    /// restructure arbitrarily.
    pub fn mutate_deep(&mut self, path: &Path, f: impl FnOnce(&mut Value)) -> GraftResult<bool> {
        self.mutate_depth(path, CloneDepth::Deep, f)
    }

    fn mutate_depth(
        &mut self,
        path: &Path,
        depth: CloneDepth,
        f: impl FnOnce(&mut Value),
    ) -> GraftResult<bool> {
        let full = self.base.join(path);
        match rebuild::probe(&self.root, full.segments())? {
            Probe::Broken { .. } | Probe::AbsentLeaf => return Ok(false),
            Probe::Present(_) => {}
        }
        let result = rebuild::mutate_at(
            &mut self.root,
            full.segments(),
            &mut self.registry,
            depth,
            f,
        );
        self.sync_slot();
        result.map(|_| true)
    }

    /// Remove the value at `path`; absent paths are a no-op.
    pub fn delete(&mut self, path: &Path) -> GraftResult<()> {
        let full = self.base.join(path);
        match rebuild::probe(&self.root, full.segments())? {
            Probe::Broken { .. } | Probe::AbsentLeaf => return Ok(()),
            Probe::Present(_) => {}
        }
        self.apply(&full, LeafWrite::Delete).map(|_| ())
    }

    /// Remove the first element equal to `value` from the container at
    /// `path`. Returns whether anything was removed; an absent container or
    /// element is a no-op.
    pub fn remove_value(&mut self, path: &Path, value: impl Into<Value>) -> GraftResult<bool> {
        let full = self.base.join(path);
        let value = value.into();
        match rebuild::probe(&self.root, full.segments())? {
            Probe::Broken { .. } | Probe::AbsentLeaf => return Ok(false),
            // nothing to remove: do not clone the spine for a no-op
            Probe::Present(container) if crate::adapter::remove_is_noop(container, &value) => {
                return Ok(false);
            }
            Probe::Present(_) => {}
        }
        self.apply(&full, LeafWrite::RemoveValue(value))
    }

    /// Add one element to the sequence or unique-element container at
    /// `path`. The container must exist.
    pub fn add(&mut self, path: &Path, value: impl Into<Value>) -> GraftResult<()> {
        self.add_all(path, [value.into()])
    }

    /// Add several elements to the container at `path`.
    pub fn add_all<V: Into<Value>>(
        &mut self,
        path: &Path,
        values: impl IntoIterator<Item = V>,
    ) -> GraftResult<()> {
        let full = self.base.join(path);
        match rebuild::probe(&self.root, full.segments())? {
            Probe::Broken { at } => return Err(rebuild::broken_error(full.segments(), at)),
            Probe::AbsentLeaf => {
                return Err(GraftError::kind_error(full.clone(), "add", "nothing"))
            }
            Probe::Present(_) => {}
        }
        self.apply(
            &full,
            LeafWrite::Add(values.into_iter().map(Into::into).collect()),
        )
        .map(|_| ())
    }

    /// Run `f` with every operation path resolved under `base.join(path)`.
    /// Scopes nest; errors inside carry the full path.
    pub fn scope<F>(&mut self, path: &Path, f: F) -> GraftResult<()>
    where
        F: FnOnce(&mut Batch) -> GraftResult<()>,
    {
        let saved = self.base.clone();
        self.base = saved.join(path);
        let result = f(self);
        self.base = saved;
        result
    }

    // ===== Observation =====

    /// Read the current working value at `path` (under the active scope).
    pub fn get(&self, path: &Path) -> Option<&Value> {
        self.root.get_at(&self.base.join(path))
    }

    /// The current working root. A live draft: share it, but do not open
    /// independent chains on it.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// A cheap copy of the current working root. Unlike the value returned
    /// by [`Batch::finish`] it is not frozen; the session is still open.
    pub fn snapshot(&self) -> Value {
        self.root.clone()
    }

    /// Containers cloned so far in this session.
    pub fn clone_count(&self) -> usize {
        self.registry.clone_count()
    }

    /// Close the session and return the final root.
    pub fn finish(mut self) -> Value {
        let root = std::mem::take(&mut self.root);
        freeze::freeze_tree(&root);
        root
    }

    // ===== Internals =====

    fn apply(&mut self, full: &Path, write: LeafWrite) -> GraftResult<bool> {
        let result = rebuild::apply(&mut self.root, full.segments(), &mut self.registry, write);
        self.sync_slot();
        result
    }

    /// The working root's address changes when a write clones it; keep the
    /// live-draft entry pointing at the current draft.
    fn sync_slot(&mut self) {
        let Some(old) = self.slot else { return };
        let now = self.root.addr();
        if now == Some(old) {
            return;
        }
        DRAFTS.with(|drafts| {
            let mut drafts = drafts.borrow_mut();
            if let Some(pos) = drafts.iter().rposition(|a| *a == old) {
                match now {
                    Some(addr) => drafts[pos] = addr,
                    None => {
                        drafts.remove(pos);
                    }
                }
            }
        });
        self.slot = now;
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        if let Some(addr) = self.slot.take() {
            DRAFTS.with(|drafts| {
                let mut drafts = drafts.borrow_mut();
                if let Some(pos) = drafts.iter().rposition(|a| *a == addr) {
                    drafts.remove(pos);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    #[test]
    fn test_batch_clones_each_container_once() {
        let root = Value::from_json(json!({"user": {"name": "a", "age": 1}}));
        let next = batch(&root, |b| {
            b.set(&path!("user", "name"), "b")?;
            b.set(&path!("user", "age"), 2)?;
            assert_eq!(b.clone_count(), 2); // root + user, despite two writes
            Ok(())
        })
        .unwrap();
        assert_eq!(next.get_at(&path!("user", "age")), Some(&Value::Int(2)));
    }

    #[test]
    fn test_batch_error_discards_working_copy() {
        let root = Value::from_json(json!({"a": 1}));
        let err = batch(&root, |b| {
            b.set(&path!("a"), 2)?;
            b.set(&path!("missing", "deep"), 3)?;
            Ok(())
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "cannot read .deep of nothing at $.missing");
        assert_eq!(root.get_at(&path!("a")), Some(&Value::Int(1)));
    }

    #[test]
    fn test_update_and_delete_tolerance() {
        let root = Value::from_json(json!({"counter": {"n": 1}}));
        let next = batch(&root, |b| {
            assert!(!b.update(&path!("ghost", "n"), |_| Value::Int(0)).unwrap());
            assert!(b
                .update(&path!("counter", "n"), |v| {
                    Value::Int(v.as_int().unwrap_or(0) + 1)
                })
                .unwrap());
            b.delete(&path!("ghost", "x"))?; // no-op
            Ok(())
        })
        .unwrap();
        assert_eq!(next.get_at(&path!("counter", "n")), Some(&Value::Int(2)));
    }

    #[test]
    fn test_scope_prefixes_paths_and_errors() {
        let root = Value::from_json(json!({"data": {"items": [1]}}));
        let next = batch(&root, |b| {
            b.scope(&path!("data"), |s| {
                s.add(&path!("items"), 2)?;
                s.set(&path!("flag"), true)
            })
        })
        .unwrap();
        assert_eq!(next.get_at(&path!("data", "items")).unwrap().len(), Some(2));
        assert_eq!(next.get_at(&path!("data", "flag")), Some(&Value::Bool(true)));

        let err = batch(&root, |b| {
            b.scope(&path!("data"), |s| s.add(&path!("ghost"), 1))
        })
        .unwrap_err();
        // the error path includes the scope prefix
        assert_eq!(err.to_string(), "add is not supported on nothing at $.data.ghost");
    }

    #[test]
    fn test_chain_on_live_draft_is_misuse() {
        let root = Value::from_json(json!({"a": {"b": 1}}));
        batch(&root, |b| {
            b.set(&path!("a", "b"), 2)?;
            let captured = b.root().clone();
            let err = crate::cursor::set_in(&captured)
                .field("a")
                .field("b")
                .assign(3)
                .unwrap_err();
            assert!(matches!(err, GraftError::Misuse { .. }));
            Ok(())
        })
        .unwrap();

        // after the batch closes, chains on its result are fine
        let next = batch(&root, |_| Ok(())).unwrap();
        crate::cursor::set_in(&next).field("a").field("b").assign(4).unwrap();
    }

    #[test]
    fn test_remove_value_reports_removal() {
        let root = Value::record([("tags", Value::set(["x", "y"]))]);
        let next = batch(&root, |b| {
            assert!(b.remove_value(&path!("tags"), "x").unwrap());
            assert!(!b.remove_value(&path!("tags"), "zzz").unwrap());
            assert!(!b.remove_value(&path!("ghost"), "x").unwrap());
            Ok(())
        })
        .unwrap();
        assert_eq!(next.get_at(&path!("tags")).unwrap().len(), Some(1));
    }

    #[test]
    fn test_snapshot_observes_mid_session() {
        let root = Value::from_json(json!({"n": 1}));
        batch(&root, |b| {
            b.set(&path!("n"), 2)?;
            let snap = b.snapshot();
            b.set(&path!("n"), 3)?;
            assert_eq!(snap.get_at(&path!("n")), Some(&Value::Int(2)));
            assert_eq!(b.get(&path!("n")), Some(&Value::Int(3)));
            Ok(())
        })
        .unwrap();
    }
}
