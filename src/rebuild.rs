//! Rebuilding a root after a leaf edit.
//!
//! Resolution descends the working root along the recorded segments, asking
//! the clone registry for the (already-cloned-or-newly-cloned) copy of every
//! container on the path, then applies the leaf write through the container
//! adapter. Untouched siblings keep their `Arc`s; the descent produces the
//! minimal set of fresh containers.

use crate::adapter;
use crate::error::{GraftError, GraftResult};
use crate::path::{Path, Seg};
use crate::registry::{CloneDepth, CloneRegistry};
use crate::value::Value;

/// The edit to apply at the end of a path.
pub(crate) enum LeafWrite {
    /// Replace the child at the final segment (created if absent).
    Assign(Value),
    /// Remove the child at the final segment (no-op if absent).
    Delete,
    /// Add values to the sequence or unique-element container at the path.
    Add(Vec<Value>),
    /// Remove the first equal element from the container at the path.
    RemoveValue(Value),
}

/// Apply a leaf write to `root` along `segs`, cloning through the registry.
/// Returns whether anything changed (deletes and removes of absent targets
/// do not).
pub(crate) fn apply(
    root: &mut Value,
    segs: &[Seg],
    registry: &mut CloneRegistry,
    write: LeafWrite,
) -> GraftResult<bool> {
    match write {
        LeafWrite::Assign(value) => {
            let Some((last, parents)) = segs.split_last() else {
                *root = value;
                return Ok(true);
            };
            let parent = descend(root, parents, registry)?;
            registry.obtain(parent, CloneDepth::Shallow);
            adapter::write(parent, last, value, &prefix(segs, parents.len()))?;
            Ok(true)
        }
        LeafWrite::Delete => {
            let Some((last, parents)) = segs.split_last() else {
                // deleting the root leaves nothing behind
                *root = Value::Null;
                return Ok(true);
            };
            let parent = descend(root, parents, registry)?;
            registry.obtain(parent, CloneDepth::Shallow);
            adapter::delete(parent, last, &prefix(segs, parents.len()))
        }
        LeafWrite::Add(values) => {
            let target = descend(root, segs, registry)?;
            registry.obtain(target, CloneDepth::Shallow);
            let at = prefix(segs, segs.len());
            for value in values {
                adapter::add(target, value, &at)?;
            }
            Ok(true)
        }
        LeafWrite::RemoveValue(value) => {
            let target = descend(root, segs, registry)?;
            registry.obtain(target, CloneDepth::Shallow);
            adapter::remove_value(target, &value, &prefix(segs, segs.len()))
        }
    }
}

/// Descend to the subtree at `segs`, clone it at `depth` through the
/// registry, and hand it to the callback as a draft.
pub(crate) fn mutate_at(
    root: &mut Value,
    segs: &[Seg],
    registry: &mut CloneRegistry,
    depth: CloneDepth,
    f: impl FnOnce(&mut Value),
) -> GraftResult<()> {
    let target = descend(root, segs, registry)?;
    registry.obtain(target, depth);
    f(target);
    Ok(())
}

/// Walk down `segs`, cloning every container on the way via the registry.
/// Every segment must resolve; an absent link is a path error here (callers
/// that tolerate absence probe first).
fn descend<'a>(
    root: &'a mut Value,
    segs: &[Seg],
    registry: &mut CloneRegistry,
) -> GraftResult<&'a mut Value> {
    let mut current = root;
    for (i, seg) in segs.iter().enumerate() {
        registry.obtain(current, CloneDepth::Shallow);
        let at = prefix(segs, i);
        match adapter::child_mut(current, seg, &at)? {
            Some(child) => current = child,
            None => return Err(GraftError::path_error(at, seg.clone(), "nothing")),
        }
    }
    Ok(current)
}

/// Outcome of resolving a path against a live root without editing it.
pub(crate) enum Probe<'a> {
    /// Every link resolved.
    Present(&'a Value),
    /// Only the final segment was absent; the parents are intact.
    AbsentLeaf,
    /// An intermediate link was absent: the child at `segs[at]` is missing.
    Broken { at: usize },
}

/// Resolve `segs` against `root` read-only, distinguishing a missing leaf
/// from a broken intermediate link. Hard faults (reading through a scalar,
/// wrong access kind) are errors.
pub(crate) fn probe<'a>(root: &'a Value, segs: &[Seg]) -> GraftResult<Probe<'a>> {
    let mut current = root;
    for (i, seg) in segs.iter().enumerate() {
        let at = prefix(segs, i);
        match adapter::child(current, seg, &at)? {
            Some(child) => current = child,
            None if i + 1 == segs.len() => return Ok(Probe::AbsentLeaf),
            None => return Ok(Probe::Broken { at: i }),
        }
    }
    Ok(Probe::Present(current))
}

/// The path error for a chain that kept reading past a broken link: the
/// read of `segs[at + 1]` found nothing at `segs[..=at]`.
pub(crate) fn broken_error(segs: &[Seg], at: usize) -> GraftError {
    GraftError::path_error(
        Path::from_segments(segs[..=at].to_vec()),
        segs[at + 1].clone(),
        "nothing",
    )
}

#[inline]
fn prefix(segs: &[Seg], n: usize) -> Path {
    Path::from_segments(segs[..n].to_vec())
}
