//! Per-kind container primitives.
//!
//! The adapter is the single place that knows how each container kind reads,
//! writes, deletes and clones. Everything above it (cursors, batches, the
//! rebuild walk) is kind-agnostic.
//!
//! Error split: reading through a scalar or null is a [`GraftError::Path`]
//! (there is nothing to descend into), while using the wrong access kind on
//! a container (indexing a record, key-addressing a list) is a
//! [`GraftError::Kind`].

use crate::error::{GraftError, GraftResult};
use crate::freeze;
use crate::path::{Path, Seg};
use crate::value::Value;
use std::sync::Arc;

/// Read one step into a container.
///
/// Returns `Ok(None)` when the key/index itself is absent (an optional
/// link), and an error when the step can never succeed on this value.
pub(crate) fn child<'a>(parent: &'a Value, seg: &Seg, at: &Path) -> GraftResult<Option<&'a Value>> {
    match (parent, seg) {
        (Value::Record(m), Seg::Field(name)) => Ok(m.get(name)),
        (Value::List(v), Seg::Index(i)) => Ok(v.get(*i)),
        (Value::Map(m), Seg::Key(k)) => Ok(m.get(k)),
        (parent, seg) if parent.is_container() => Err(GraftError::kind_error(
            at.clone(),
            seg.access_name(),
            parent.kind().name(),
        )),
        (parent, seg) => Err(GraftError::path_error(
            at.clone(),
            seg.clone(),
            parent.kind().name(),
        )),
    }
}

/// Read one step into a container, mutably. Shared children are detached
/// copy-on-write before the reference is handed out.
pub(crate) fn child_mut<'a>(
    parent: &'a mut Value,
    seg: &Seg,
    at: &Path,
) -> GraftResult<Option<&'a mut Value>> {
    match (parent, seg) {
        (Value::Record(m), Seg::Field(name)) => Ok(Arc::make_mut(m).get_mut(name)),
        (Value::List(v), Seg::Index(i)) => Ok(Arc::make_mut(v).get_mut(*i)),
        (Value::Map(m), Seg::Key(k)) => Ok(Arc::make_mut(m).get_mut(k)),
        (parent, seg) if parent.is_container() => Err(GraftError::kind_error(
            at.clone(),
            seg.access_name(),
            parent.kind().name(),
        )),
        (parent, seg) => Err(GraftError::path_error(
            at.clone(),
            seg.clone(),
            parent.kind().name(),
        )),
    }
}

/// Write one child. Record fields and map keys are created if absent; a
/// list index must be in bounds (index == len appends). Sets have no
/// positional write.
pub(crate) fn write(parent: &mut Value, seg: &Seg, value: Value, at: &Path) -> GraftResult<()> {
    freeze::deny_write(parent, at)?;
    match (parent, seg) {
        (Value::Record(m), Seg::Field(name)) => {
            Arc::make_mut(m).insert(name.clone(), value);
            Ok(())
        }
        (Value::Map(m), Seg::Key(k)) => {
            Arc::make_mut(m).insert(k.clone(), value);
            Ok(())
        }
        (Value::List(v), Seg::Index(i)) => {
            let items = Arc::make_mut(v);
            if *i < items.len() {
                items[*i] = value;
                Ok(())
            } else if *i == items.len() {
                items.push(value);
                Ok(())
            } else {
                Err(GraftError::index_out_of_bounds(at.clone(), *i, items.len()))
            }
        }
        (parent, seg) if parent.is_container() => Err(GraftError::kind_error(
            at.clone(),
            seg.access_name(),
            parent.kind().name(),
        )),
        (parent, seg) => Err(GraftError::path_error(
            at.clone(),
            seg.clone(),
            parent.kind().name(),
        )),
    }
}

/// Remove one child. Returns whether anything was removed; absent keys and
/// past-the-end indexes are a no-op.
pub(crate) fn delete(parent: &mut Value, seg: &Seg, at: &Path) -> GraftResult<bool> {
    freeze::deny_write(parent, at)?;
    match (parent, seg) {
        (Value::Record(m), Seg::Field(name)) => Ok(Arc::make_mut(m).remove(name).is_some()),
        (Value::Map(m), Seg::Key(k)) => Ok(Arc::make_mut(m).remove(k).is_some()),
        (Value::List(v), Seg::Index(i)) => {
            let items = Arc::make_mut(v);
            if *i < items.len() {
                items.remove(*i);
                Ok(true)
            } else {
                Ok(false)
            }
        }
        (parent, seg) if parent.is_container() => Err(GraftError::kind_error(
            at.clone(),
            seg.access_name(),
            parent.kind().name(),
        )),
        (parent, seg) => Err(GraftError::path_error(
            at.clone(),
            seg.clone(),
            parent.kind().name(),
        )),
    }
}

/// Append to a sequence, or insert into a unique-element container
/// (idempotent: an element already present is left alone).
pub(crate) fn add(container: &mut Value, value: Value, at: &Path) -> GraftResult<()> {
    freeze::deny_write(container, at)?;
    match container {
        Value::List(v) => {
            Arc::make_mut(v).push(value);
            Ok(())
        }
        Value::Set(v) => {
            if !v.contains(&value) {
                Arc::make_mut(v).push(value);
            }
            Ok(())
        }
        other => Err(GraftError::kind_error(
            at.clone(),
            "add",
            other.kind().name(),
        )),
    }
}

/// Whether removing `value` from `container` would change nothing: a
/// sequence or unique-element container with no equal element. Wrong kinds
/// report `false` so the write path gets to raise its kind error.
pub(crate) fn remove_is_noop(container: &Value, value: &Value) -> bool {
    match container {
        Value::List(v) | Value::Set(v) => !v.contains(value),
        _ => false,
    }
}

/// Remove the first element equal to `value` from a sequence or
/// unique-element container. Returns whether anything was removed.
pub(crate) fn remove_value(container: &mut Value, value: &Value, at: &Path) -> GraftResult<bool> {
    freeze::deny_write(container, at)?;
    match container {
        Value::List(v) | Value::Set(v) => {
            if let Some(pos) = v.iter().position(|e| e == value) {
                Arc::make_mut(v).remove(pos);
                Ok(true)
            } else {
                Ok(false)
            }
        }
        other => Err(GraftError::kind_error(
            at.clone(),
            "remove by value",
            other.kind().name(),
        )),
    }
}
