//! Per-batch clone bookkeeping.
//!
//! The registry guarantees that within one logical batch a given container
//! is cloned at most once: the first write detaches a fresh copy and
//! registers its address, and every later write to the same container finds
//! the address and mutates the existing copy in place. A deep request over
//! an earlier shallow entry upgrades that entry in place (its children are
//! recursively detached) instead of producing a second clone.
//!
//! One registry lives for one entry operation, or for one whole batch; it
//! is dropped on success and on error alike.

use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// How much of a container a clone request covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum CloneDepth {
    /// Copy the container's own entries; children stay shared.
    Shallow,
    /// Recursively copy every reachable container.
    Deep,
}

/// Tracks which containers have already been detached during one batch.
#[derive(Debug, Default)]
pub(crate) struct CloneRegistry {
    /// Clone address -> depth it was produced at.
    entries: HashMap<usize, CloneDepth>,
    /// Containers cloned from an original (upgrades do not count).
    clone_count: usize,
}

impl CloneRegistry {
    /// Number of original containers detached so far.
    #[inline]
    pub(crate) fn clone_count(&self) -> usize {
        self.clone_count
    }

    /// Make `slot` an exclusively-owned clone at `depth`, reusing the clone
    /// from an earlier write to the same container when there is one.
    ///
    /// Scalars pass through untouched.
    pub(crate) fn obtain(&mut self, slot: &mut Value, depth: CloneDepth) {
        let Some(addr) = slot.addr() else { return };
        match self.entries.get(&addr).copied() {
            Some(have) => {
                // Already our clone from this batch. A callback may still
                // hold a handle to it, so re-assert exclusivity; the address
                // only changes in that (rare) case.
                slot.ensure_unique();
                let Some(now) = slot.addr() else { return };
                if now != addr {
                    self.entries.remove(&addr);
                }
                if depth > have {
                    self.deepen_children(slot);
                    self.entries.insert(now, CloneDepth::Deep);
                } else {
                    self.entries.insert(now, have);
                }
            }
            None => {
                let clone = match depth {
                    CloneDepth::Shallow => slot.shallow_clone(),
                    CloneDepth::Deep => self.deep_clone_registered(slot),
                };
                *slot = clone;
                if let Some(now) = slot.addr() {
                    self.entries.insert(now, depth);
                }
                self.clone_count += 1;
            }
        }
    }

    /// Deep-clone `value`, registering every produced container as `Deep`
    /// so later writes inside the cloned subtree reuse it directly.
    fn deep_clone_registered(&mut self, value: &Value) -> Value {
        let clone = match value {
            Value::Record(m) => Value::Record(Arc::new(
                m.iter()
                    .map(|(k, v)| (k.clone(), self.deep_clone_registered(v)))
                    .collect(),
            )),
            Value::Map(m) => Value::Map(Arc::new(
                m.iter()
                    .map(|(k, v)| (k.clone(), self.deep_clone_registered(v)))
                    .collect(),
            )),
            Value::List(v) => Value::List(Arc::new(
                v.iter().map(|c| self.deep_clone_registered(c)).collect(),
            )),
            Value::Set(v) => Value::Set(Arc::new(
                v.iter().map(|c| self.deep_clone_registered(c)).collect(),
            )),
            other => return other.clone(),
        };
        if let Some(addr) = clone.addr() {
            self.entries.insert(addr, CloneDepth::Deep);
        }
        clone
    }

    /// Upgrade an exclusively-owned shallow clone to deep by detaching its
    /// children in place.
    fn deepen_children(&mut self, value: &mut Value) {
        match value {
            Value::Record(m) => {
                for child in Arc::make_mut(m).values_mut() {
                    self.deepen_child(child);
                }
            }
            Value::Map(m) => {
                for child in Arc::make_mut(m).values_mut() {
                    self.deepen_child(child);
                }
            }
            Value::List(v) | Value::Set(v) => {
                for child in Arc::make_mut(v).iter_mut() {
                    self.deepen_child(child);
                }
            }
            _ => {}
        }
    }

    fn deepen_child(&mut self, child: &mut Value) {
        let Some(addr) = child.addr() else { return };
        match self.entries.get(&addr).copied() {
            Some(CloneDepth::Deep) => {}
            Some(CloneDepth::Shallow) => {
                // In-place upgrade of a clone this batch already produced.
                child.ensure_unique();
                let Some(now) = child.addr() else { return };
                if now != addr {
                    self.entries.remove(&addr);
                }
                self.deepen_children(child);
                self.entries.insert(now, CloneDepth::Deep);
            }
            None => {
                let taken = std::mem::take(child);
                *child = self.deep_clone_registered(&taken);
            }
        }
    }
}
