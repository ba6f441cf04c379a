//! Pooled path frames and chain bookkeeping.
//!
//! Every navigation chain records its segments into a [`Frame`]. Frames are
//! recycled through a small per-thread pool so steady-state chains allocate
//! nothing; when the pool is empty a transient frame is built on the spot
//! and offered back on release.
//!
//! The same thread-local state tracks which roots currently have a chain in
//! flight. Opening a second chain on a root whose first chain has not been
//! resolved is a misuse, but a chain builder cannot fail; the clash is
//! recorded in the [`ChainGuard`] and surfaced by the terminal call.

use crate::path::Seg;
use crate::value::Value;
use std::cell::RefCell;

/// Frames kept warm per thread.
const POOL_CAPACITY: usize = 4;
/// Segment capacity a fresh frame starts with; deeper chains grow normally.
const PATH_CAPACITY: usize = 8;

/// The operation a chain was opened for. Fixed at entry; the terminal call
/// must match it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OpKind {
    Set,
    Update,
    Mutate,
    Edit,
    Delete,
    Add,
}

impl OpKind {
    pub(crate) fn name(self) -> &'static str {
        match self {
            OpKind::Set => "set",
            OpKind::Update => "update",
            OpKind::Mutate => "mutate",
            OpKind::Edit => "edit",
            OpKind::Delete => "delete",
            OpKind::Add => "add",
        }
    }
}

/// One chain's recorded navigation.
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) steps: Vec<Seg>,
    pub(crate) op: OpKind,
}

thread_local! {
    static POOL: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
    // Container addresses of roots with a chain currently in flight.
    static ACTIVE: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Take a frame from the pool, or build a transient one.
pub(crate) fn acquire(op: OpKind) -> Frame {
    POOL.with(|pool| match pool.borrow_mut().pop() {
        Some(mut frame) => {
            frame.steps.clear();
            frame.op = op;
            frame
        }
        None => Frame {
            steps: Vec::with_capacity(PATH_CAPACITY),
            op,
        },
    })
}

/// Return a frame to the pool. Frames past the pool capacity are dropped.
pub(crate) fn release(frame: Frame) {
    POOL.with(|pool| {
        let mut pool = pool.borrow_mut();
        if pool.len() < POOL_CAPACITY {
            pool.push(frame);
        }
    });
}

/// Registration of a chain against its root, for overlap detection.
///
/// Dropping the guard unregisters the root, on success and error alike.
#[derive(Debug)]
pub(crate) struct ChainGuard {
    addr: Option<usize>,
    /// A misuse detected at entry, reported by the terminal call.
    pub(crate) clash: Option<&'static str>,
}

impl ChainGuard {
    /// Register a chain on `root`. Scalar roots cannot overlap (they have no
    /// shared allocation) and are never registered.
    pub(crate) fn begin(root: &Value) -> ChainGuard {
        let Some(addr) = root.addr() else {
            return ChainGuard {
                addr: None,
                clash: None,
            };
        };
        if crate::batch::is_live_draft(addr) {
            return ChainGuard {
                addr: None,
                clash: Some("root is a live batch draft; go through the batch instead"),
            };
        }
        let clashed = ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&addr) {
                true
            } else {
                active.push(addr);
                false
            }
        });
        if clashed {
            ChainGuard {
                addr: None,
                clash: Some("another chain is already in flight on this root"),
            }
        } else {
            ChainGuard {
                addr: Some(addr),
                clash: None,
            }
        }
    }
}

impl Drop for ChainGuard {
    fn drop(&mut self) {
        if let Some(addr) = self.addr {
            ACTIVE.with(|active| {
                let mut active = active.borrow_mut();
                if let Some(pos) = active.iter().rposition(|a| *a == addr) {
                    active.remove(pos);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pool_recycles_frames() {
        let mut frame = acquire(OpKind::Set);
        frame.steps.push(Seg::field("a"));
        release(frame);

        let frame = acquire(OpKind::Delete);
        // recycled frames come back empty, with the new op
        assert!(frame.steps.is_empty());
        assert_eq!(frame.op, OpKind::Delete);
        release(frame);
    }

    #[test]
    fn test_pool_caps_out() {
        let frames: Vec<Frame> = (0..POOL_CAPACITY + 2).map(|_| acquire(OpKind::Set)).collect();
        for frame in frames {
            release(frame);
        }
        let refill: Vec<Frame> = (0..POOL_CAPACITY + 2).map(|_| acquire(OpKind::Set)).collect();
        assert_eq!(refill.len(), POOL_CAPACITY + 2);
    }

    #[test]
    fn test_overlapping_chains_clash() {
        let root = Value::from_json(json!({"a": 1}));
        let first = ChainGuard::begin(&root);
        assert!(first.clash.is_none());

        let second = ChainGuard::begin(&root);
        assert!(second.clash.is_some());

        drop(second);
        drop(first);
        // resolved: a new chain is fine again
        let third = ChainGuard::begin(&root);
        assert!(third.clash.is_none());
    }

    #[test]
    fn test_distinct_roots_do_not_clash() {
        let a = Value::from_json(json!({"a": 1}));
        let b = Value::from_json(json!({"b": 2}));
        let ga = ChainGuard::begin(&a);
        let gb = ChainGuard::begin(&b);
        assert!(ga.clash.is_none());
        assert!(gb.clash.is_none());
    }
}
