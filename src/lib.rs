//! Immutable, structurally-shared updates for nested data trees.
//!
//! `graft` edits trees of records, sequences, associative containers and
//! unique-element containers without ever mutating the input: every
//! operation returns a new root, and every subtree the operation did not
//! touch is shared by reference between the old root and the new one.
//! Sharing is real (`Arc` identity, observable via [`Value::ptr_eq`]), so
//! change detection is a pointer comparison.
//!
//! # Chains
//!
//! Single edits go through a navigation chain: an entry function fixes the
//! operation, navigation records the path, a terminal resolves it.
//!
//! ```
//! use graft::{set_in, update_in, Value};
//! use serde_json::json;
//!
//! let root = Value::from_json(json!({"user": {"name": "John"}, "posts": [1, 2]}));
//!
//! let next = set_in(&root).field("user").field("name").assign("Jane").unwrap();
//! assert_eq!(next.get_field("user").unwrap().get_field("name"),
//!            Some(&Value::from("Jane")));
//! // untouched siblings are the same containers, not copies
//! assert!(next.get_field("posts").unwrap().ptr_eq(root.get_field("posts").unwrap()));
//!
//! // tolerant operations turn an absent path into a no-op
//! let out = update_in(&root).field("ghost").field("x").apply(|_| Value::Int(1)).unwrap();
//! assert!(out.is_none());
//! ```
//!
//! # Batches
//!
//! A [`batch`] runs many operations against one working copy with shared
//! clone bookkeeping: each touched container is cloned exactly once no
//! matter how many operations write to it. [`batch_async`] is the same
//! session owned by a future, for work that spans `await` points.
//!
//! ```
//! use graft::{batch, path, Value};
//! use serde_json::json;
//!
//! let root = Value::from_json(json!({"user": {"name": "a", "score": 0}}));
//! let next = batch(&root, |b| {
//!     b.set(&path!("user", "name"), "b")?;
//!     b.update(&path!("user", "score"), |v| {
//!         Value::Int(v.as_int().unwrap_or(0) + 10)
//!     })?;
//!     Ok(())
//! }).unwrap();
//! assert_eq!(next.get_at(&path!("user", "score")), Some(&Value::Int(10)));
//! ```
//!
//! # Stores
//!
//! [`Store`] / [`AsyncStore`] hold a current root; [`patch_do`] /
//! [`patch_do_async`] load it, run a batch and commit the result.
//!
//! # Dev mode
//!
//! [`set_dev_mode`] makes returned roots tamper-evident: in-place writes to
//! them raise [`GraftError::Frozen`] instead of silently aliasing. Leave it
//! off in production; copy-on-write already keeps shared trees safe.

mod adapter;
mod batch;
mod cursor;
mod error;
mod frame;
mod freeze;
mod path;
mod rebuild;
mod registry;
mod store;
mod value;

pub use batch::{batch, batch_async, Batch};
pub use cursor::{add_in, delete_in, edit_in, fork, mutate_in, set_in, update_in, Cursor};
pub use error::{GraftError, GraftResult};
pub use freeze::{dev_mode, set_dev_mode};
pub use path::{Path, Seg};
pub use store::{patch_do, patch_do_async, AsyncStore, MemStore, Store};
pub use value::{Key, Kind, Value};
