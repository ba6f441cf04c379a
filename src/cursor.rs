//! Navigation chains over an immutable root.
//!
//! A chain is opened by one of the entry functions ([`set_in`], [`update_in`],
//! [`mutate_in`], [`edit_in`], [`delete_in`], [`add_in`]), navigated with
//! [`Cursor::field`] / [`Cursor::index`] / [`Cursor::key`], and resolved by a
//! terminal call that returns a new root sharing every untouched subtree with
//! the original.
//!
//! Navigation is validated eagerly: each step is checked as it is recorded.
//! An absent link is remembered rather than raised, because strict and
//! tolerant terminals treat it differently; a hard fault (descending into a
//! scalar, wrong access kind) is remembered and returned by whichever
//! terminal resolves the chain. Builders themselves never fail.

use crate::adapter;
use crate::error::{GraftError, GraftResult};
use crate::frame::{self, ChainGuard, Frame, OpKind};
use crate::freeze;
use crate::path::{Path, Seg};
use crate::rebuild::{self, LeafWrite};
use crate::registry::{CloneDepth, CloneRegistry};
use crate::value::{Key, Value};

/// Open a chain that will replace the value at its path.
///
/// The terminal is [`Cursor::assign`] or [`Cursor::assign_with`]. Every
/// segment but the last must resolve; the final field or key is created if
/// absent.
///
/// # Examples
///
/// ```
/// use graft::{set_in, Value};
/// use serde_json::json;
///
/// let root = Value::from_json(json!({"user": {"name": "John"}}));
/// let next = set_in(&root).field("user").field("name").assign("Jane").unwrap();
/// assert_eq!(next.get_field("user").unwrap().get_field("name"),
///            Some(&Value::from("Jane")));
/// // the original is untouched
/// assert_eq!(root.get_field("user").unwrap().get_field("name"),
///            Some(&Value::from("John")));
/// ```
pub fn set_in(root: &Value) -> Cursor<'_> {
    Cursor::begin(root, OpKind::Set)
}

/// Alias for [`set_in`]; reads better when the chain computes its value
/// with [`Cursor::assign_with`].
pub fn fork(root: &Value) -> Cursor<'_> {
    set_in(root)
}

/// Open a chain that will transform the value at its path.
///
/// The terminal is [`Cursor::apply`]. A broken intermediate link makes the
/// whole operation a no-op (`Ok(None)`); a missing *final* link hands the
/// callback [`Value::Null`] and stores its result.
pub fn update_in(root: &Value) -> Cursor<'_> {
    Cursor::begin(root, OpKind::Update)
}

/// Open a chain that will hand out a shallow draft of the subtree at its
/// path.
///
/// The terminal is [`Cursor::mutate`]. The draft's own entries may be
/// mutated freely; children the callback does not touch stay shared with
/// the original. An absent target makes the operation a no-op (`Ok(None)`).
pub fn mutate_in(root: &Value) -> Cursor<'_> {
    Cursor::begin(root, OpKind::Mutate)
}

/// Open a chain that will hand out a fully-detached deep draft of the
/// subtree at its path.
///
/// Like [`mutate_in`] but the draft shares nothing with the original, so
/// the callback may restructure it arbitrarily.
pub fn edit_in(root: &Value) -> Cursor<'_> {
    Cursor::begin(root, OpKind::Edit)
}

/// Open a chain that will remove the value at its path.
///
/// The terminal is [`Cursor::delete`] or [`Cursor::remove_value`]. Absent
/// paths are a no-op: the returned root is the original, shared.
pub fn delete_in(root: &Value) -> Cursor<'_> {
    Cursor::begin(root, OpKind::Delete)
}

/// Open a chain that will add elements to the sequence or unique-element
/// container at its path.
///
/// The terminal is [`Cursor::add`] or [`Cursor::add_all`]. The container
/// must exist.
pub fn add_in(root: &Value) -> Cursor<'_> {
    Cursor::begin(root, OpKind::Add)
}

/// An in-flight navigation chain. See the [module docs](self) and the entry
/// functions for semantics.
#[derive(Debug)]
pub struct Cursor<'a> {
    root: &'a Value,
    frame: Option<Frame>,
    guard: ChainGuard,
    /// Where navigation currently stands; `None` after a break or fault.
    node: Option<&'a Value>,
    /// Index of the first segment whose link was absent.
    broke_at: Option<usize>,
    /// First hard navigation error, surfaced at the terminal.
    fault: Option<GraftError>,
}

impl<'a> Cursor<'a> {
    fn begin(root: &'a Value, op: OpKind) -> Cursor<'a> {
        Cursor {
            root,
            frame: Some(frame::acquire(op)),
            guard: ChainGuard::begin(root),
            node: Some(root),
            broke_at: None,
            fault: None,
        }
    }

    // ===== Navigation =====

    /// Step into a record field.
    pub fn field(self, name: impl Into<String>) -> Self {
        self.step(Seg::Field(name.into()))
    }

    /// Step into a sequence element.
    pub fn index(self, i: usize) -> Self {
        self.step(Seg::Index(i))
    }

    /// Step into an associative-container entry.
    pub fn key(self, k: impl Into<Key>) -> Self {
        self.step(Seg::Key(k.into()))
    }

    /// Follow every segment of a pre-built path.
    pub fn at(self, path: &Path) -> Self {
        path.iter().cloned().fold(self, Cursor::step)
    }

    fn step(mut self, seg: Seg) -> Self {
        if self.fault.is_none() && self.broke_at.is_none() {
            if let Some(node) = self.node {
                let i = self.steps().len();
                let at = Path::from_segments(self.steps().to_vec());
                match adapter::child(node, &seg, &at) {
                    Ok(Some(child)) => self.node = Some(child),
                    Ok(None) => {
                        self.node = None;
                        self.broke_at = Some(i);
                    }
                    Err(err) => {
                        self.node = None;
                        self.fault = Some(err);
                    }
                }
            }
        }
        if let Some(frame) = self.frame.as_mut() {
            frame.steps.push(seg);
        }
        self
    }

    // ===== Terminals =====

    /// Replace the value at the chain's path, returning the new root.
    pub fn assign(mut self, value: impl Into<Value>) -> GraftResult<Value> {
        self.check(&[OpKind::Set], "assign")?;
        self.require_parents_intact()?;
        self.resolve(LeafWrite::Assign(value.into()))
    }

    /// Replace the value at the chain's path with one computed from the
    /// current value ([`Value::Null`] when the final link is absent).
    pub fn assign_with(mut self, f: impl FnOnce(&Value) -> Value) -> GraftResult<Value> {
        self.check(&[OpKind::Set], "assign")?;
        self.require_parents_intact()?;
        let next = f(self.node.unwrap_or(&Value::Null));
        self.resolve(LeafWrite::Assign(next))
    }

    /// Transform the value at the chain's path.
    ///
    /// Returns `Ok(None)` without touching anything when an intermediate
    /// link was absent. A missing final link hands `f` a [`Value::Null`].
    pub fn apply(mut self, f: impl FnOnce(&Value) -> Value) -> GraftResult<Option<Value>> {
        self.check(&[OpKind::Update], "apply")?;
        if let Some(at) = self.broke_at {
            if at + 1 < self.steps().len() {
                return Ok(None);
            }
        }
        let next = f(self.node.unwrap_or(&Value::Null));
        self.resolve(LeafWrite::Assign(next)).map(Some)
    }

    /// Hand a draft of the subtree at the chain's path to `f`.
    ///
    /// The draft is shallow for a [`mutate_in`] chain and deep for an
    /// [`edit_in`] chain. Returns `Ok(None)` when the target is absent.
    pub fn mutate(mut self, f: impl FnOnce(&mut Value)) -> GraftResult<Option<Value>> {
        self.check(&[OpKind::Mutate, OpKind::Edit], "mutate")?;
        if self.broke_at.is_some() {
            return Ok(None);
        }
        let depth = match self.op() {
            OpKind::Edit => CloneDepth::Deep,
            _ => CloneDepth::Shallow,
        };
        let mut work = self.root.clone();
        let mut registry = CloneRegistry::default();
        rebuild::mutate_at(&mut work, self.steps(), &mut registry, depth, f)?;
        freeze::freeze_tree(&work);
        Ok(Some(work))
    }

    /// Remove the value at the chain's path. Absent paths are a no-op: the
    /// original root comes back, shared.
    pub fn delete(mut self) -> GraftResult<Value> {
        self.check(&[OpKind::Delete], "delete")?;
        if self.broke_at.is_some() {
            freeze::freeze_tree(self.root);
            return Ok(self.root.clone());
        }
        self.resolve(LeafWrite::Delete)
    }

    /// Remove the first element equal to `value` from the container at the
    /// chain's path. An absent container or element is a no-op.
    pub fn remove_value(mut self, value: impl Into<Value>) -> GraftResult<Value> {
        self.check(&[OpKind::Delete], "delete")?;
        let value = value.into();
        let noop = self.broke_at.is_some()
            || self
                .node
                .is_some_and(|node| adapter::remove_is_noop(node, &value));
        if noop {
            freeze::freeze_tree(self.root);
            return Ok(self.root.clone());
        }
        self.resolve(LeafWrite::RemoveValue(value))
    }

    /// Add one element to the container at the chain's path.
    pub fn add(self, value: impl Into<Value>) -> GraftResult<Value> {
        self.add_all([value.into()])
    }

    /// Add several elements to the container at the chain's path.
    pub fn add_all<V: Into<Value>>(
        mut self,
        values: impl IntoIterator<Item = V>,
    ) -> GraftResult<Value> {
        self.check(&[OpKind::Add], "add")?;
        if let Some(at) = self.broke_at {
            if at + 1 < self.steps().len() {
                return Err(rebuild::broken_error(self.steps(), at));
            }
            // the container itself is absent
            return Err(GraftError::kind_error(
                Path::from_segments(self.steps().to_vec()),
                "add",
                "nothing",
            ));
        }
        self.resolve(LeafWrite::Add(values.into_iter().map(Into::into).collect()))
    }

    // ===== Internals =====

    #[inline]
    fn steps(&self) -> &[Seg] {
        self.frame.as_ref().map(|f| f.steps.as_slice()).unwrap_or(&[])
    }

    #[inline]
    fn op(&self) -> OpKind {
        self.frame.as_ref().map(|f| f.op).unwrap_or(OpKind::Set)
    }

    /// Entry-time and navigation-time failures, surfaced in order: chain
    /// overlap, then entry/terminal mismatch, then the recorded fault.
    fn check(&mut self, allowed: &[OpKind], terminal: &'static str) -> GraftResult<()> {
        if let Some(message) = self.guard.clash {
            return Err(GraftError::misuse(message));
        }
        let op = self.op();
        if !allowed.contains(&op) {
            return Err(GraftError::misuse(format!(
                "chain opened for {} resolved with {}",
                op.name(),
                terminal
            )));
        }
        if let Some(err) = self.fault.take() {
            return Err(err);
        }
        Ok(())
    }

    /// Strict terminals require every segment before the last to resolve.
    fn require_parents_intact(&self) -> GraftResult<()> {
        match self.broke_at {
            Some(at) if at + 1 < self.steps().len() => {
                Err(rebuild::broken_error(self.steps(), at))
            }
            _ => Ok(()),
        }
    }

    fn resolve(&self, write: LeafWrite) -> GraftResult<Value> {
        let mut work = self.root.clone();
        let mut registry = CloneRegistry::default();
        rebuild::apply(&mut work, self.steps(), &mut registry, write)?;
        freeze::freeze_tree(&work);
        Ok(work)
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        if let Some(frame) = self.frame.take() {
            frame::release(frame);
        }
    }
}
