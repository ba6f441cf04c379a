//! Dev-mode integrity checking.
//!
//! When dev mode is enabled, every root returned by an engine call is
//! recursively registered as frozen. The container adapter's write path
//! checks the registration and refuses in-place writes to frozen containers,
//! making accidental tampering with engine results loud instead of silent.
//!
//! Registrations hold weak references: once a frozen container is dropped
//! its entry is stale, so a later allocation reusing the same address is not
//! mistaken for it.
//!
//! This is a debugging aid, not required for correctness: copy-on-write
//! already protects shared trees, and with dev mode off nothing is ever
//! registered or checked.

use crate::error::{GraftError, GraftResult};
use crate::path::Path;
use crate::value::{Key, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

static DEV_MODE: AtomicBool = AtomicBool::new(false);

/// A weak handle to a frozen container, keyed by its address.
#[derive(Debug)]
enum FrozenRef {
    Record(Weak<BTreeMap<String, Value>>),
    List(Weak<Vec<Value>>),
    Map(Weak<BTreeMap<Key, Value>>),
    Set(Weak<Vec<Value>>),
}

impl FrozenRef {
    fn of(value: &Value) -> Option<FrozenRef> {
        match value {
            Value::Record(m) => Some(FrozenRef::Record(Arc::downgrade(m))),
            Value::List(v) => Some(FrozenRef::List(Arc::downgrade(v))),
            Value::Map(m) => Some(FrozenRef::Map(Arc::downgrade(m))),
            Value::Set(v) => Some(FrozenRef::Set(Arc::downgrade(v))),
            _ => None,
        }
    }

    /// Whether the frozen allocation is still live.
    fn alive(&self) -> bool {
        match self {
            FrozenRef::Record(w) => w.strong_count() > 0,
            FrozenRef::List(w) => w.strong_count() > 0,
            FrozenRef::Map(w) => w.strong_count() > 0,
            FrozenRef::Set(w) => w.strong_count() > 0,
        }
    }
}

thread_local! {
    // Frozen containers, per thread. Grows while dev mode is on; cleared
    // when it is switched off, and stale entries are pruned on lookup.
    static FROZEN: RefCell<HashMap<usize, FrozenRef>> = RefCell::new(HashMap::new());
}

/// Toggle dev mode for the whole process.
///
/// While enabled, values handed back by engine calls are tamper-evident: a
/// later in-place write to them (through the engine's mutation helpers)
/// raises [`GraftError::Frozen`]. Disabling clears the frozen registry.
pub fn set_dev_mode(enabled: bool) {
    DEV_MODE.store(enabled, Ordering::SeqCst);
    if !enabled {
        FROZEN.with(|f| f.borrow_mut().clear());
    }
}

/// Whether dev mode is currently enabled.
#[inline]
pub fn dev_mode() -> bool {
    DEV_MODE.load(Ordering::Relaxed)
}

/// Recursively register every container in `value` as frozen.
/// No-op when dev mode is off.
pub(crate) fn freeze_tree(value: &Value) {
    if !dev_mode() {
        return;
    }
    FROZEN.with(|f| register(value, &mut f.borrow_mut()));
}

fn register(value: &Value, frozen: &mut HashMap<usize, FrozenRef>) {
    let Some(addr) = value.addr() else { return };
    if let Some(existing) = frozen.get(&addr) {
        if existing.alive() {
            // same live allocation: this subtree is already frozen
            return;
        }
    }
    if let Some(weak) = FrozenRef::of(value) {
        frozen.insert(addr, weak);
    }
    match value {
        Value::Record(m) => m.values().for_each(|v| register(v, frozen)),
        Value::Map(m) => m.values().for_each(|v| register(v, frozen)),
        Value::List(v) | Value::Set(v) => v.iter().for_each(|c| register(c, frozen)),
        _ => {}
    }
}

/// Reject an in-place write to a frozen container. Called by the container
/// adapter before every structural write.
#[inline]
pub(crate) fn deny_write(target: &Value, at: &Path) -> GraftResult<()> {
    if !dev_mode() {
        return Ok(());
    }
    let Some(addr) = target.addr() else {
        return Ok(());
    };
    let frozen = FROZEN.with(|f| {
        let mut map = f.borrow_mut();
        match map.get(&addr) {
            Some(entry) if entry.alive() => true,
            Some(_) => {
                // a dead registration whose address got reused
                map.remove(&addr);
                false
            }
            None => false,
        }
    });
    if frozen {
        Err(GraftError::frozen(at.clone(), target.kind().name()))
    } else {
        Ok(())
    }
}
