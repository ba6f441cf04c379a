//! The tree value model.
//!
//! `Value` covers scalars plus the four container kinds the engine edits:
//! records (fixed string fields), ordered sequences, associative containers
//! (arbitrary runtime keys) and unique-element containers. Containers are
//! `Arc`-wrapped so that untouched subtrees are shared by reference between
//! an input tree and the updated tree returned by the engine.

use crate::error::GraftResult;
use crate::path::{Path, Seg};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A scalar key for associative containers.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    /// String key.
    Str(String),
    /// Integer key.
    Int(i64),
    /// Boolean key.
    Bool(bool),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => write!(f, "{}", s),
            Key::Int(i) => write!(f, "{}", i),
            Key::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Int(i as i64)
    }
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Key::Bool(b)
    }
}

/// The runtime kind of a [`Value`], used in error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Record,
    List,
    Map,
    Set,
}

impl Kind {
    /// Human-readable kind name.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "boolean",
            Kind::Int => "integer",
            Kind::Float => "float",
            Kind::Str => "string",
            Kind::Record => "record",
            Kind::List => "list",
            Kind::Map => "map",
            Kind::Set => "set",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node in a heterogeneous data tree.
///
/// Container variants hold their contents behind an `Arc`; cloning a `Value`
/// is cheap and shares the container. [`Value::ptr_eq`] tests that sharing.
///
/// # Examples
///
/// ```
/// use graft::Value;
/// use serde_json::json;
///
/// let v = Value::from_json(json!({"user": {"name": "John"}, "tags": [1, 2]}));
/// assert_eq!(v.get_field("user").unwrap().get_field("name"),
///            Some(&Value::from("John")));
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    /// Absent / null.
    #[default]
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// String scalar.
    Str(String),
    /// Record: a fixed set of named fields.
    Record(Arc<BTreeMap<String, Value>>),
    /// Ordered sequence.
    List(Arc<Vec<Value>>),
    /// Associative container with arbitrary runtime keys.
    Map(Arc<BTreeMap<Key, Value>>),
    /// Unique-element container, insertion-ordered.
    Set(Arc<Vec<Value>>),
}

impl Value {
    /// Build a record from field/value pairs.
    pub fn record<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Value
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Record(Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// Build an ordered sequence.
    pub fn list<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Value {
        Value::List(Arc::new(items.into_iter().map(Into::into).collect()))
    }

    /// Build an associative container from key/value pairs.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Value
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        Value::Map(Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// Build a unique-element container, dropping duplicates while keeping
    /// first-occurrence order.
    pub fn set<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Value {
        let mut elems: Vec<Value> = Vec::new();
        for item in items {
            let v = item.into();
            if !elems.contains(&v) {
                elems.push(v);
            }
        }
        Value::Set(Arc::new(elems))
    }

    /// The runtime kind of this value.
    #[inline]
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Str(_) => Kind::Str,
            Value::Record(_) => Kind::Record,
            Value::List(_) => Kind::List,
            Value::Map(_) => Kind::Map,
            Value::Set(_) => Kind::Set,
        }
    }

    /// Returns true for the four container kinds.
    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Value::Record(_) | Value::List(_) | Value::Map(_) | Value::Set(_)
        )
    }

    /// Returns true for `Null`.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    // ===== Scalar accessors =====

    /// Get the boolean if this is a `Bool`.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the integer if this is an `Int`.
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the float if this is a `Float` (or an `Int`, widened).
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get the string slice if this is a `Str`.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    // ===== Container accessors =====

    /// Get the field map if this is a record.
    #[inline]
    pub fn as_record(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Record(m) => Some(m),
            _ => None,
        }
    }

    /// Get the elements if this is a list.
    #[inline]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    /// Get the entry map if this is an associative container.
    #[inline]
    pub fn as_map(&self) -> Option<&BTreeMap<Key, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Get the elements if this is a unique-element container.
    #[inline]
    pub fn as_set(&self) -> Option<&[Value]> {
        match self {
            Value::Set(v) => Some(v),
            _ => None,
        }
    }

    /// Read a record field.
    #[inline]
    pub fn get_field(&self, name: &str) -> Option<&Value> {
        self.as_record().and_then(|m| m.get(name))
    }

    /// Read a sequence element.
    #[inline]
    pub fn get_index(&self, i: usize) -> Option<&Value> {
        self.as_list().and_then(|v| v.get(i))
    }

    /// Read an associative-container entry.
    #[inline]
    pub fn get_key(&self, key: &Key) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Number of entries/elements for containers, `None` for scalars.
    #[inline]
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Record(m) => Some(m.len()),
            Value::List(v) => Some(v.len()),
            Value::Map(m) => Some(m.len()),
            Value::Set(v) => Some(v.len()),
            _ => None,
        }
    }

    /// Whether a container is empty; `None` for scalars.
    #[inline]
    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|n| n == 0)
    }

    // ===== Identity & cloning =====

    /// Reference identity: true when both values are the *same* container
    /// (shared `Arc`). Scalars never compare identical.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Record(a), Value::Record(b)) => Arc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Stable address of the container allocation, `None` for scalars.
    pub(crate) fn addr(&self) -> Option<usize> {
        match self {
            Value::Record(m) => Some(Arc::as_ptr(m) as usize),
            Value::List(v) => Some(Arc::as_ptr(v) as usize),
            Value::Map(m) => Some(Arc::as_ptr(m) as usize),
            Value::Set(v) => Some(Arc::as_ptr(v) as usize),
            _ => None,
        }
    }

    /// Copy the container's own entries into a fresh allocation; children
    /// stay shared.
    pub(crate) fn shallow_clone(&self) -> Value {
        match self {
            Value::Record(m) => Value::Record(Arc::new((**m).clone())),
            Value::List(v) => Value::List(Arc::new((**v).clone())),
            Value::Map(m) => Value::Map(Arc::new((**m).clone())),
            Value::Set(v) => Value::Set(Arc::new((**v).clone())),
            other => other.clone(),
        }
    }

    /// Recursively copy every reachable container, fully detaching the
    /// result from the original.
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::Record(m) => Value::Record(Arc::new(
                m.iter().map(|(k, v)| (k.clone(), v.deep_clone())).collect(),
            )),
            Value::List(v) => Value::List(Arc::new(v.iter().map(Value::deep_clone).collect())),
            Value::Map(m) => Value::Map(Arc::new(
                m.iter().map(|(k, v)| (k.clone(), v.deep_clone())).collect(),
            )),
            Value::Set(v) => Value::Set(Arc::new(v.iter().map(Value::deep_clone).collect())),
            other => other.clone(),
        }
    }

    /// Make this container's allocation exclusively owned, cloning it if the
    /// `Arc` is shared. No-op for scalars.
    pub(crate) fn ensure_unique(&mut self) {
        match self {
            Value::Record(m) => {
                Arc::make_mut(m);
            }
            Value::List(v) => {
                Arc::make_mut(v);
            }
            Value::Map(m) => {
                Arc::make_mut(m);
            }
            Value::Set(v) => {
                Arc::make_mut(v);
            }
            _ => {}
        }
    }

    // ===== Copy-on-write mutation =====
    //
    // These route through the container adapter, which enforces kind
    // compatibility and the dev-mode freeze check. Shared children are
    // cloned before being written into (copy-on-write), so sibling trees
    // holding the same Arc are never affected.

    /// Write one record field in place (copy-on-write).
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) -> GraftResult<()> {
        crate::adapter::write(self, &Seg::Field(name.into()), value.into(), &Path::root())
    }

    /// Replace one sequence element in place (copy-on-write).
    pub fn set_index(&mut self, i: usize, value: impl Into<Value>) -> GraftResult<()> {
        crate::adapter::write(self, &Seg::Index(i), value.into(), &Path::root())
    }

    /// Write one associative-container entry in place (copy-on-write).
    pub fn set_key(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> GraftResult<()> {
        crate::adapter::write(self, &Seg::Key(key.into()), value.into(), &Path::root())
    }

    /// Append to a sequence, or insert into a unique-element container.
    pub fn add(&mut self, value: impl Into<Value>) -> GraftResult<()> {
        crate::adapter::add(self, value.into(), &Path::root())
    }

    /// Remove a record field; returns whether it was present.
    pub fn remove_field(&mut self, name: &str) -> GraftResult<bool> {
        crate::adapter::delete(self, &Seg::Field(name.to_owned()), &Path::root())
    }

    /// Remove a sequence element at an index; returns whether it was present.
    pub fn remove_index(&mut self, i: usize) -> GraftResult<bool> {
        crate::adapter::delete(self, &Seg::Index(i), &Path::root())
    }

    /// Remove an associative-container entry; returns whether it was present.
    pub fn remove_key(&mut self, key: &Key) -> GraftResult<bool> {
        crate::adapter::delete(self, &Seg::Key(key.clone()), &Path::root())
    }

    /// Remove the first element equal to `value` from a sequence or
    /// unique-element container; returns whether anything was removed.
    pub fn remove_element(&mut self, value: &Value) -> GraftResult<bool> {
        crate::adapter::remove_value(self, value, &Path::root())
    }

    // ===== Path access =====

    /// Read the value at a path, if every link resolves.
    pub fn get_at(&self, path: &Path) -> Option<&Value> {
        let mut current = self;
        for seg in path.segments() {
            current = crate::adapter::child(current, seg, path).ok().flatten()?;
        }
        Some(current)
    }

    /// Write the value at a path in place (copy-on-write along the way).
    ///
    /// Every segment but the last must resolve; the final field/key is
    /// created if absent.
    pub fn set_at(&mut self, path: &Path, value: impl Into<Value>) -> GraftResult<()> {
        if let crate::rebuild::Probe::Broken { at } =
            crate::rebuild::probe(self, path.segments())?
        {
            return Err(crate::rebuild::broken_error(path.segments(), at));
        }
        let mut registry = crate::registry::CloneRegistry::default();
        crate::rebuild::apply(
            self,
            path.segments(),
            &mut registry,
            crate::rebuild::LeafWrite::Assign(value.into()),
        )
        .map(|_| ())
    }

    /// Delete the value at a path in place; absent paths are a no-op.
    pub fn delete_at(&mut self, path: &Path) -> GraftResult<()> {
        match self.get_at(path) {
            None => Ok(()),
            Some(_) => {
                let mut registry = crate::registry::CloneRegistry::default();
                crate::rebuild::apply(
                    self,
                    path.segments(),
                    &mut registry,
                    crate::rebuild::LeafWrite::Delete,
                )
                .map(|_| ())
            }
        }
    }

    // ===== JSON interop =====

    /// Convert from a `serde_json::Value`. Objects become records and arrays
    /// become lists; use [`Value::map`] / [`Value::set`] to build the two
    /// container kinds JSON cannot express.
    pub fn from_json(v: serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(Arc::new(items.into_iter().map(Value::from_json).collect()))
            }
            serde_json::Value::Object(entries) => Value::Record(Arc::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            )),
        }
    }

    /// Convert to a `serde_json::Value`. Maps become objects with stringified
    /// keys and sets become arrays, so the conversion is lossy for those two
    /// kinds. Non-finite floats become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Record(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::List(v) => serde_json::Value::Array(v.iter().map(Value::to_json).collect()),
            Value::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.to_string(), v.to_json())).collect(),
            ),
            Value::Set(v) => serde_json::Value::Array(v.iter().map(Value::to_json).collect()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Record(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m.iter() {
                    map.serialize_entry(&k.to_string(), v)?;
                }
                map.end()
            }
            Value::List(v) | Value::Set(v) => {
                let mut seq = serializer.serialize_seq(Some(v.len()))?;
                for item in v.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::from_json(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    #[test]
    fn test_from_json_kinds() {
        let v = Value::from_json(json!({"a": 1, "b": [true, null], "c": 1.5, "d": "x"}));
        assert_eq!(v.kind(), Kind::Record);
        assert_eq!(v.get_field("a"), Some(&Value::Int(1)));
        assert_eq!(v.get_field("b").unwrap().kind(), Kind::List);
        assert_eq!(v.get_field("c"), Some(&Value::Float(1.5)));
    }

    #[test]
    fn test_clone_shares_containers() {
        let a = Value::from_json(json!({"x": [1, 2, 3]}));
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(a.get_field("x").unwrap().ptr_eq(b.get_field("x").unwrap()));
    }

    #[test]
    fn test_shallow_clone_shares_children() {
        let a = Value::from_json(json!({"x": [1], "y": [2]}));
        let b = a.shallow_clone();
        assert!(!a.ptr_eq(&b));
        assert!(a.get_field("x").unwrap().ptr_eq(b.get_field("x").unwrap()));
    }

    #[test]
    fn test_deep_clone_detaches_everything() {
        let a = Value::from_json(json!({"x": {"y": [1]}}));
        let b = a.deep_clone();
        assert!(!a.ptr_eq(&b));
        assert!(!a.get_field("x").unwrap().ptr_eq(b.get_field("x").unwrap()));
        assert_eq!(a, b);
    }

    #[test]
    fn test_set_dedupes() {
        let s = Value::set(["a", "b", "a"]);
        assert_eq!(s.len(), Some(2));
    }

    #[test]
    fn test_cow_set_field_leaves_sibling_untouched() {
        let a = Value::from_json(json!({"name": "John"}));
        let mut b = a.clone();
        b.set_field("name", "Jane").unwrap();
        assert_eq!(a.get_field("name"), Some(&Value::from("John")));
        assert_eq!(b.get_field("name"), Some(&Value::from("Jane")));
    }

    #[test]
    fn test_get_at_and_set_at() {
        let mut v = Value::from_json(json!({"a": {"b": [10, 20]}}));
        assert_eq!(v.get_at(&path!("a", "b", 1)), Some(&Value::Int(20)));
        v.set_at(&path!("a", "b", 1), 99).unwrap();
        assert_eq!(v.get_at(&path!("a", "b", 1)), Some(&Value::Int(99)));
    }

    #[test]
    fn test_delete_at_absent_is_noop() {
        let mut v = Value::from_json(json!({"a": 1}));
        v.delete_at(&path!("missing", "deep")).unwrap();
        assert_eq!(v, Value::from_json(json!({"a": 1})));
    }

    #[test]
    fn test_map_and_set_serialize() {
        let m = Value::map([("k", 1i64), ("j", 2i64)]);
        assert_eq!(serde_json::to_value(&m).unwrap(), json!({"j": 2, "k": 1}));
        let s = Value::set([1i64, 2]);
        assert_eq!(serde_json::to_value(&s).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_json_round_trip() {
        let j = json!({"a": {"b": [1, "two", 3.5, null, true]}});
        let v = Value::from_json(j.clone());
        assert_eq!(v.to_json(), j);
    }
}
