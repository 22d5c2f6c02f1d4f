//! Shared-node values for payloads that may alias or contain themselves.
//!
//! `serde_json::Value` is a strict tree. Step payloads assembled inside the
//! engine are not always trees: the same config object can be attached under
//! several keys, and a context object can end up referring back to itself.
//! [`Payload`] models that with reference-counted containers whose identity is
//! their allocation.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Number, Value};

/// A scalar or a shared container.
///
/// Containers hold strong references to their children, so a cycle keeps
/// every container on it alive after the last outside handle is dropped.
/// Call [`SharedObject::clear`] or [`SharedArray::clear`] on one container of
/// the cycle once the payload is no longer needed.
#[derive(Clone, Debug)]
pub enum Payload {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(SharedArray),
    Object(SharedObject),
}

impl Payload {
    /// Creates an empty shared array.
    pub fn array() -> Self {
        Payload::Array(SharedArray::new())
    }

    /// Creates an empty shared object.
    pub fn object() -> Self {
        Payload::Object(SharedObject::new())
    }

    pub fn as_array(&self) -> Option<&SharedArray> {
        match self {
            Payload::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&SharedObject> {
        match self {
            Payload::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Returns the scalar as a JSON value, or `None` for containers.
    pub fn scalar_value(&self) -> Option<Value> {
        match self {
            Payload::Null => Some(Value::Null),
            Payload::Bool(b) => Some(Value::Bool(*b)),
            Payload::Number(n) => Some(Value::Number(n.clone())),
            Payload::String(s) => Some(Value::String(s.clone())),
            Payload::Array(_) | Payload::Object(_) => None,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Payload::Null,
            Value::Bool(b) => Payload::Bool(b),
            Value::Number(n) => Payload::Number(n),
            Value::String(s) => Payload::String(s),
            Value::Array(items) => {
                let array = SharedArray::new();
                for item in items {
                    array.push(Payload::from(item));
                }
                Payload::Array(array)
            }
            Value::Object(map) => {
                let object = SharedObject::new();
                for (key, value) in map {
                    object.insert(key, Payload::from(value));
                }
                Payload::Object(object)
            }
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::String(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::String(s)
    }
}

impl From<bool> for Payload {
    fn from(b: bool) -> Self {
        Payload::Bool(b)
    }
}

impl From<i64> for Payload {
    fn from(n: i64) -> Self {
        Payload::Number(n.into())
    }
}

impl From<SharedArray> for Payload {
    fn from(array: SharedArray) -> Self {
        Payload::Array(array)
    }
}

impl From<SharedObject> for Payload {
    fn from(object: SharedObject) -> Self {
        Payload::Object(object)
    }
}

// A poisoned lock only means another thread panicked mid-write; the data is
// still a valid list, so keep reading it.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An ordered list shared by reference. Clones alias the same list.
#[derive(Clone, Default)]
pub struct SharedArray(Arc<RwLock<Vec<Payload>>>);

impl SharedArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, value: impl Into<Payload>) {
        write(&self.0).push(value.into());
    }

    pub fn get(&self, index: usize) -> Option<Payload> {
        read(&self.0).get(index).cloned()
    }

    pub fn len(&self) -> usize {
        read(&self.0).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.0).is_empty()
    }

    /// Removes all elements, breaking any cycle that passes through them.
    pub fn clear(&self) {
        let items = std::mem::take(&mut *write(&self.0));
        drop(items);
    }

    /// A copy of the current elements. The lock is released on return.
    pub fn snapshot(&self) -> Vec<Payload> {
        read(&self.0).clone()
    }

    /// Identity of the underlying allocation.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Returns true if both handles point at the same list.
    pub fn ptr_eq(&self, other: &SharedArray) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// Elements may lead back to this array, so Debug never walks them.
impl fmt::Debug for SharedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedArray")
            .field("id", &format_args!("{:#x}", self.id()))
            .field("len", &self.len())
            .finish()
    }
}

/// An insertion-ordered key/value list shared by reference. Clones alias the
/// same object.
#[derive(Clone, Default)]
pub struct SharedObject(Arc<RwLock<Vec<(String, Payload)>>>);

impl SharedObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing an existing entry in place or appending a new one.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Payload>) {
        let key = key.into();
        let value = value.into();
        let mut entries = write(&self.0);
        match entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<Payload> {
        read(&self.0)
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.clone())
    }

    pub fn len(&self) -> usize {
        read(&self.0).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.0).is_empty()
    }

    /// Removes all entries, breaking any cycle that passes through them.
    pub fn clear(&self) {
        // Children are dropped after the write guard is released.
        let entries = std::mem::take(&mut *write(&self.0));
        drop(entries);
    }

    /// A copy of the current entries in insertion order.
    pub fn snapshot(&self) -> Vec<(String, Payload)> {
        read(&self.0).clone()
    }

    /// Identity of the underlying allocation.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Returns true if both handles point at the same object.
    pub fn ptr_eq(&self, other: &SharedObject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SharedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = read(&self.0).iter().map(|(key, _)| key.clone()).collect();
        f.debug_struct("SharedObject")
            .field("id", &format_args!("{:#x}", self.id()))
            .field("keys", &keys)
            .finish()
    }
}
