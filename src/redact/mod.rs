//! Sensitive-data redaction for step payloads
//!
//! Before a failed step's input or configuration is stored in the dead-letter
//! queue or shown to an operator, every value under a sensitive-looking key
//! is replaced by [`REDACTED_SENTINEL`]. Matching is a deliberately broad
//! substring test on the normalized key: `access_granted_at` is masked too.
//!
//! The walk uses an explicit work stack, so payload depth is bounded by heap
//! rather than by the call stack. Containers on the current path are tracked
//! by identity; meeting one again means the payload refers back to itself and
//! that position becomes [`CIRCULAR_SENTINEL`]. A container reached twice via
//! separate branches is not a cycle and is redacted at both places.

pub mod payload;

use std::collections::HashSet;
use std::sync::OnceLock;

use serde_json::{Map, Value};

use crate::config::RedactionSettings;

pub use payload::{Payload, SharedArray, SharedObject};

/// Replaces values stored under sensitive keys.
pub const REDACTED_SENTINEL: &str = "[REDACTED]";

/// Replaces a container that already appears on the path leading to it.
pub const CIRCULAR_SENTINEL: &str = "[CIRCULAR]";

/// Key fragments that mark a value as sensitive.
pub const SENSITIVE_KEY_FRAGMENTS: [&str; 12] = [
    "password",
    "token",
    "secret",
    "api_key",
    "apikey",
    "authorization",
    "cookie",
    "access",
    "refresh",
    "credential",
    "client_secret",
    "private_key",
];

/// One level of a value, as seen by the redaction walk.
pub enum Shape<N> {
    /// A leaf, copied to the output as-is.
    Scalar(Value),
    /// An ordered sequence; `id` is the container's identity.
    Sequence { id: usize, items: Vec<N> },
    /// A keyed mapping in iteration order; `id` is the container's identity.
    Mapping { id: usize, entries: Vec<(String, N)> },
}

/// A value the redactor can walk.
pub trait Redactable: Sized {
    /// Exposes this node's immediate children.
    fn shape(&self) -> Shape<Self>;
}

impl<'a> Redactable for &'a Value {
    fn shape(&self) -> Shape<Self> {
        let id = *self as *const Value as usize;
        match *self {
            Value::Array(items) => Shape::Sequence {
                id,
                items: items.iter().collect(),
            },
            Value::Object(map) => Shape::Mapping {
                id,
                entries: map.iter().map(|(key, value)| (key.clone(), value)).collect(),
            },
            scalar => Shape::Scalar(scalar.clone()),
        }
    }
}

impl Redactable for Payload {
    fn shape(&self) -> Shape<Self> {
        match self {
            Payload::Array(array) => Shape::Sequence {
                id: array.id(),
                items: array.snapshot(),
            },
            Payload::Object(object) => Shape::Mapping {
                id: object.id(),
                entries: object.snapshot(),
            },
            scalar => Shape::Scalar(scalar.scalar_value().unwrap_or(Value::Null)),
        }
    }
}

/// A container whose children are still being redacted.
enum Frame<N> {
    Sequence {
        id: usize,
        items: std::vec::IntoIter<N>,
        out: Vec<Value>,
    },
    Mapping {
        id: usize,
        entries: std::vec::IntoIter<(String, N)>,
        /// Key awaiting the redacted value of the child being walked.
        pending: Option<String>,
        out: Map<String, Value>,
    },
}

impl<N> Frame<N> {
    fn id(&self) -> usize {
        match self {
            Frame::Sequence { id, .. } | Frame::Mapping { id, .. } => *id,
        }
    }

    fn accept(&mut self, value: Value) {
        match self {
            Frame::Sequence { out, .. } => out.push(value),
            Frame::Mapping { out, pending, .. } => {
                if let Some(key) = pending.take() {
                    out.insert(key, value);
                }
            }
        }
    }

    fn into_value(self) -> Value {
        match self {
            Frame::Sequence { out, .. } => Value::Array(out),
            Frame::Mapping { out, .. } => Value::Object(out),
        }
    }
}

/// Masks values under sensitive keys.
#[derive(Debug, Clone)]
pub struct Redactor {
    /// Lower-cased key fragments.
    fragments: Vec<String>,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Redactor {
    /// Creates a redactor with the built-in key fragments.
    pub fn new() -> Self {
        Self {
            fragments: SENSITIVE_KEY_FRAGMENTS
                .iter()
                .map(|fragment| fragment.to_string())
                .collect(),
        }
    }

    /// Creates a redactor that also masks the configured extra fragments.
    /// The built-in fragments always apply.
    pub fn with_settings(settings: &RedactionSettings) -> Self {
        let mut redactor = Self::new();
        for extra in &settings.extra_sensitive_keys {
            let fragment = extra.trim().to_lowercase();
            if !fragment.is_empty() && !redactor.fragments.contains(&fragment) {
                redactor.fragments.push(fragment);
            }
        }
        redactor
    }

    /// The lower-cased fragments a key is tested against.
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Returns true if the trimmed, lower-cased key contains any fragment.
    pub fn is_sensitive_key(&self, key: &str) -> bool {
        let key = key.trim().to_lowercase();
        self.fragments
            .iter()
            .any(|fragment| key.contains(fragment.as_str()))
    }

    /// Returns a redacted copy of a JSON tree.
    pub fn redact_value(&self, value: &Value) -> Value {
        self.redact_node(value)
    }

    /// Returns a redacted tree built from a payload graph. Cycles become
    /// [`CIRCULAR_SENTINEL`]; the graph itself is left untouched.
    pub fn redact_payload(&self, payload: &Payload) -> Value {
        self.redact_node(payload.clone())
    }

    /// Walks any redactable node and builds the redacted copy.
    pub fn redact_node<N: Redactable>(&self, root: N) -> Value {
        // Identities of the containers between the root and the current node.
        let mut path: HashSet<usize> = HashSet::new();
        let mut stack: Vec<Frame<N>> = Vec::new();

        if let Some(value) = self.enter(root, &mut path, &mut stack) {
            return value;
        }

        let mut output = Value::Null;
        while let Some(frame) = stack.last_mut() {
            let value = match self.next_child(frame) {
                Some(child) => match self.enter(child, &mut path, &mut stack) {
                    Some(value) => value,
                    None => continue,
                },
                None => {
                    let Some(done) = stack.pop() else { break };
                    path.remove(&done.id());
                    done.into_value()
                }
            };

            match stack.last_mut() {
                Some(parent) => parent.accept(value),
                None => output = value,
            }
        }

        output
    }

    /// Returns the finished value for scalars and cycles, or pushes a frame
    /// for a container that still has to be walked.
    fn enter<N: Redactable>(
        &self,
        node: N,
        path: &mut HashSet<usize>,
        stack: &mut Vec<Frame<N>>,
    ) -> Option<Value> {
        match node.shape() {
            Shape::Scalar(value) => Some(value),
            Shape::Sequence { id, items } => {
                if !path.insert(id) {
                    tracing::debug!(depth = stack.len(), "circular reference in payload");
                    return Some(Value::String(CIRCULAR_SENTINEL.to_string()));
                }
                stack.push(Frame::Sequence {
                    id,
                    out: Vec::with_capacity(items.len()),
                    items: items.into_iter(),
                });
                None
            }
            Shape::Mapping { id, entries } => {
                if !path.insert(id) {
                    tracing::debug!(depth = stack.len(), "circular reference in payload");
                    return Some(Value::String(CIRCULAR_SENTINEL.to_string()));
                }
                stack.push(Frame::Mapping {
                    id,
                    out: Map::with_capacity(entries.len()),
                    entries: entries.into_iter(),
                    pending: None,
                });
                None
            }
        }
    }

    /// Advances a frame to its next child that needs walking. Sensitive keys
    /// are masked on the spot and never descended into.
    fn next_child<N>(&self, frame: &mut Frame<N>) -> Option<N> {
        match frame {
            Frame::Sequence { items, .. } => items.next(),
            Frame::Mapping {
                entries,
                pending,
                out,
                ..
            } => {
                for (key, child) in entries.by_ref() {
                    if self.is_sensitive_key(&key) {
                        tracing::trace!(key = %key, "redacted sensitive key");
                        out.insert(key, Value::String(REDACTED_SENTINEL.to_string()));
                    } else {
                        *pending = Some(key);
                        return Some(child);
                    }
                }
                None
            }
        }
    }
}

/// The shared redactor with the built-in fragments.
pub fn default_redactor() -> &'static Redactor {
    static DEFAULT: OnceLock<Redactor> = OnceLock::new();
    DEFAULT.get_or_init(Redactor::new)
}

/// Returns a redacted copy of a JSON tree using the built-in fragments.
pub fn redact(value: &Value) -> Value {
    default_redactor().redact_value(value)
}

/// Returns a redacted tree built from a payload graph using the built-in
/// fragments.
pub fn redact_payload(payload: &Payload) -> Value {
    default_redactor().redact_payload(payload)
}

/// Checks a key against the built-in fragments.
pub fn is_sensitive_key(key: &str) -> bool {
    default_redactor().is_sensitive_key(key)
}
