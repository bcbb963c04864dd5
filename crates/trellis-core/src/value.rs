//! Dynamic property values carried by elements and mutation records

use crate::cmd::Cmd;
use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A dynamic property value
///
/// Serializes untagged, so a host receives plain JSON scalars, arrays and
/// objects. Handlers serialize as `{"handler": <id>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// No value / null
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// List of values
    List(Vec<Value>),
    /// Map of string keys to values
    Map(Props),
    /// Event callback
    Handler(Handler),
}

/// A map of property names to values
///
/// Uses IndexMap to preserve insertion order, so serialized mutation logs are
/// deterministic.
pub type Props = IndexMap<String, Value>;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// An event callback attached to a host node
///
/// Equality is identity: two handlers are equal only when they share the same
/// allocation.
#[derive(Clone)]
pub struct Handler {
    id: u64,
    callback: Rc<dyn Fn(&Value) -> Cmd>,
}

impl Handler {
    /// Wrap a callback
    pub fn new(callback: impl Fn(&Value) -> Cmd + 'static) -> Self {
        Self {
            id: NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed),
            callback: Rc::new(callback),
        }
    }

    /// Process-unique id of this handler
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Invoke the callback with an event payload
    pub fn call(&self, payload: &Value) -> Cmd {
        (self.callback)(payload)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({})", self.id)
    }
}

impl Serialize for Handler {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Handler", 1)?;
        s.serialize_field("handler", &self.id)?;
        s.end()
    }
}

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get this value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get this value as an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get this value as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Whether a prop is an event-handler prop (`onClick`, `onInput`, ...)
pub fn is_event_prop(key: &str, value: &Value) -> bool {
    let mut chars = key.chars();
    matches!(value, Value::Handler(_))
        && chars.next() == Some('o')
        && chars.next() == Some('n')
        && chars.next().is_some_and(|c| c.is_ascii_uppercase())
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

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Handler> for Value {
    fn from(h: Handler) -> Self {
        Value::Handler(h)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(vec: Vec<T>) -> Self {
        Value::List(vec.into_iter().map(Into::into).collect())
    }
}
