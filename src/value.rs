use crate::error::Result;
use crate::sink::ChunkSink;

/// JSON value representation for response documents.
///
/// `Object` uses `Vec<(String, Value)>` to preserve key insertion order.
/// `Absent` is distinct from `Null`: an absent object entry is omitted and an
/// absent array element inside a nested value renders as `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Absent,
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// `Some(v)` becomes `v`, `None` becomes `Absent`.
    pub fn opt<T: Into<Value>>(v: Option<T>) -> Value {
        v.map_or(Value::Absent, Into::into)
    }

    /// An array of strings, or `Absent` when the list is empty.
    pub fn non_empty_list(items: &[String]) -> Value {
        if items.is_empty() {
            Value::Absent
        } else {
            items.into()
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&[String]> for Value {
    fn from(items: &[String]) -> Self {
        Value::Array(items.iter().cloned().map(Value::String).collect())
    }
}

/// An operation that writes its own serialized form directly to a sink.
///
/// Returns `true` when it produced output. The encoder substitutes `null`
/// inside objects when a producer reports `false`.
pub trait Produce {
    fn produce(self: Box<Self>, sink: &mut dyn ChunkSink) -> Result<bool>;
}

impl<F> Produce for F
where
    F: FnOnce(&mut dyn ChunkSink) -> Result<bool>,
{
    fn produce(self: Box<Self>, sink: &mut dyn ChunkSink) -> Result<bool> {
        (*self)(sink)
    }
}

/// Anything the streaming encoder can write: an eager value or a deferred
/// producer.
pub enum Serializable<'a> {
    Value(Value),
    Deferred(Box<dyn Produce + 'a>),
}

impl<'a> Serializable<'a> {
    pub fn deferred<F>(f: F) -> Self
    where
        F: FnOnce(&mut dyn ChunkSink) -> Result<bool> + 'a,
    {
        Serializable::Deferred(Box::new(f))
    }
}

impl std::fmt::Debug for Serializable<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Serializable::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Serializable::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<Value> for Serializable<'_> {
    fn from(v: Value) -> Self {
        Serializable::Value(v)
    }
}

impl From<bool> for Serializable<'_> {
    fn from(b: bool) -> Self {
        Serializable::Value(b.into())
    }
}

impl From<i64> for Serializable<'_> {
    fn from(n: i64) -> Self {
        Serializable::Value(n.into())
    }
}

impl From<usize> for Serializable<'_> {
    fn from(n: usize) -> Self {
        Serializable::Value(n.into())
    }
}

impl From<&str> for Serializable<'_> {
    fn from(s: &str) -> Self {
        Serializable::Value(s.into())
    }
}

impl From<String> for Serializable<'_> {
    fn from(s: String) -> Self {
        Serializable::Value(s.into())
    }
}
