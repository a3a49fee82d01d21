use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// Object values map string keys to values. A `BTreeMap` keeps iteration
/// deterministic, which the canonical form relies on; insertion order is
/// not observable in the language.
pub type Map = BTreeMap<String, Value>;

/// An opaque instant: milliseconds since the Unix epoch plus an IANA zone
/// name used only for formatting and calendar decomposition. Only the
/// `time` library produces these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeValue {
    pub epoch_millis: i64,
    pub zone: String,
}

impl TimeValue {
    pub fn new(epoch_millis: i64, zone: impl Into<String>) -> Self {
        Self {
            epoch_millis,
            zone: zone.into(),
        }
    }
}

/// A runtime value. `Int` and `Float` are disjoint: arithmetic never
/// crosses the boundary implicitly, though relational comparison and
/// equality may project both onto `f64`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Time(TimeValue),
    Array(Vec<Value>),
    Object(Map),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    /// Numeric projection: `Int` and `Float` only.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Integer projection: `Int` passes through, `Float` truncates toward
    /// zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(n) => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// The language's equality rule: numeric pairs compare with an absolute
    /// tolerance of 1e-9 on the f64 projection; every other pair compares
    /// by canonical string form.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() < 1e-9,
            _ => self.canonical() == other.canonical(),
        }
    }

    /// Total, deterministic string form. Used for non-numeric equality and
    /// as the `Display` rendering.
    pub fn canonical(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(true) => "true".to_string(),
            Value::Bool(false) => "false".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Str(s) => s.clone(),
            Value::Time(t) => format!("time({}, {})", t.epoch_millis, t.zone),
            Value::Array(items) => {
                format!("[{}]", items.iter().map(Value::canonical).join(", "))
            }
            Value::Object(fields) => format!(
                "{{{}}}",
                fields
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value.canonical()))
                    .join(", ")
            ),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
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

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}
