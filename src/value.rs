//! Typed accessor over the engine's value tokens
//!
//! Host callbacks (column setters, insert handlers) receive engine-supplied
//! values during `UPDATE`/`INSERT`. [`ValueToken`] wraps those tokens behind
//! a small typed surface so host code never handles the raw SQLite value
//! representation.

use rusqlite::types::Value;

/// A single engine-typed value handed to a host callback.
///
/// Numeric accessors coerce between integer and real storage classes and
/// parse numeric text, matching what SQLite itself does when a statement
/// binds a value against a typed column. `NULL` yields `None` from every
/// accessor, so typed setters can refuse it instead of silently writing a
/// default.
#[derive(Debug, Clone)]
pub struct ValueToken(Value);

impl ValueToken {
    pub(crate) fn new(value: Value) -> Self {
        ValueToken(value)
    }

    /// Whether the token holds SQL `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self.0, Value::Null)
    }

    /// The value as a 64-bit integer, if representable.
    pub fn as_i64(&self) -> Option<i64> {
        match &self.0 {
            Value::Integer(i) => Some(*i),
            Value::Real(f) => Some(*f as i64),
            Value::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// The value as a double, if representable.
    pub fn as_f64(&self) -> Option<f64> {
        match &self.0 {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// The value as text. Only `TEXT` storage is accepted.
    pub fn as_text(&self) -> Option<&str> {
        match &self.0 {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The value as a byte slice. Only `BLOB` storage is accepted.
    pub fn as_blob(&self) -> Option<&[u8]> {
        match &self.0 {
            Value::Blob(b) => Some(b.as_slice()),
            _ => None,
        }
    }
}

impl From<Value> for ValueToken {
    fn from(value: Value) -> Self {
        ValueToken::new(value)
    }
}
