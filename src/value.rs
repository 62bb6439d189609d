//! mashpack value model.
//!
//! `Value` is a closed sum type over everything the wire format can carry,
//! plus `Opaque` for application objects that need an encoder fallback.
//! Values own their data; the decoder always produces fresh values.
//!
//! Map entries are stored as `Vec<(Value, Value)>` rather than a HashMap so
//! that iteration order is the insertion order and duplicate keys survive a
//! round trip.  Consumers that want last-write-wins can intern themselves.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::constants::EXT_CODE_MAX;
use crate::errors::{Error, Result};

/// A value in the mashpack data model.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    /// Signed integer.  Only the union of the i64 and u64 ranges is
    /// encodable; anything outside is rejected at encode time.
    Int(i128),
    F32(f32),
    F64(f64),
    /// UTF-8 text.  Distinct from `Bytes` on the wire.
    Text(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    /// Ordered key/value pairs.  Keys may be any value and need not be unique.
    Map(Vec<(Value, Value)>),
    Ext(Ext),
    /// Application object with no wire representation of its own.
    Opaque(Opaque),
}

impl Value {
    /// Short category name, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::F32(_) => "float32",
            Value::F64(_) => "float64",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Ext(_) => "ext",
            Value::Opaque(_) => "opaque",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up the last entry whose key is the given text.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .rev()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::F32(x) => write!(f, "{}f32", x),
            Value::F64(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Array(items) => write!(f, "[{} items]", items.len()),
            Value::Map(entries) => write!(f, "{{{} entries}}", entries.len()),
            Value::Ext(ext) => write!(f, "ext({}, <{} bytes>)", ext.code, ext.data.len()),
            Value::Opaque(o) => write!(f, "<{}>", o.type_name),
        }
    }
}

// ── Conversions ──────────────────────────────────────────────

macro_rules! from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i128)
            }
        })*
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Vec<(Value, Value)>> for Value {
    fn from(v: Vec<(Value, Value)>) -> Self {
        Value::Map(v)
    }
}

impl From<Ext> for Value {
    fn from(v: Ext) -> Self {
        Value::Ext(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

// ── Extension value ──────────────────────────────────────────

/// Application-defined payload tagged with a type code in `0..=127`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ext {
    code: u8,
    data: Vec<u8>,
}

impl Ext {
    /// Build an extension value.  Fails if `code` is above 127.
    pub fn new(code: u8, data: impl Into<Vec<u8>>) -> Result<Self> {
        if code > EXT_CODE_MAX {
            return Err(Error::range(format!(
                "ext type code {} outside 0..={}",
                code, EXT_CODE_MAX
            )));
        }
        Ok(Self {
            code,
            data: data.into(),
        })
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

// ── Opaque host value ────────────────────────────────────────

/// A shared application object the encoder cannot represent directly.
///
/// Equality is identity: two `Opaque`s are equal only if they wrap the same
/// allocation.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.inner) as *const (),
            Arc::as_ptr(&other.inner) as *const (),
        )
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})", self.type_name)
    }
}
