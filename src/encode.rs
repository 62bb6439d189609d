//! mashpack encoder: picks the most compact header for every value.
//!
//! Encoding per category:
//!   nil/bool : one sentinel byte
//!   int      : inline (-32..=31), else the narrowest uint/int 8..64 tag
//!   float    : float64, or float32 for `F32` values and when configured
//!   text     : fixstr (<= 63 bytes), else str8/16/32 || utf8_bytes
//!   bytes    : bin8/16/32 || raw_bytes
//!   array    : fixarray (<= 31) or array8/16/32, elements individually tagged;
//!              3+ elements sharing one fixed-width scalar tag become
//!              tarray8/16/32 || count || elem_tag || untagged payloads
//!   map      : fixmap (<= 63) or map8/16/32, then key || value pairs
//!   ext      : ext8/16/32 || length || code || payload
//!
//! Any failure rolls the output buffer back to where the failed call
//! started, so a caller never sees partial bytes.

use std::fmt;
use std::mem;

use tracing::{debug, trace};

use crate::config::EncoderConfig;
use crate::constants::*;
use crate::errors::{Error, Result};
use crate::header::Scalar;
use crate::value::{Ext, Value};

/// Substitute for values the wire format cannot carry.  Invoked once per
/// unencodable value; returning another unencodable value is an error.
pub type Fallback = Box<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// Reusable encoder with an internal output buffer.
pub struct Encoder {
    config: EncoderConfig,
    fallback: Option<Fallback>,
    buf: Vec<u8>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("config", &self.config)
            .field("fallback", &self.fallback.is_some())
            .field("buffered", &self.buf.len())
            .finish()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self::with_config(EncoderConfig::default())
    }

    pub fn with_config(config: EncoderConfig) -> Self {
        Self {
            config,
            fallback: None,
            buf: Vec::new(),
        }
    }

    /// Install the unknown-type fallback.
    pub fn with_fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.fallback = Some(Box::new(fallback));
        self
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode one value.
    ///
    /// Returns the bytes for this value.  With `reset_buffer_after_pack`
    /// off, the bytes also stay in the internal buffer (see [`Encoder::bytes`]).
    pub fn pack(&mut self, value: &Value) -> Result<Vec<u8>> {
        let start = self.buf.len();
        let result = self.encode_value(value, self.config.recursion_limit);
        self.finish(start, result)
    }

    /// Write only an array header, for streaming the elements separately.
    pub fn pack_array_header(&mut self, len: usize) -> Result<Vec<u8>> {
        let start = self.buf.len();
        let result = self.write_array_header(len);
        self.finish(start, result)
    }

    /// Write only a map header, for streaming the pairs separately.
    pub fn pack_map_header(&mut self, len: usize) -> Result<Vec<u8>> {
        let start = self.buf.len();
        let result = self.write_map_header(len);
        self.finish(start, result)
    }

    pub fn pack_ext(&mut self, ext: &Ext) -> Result<Vec<u8>> {
        let start = self.buf.len();
        let result = self.write_ext(ext);
        self.finish(start, result)
    }

    /// Everything accumulated since the last reset.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn reset(&mut self) {
        self.buf.clear();
    }

    fn finish(&mut self, start: usize, result: Result<()>) -> Result<Vec<u8>> {
        if let Err(e) = result {
            debug!(discarded = self.buf.len() - start, error = %e, "encode failed, rolling back");
            self.buf.truncate(start);
            return Err(e);
        }
        if self.config.reset_buffer_after_pack {
            Ok(mem::take(&mut self.buf))
        } else {
            Ok(self.buf[start..].to_vec())
        }
    }

    // ── Value dispatch ───────────────────────────────────────

    fn encode_value(&mut self, value: &Value, limit: i32) -> Result<()> {
        if limit < 0 {
            return Err(Error::limit("recursion limit exceeded"));
        }

        match value {
            Value::Nil => self.buf.push(TAG_NIL),
            Value::Bool(false) => self.buf.push(TAG_FALSE),
            Value::Bool(true) => self.buf.push(TAG_TRUE),
            Value::Int(i) => self.write_int(*i)?,
            Value::F32(x) => {
                self.buf.push(TAG_FLOAT32);
                self.buf.extend_from_slice(&x.to_be_bytes());
            }
            Value::F64(x) => {
                if self.config.use_32bit_float {
                    self.buf.push(TAG_FLOAT32);
                    self.buf.extend_from_slice(&(*x as f32).to_be_bytes());
                } else {
                    self.buf.push(TAG_FLOAT64);
                    self.buf.extend_from_slice(&x.to_be_bytes());
                }
            }
            Value::Text(s) => {
                let raw = s.as_bytes();
                if raw.len() <= FIXSTR_MAX {
                    self.buf.push(FIXSTR | raw.len() as u8);
                } else {
                    self.write_len(raw.len(), [TAG_STR8, TAG_STR16, TAG_STR32], "text")?;
                }
                self.buf.extend_from_slice(raw);
            }
            Value::Bytes(b) => {
                self.write_len(b.len(), [TAG_BIN8, TAG_BIN16, TAG_BIN32], "bytes")?;
                self.buf.extend_from_slice(b);
            }
            Value::Array(items) => {
                if !self.config.use_generic_array_only && items.len() >= TYPED_ARRAY_MIN_LEN {
                    if let Some(elem) = self.uniform_scalar(items) {
                        return self.write_typed_array(items, elem);
                    }
                }
                self.write_array_header(items.len())?;
                for item in items {
                    self.encode_value(item, limit - 1)?;
                }
            }
            Value::Map(entries) => {
                self.write_map_header(entries.len())?;
                for (k, v) in entries {
                    self.encode_value(k, limit - 1)?;
                    self.encode_value(v, limit - 1)?;
                }
            }
            Value::Ext(ext) => self.write_ext(ext)?,
            Value::Opaque(opaque) => {
                let Some(fallback) = &self.fallback else {
                    return Err(Error::Unserializable(value.to_string()));
                };
                debug!(type_name = opaque.type_name(), "invoking encoder fallback");
                let substitute = fallback(value)?;
                if matches!(substitute, Value::Opaque(_)) {
                    return Err(Error::Unserializable(value.to_string()));
                }
                self.encode_value(&substitute, limit)?;
            }
        }
        Ok(())
    }

    // ── Integers ─────────────────────────────────────────────

    fn write_int(&mut self, i: i128) -> Result<()> {
        if (0..=POS_FIXINT_MAX).contains(&i) {
            self.buf.push(POS_FIXINT | i as u8);
            return Ok(());
        }
        if (NEG_FIXINT_MIN..0).contains(&i) {
            self.buf.push(NEG_FIXINT | (-i - 1) as u8);
            return Ok(());
        }
        let scalar = int_scalar(i)
            .ok_or_else(|| Error::range(format!("integer {} too large to represent", i)))?;
        self.buf.push(scalar.tag());
        self.write_payload(scalar, &Value::Int(i))
    }

    /// Fixed-width wire type `value` would be written with, if any.
    /// Inline integers have no fixed-width form and never compact.
    fn fixed_scalar(&self, value: &Value) -> Option<Scalar> {
        match value {
            Value::Int(i) if (NEG_FIXINT_MIN..=POS_FIXINT_MAX).contains(i) => None,
            Value::Int(i) => int_scalar(*i),
            Value::F32(_) => Some(Scalar::F32),
            Value::F64(_) if self.config.use_32bit_float => Some(Scalar::F32),
            Value::F64(_) => Some(Scalar::F64),
            _ => None,
        }
    }

    fn uniform_scalar(&self, items: &[Value]) -> Option<Scalar> {
        let (first, rest) = items.split_first()?;
        let elem = self.fixed_scalar(first)?;
        rest.iter()
            .all(|v| self.fixed_scalar(v) == Some(elem))
            .then_some(elem)
    }

    /// Write a scalar's payload bytes without its tag.  `value` has already
    /// been classified as `scalar` by `fixed_scalar`/`int_scalar`.
    fn write_payload(&mut self, scalar: Scalar, value: &Value) -> Result<()> {
        match (scalar, value) {
            (Scalar::U8, Value::Int(i)) => self.buf.push(*i as u8),
            (Scalar::U16, Value::Int(i)) => self.buf.extend_from_slice(&(*i as u16).to_be_bytes()),
            (Scalar::U32, Value::Int(i)) => self.buf.extend_from_slice(&(*i as u32).to_be_bytes()),
            (Scalar::U64, Value::Int(i)) => self.buf.extend_from_slice(&(*i as u64).to_be_bytes()),
            (Scalar::I8, Value::Int(i)) => self.buf.push(*i as i8 as u8),
            (Scalar::I16, Value::Int(i)) => self.buf.extend_from_slice(&(*i as i16).to_be_bytes()),
            (Scalar::I32, Value::Int(i)) => self.buf.extend_from_slice(&(*i as i32).to_be_bytes()),
            (Scalar::I64, Value::Int(i)) => self.buf.extend_from_slice(&(*i as i64).to_be_bytes()),
            (Scalar::F32, Value::F32(x)) => self.buf.extend_from_slice(&x.to_be_bytes()),
            (Scalar::F32, Value::F64(x)) => self.buf.extend_from_slice(&(*x as f32).to_be_bytes()),
            (Scalar::F64, Value::F64(x)) => self.buf.extend_from_slice(&x.to_be_bytes()),
            (scalar, value) => {
                return Err(Error::Unserializable(format!(
                    "{} as {:?} payload",
                    value.kind(),
                    scalar
                )));
            }
        }
        Ok(())
    }

    // ── Containers ───────────────────────────────────────────

    fn write_typed_array(&mut self, items: &[Value], elem: Scalar) -> Result<()> {
        self.write_len(items.len(), [TAG_TARRAY8, TAG_TARRAY16, TAG_TARRAY32], "typed array")?;
        self.buf.push(elem.tag());
        self.buf.reserve(items.len() * elem.width());
        for item in items {
            self.write_payload(elem, item)?;
        }
        trace!(len = items.len(), ?elem, "wrote typed array");
        Ok(())
    }

    fn write_array_header(&mut self, len: usize) -> Result<()> {
        if len <= FIXARRAY_MAX {
            self.buf.push(FIXARRAY | len as u8);
            Ok(())
        } else {
            self.write_len(len, [TAG_ARRAY8, TAG_ARRAY16, TAG_ARRAY32], "array")
        }
    }

    fn write_map_header(&mut self, len: usize) -> Result<()> {
        if len <= FIXMAP_MAX {
            self.buf.push(FIXMAP | len as u8);
            Ok(())
        } else {
            self.write_len(len, [TAG_MAP8, TAG_MAP16, TAG_MAP32], "map")
        }
    }

    fn write_ext(&mut self, ext: &Ext) -> Result<()> {
        let data = ext.data();
        self.write_len(data.len(), [TAG_EXT8, TAG_EXT16, TAG_EXT32], "ext")?;
        self.buf.push(ext.code());
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Tag from the 8/16/32-bit length class that fits, then the length.
    fn write_len(&mut self, len: usize, tags: [u8; 3], what: &str) -> Result<()> {
        if let Ok(n) = u8::try_from(len) {
            self.buf.push(tags[0]);
            self.buf.push(n);
        } else if let Ok(n) = u16::try_from(len) {
            self.buf.push(tags[1]);
            self.buf.extend_from_slice(&n.to_be_bytes());
        } else if let Ok(n) = u32::try_from(len) {
            self.buf.push(tags[2]);
            self.buf.extend_from_slice(&n.to_be_bytes());
        } else {
            return Err(Error::range(format!("{} length {} exceeds u32", what, len)));
        }
        Ok(())
    }
}

/// Narrowest fixed-width integer type holding `i`.
fn int_scalar(i: i128) -> Option<Scalar> {
    if i >= 0 {
        if i <= u8::MAX as i128 {
            Some(Scalar::U8)
        } else if i <= u16::MAX as i128 {
            Some(Scalar::U16)
        } else if i <= u32::MAX as i128 {
            Some(Scalar::U32)
        } else if i <= u64::MAX as i128 {
            Some(Scalar::U64)
        } else {
            None
        }
    } else if i >= i8::MIN as i128 {
        Some(Scalar::I8)
    } else if i >= i16::MIN as i128 {
        Some(Scalar::I16)
    } else if i >= i32::MIN as i128 {
        Some(Scalar::I32)
    } else if i >= i64::MIN as i128 {
        Some(Scalar::I64)
    } else {
        None
    }
}
