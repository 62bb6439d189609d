//! # mashpack: compact binary serialization
//!
//! Convert in-memory values to a compact binary wire format and back.
//!
//! ```no_run
//! use mashpack::{pack, unpack, Value};
//!
//! let value = Value::Map(vec![
//!     ("action".into(), "deploy".into()),
//!     ("replicas".into(), Value::Int(3)),
//! ]);
//! let bytes = pack(&value).unwrap();
//! assert_eq!(unpack(&bytes).unwrap(), value);
//! ```
//!
//! For incremental input use [`Decoder`]: feed it chunks (or hand it a
//! `Read`) and pull values out as they complete.  [`Encoder`] keeps its
//! configuration and fallback across calls.

mod buffer;
pub mod config;
pub mod constants;
pub mod decode;
pub mod encode;
pub mod errors;
pub mod header;
pub mod json_adapter;
pub mod value;
pub mod varint;

use std::io::{Read, Write};

use tracing::debug;

pub use config::{DecoderConfig, EncoderConfig, Limits};
pub use decode::Decoder;
pub use encode::Encoder;
pub use errors::{
    Error, Result, ERR_CONFIG, ERR_EXTRA_DATA, ERR_FORMAT, ERR_HOOK, ERR_INSUFFICIENT_DATA,
    ERR_IO, ERR_LIMIT, ERR_RANGE, ERR_UNSERIALIZABLE,
};
pub use value::{Ext, Opaque, Value};

// ── One-shot API ─────────────────────────────────────────────

/// Encode one value with default settings.
pub fn pack(value: &Value) -> Result<Vec<u8>> {
    pack_with(value, EncoderConfig::default())
}

pub fn pack_with(value: &Value, config: EncoderConfig) -> Result<Vec<u8>> {
    Encoder::with_config(config).pack(value)
}

/// Decode exactly one value from `bytes` with default settings.
///
/// Trailing bytes are an [`Error::ExtraData`] carrying both the decoded
/// value and the leftovers.  Truncated input is
/// [`Error::InsufficientData`].
pub fn unpack(bytes: &[u8]) -> Result<Value> {
    unpack_with(bytes, DecoderConfig::default())
}

pub fn unpack_with(bytes: &[u8], config: DecoderConfig) -> Result<Value> {
    // The whole input is in hand, so the buffer ceiling only has to admit it.
    let config = DecoderConfig {
        max_buffer_size: config.max_buffer_size.max(bytes.len()),
        ..config
    };
    let mut decoder = Decoder::with_config(config);
    decoder.feed(bytes)?;
    let value = decoder.unpack()?;

    let rest = decoder.remaining();
    if !rest.is_empty() {
        debug!(consumed = decoder.tell(), trailing = rest.len(), "extra data after value");
        return Err(Error::ExtraData {
            value: Box::new(value),
            remaining: rest.to_vec(),
        });
    }
    Ok(value)
}

// ── Stream adapters ──────────────────────────────────────────

/// Encode `value` and write it to `writer`.
pub fn pack_into<W: Write>(value: &Value, mut writer: W) -> Result<()> {
    let bytes = pack(value)?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Read `reader` to its end and decode exactly one value from it.
pub fn unpack_from<R: Read>(mut reader: R) -> Result<Value> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    unpack(&bytes)
}
