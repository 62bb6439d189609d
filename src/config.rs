//! Encoder and decoder configuration.
//!
//! All knobs are plain data with defaults, so a deployment can keep them in a
//! JSON document next to its other settings.  Hooks and the encoder fallback
//! are code and are attached with builder methods on the encoder/decoder.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::errors::Result;

/// Per-category ceilings on declared lengths.
///
/// Each is checked the moment a header is read, before any payload byte is
/// consumed or any storage is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_str_len: usize,
    pub max_bin_len: usize,
    pub max_array_len: usize,
    pub max_map_len: usize,
    pub max_ext_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_str_len: DEFAULT_MAX_LEN,
            max_bin_len: DEFAULT_MAX_LEN,
            max_array_len: DEFAULT_MAX_LEN,
            max_map_len: DEFAULT_MAX_LEN,
            max_ext_len: DEFAULT_MAX_LEN,
        }
    }
}

/// Decoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Bytes requested from a source per read.
    pub read_chunk_size: usize,
    /// Ceiling on buffered-but-unconsumed input.
    pub max_buffer_size: usize,
    /// Ceiling on container nesting.
    pub max_depth: usize,
    pub limits: Limits,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            limits: Limits::default(),
        }
    }
}

impl DecoderConfig {
    /// Parse a JSON settings document; missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Write 64-bit floats as float32 (lossy).
    pub use_32bit_float: bool,
    /// Never emit typed arrays.
    pub use_generic_array_only: bool,
    /// Hand back and clear the buffer after every `pack`.
    pub reset_buffer_after_pack: bool,
    /// Nesting budget; each array element, map key, and map value costs one.
    pub recursion_limit: i32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            use_32bit_float: false,
            use_generic_array_only: false,
            reset_buffer_after_pack: true,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

impl EncoderConfig {
    /// Parse a JSON settings document; missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
