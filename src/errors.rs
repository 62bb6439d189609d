//! mashpack error type and stable error codes.
//!
//! Every variant maps to one `ERR_*` code so callers and the conformance
//! vectors can match on a string that survives message rewording.
//!
//! `InsufficientData` is the only variant a feed-mode caller is expected to
//! catch and retry after feeding more input.  Everything else is fatal to the
//! call that raised it, though the encoder/decoder instance stays usable.

use thiserror::Error;

use crate::value::Value;

// ── Error codes ──────────────────────────────────────────────

pub const ERR_FORMAT: &str = "ERR_FORMAT";
pub const ERR_LIMIT: &str = "ERR_LIMIT";
pub const ERR_INSUFFICIENT_DATA: &str = "ERR_INSUFFICIENT_DATA";
pub const ERR_EXTRA_DATA: &str = "ERR_EXTRA_DATA";
pub const ERR_UNSERIALIZABLE: &str = "ERR_UNSERIALIZABLE";
pub const ERR_RANGE: &str = "ERR_RANGE";
pub const ERR_IO: &str = "ERR_IO";
pub const ERR_HOOK: &str = "ERR_HOOK";
pub const ERR_CONFIG: &str = "ERR_CONFIG";

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Encode/decode failure.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input: reserved tag, missing varint stop bit, invalid UTF-8,
    /// bad typed-array element tag, or an unexpected kind for a header read.
    #[error("format error: {0}")]
    Format(String),

    /// A declared length, nesting depth, or buffer size went over its ceiling.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Input ran out mid-value.  Recoverable in feed mode.
    #[error("insufficient data")]
    InsufficientData,

    /// A one-shot decode produced a value but bytes were left over.
    #[error("extra data: {} trailing bytes after value", remaining.len())]
    ExtraData {
        /// The value decoded from the front of the input.
        value: Box<Value>,
        /// The unconsumed tail.
        remaining: Vec<u8>,
    },

    /// The encoder has no representation for this value and no fallback
    /// produced one.
    #[error("cannot serialize {0}")]
    Unserializable(String),

    /// A magnitude or length outside what the wire format can carry.
    #[error("out of range: {0}")]
    Range(String),

    /// Reading from a source or writing to a sink failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A decode hook or encoder fallback rejected its input.
    #[error("hook rejected value: {0}")]
    Hook(String),

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Format(_) => ERR_FORMAT,
            Error::LimitExceeded(_) => ERR_LIMIT,
            Error::InsufficientData => ERR_INSUFFICIENT_DATA,
            Error::ExtraData { .. } => ERR_EXTRA_DATA,
            Error::Unserializable(_) => ERR_UNSERIALIZABLE,
            Error::Range(_) => ERR_RANGE,
            Error::Io(_) => ERR_IO,
            Error::Hook(_) => ERR_HOOK,
            Error::Config(_) => ERR_CONFIG,
        }
    }

    /// Shorthand for hooks that want to reject a value.
    pub fn hook(message: impl Into<String>) -> Self {
        Error::Hook(message.into())
    }

    /// True for the one condition a feed-mode caller should retry.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Error::InsufficientData)
    }

    pub(crate) fn format(message: impl Into<String>) -> Self {
        Error::Format(message.into())
    }

    pub(crate) fn limit(message: impl Into<String>) -> Self {
        Error::LimitExceeded(message.into())
    }

    pub(crate) fn range(message: impl Into<String>) -> Self {
        Error::Range(message.into())
    }
}
