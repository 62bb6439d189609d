//! mashpack wire constants: lead-byte ranges, type tags, and default limits.
//!
//! The layout below is the frozen wire format.  Every tag that carries a
//! length or a scalar payload is followed by that many big-endian bytes.

// ── Inline ranges (value lives in the lead byte) ─────────────
// Each range is identified by masking the lead byte; the low bits carry a
// count, a length, or the value itself.

/// 0x00–0x3F: map with 0–63 pairs.
pub const FIXMAP: u8 = 0x00;
pub const FIXMAP_MAX: usize = 0x3F;
/// 0x40–0x7F: text with 0–63 UTF-8 bytes.
pub const FIXSTR: u8 = 0x40;
pub const FIXSTR_MAX: usize = 0x3F;
/// 0x80–0x9F: array with 0–31 individually tagged elements.
pub const FIXARRAY: u8 = 0x80;
pub const FIXARRAY_MAX: usize = 0x1F;
/// 0xA0–0xBF: integers 0..=31.
pub const POS_FIXINT: u8 = 0xA0;
pub const POS_FIXINT_MAX: i128 = 0x1F;
/// 0xC0–0xDF: integers -1..=-32, stored as `-(b & 0x1F) - 1`.
pub const NEG_FIXINT: u8 = 0xC0;
pub const NEG_FIXINT_MIN: i128 = -32;

// ── Single-byte sentinels ────────────────────────────────────

pub const TAG_NIL: u8 = 0xE0;
pub const TAG_FALSE: u8 = 0xE1;
pub const TAG_TRUE: u8 = 0xE2;

// ── Fixed-width scalars ──────────────────────────────────────
// These are also the only tags allowed as a typed-array element type.

pub const TAG_FLOAT32: u8 = 0xE3;
pub const TAG_FLOAT64: u8 = 0xE4;
pub const TAG_UINT8: u8 = 0xF1;
pub const TAG_UINT16: u8 = 0xF2;
pub const TAG_UINT32: u8 = 0xF3;
pub const TAG_UINT64: u8 = 0xF4;
pub const TAG_INT8: u8 = 0xF5;
pub const TAG_INT16: u8 = 0xF6;
pub const TAG_INT32: u8 = 0xF7;
pub const TAG_INT64: u8 = 0xF8;

// ── Length-prefixed containers and payloads ──────────────────
// Three length classes each: 8, 16, and 32-bit big-endian.

pub const TAG_MAP8: u8 = 0xE5;
pub const TAG_MAP16: u8 = 0xE6;
pub const TAG_MAP32: u8 = 0xE7;
/// Typed arrays: count, then one element-type tag, then untagged payloads.
pub const TAG_TARRAY8: u8 = 0xE8;
pub const TAG_TARRAY16: u8 = 0xE9;
pub const TAG_TARRAY32: u8 = 0xEA;
pub const TAG_ARRAY8: u8 = 0xEB;
pub const TAG_ARRAY16: u8 = 0xEC;
pub const TAG_ARRAY32: u8 = 0xED;
pub const TAG_STR8: u8 = 0xEE;
pub const TAG_STR16: u8 = 0xEF;
pub const TAG_STR32: u8 = 0xF0;
pub const TAG_BIN8: u8 = 0xF9;
pub const TAG_BIN16: u8 = 0xFA;
pub const TAG_BIN32: u8 = 0xFB;
/// Extensions: length, then a one-byte type code, then the payload.
pub const TAG_EXT8: u8 = 0xFC;
pub const TAG_EXT16: u8 = 0xFD;
pub const TAG_EXT32: u8 = 0xFE;

/// Never emitted; decoding it is a format error.
pub const TAG_RESERVED: u8 = 0xFF;

// ── Encoder/decoder defaults ─────────────────────────────────

/// Default ceiling for every per-category declared length (2^31 - 1).
pub const DEFAULT_MAX_LEN: usize = 0x7FFF_FFFF;

/// Default ceiling on buffered-but-unconsumed decoder input.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 0x7FFF_FFFF;

/// Default number of bytes pulled from a source per read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 16 * 1024;

/// Default encoder nesting budget.
pub const DEFAULT_RECURSION_LIMIT: i32 = 511;

/// Default decoder nesting ceiling.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Minimum element count before an array is eligible for typed compaction.
pub const TYPED_ARRAY_MIN_LEN: usize = 3;

/// Highest extension type code.
pub const EXT_CODE_MAX: u8 = 0x7F;

/// Varint collection guard: declared sizes above this abort decoding.
pub const LARGEST_VARINT_COLLECTION: u64 = 1024 * 1024;
