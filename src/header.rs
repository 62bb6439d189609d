//! Lead-byte dispatch.
//!
//! Every value starts with one lead byte.  [`LEAD_TABLE`] classifies all 256
//! possible lead bytes once, at compile time, into a [`Lead`]: either an
//! inline value (count, length, or integer packed into the byte itself) or a
//! tag followed by a fixed number of big-endian length/scalar bytes.
//!
//! The decoder turns a `Lead` plus its following bytes into a [`Header`]; the
//! encoder uses the same constants in reverse.

use crate::constants::*;
use crate::value::Value;

/// Size of a big-endian field following a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    W8,
    W16,
    W32,
    W64,
}

impl Width {
    pub const fn bytes(self) -> usize {
        match self {
            Width::W8 => 1,
            Width::W16 => 2,
            Width::W32 => 4,
            Width::W64 => 8,
        }
    }
}

/// Classification of a single lead byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lead {
    FixMap(u8),
    FixStr(u8),
    FixArray(u8),
    PosFixInt(u8),
    NegFixInt(i8),
    Nil,
    False,
    True,
    /// Fixed-width scalar; the payload width is implied by the type.
    Scalar(Scalar),
    Map(Width),
    Str(Width),
    Array(Width),
    TypedArray(Width),
    Bin(Width),
    Ext(Width),
    Reserved,
}

impl Lead {
    /// Number of bytes following the lead byte before any payload:
    /// the length field, plus one for a typed-array element tag or ext code.
    pub const fn follow_len(self) -> usize {
        match self {
            Lead::Scalar(s) => s.width(),
            Lead::Map(w) | Lead::Str(w) | Lead::Array(w) | Lead::Bin(w) => w.bytes(),
            Lead::TypedArray(w) | Lead::Ext(w) => w.bytes() + 1,
            _ => 0,
        }
    }
}

/// Fixed-width scalar wire types.  These are the only types a typed array
/// may declare for its elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl Scalar {
    pub const fn tag(self) -> u8 {
        match self {
            Scalar::U8 => TAG_UINT8,
            Scalar::U16 => TAG_UINT16,
            Scalar::U32 => TAG_UINT32,
            Scalar::U64 => TAG_UINT64,
            Scalar::I8 => TAG_INT8,
            Scalar::I16 => TAG_INT16,
            Scalar::I32 => TAG_INT32,
            Scalar::I64 => TAG_INT64,
            Scalar::F32 => TAG_FLOAT32,
            Scalar::F64 => TAG_FLOAT64,
        }
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            TAG_UINT8 => Some(Scalar::U8),
            TAG_UINT16 => Some(Scalar::U16),
            TAG_UINT32 => Some(Scalar::U32),
            TAG_UINT64 => Some(Scalar::U64),
            TAG_INT8 => Some(Scalar::I8),
            TAG_INT16 => Some(Scalar::I16),
            TAG_INT32 => Some(Scalar::I32),
            TAG_INT64 => Some(Scalar::I64),
            TAG_FLOAT32 => Some(Scalar::F32),
            TAG_FLOAT64 => Some(Scalar::F64),
            _ => None,
        }
    }

    pub const fn kind(self) -> &'static str {
        match self {
            Scalar::F32 => "float32",
            Scalar::F64 => "float64",
            _ => "int",
        }
    }

    pub const fn width(self) -> usize {
        match self {
            Scalar::U8 | Scalar::I8 => 1,
            Scalar::U16 | Scalar::I16 => 2,
            Scalar::U32 | Scalar::I32 | Scalar::F32 => 4,
            Scalar::U64 | Scalar::I64 | Scalar::F64 => 8,
        }
    }
}

const fn classify(b: u8) -> Lead {
    match b {
        0x00..=0x3F => Lead::FixMap(b & 0x3F),
        0x40..=0x7F => Lead::FixStr(b & 0x3F),
        0x80..=0x9F => Lead::FixArray(b & 0x1F),
        0xA0..=0xBF => Lead::PosFixInt(b & 0x1F),
        0xC0..=0xDF => Lead::NegFixInt(-((b & 0x1F) as i8) - 1),
        TAG_NIL => Lead::Nil,
        TAG_FALSE => Lead::False,
        TAG_TRUE => Lead::True,
        TAG_MAP8 => Lead::Map(Width::W8),
        TAG_MAP16 => Lead::Map(Width::W16),
        TAG_MAP32 => Lead::Map(Width::W32),
        TAG_TARRAY8 => Lead::TypedArray(Width::W8),
        TAG_TARRAY16 => Lead::TypedArray(Width::W16),
        TAG_TARRAY32 => Lead::TypedArray(Width::W32),
        TAG_ARRAY8 => Lead::Array(Width::W8),
        TAG_ARRAY16 => Lead::Array(Width::W16),
        TAG_ARRAY32 => Lead::Array(Width::W32),
        TAG_STR8 => Lead::Str(Width::W8),
        TAG_STR16 => Lead::Str(Width::W16),
        TAG_STR32 => Lead::Str(Width::W32),
        TAG_BIN8 => Lead::Bin(Width::W8),
        TAG_BIN16 => Lead::Bin(Width::W16),
        TAG_BIN32 => Lead::Bin(Width::W32),
        TAG_EXT8 => Lead::Ext(Width::W8),
        TAG_EXT16 => Lead::Ext(Width::W16),
        TAG_EXT32 => Lead::Ext(Width::W32),
        _ => match Scalar::from_tag(b) {
            Some(s) => Lead::Scalar(s),
            None => Lead::Reserved,
        },
    }
}

const fn build_table() -> [Lead; 256] {
    let mut table = [Lead::Reserved; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = classify(i as u8);
        i += 1;
    }
    table
}

/// Lead byte → classification, for all 256 byte values.
pub static LEAD_TABLE: [Lead; 256] = build_table();

/// A decoded header: what kind of value follows and how big it claims to be.
///
/// Inline scalars are complete once the header is read.  `Scalar` names a
/// fixed-width payload still to be read; the remaining kinds carry the
/// declared element/byte count that the decoder has already checked against
/// its limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Header {
    Nil,
    Bool(bool),
    Int(i128),
    /// Fixed-width number; its payload follows the tag.
    Scalar(Scalar),
    Str(usize),
    Bin(usize),
    Array(usize),
    TypedArray { len: usize, elem: Scalar },
    Map(usize),
    Ext { len: usize, code: u8 },
}

impl Header {
    pub fn kind(&self) -> &'static str {
        match self {
            Header::Nil => "nil",
            Header::Bool(_) => "bool",
            Header::Int(_) => "int",
            Header::Scalar(s) => s.kind(),
            Header::Str(_) => "text",
            Header::Bin(_) => "bytes",
            Header::Array(_) => "array",
            Header::TypedArray { .. } => "typed array",
            Header::Map(_) => "map",
            Header::Ext { .. } => "ext",
        }
    }
}

/// Read an unsigned big-endian length field.
pub(crate) fn be_len(bytes: &[u8]) -> usize {
    bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize)
}

/// Interpret a fixed-width scalar payload.
pub(crate) fn read_scalar(scalar: Scalar, bytes: &[u8]) -> Value {
    let mut buf = [0u8; 8];
    let w = scalar.width();
    buf[..w].copy_from_slice(&bytes[..w]);
    match scalar {
        Scalar::U8 => Value::Int(buf[0] as i128),
        Scalar::U16 => Value::Int(u16::from_be_bytes([buf[0], buf[1]]) as i128),
        Scalar::U32 => Value::Int(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as i128),
        Scalar::U64 => Value::Int(u64::from_be_bytes(buf) as i128),
        Scalar::I8 => Value::Int(buf[0] as i8 as i128),
        Scalar::I16 => Value::Int(i16::from_be_bytes([buf[0], buf[1]]) as i128),
        Scalar::I32 => Value::Int(i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as i128),
        Scalar::I64 => Value::Int(i64::from_be_bytes(buf) as i128),
        Scalar::F32 => Value::F32(f32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])),
        Scalar::F64 => Value::F64(f64::from_be_bytes(buf)),
    }
}
