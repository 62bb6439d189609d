//! Prefix varints: self-delimiting integers that can share their first byte
//! with a type header.
//!
//! Layout for `prefix_bits = p`:
//!
//! ```text
//! first byte:  [ header (p bits) | stop (1 bit) | low value bits (7 - p) ]
//! next bytes:  [ stop (1 bit) | 7 value bits ]          (little-endian groups)
//! ```
//!
//! The stop bit of the first byte is `0x80 >> p`; every following byte uses
//! `0x80`.  Decoding ends at the first byte whose stop bit is set.

use crate::constants::LARGEST_VARINT_COLLECTION;
use crate::errors::{Error, Result};

/// Encode `value`, placing `header` in the top `prefix_bits` bits of the
/// first byte.
pub fn encode(value: u64, prefix_bits: u8, header: u8) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(encoded_len(value, prefix_bits));
    encode_into(&mut out, value, prefix_bits, header)?;
    Ok(out)
}

/// Append the encoding of `value` to `out`.
pub fn encode_into(out: &mut Vec<u8>, value: u64, prefix_bits: u8, header: u8) -> Result<()> {
    check_prefix(prefix_bits)?;
    if header & !header_mask(prefix_bits) != 0 {
        return Err(Error::range(format!(
            "header 0x{:02x} overlaps the low {} bits",
            header,
            8 - prefix_bits
        )));
    }

    let low_mask = 0x7Fu64 >> prefix_bits;
    let stop = 0x80u8 >> prefix_bits;

    if value & low_mask == value {
        out.push(header | stop | value as u8);
        return Ok(());
    }

    out.push(header | (value & low_mask) as u8);
    let mut rest = value >> (7 - prefix_bits);
    while rest > 0x7F {
        out.push((rest & 0x7F) as u8);
        rest >>= 7;
    }
    out.push(rest as u8 | 0x80);
    Ok(())
}

/// Number of bytes `encode` produces.
pub fn encoded_len(value: u64, prefix_bits: u8) -> usize {
    let first_bits = 7u32.saturating_sub(prefix_bits as u32);
    let significant = 64 - value.leading_zeros();
    if significant <= first_bits {
        return 1;
    }
    1 + ((significant - first_bits) as usize).div_ceil(7)
}

/// Decode a varint from the front of `bytes`; returns `(value, consumed)`.
pub fn decode(bytes: &[u8], prefix_bits: u8) -> Result<(u64, usize)> {
    decode_inner(bytes, prefix_bits, None)
}

/// Decode a varint that declares a collection size.
///
/// Fails with `LimitExceeded` as soon as the running total passes
/// [`LARGEST_VARINT_COLLECTION`], without waiting for the stop bit.
pub fn decode_collection_len(bytes: &[u8], prefix_bits: u8) -> Result<(u64, usize)> {
    decode_inner(bytes, prefix_bits, Some(LARGEST_VARINT_COLLECTION))
}

fn decode_inner(bytes: &[u8], prefix_bits: u8, ceiling: Option<u64>) -> Result<(u64, usize)> {
    check_prefix(prefix_bits)?;

    let mut total: u64 = 0;
    let mut shift: u32 = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let (chunk, stopped, width) = if i == 0 {
            let chunk = (b & (0x7F >> prefix_bits)) as u64;
            (chunk, b & (0x80 >> prefix_bits) != 0, 7 - prefix_bits as u32)
        } else {
            ((b & 0x7F) as u64, b & 0x80 != 0, 7)
        };

        if chunk != 0 {
            if shift >= 64 || (chunk << shift) >> shift != chunk {
                return Err(Error::format("varint overflows 64 bits"));
            }
            total |= chunk << shift;
        }

        if let Some(ceiling) = ceiling {
            if total > ceiling {
                return Err(Error::limit(format!(
                    "declared collection size exceeds {}",
                    ceiling
                )));
            }
        }

        if stopped {
            return Ok((total, i + 1));
        }
        shift += width;
    }
    Err(Error::format("no stop bit found in varint"))
}

fn check_prefix(prefix_bits: u8) -> Result<()> {
    if prefix_bits > 7 {
        return Err(Error::range(format!(
            "prefix_bits must be 0..=7, got {}",
            prefix_bits
        )));
    }
    Ok(())
}

/// Bits of the first byte available to the caller's header.
fn header_mask(prefix_bits: u8) -> u8 {
    if prefix_bits == 0 {
        0
    } else {
        0xFF << (8 - prefix_bits)
    }
}
