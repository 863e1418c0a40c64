//! MU protocol binary codecs
//!
//! Every reader takes the complete frame and an absolute offset, and fails
//! with [`DecodeError::IndexOutOfRange`] instead of panicking when the frame
//! is shorter than the field. Decoders layer their layout-level
//! [`DecodeError::TooShort`] checks on top via [`require_len`].

use crate::error::DecodeError;
use bytes::{BufMut, BytesMut};
use muclient_core::ProtocolVersion;

/// Key of the 3-byte XOR applied to login credentials
pub const XOR3_KEY: [u8; 3] = [0xFC, 0xCF, 0xAB];

/// Check a frame against a layout's minimum length
#[inline]
pub fn require_len(packet: &[u8], expected: usize) -> Result<(), DecodeError> {
    if packet.len() < expected {
        return Err(DecodeError::TooShort {
            expected,
            actual: packet.len(),
        });
    }
    Ok(())
}

/// Which of a packet's two size variants a frame uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// u16 fields, every generation
    Standard,
    /// u32 fields, Season 6 only
    Extended,
}

/// Pick the layout for a frame by its length
///
/// Extended wins when the frame is long enough for it and the negotiated
/// version is at least Season 6; otherwise Standard if the frame is long
/// enough for that. Anything shorter is rejected before any field is read.
pub fn select_layout(
    packet: &[u8],
    version: ProtocolVersion,
    standard_len: usize,
    extended_len: usize,
) -> Result<Layout, DecodeError> {
    if packet.len() >= extended_len && version >= ProtocolVersion::Season6 {
        Ok(Layout::Extended)
    } else if packet.len() >= standard_len {
        Ok(Layout::Standard)
    } else {
        Err(DecodeError::TooShort {
            expected: standard_len,
            actual: packet.len(),
        })
    }
}

/// Borrow `size` bytes starting at `offset`
#[inline]
pub fn read_bytes(packet: &[u8], offset: usize, size: usize) -> Result<&[u8], DecodeError> {
    offset
        .checked_add(size)
        .and_then(|end| packet.get(offset..end))
        .ok_or(DecodeError::IndexOutOfRange {
            offset,
            size,
            length: packet.len(),
        })
}

/// Borrow one record of a repeated block
///
/// Reads the fixed `prefix_len` bytes first. When `trailing_count_at` names a
/// byte inside the prefix, that byte holds the number of extra trailing bytes
/// and the full record is bounds-checked again. `None` means the record does
/// not fit and the caller should stop iterating.
pub fn read_record(
    packet: &[u8],
    offset: usize,
    prefix_len: usize,
    trailing_count_at: Option<usize>,
) -> Option<&[u8]> {
    let prefix = read_bytes(packet, offset, prefix_len).ok()?;
    let size = match trailing_count_at {
        Some(at) => prefix_len + *prefix.get(at)? as usize,
        None => prefix_len,
    };
    read_bytes(packet, offset, size).ok()
}

#[inline]
pub fn read_u8(packet: &[u8], offset: usize) -> Result<u8, DecodeError> {
    Ok(read_bytes(packet, offset, 1)?[0])
}

/// Read a big-endian u16 (object ids, standard vitals)
#[inline]
pub fn read_u16_be(packet: &[u8], offset: usize) -> Result<u16, DecodeError> {
    let bytes = read_bytes(packet, offset, 2)?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Read a little-endian u16 (character stats, map numbers, server ids)
#[inline]
pub fn read_u16_le(packet: &[u8], offset: usize) -> Result<u16, DecodeError> {
    let bytes = read_bytes(packet, offset, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Read a little-endian u32 (extended vitals, money)
#[inline]
pub fn read_u32_le(packet: &[u8], offset: usize) -> Result<u32, DecodeError> {
    let bytes = read_bytes(packet, offset, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read a big-endian u32 (legacy experience, picked-up money)
#[inline]
pub fn read_u32_be(packet: &[u8], offset: usize) -> Result<u32, DecodeError> {
    let bytes = read_bytes(packet, offset, 4)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read a big-endian u64 (season 6 experience)
#[inline]
pub fn read_u64_be(packet: &[u8], offset: usize) -> Result<u64, DecodeError> {
    let bytes = read_bytes(packet, offset, 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Ok(u64::from_be_bytes(raw))
}

/// Read a fixed-width, NUL-padded string
///
/// # Format
/// - `size` bytes, text ends at the first NUL or at the field end
/// - Non UTF-8 bytes are replaced rather than rejected
#[inline]
pub fn read_fixed_string(packet: &[u8], offset: usize, size: usize) -> Result<String, DecodeError> {
    let bytes = read_bytes(packet, offset, size)?;
    Ok(trim_nul(bytes))
}

/// Read a NUL-terminated string running at most to the end of the frame
pub fn read_string_to_end(packet: &[u8], offset: usize) -> Result<String, DecodeError> {
    let bytes = packet.get(offset..).ok_or(DecodeError::IndexOutOfRange {
        offset,
        size: 0,
        length: packet.len(),
    })?;
    Ok(trim_nul(bytes))
}

fn trim_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Write `value` into a fixed-width field, truncating or NUL-padding
#[inline]
pub fn write_fixed_string(buf: &mut BytesMut, value: &str, size: usize) {
    let bytes = value.as_bytes();
    let used = bytes.len().min(size);
    buf.put_slice(&bytes[..used]);
    buf.put_bytes(0, size - used);
}

/// Apply the 3-byte credential XOR in place (self-inverse)
#[inline]
pub fn xor3(data: &mut [u8]) {
    for (index, byte) in data.iter_mut().enumerate() {
        *byte ^= XOR3_KEY[index % XOR3_KEY.len()];
    }
}
