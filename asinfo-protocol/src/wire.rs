//! Primitive big-endian packing at explicit offsets.
//!
//! Buffers are allocated zero-filled at their final size before anything is
//! packed, so every function writes into an existing slice and returns the
//! offset just past what it wrote. Nothing here grows a buffer.

use crate::error::ProtocolError;

fn check_write(buf: &[u8], offset: usize, len: usize) -> Result<(), ProtocolError> {
    if offset.checked_add(len).map_or(true, |end| end > buf.len()) {
        return Err(ProtocolError::BufferOverflow {
            offset,
            len,
            capacity: buf.len(),
        });
    }
    Ok(())
}

fn check_read(buf: &[u8], offset: usize, len: usize) -> Result<(), ProtocolError> {
    if offset.checked_add(len).map_or(true, |end| end > buf.len()) {
        return Err(ProtocolError::Truncated {
            offset,
            needed: len,
            available: buf.len().saturating_sub(offset),
        });
    }
    Ok(())
}

pub fn pack_u8(buf: &mut [u8], offset: usize, value: u8) -> Result<usize, ProtocolError> {
    check_write(buf, offset, 1)?;
    buf[offset] = value;
    Ok(offset + 1)
}

pub fn unpack_u8(buf: &[u8], offset: usize) -> Result<(u8, usize), ProtocolError> {
    check_read(buf, offset, 1)?;
    Ok((buf[offset], offset + 1))
}

pub fn pack_u16(buf: &mut [u8], offset: usize, value: u16) -> Result<usize, ProtocolError> {
    pack_bytes(buf, offset, &value.to_be_bytes())
}

pub fn unpack_u16(buf: &[u8], offset: usize) -> Result<(u16, usize), ProtocolError> {
    check_read(buf, offset, 2)?;
    let value = u16::from_be_bytes([buf[offset], buf[offset + 1]]);
    Ok((value, offset + 2))
}

pub fn pack_u32(buf: &mut [u8], offset: usize, value: u32) -> Result<usize, ProtocolError> {
    pack_bytes(buf, offset, &value.to_be_bytes())
}

pub fn unpack_u32(buf: &[u8], offset: usize) -> Result<(u32, usize), ProtocolError> {
    check_read(buf, offset, 4)?;
    let value = u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ]);
    Ok((value, offset + 4))
}

/// Copies raw bytes (already UTF-8 for strings) into the buffer.
pub fn pack_bytes(buf: &mut [u8], offset: usize, bytes: &[u8]) -> Result<usize, ProtocolError> {
    check_write(buf, offset, bytes.len())?;
    buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    Ok(offset + bytes.len())
}

/// Slices exactly `len` bytes without decoding them.
pub fn unpack_bytes(buf: &[u8], offset: usize, len: usize) -> Result<(&[u8], usize), ProtocolError> {
    check_read(buf, offset, len)?;
    Ok((&buf[offset..offset + len], offset + len))
}

/// Slices exactly `len` bytes and decodes them as UTF-8.
pub fn unpack_string(
    buf: &[u8],
    offset: usize,
    len: usize,
) -> Result<(String, usize), ProtocolError> {
    let (bytes, next) = unpack_bytes(buf, offset, len)?;
    let value = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8 { offset })?;
    Ok((value.to_string(), next))
}
