//! Protocol header and admin header codecs.
//!
//! Protocol header (8 bytes), precedes every message:
//!
//! ```text
//! +---------+--------+-------------+-------------+-------------+
//! | version | type   | size[47:32] | size[31:16] | size[15:0]  |
//! | 1 byte  | 1 byte | 2 bytes     | 2 bytes     | 2 bytes     |
//! +---------+--------+-------------+-------------+-------------+
//! ```
//!
//! `size` counts the bytes following the protocol header.
//!
//! Admin header (16 bytes), follows the protocol header in admin exchanges:
//!
//! ```text
//! +--------+--------+---------+-------------+----------------+
//! | scheme | result | command | field_count | reserved       |
//! | 1 byte | 1 byte | 1 byte  | 1 byte      | 12 bytes, zero |
//! +--------+--------+---------+-------------+----------------+
//! ```

use crate::error::{ProtocolError, ResponseCode};
use crate::types::AdminCommand;
use crate::wire::{pack_u16, pack_u8, unpack_u16, unpack_u8};
use crate::{
    ADMIN_HEADER_SIZE, ADMIN_MSG_TYPE, ADMIN_MSG_VERSION, FIELD_HEADER_SIZE, MAX_MESSAGE_SIZE,
    PROTOCOL_HEADER_SIZE,
};
use bytes::BytesMut;

/// Decoded protocol header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolHeader {
    pub version: u8,
    pub msg_type: u8,
    /// Byte length of the body following this header.
    pub size: u64,
}

/// Decoded admin header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminHeader {
    pub scheme: u8,
    pub result_code: u8,
    pub command: u8,
    pub field_count: u8,
}

impl AdminHeader {
    pub fn result(&self) -> ResponseCode {
        ResponseCode::from(self.result_code)
    }
}

/// Writes the protocol header at `offset` and returns the offset after it.
pub fn pack_protocol_header(
    buf: &mut [u8],
    offset: usize,
    version: u8,
    msg_type: u8,
    size: u64,
) -> Result<usize, ProtocolError> {
    if size > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge(size));
    }
    let offset = pack_u8(buf, offset, version)?;
    let offset = pack_u8(buf, offset, msg_type)?;
    let offset = pack_u16(buf, offset, ((size >> 32) & 0xFFFF) as u16)?;
    let offset = pack_u16(buf, offset, ((size >> 16) & 0xFFFF) as u16)?;
    pack_u16(buf, offset, (size & 0xFFFF) as u16)
}

/// Reads a protocol header at `offset`.
pub fn unpack_protocol_header(
    buf: &[u8],
    offset: usize,
) -> Result<(ProtocolHeader, usize), ProtocolError> {
    let (version, offset) = unpack_u8(buf, offset)?;
    let (msg_type, offset) = unpack_u8(buf, offset)?;
    let (high, offset) = unpack_u16(buf, offset)?;
    let (mid, offset) = unpack_u16(buf, offset)?;
    let (low, offset) = unpack_u16(buf, offset)?;
    let size = (u64::from(high) << 32) | (u64::from(mid) << 16) | u64::from(low);

    Ok((
        ProtocolHeader {
            version,
            msg_type,
            size,
        },
        offset,
    ))
}

/// Writes the four meaningful admin header bytes and skips the 12 reserved
/// ones, which the zero-filled buffer already holds.
pub fn pack_admin_header(
    buf: &mut [u8],
    offset: usize,
    header: &AdminHeader,
) -> Result<usize, ProtocolError> {
    let start = offset;
    let offset = pack_u8(buf, offset, header.scheme)?;
    let offset = pack_u8(buf, offset, header.result_code)?;
    let offset = pack_u8(buf, offset, header.command)?;
    pack_u8(buf, offset, header.field_count)?;

    let end = start + ADMIN_HEADER_SIZE;
    if end > buf.len() {
        return Err(ProtocolError::BufferOverflow {
            offset: start,
            len: ADMIN_HEADER_SIZE,
            capacity: buf.len(),
        });
    }
    Ok(end)
}

/// Reads an admin header at `offset`, skipping the reserved bytes.
pub fn unpack_admin_header(
    buf: &[u8],
    offset: usize,
) -> Result<(AdminHeader, usize), ProtocolError> {
    let available = buf.len().saturating_sub(offset);
    if available < ADMIN_HEADER_SIZE {
        return Err(ProtocolError::Truncated {
            offset,
            needed: ADMIN_HEADER_SIZE,
            available,
        });
    }

    let (scheme, next) = unpack_u8(buf, offset)?;
    let (result_code, next) = unpack_u8(buf, next)?;
    let (command, next) = unpack_u8(buf, next)?;
    let (field_count, _) = unpack_u8(buf, next)?;

    Ok((
        AdminHeader {
            scheme,
            result_code,
            command,
            field_count,
        },
        offset + ADMIN_HEADER_SIZE,
    ))
}

/// Allocates a zero-filled request buffer sized for `payload_size` bytes of
/// field values plus `field_count` field headers, and writes both headers.
///
/// Returns the buffer and the offset where the first field goes.
pub fn create_admin_header(
    payload_size: usize,
    command: AdminCommand,
    field_count: u8,
) -> Result<(BytesMut, usize), ProtocolError> {
    let data_size =
        payload_size + ADMIN_HEADER_SIZE + FIELD_HEADER_SIZE * usize::from(field_count);
    let mut buf = BytesMut::zeroed(PROTOCOL_HEADER_SIZE + data_size);

    let offset = pack_protocol_header(
        &mut buf,
        0,
        ADMIN_MSG_VERSION,
        ADMIN_MSG_TYPE,
        data_size as u64,
    )?;
    let offset = pack_admin_header(
        &mut buf,
        offset,
        &AdminHeader {
            scheme: ADMIN_MSG_VERSION,
            result_code: 0,
            command: command.code(),
            field_count,
        },
    )?;

    Ok((buf, offset))
}
