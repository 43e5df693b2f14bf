//! Admin request encoding and login reply decoding.

use crate::error::ProtocolError;
use crate::field::{pack_admin_field, unpack_admin_field_header, FieldValue};
use crate::header::create_admin_header;
use crate::types::{AdminCommand, FieldType};
use crate::wire::{unpack_bytes, unpack_u32};
use bytes::Bytes;

/// An admin request under construction.
///
/// Fields are packed in insertion order. The buffer is sized up front from
/// each value's encoded length, so [`encode`](Self::encode) never grows it.
///
/// ```
/// use asinfo_protocol::{AdminCommand, AdminRequest, FieldType, FieldValue};
///
/// let buf = AdminRequest::new(AdminCommand::DropUser)
///     .field(FieldType::User, FieldValue::Text("bob"))
///     .encode()
///     .unwrap();
/// assert_eq!(buf.len(), 8 + 16 + 5 + 3);
/// ```
#[derive(Debug, Clone)]
pub struct AdminRequest<'a> {
    command: AdminCommand,
    fields: Vec<(FieldType, FieldValue<'a>)>,
}

impl<'a> AdminRequest<'a> {
    pub fn new(command: AdminCommand) -> Self {
        Self {
            command,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldType, value: FieldValue<'a>) -> Self {
        self.fields.push((field, value));
        self
    }

    /// Adds the field only when a value is present.
    pub fn optional_field(self, field: FieldType, value: Option<FieldValue<'a>>) -> Self {
        match value {
            Some(value) => self.field(field, value),
            None => self,
        }
    }

    pub fn command(&self) -> AdminCommand {
        self.command
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Encodes the complete message: protocol header, admin header, fields.
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let field_count =
            u8::try_from(self.fields.len()).map_err(|_| ProtocolError::ValueTooLong {
                what: "field list",
                len: self.fields.len(),
                max: u8::MAX as usize,
            })?;

        let mut payload_size = 0;
        for (field, value) in &self.fields {
            payload_size += value.value_len(*field)?;
        }

        let (mut buf, mut offset) = create_admin_header(payload_size, self.command, field_count)?;
        for (field, value) in &self.fields {
            offset = pack_admin_field(&mut buf, offset, *field, value)?;
        }

        if offset != buf.len() {
            return Err(ProtocolError::SizeMismatch {
                expected: buf.len(),
                actual: offset,
            });
        }

        Ok(buf.freeze())
    }
}

/// Session fields carried in a login reply body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    pub token: Option<Bytes>,
    /// Advertised time to live, in seconds.
    pub ttl: Option<u32>,
}

/// Decodes `field_count` fields from a login reply body, keeping the session
/// token and TTL and skipping anything else.
pub fn parse_session_info(data: &[u8], field_count: u8) -> Result<SessionInfo, ProtocolError> {
    let mut info = SessionInfo::default();
    let mut offset = 0;

    for _ in 0..field_count {
        let (header, next) = unpack_admin_field_header(data, offset)?;
        let value_len = header.value_len()?;

        match header.field_type() {
            Some(FieldType::SessionToken) => {
                let (token, _) = unpack_bytes(data, next, value_len)?;
                info.token = Some(Bytes::copy_from_slice(token));
            }
            Some(FieldType::SessionTtl) => {
                let (ttl, _) = unpack_u32(data, next)?;
                info.ttl = Some(ttl);
            }
            _ => {}
        }

        offset = next + value_len;
    }

    Ok(info)
}
