//! Admin field codec.
//!
//! Every admin argument and return value travels as a field:
//!
//! ```text
//! +----------+--------+---------------------+
//! | length   | type   | value               |
//! | 4 bytes  | 1 byte | length - 1 bytes    |
//! +----------+--------+---------------------+
//! ```
//!
//! `length` counts the type byte too, so it is always one more than the value.
//!
//! Role lists are `{count:1}{len:1, name}*`. Privilege lists are
//! `{count:1}{code:1 [, ns_len:1, ns, set_len:1, set]}*`, where the scope bytes
//! are omitted for global-only permissions.

use crate::error::ProtocolError;
use crate::types::{FieldType, Privilege};
use crate::wire::{pack_bytes, pack_u32, pack_u8, unpack_string, unpack_u32, unpack_u8};
use crate::FIELD_HEADER_SIZE;

const MAX_SHORT_LEN: usize = u8::MAX as usize;

/// A value to be packed into an admin field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// UTF-8 text, sent as its raw bytes.
    Text(&'a str),
    /// Opaque bytes (credential hashes, session tokens).
    Bytes(&'a [u8]),
    /// Role names or privilege strings, depending on the field type.
    List(&'a [&'a str]),
    /// Quota value.
    Integer(u32),
}

impl<'a> FieldValue<'a> {
    fn kind(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::List(_) => "list",
            FieldValue::Integer(_) => "integer",
        }
    }

    /// Returns the encoded length of the value alone, without its field header.
    pub fn value_len(&self, field: FieldType) -> Result<usize, ProtocolError> {
        if field.is_quota() {
            quota_value(field, self)?;
            return Ok(4);
        }

        match self {
            FieldValue::Text(text) => Ok(text.len()),
            FieldValue::Bytes(bytes) => Ok(bytes.len()),
            FieldValue::List(items) if field == FieldType::Roles => Ok(roles_len(items)),
            FieldValue::List(items) if field == FieldType::Privileges => {
                Ok(privileges_len(items))
            }
            _ => Err(ProtocolError::UnsupportedFieldValue {
                field,
                kind: self.kind(),
            }),
        }
    }
}

impl<'a> From<&'a str> for FieldValue<'a> {
    fn from(value: &'a str) -> Self {
        FieldValue::Text(value)
    }
}

impl<'a> From<&'a [u8]> for FieldValue<'a> {
    fn from(value: &'a [u8]) -> Self {
        FieldValue::Bytes(value)
    }
}

impl<'a> From<&'a [&'a str]> for FieldValue<'a> {
    fn from(value: &'a [&'a str]) -> Self {
        FieldValue::List(value)
    }
}

impl From<u32> for FieldValue<'_> {
    fn from(value: u32) -> Self {
        FieldValue::Integer(value)
    }
}

/// Coerces a quota value to an integer, accepting numeric text.
fn quota_value(field: FieldType, value: &FieldValue<'_>) -> Result<u32, ProtocolError> {
    match value {
        FieldValue::Integer(quota) => Ok(*quota),
        FieldValue::Text(text) => {
            text.trim()
                .parse::<u32>()
                .map_err(|_| ProtocolError::InvalidQuota {
                    field,
                    value: text.to_string(),
                })
        }
        other => Err(ProtocolError::UnsupportedFieldValue {
            field,
            kind: other.kind(),
        }),
    }
}

/// Decoded field header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    /// Raw length as sent: value length plus one for the type byte.
    pub length: u32,
    pub field_code: u8,
}

impl FieldHeader {
    pub fn field_type(&self) -> Option<FieldType> {
        FieldType::from_code(self.field_code)
    }

    /// Length of the value that follows the header.
    pub fn value_len(&self) -> Result<usize, ProtocolError> {
        if self.length == 0 {
            return Err(ProtocolError::EmptyField {
                field_type: self.field_code,
            });
        }
        Ok((self.length - 1) as usize)
    }
}

/// Writes a field header for a value of `value_len` bytes.
pub fn pack_admin_field_header(
    buf: &mut [u8],
    offset: usize,
    value_len: usize,
    field: FieldType,
) -> Result<usize, ProtocolError> {
    let length = u32::try_from(value_len + 1).map_err(|_| ProtocolError::ValueTooLong {
        what: "field value",
        len: value_len,
        max: u32::MAX as usize - 1,
    })?;
    let offset = pack_u32(buf, offset, length)?;
    pack_u8(buf, offset, field.code())
}

pub fn unpack_admin_field_header(
    buf: &[u8],
    offset: usize,
) -> Result<(FieldHeader, usize), ProtocolError> {
    let (length, offset) = unpack_u32(buf, offset)?;
    let (field_code, offset) = unpack_u8(buf, offset)?;
    Ok((FieldHeader { length, field_code }, offset))
}

/// Packs a complete field (header and value) and returns the offset after it.
pub fn pack_admin_field(
    buf: &mut [u8],
    offset: usize,
    field: FieldType,
    value: &FieldValue<'_>,
) -> Result<usize, ProtocolError> {
    if field.is_quota() {
        let quota = quota_value(field, value)?;
        let offset = pack_admin_field_header(buf, offset, 4, field)?;
        return pack_u32(buf, offset, quota);
    }

    match value {
        FieldValue::Text(text) => {
            let offset = pack_admin_field_header(buf, offset, text.len(), field)?;
            pack_bytes(buf, offset, text.as_bytes())
        }
        FieldValue::Bytes(bytes) => {
            let offset = pack_admin_field_header(buf, offset, bytes.len(), field)?;
            pack_bytes(buf, offset, bytes)
        }
        FieldValue::List(roles) if field == FieldType::Roles => {
            pack_admin_roles(buf, offset, roles)
        }
        FieldValue::List(privileges) if field == FieldType::Privileges => {
            pack_admin_privileges(buf, offset, privileges)
        }
        other => Err(ProtocolError::UnsupportedFieldValue {
            field,
            kind: other.kind(),
        }),
    }
}

fn short_len(what: &'static str, len: usize) -> Result<u8, ProtocolError> {
    u8::try_from(len).map_err(|_| ProtocolError::ValueTooLong {
        what,
        len,
        max: MAX_SHORT_LEN,
    })
}

/// Encoded value length of a role list.
pub fn roles_len(roles: &[&str]) -> usize {
    1 + roles.iter().map(|role| 1 + role.len()).sum::<usize>()
}

pub fn pack_admin_roles(
    buf: &mut [u8],
    offset: usize,
    roles: &[&str],
) -> Result<usize, ProtocolError> {
    let count = short_len("role list", roles.len())?;
    let mut offset = pack_admin_field_header(buf, offset, roles_len(roles), FieldType::Roles)?;
    offset = pack_u8(buf, offset, count)?;

    for role in roles {
        offset = pack_u8(buf, offset, short_len("role name", role.len())?)?;
        offset = pack_bytes(buf, offset, role.as_bytes())?;
    }

    Ok(offset)
}

pub fn unpack_admin_roles(buf: &[u8], offset: usize) -> Result<(Vec<String>, usize), ProtocolError> {
    let (count, mut offset) = unpack_u8(buf, offset)?;
    let mut roles = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let (len, next) = unpack_u8(buf, offset)?;
        let (role, next) = unpack_string(buf, next, len as usize)?;
        roles.push(role);
        offset = next;
    }

    Ok((roles, offset))
}

/// A privilege string split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedPrivilege<'a> {
    pub permission: Privilege,
    pub namespace: &'a str,
    pub set: &'a str,
}

/// Parses `permission[.namespace[.set]]`. Missing parts are empty and
/// segments past the set are ignored.
pub fn parse_privilege(privilege: &str) -> ParsedPrivilege<'_> {
    let mut parts = privilege.split('.');
    let permission = Privilege::from_name(parts.next().unwrap_or(""));
    let namespace = parts.next().unwrap_or("");
    let set = parts.next().unwrap_or("");

    ParsedPrivilege {
        permission,
        namespace,
        set,
    }
}

/// Encoded value length of a privilege list.
pub fn privileges_len(privileges: &[&str]) -> usize {
    let mut len = 1;

    for privilege in privileges {
        let parsed = parse_privilege(privilege);
        len += 1;

        if !parsed.permission.is_global_only_scope() {
            len += 1 + parsed.namespace.len() + 1 + parsed.set.len();
        }
    }

    len
}

pub fn pack_admin_privileges(
    buf: &mut [u8],
    offset: usize,
    privileges: &[&str],
) -> Result<usize, ProtocolError> {
    let count = short_len("privilege list", privileges.len())?;
    let mut offset = pack_admin_field_header(
        buf,
        offset,
        privileges_len(privileges),
        FieldType::Privileges,
    )?;
    offset = pack_u8(buf, offset, count)?;

    for privilege in privileges {
        let parsed = parse_privilege(privilege);
        offset = pack_u8(buf, offset, parsed.permission.code())?;

        if !parsed.permission.is_global_only_scope() {
            offset = pack_u8(buf, offset, short_len("namespace", parsed.namespace.len())?)?;
            offset = pack_bytes(buf, offset, parsed.namespace.as_bytes())?;
            offset = pack_u8(buf, offset, short_len("set", parsed.set.len())?)?;
            offset = pack_bytes(buf, offset, parsed.set.as_bytes())?;
        }
    }

    Ok(offset)
}

/// Decodes a privilege list back to dot-joined strings. An empty namespace
/// drops both scope segments; an empty set drops only the set.
pub fn unpack_admin_privileges(
    buf: &[u8],
    offset: usize,
) -> Result<(Vec<String>, usize), ProtocolError> {
    let (count, mut offset) = unpack_u8(buf, offset)?;
    let mut privileges = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let (code, next) = unpack_u8(buf, offset)?;
        offset = next;
        let permission = Privilege::try_from(code)?;
        let mut privilege = permission.to_string();

        if !permission.is_global_only_scope() {
            let (ns_len, next) = unpack_u8(buf, offset)?;
            let (namespace, next) = unpack_string(buf, next, ns_len as usize)?;
            let (set_len, next) = unpack_u8(buf, next)?;
            let (set, next) = unpack_string(buf, next, set_len as usize)?;
            offset = next;

            if !namespace.is_empty() {
                privilege.push('.');
                privilege.push_str(&namespace);

                if !set.is_empty() {
                    privilege.push('.');
                    privilege.push_str(&set);
                }
            }
        }

        privileges.push(privilege);
    }

    Ok((privileges, offset))
}

/// Decodes a read/write rate info field: `{count:1}{u32}*`.
pub fn unpack_admin_rate_info(
    buf: &[u8],
    offset: usize,
) -> Result<(Vec<u32>, usize), ProtocolError> {
    let (count, mut offset) = unpack_u8(buf, offset)?;
    let mut values = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let (value, next) = unpack_u32(buf, offset)?;
        values.push(value);
        offset = next;
    }

    Ok((values, offset))
}

/// Full encoded size of a field, header included.
pub fn field_size(field: FieldType, value: &FieldValue<'_>) -> Result<usize, ProtocolError> {
    Ok(FIELD_HEADER_SIZE + value.value_len(field)?)
}
