//! Streamed query reply decoding for user and role listings.
//!
//! A query reply arrives as one or more chunks, each prefixed by a protocol
//! header. A chunk body holds consecutive records:
//!
//! ```text
//! +--------------+---------+---------+-----+
//! | admin header | field 0 | field 1 | ... |
//! +--------------+---------+---------+-----+
//! ```
//!
//! The stream ends at the first record whose result code is not OK. A
//! QUERY_END code ends it successfully.

use crate::error::{ProtocolError, ResponseCode};
use crate::field::{
    unpack_admin_field_header, unpack_admin_privileges, unpack_admin_rate_info,
    unpack_admin_roles,
};
use crate::header::unpack_admin_header;
use crate::types::FieldType;
use crate::wire::{unpack_string, unpack_u32};
use serde::{Serialize, Serializer};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// One entry of a query reply, keyed by the value of its name field.
pub trait QueryRecord: Default {
    /// Field carrying the record's key.
    const NAME_FIELD: FieldType;

    /// Applies one field value. Returns `false` for fields the record does
    /// not use, which are then skipped.
    fn apply_field(&mut self, field: FieldType, value: &[u8]) -> Result<bool, ProtocolError>;

    /// Folds a later record for the same name into this one.
    fn merge(&mut self, later: Self);
}

/// Rate figures reported for a user's reads or writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RateInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_record_tps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_query_rps_limited: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_query_limitless: Option<u32>,
}

impl RateInfo {
    /// Names values positionally. Returns `None` for an empty list; values
    /// past the fourth are ignored.
    pub fn from_values(values: &[u32]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let at = |i: usize| values.get(i).copied();
        Some(Self {
            quota: at(0),
            single_record_tps: at(1),
            scan_query_rps_limited: at(2),
            scan_query_limitless: at(3),
        })
    }
}

/// A user as reported by QUERY_USERS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub roles: Vec<String>,
    #[serde(rename = "read-info", skip_serializing_if = "Option::is_none")]
    pub read_info: Option<RateInfo>,
    #[serde(rename = "write-info", skip_serializing_if = "Option::is_none")]
    pub write_info: Option<RateInfo>,
    /// Open connections; absent when the server reports zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<u32>,
}

impl QueryRecord for UserInfo {
    const NAME_FIELD: FieldType = FieldType::User;

    fn apply_field(&mut self, field: FieldType, value: &[u8]) -> Result<bool, ProtocolError> {
        match field {
            FieldType::Roles => {
                let (roles, _) = unpack_admin_roles(value, 0)?;
                self.roles.extend(roles);
            }
            FieldType::ReadInfo => {
                let (values, _) = unpack_admin_rate_info(value, 0)?;
                self.read_info = RateInfo::from_values(&values);
            }
            FieldType::WriteInfo => {
                let (values, _) = unpack_admin_rate_info(value, 0)?;
                self.write_info = RateInfo::from_values(&values);
            }
            FieldType::Connections => {
                let (connections, _) = unpack_u32(value, 0)?;
                self.connections = (connections != 0).then_some(connections);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn merge(&mut self, later: Self) {
        self.roles.extend(later.roles);
        if later.read_info.is_some() {
            self.read_info = later.read_info;
        }
        if later.write_info.is_some() {
            self.write_info = later.write_info;
        }
        if later.connections.is_some() {
            self.connections = later.connections;
        }
    }
}

/// A role as reported by QUERY_ROLES.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleInfo {
    pub privileges: Vec<String>,
    pub whitelist: Vec<String>,
    /// Absent when the server reports zero. Serialised as a string.
    #[serde(
        rename = "read-quota",
        skip_serializing_if = "Option::is_none",
        serialize_with = "quota_as_string"
    )]
    pub read_quota: Option<u32>,
    #[serde(
        rename = "write-quota",
        skip_serializing_if = "Option::is_none",
        serialize_with = "quota_as_string"
    )]
    pub write_quota: Option<u32>,
}

fn quota_as_string<S: Serializer>(quota: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
    match quota {
        Some(quota) => serializer.serialize_str(&quota.to_string()),
        None => serializer.serialize_none(),
    }
}

impl QueryRecord for RoleInfo {
    const NAME_FIELD: FieldType = FieldType::Role;

    fn apply_field(&mut self, field: FieldType, value: &[u8]) -> Result<bool, ProtocolError> {
        match field {
            FieldType::Privileges => {
                let (privileges, _) = unpack_admin_privileges(value, 0)?;
                self.privileges.extend(privileges);
            }
            FieldType::Whitelist => {
                let (whitelist, _) = unpack_string(value, 0, value.len())?;
                // An empty whitelist is an empty list, never `[""]`.
                if !whitelist.is_empty() {
                    self.whitelist = whitelist.split(',').map(str::to_string).collect();
                }
            }
            FieldType::ReadQuota => {
                let (quota, _) = unpack_u32(value, 0)?;
                self.read_quota = (quota != 0).then_some(quota);
            }
            FieldType::WriteQuota => {
                let (quota, _) = unpack_u32(value, 0)?;
                self.write_quota = (quota != 0).then_some(quota);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn merge(&mut self, later: Self) {
        self.privileges.extend(later.privileges);
        self.whitelist.extend(later.whitelist);
        if later.read_quota.is_some() {
            self.read_quota = later.read_quota;
        }
        if later.write_quota.is_some() {
            self.write_quota = later.write_quota;
        }
    }
}

/// Decodes `field_count` fields starting at `offset`. Every field is skipped
/// by its declared length, whether or not the record used it.
fn decode_record<T: QueryRecord>(
    buf: &[u8],
    mut offset: usize,
    field_count: u8,
) -> Result<(Option<String>, T, usize), ProtocolError> {
    let mut name = None;
    let mut record = T::default();

    for _ in 0..field_count {
        let (header, next) = unpack_admin_field_header(buf, offset)?;
        let value_len = header.value_len()?;
        let end = next + value_len;
        if end > buf.len() {
            return Err(ProtocolError::Truncated {
                offset: next,
                needed: value_len,
                available: buf.len() - next,
            });
        }
        let value = &buf[next..end];

        match header.field_type() {
            Some(field) if field == T::NAME_FIELD => {
                let (value, _) = unpack_string(buf, next, value_len)?;
                name = Some(value);
            }
            Some(field) => {
                record.apply_field(field, value)?;
            }
            None => {}
        }

        offset = end;
    }

    Ok((name, record, offset))
}

/// Accumulates a streamed query reply chunk by chunk.
///
/// The accumulated entries survive a failing status so callers can report
/// what arrived before it.
#[derive(Debug)]
pub struct QueryStream<T> {
    entries: BTreeMap<String, T>,
    status: Option<ResponseCode>,
}

impl<T> Default for QueryStream<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            status: None,
        }
    }
}

impl<T: QueryRecord> QueryStream<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one chunk body (the bytes after its protocol header).
    ///
    /// Returns the final status once a terminating record is seen, with
    /// QUERY_END reported as OK. Returns `None` when more chunks are needed.
    pub fn feed_chunk(&mut self, chunk: &[u8]) -> Result<Option<ResponseCode>, ProtocolError> {
        if let Some(status) = self.status {
            return Ok(Some(status));
        }

        let mut offset = 0;

        while offset < chunk.len() {
            let (header, next) = unpack_admin_header(chunk, offset)?;
            offset = next;

            let code = header.result();
            if !code.is_ok() {
                let status = match code {
                    ResponseCode::QueryEnd => ResponseCode::Ok,
                    other => other,
                };
                self.status = Some(status);
                return Ok(Some(status));
            }

            let (name, record, next) = decode_record::<T>(chunk, offset, header.field_count)?;
            offset = next;

            let Some(name) = name else {
                continue;
            };

            match self.entries.entry(name) {
                Entry::Occupied(mut entry) => entry.get_mut().merge(record),
                Entry::Vacant(entry) => {
                    entry.insert(record);
                }
            }
        }

        Ok(None)
    }

    pub fn status(&self) -> Option<ResponseCode> {
        self.status
    }

    pub fn entries(&self) -> &BTreeMap<String, T> {
        &self.entries
    }

    pub fn into_entries(self) -> BTreeMap<String, T> {
        self.entries
    }
}
