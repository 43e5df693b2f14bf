//! Plain info request encoding and reply parsing.
//!
//! An info request is a protocol header (version 2, type 1) followed by the
//! requested names, newline-joined with a trailing newline. An empty body asks
//! for every available name. Replies are newline-terminated `name\tvalue`
//! lines.

use crate::error::ProtocolError;
use crate::header::pack_protocol_header;
use crate::wire::pack_bytes;
use crate::{INFO_MSG_TYPE, INFO_MSG_VERSION, PROTOCOL_HEADER_SIZE};
use bytes::{Bytes, BytesMut};
use std::collections::BTreeMap;

/// Names to request from a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoRequest<'a> {
    /// Every name the node serves.
    All,
    /// One name; the reply is its bare value.
    Single(&'a str),
    /// Several names; the reply is a name to value map.
    Many(&'a [&'a str]),
}

impl InfoRequest<'_> {
    fn body(&self) -> String {
        match self {
            InfoRequest::All => String::new(),
            InfoRequest::Single(name) => format!("{}\n", name),
            InfoRequest::Many(names) => format!("{}\n", names.join("\n")),
        }
    }

    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let body = self.body();
        let mut buf = BytesMut::zeroed(PROTOCOL_HEADER_SIZE + body.len());

        let offset = pack_protocol_header(
            &mut buf,
            0,
            INFO_MSG_VERSION,
            INFO_MSG_TYPE,
            body.len() as u64,
        )?;
        pack_bytes(&mut buf, offset, body.as_bytes())?;

        Ok(buf.freeze())
    }
}

/// Parsed info reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoResponse {
    Value(String),
    Map(BTreeMap<String, String>),
}

impl InfoResponse {
    /// Parses a reply body for `request`.
    pub fn parse(request: &InfoRequest<'_>, body: &[u8]) -> Result<Self, ProtocolError> {
        match request {
            InfoRequest::Single(requested) => {
                parse_single(requested, body).map(InfoResponse::Value)
            }
            InfoRequest::All | InfoRequest::Many(_) => parse_map(body).map(InfoResponse::Map),
        }
    }

    pub fn as_value(&self) -> Option<&str> {
        match self {
            InfoResponse::Value(value) => Some(value),
            InfoResponse::Map(_) => None,
        }
    }

    pub fn into_map(self) -> Option<BTreeMap<String, String>> {
        match self {
            InfoResponse::Map(map) => Some(map),
            InfoResponse::Value(_) => None,
        }
    }
}

fn decode_text(body: &[u8]) -> Result<&str, ProtocolError> {
    std::str::from_utf8(body).map_err(|e| ProtocolError::InvalidUtf8 {
        offset: e.valid_up_to(),
    })
}

/// Parses a single-name reply. The first line must echo `requested`.
pub fn parse_single(requested: &str, body: &[u8]) -> Result<String, ProtocolError> {
    let text = decode_text(body)?;
    let first = text.split('\n').next().unwrap_or("");
    let (name, value) = split_line(first);

    if name != requested {
        return Err(ProtocolError::NameMismatch {
            requested: requested.to_string(),
            received: name.to_string(),
        });
    }
    Ok(value.to_string())
}

/// Parses a multi-name reply into a map, skipping blank lines.
pub fn parse_map(body: &[u8]) -> Result<BTreeMap<String, String>, ProtocolError> {
    let text = decode_text(body)?;
    let map = text
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (name, value) = split_line(line);
            (name.to_string(), value.to_string())
        })
        .collect();
    Ok(map)
}

/// Splits on the first tab. A line without one is all name.
fn split_line(line: &str) -> (&str, &str) {
    line.split_once('\t').unwrap_or((line, ""))
}
