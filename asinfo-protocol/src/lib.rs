//! # asinfo-protocol
//!
//! Wire codec for the cluster "info" and security/admin protocols.
//!
//! This crate provides:
//! - Big-endian primitive packing into pre-sized, zero-filled buffers
//! - The 8-byte protocol header and 16-byte admin header
//! - Type-tagged admin fields (roles, privileges, quotas, session token)
//! - Admin request building and streamed query record decoding
//! - Plain info request encoding and response parsing
//!
//! Every message on the wire has the shape:
//!
//! ```text
//! | proto header (8) | admin header (16) | field | field | ... |
//! | 1 | 1 |    6     |1|1|1|1|    12     | 4 |1| value ...     |
//! ```
//!
//! Info messages carry the protocol header followed by newline-separated text.
//!
//! The crate performs no I/O; see `asinfo-client` for the exchanges.

pub mod admin;
pub mod error;
pub mod field;
pub mod header;
pub mod info;
pub mod query;
pub mod types;
pub mod wire;

pub use admin::{parse_session_info, AdminRequest, SessionInfo};
pub use error::{ProtocolError, ResponseCode};
pub use field::{FieldHeader, FieldValue};
pub use header::{AdminHeader, ProtocolHeader};
pub use info::{InfoRequest, InfoResponse};
pub use query::{QueryRecord, QueryStream, RateInfo, RoleInfo, UserInfo};
pub use types::{AdminCommand, FieldType, Privilege};

/// Size of the protocol header preceding every message.
pub const PROTOCOL_HEADER_SIZE: usize = 8;

/// Size of the admin header (4 meaningful bytes, 12 reserved).
pub const ADMIN_HEADER_SIZE: usize = 16;

/// Size of the header preceding every admin field (4-byte length, 1-byte type).
pub const FIELD_HEADER_SIZE: usize = 5;

/// Protocol header plus admin header.
pub const TOTAL_HEADER_SIZE: usize = PROTOCOL_HEADER_SIZE + ADMIN_HEADER_SIZE;

/// Protocol version used for admin messages (also the admin header scheme).
pub const ADMIN_MSG_VERSION: u8 = 0;

/// Message type of admin/security messages.
pub const ADMIN_MSG_TYPE: u8 = 2;

/// Protocol version used for info messages.
pub const INFO_MSG_VERSION: u8 = 2;

/// Message type of info messages.
pub const INFO_MSG_TYPE: u8 = 1;

/// Largest size representable by the three 16-bit words of the protocol header.
pub const MAX_MESSAGE_SIZE: u64 = (1 << 48) - 1;

/// bcrypt salt the server expects credentials to be hashed with.
pub const ADMIN_SALT: &str = "$2a$10$7EqJtq98hPqEX7fNZaFWoO";
