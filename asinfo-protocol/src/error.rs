//! Protocol error types and server response codes.

use crate::types::FieldType;
use std::fmt;
use thiserror::Error;

/// Errors raised while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("buffer truncated at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("write of {len} bytes at offset {offset} overflows buffer of {capacity} bytes")]
    BufferOverflow {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    #[error("invalid UTF-8 at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("field type {field_type} declares zero length")]
    EmptyField { field_type: u8 },

    #[error("unknown privilege code: {0}")]
    UnknownPrivilege(u8),

    #[error("{what} too long: {len} bytes (max {max})")]
    ValueTooLong {
        what: &'static str,
        len: usize,
        max: usize,
    },

    #[error("field {field} does not accept {kind} values")]
    UnsupportedFieldValue {
        field: FieldType,
        kind: &'static str,
    },

    #[error("field {field} could not cast {value:?} to an integer")]
    InvalidQuota { field: FieldType, value: String },

    #[error("message too large: {0} bytes")]
    MessageTooLarge(u64),

    #[error("encoded {actual} bytes but buffer holds {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("requested info name {requested:?} but got {received:?}")]
    NameMismatch { requested: String, received: String },
}

/// Result status carried in the admin header of every admin response.
///
/// Codes outside the known table are kept as `Unrecognized` so callers can
/// still report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Ok,
    UnknownServerError,
    /// Terminates a streamed query reply; treated as success.
    QueryEnd,
    SecurityNotSupported,
    SecurityNotEnabled,
    InvalidCommand,
    UnrecognizedFieldId,
    ValidButUnexpectedCommands,
    NoUserOrUnrecognizedUser,
    UserAlreadyExists,
    NoPasswordOrBadPassword,
    ExpiredPassword,
    ForbiddenPassword,
    NoCredentialOrBadCredential,
    ExpiredSession,
    NoRoleOrInvalidRole,
    RoleAlreadyExists,
    NoPrivilegesOrUnrecognizedPrivileges,
    BadWhitelist,
    QuotasNotEnabled,
    BadRateQuota,
    NotAuthenticated,
    RoleOrPrivilegeViolation,
    NotWhitelisted,
    RateQuotaExceeded,
    Unrecognized(u8),
}

impl ResponseCode {
    /// Returns the wire value of this code.
    pub fn code(&self) -> u8 {
        match self {
            ResponseCode::Ok => 0,
            ResponseCode::UnknownServerError => 1,
            ResponseCode::QueryEnd => 50,
            ResponseCode::SecurityNotSupported => 51,
            ResponseCode::SecurityNotEnabled => 52,
            ResponseCode::InvalidCommand => 54,
            ResponseCode::UnrecognizedFieldId => 55,
            ResponseCode::ValidButUnexpectedCommands => 56,
            ResponseCode::NoUserOrUnrecognizedUser => 60,
            ResponseCode::UserAlreadyExists => 61,
            ResponseCode::NoPasswordOrBadPassword => 62,
            ResponseCode::ExpiredPassword => 63,
            ResponseCode::ForbiddenPassword => 64,
            ResponseCode::NoCredentialOrBadCredential => 65,
            ResponseCode::ExpiredSession => 66,
            ResponseCode::NoRoleOrInvalidRole => 70,
            ResponseCode::RoleAlreadyExists => 71,
            ResponseCode::NoPrivilegesOrUnrecognizedPrivileges => 72,
            ResponseCode::BadWhitelist => 73,
            ResponseCode::QuotasNotEnabled => 74,
            ResponseCode::BadRateQuota => 75,
            ResponseCode::NotAuthenticated => 80,
            ResponseCode::RoleOrPrivilegeViolation => 81,
            ResponseCode::NotWhitelisted => 82,
            ResponseCode::RateQuotaExceeded => 83,
            ResponseCode::Unrecognized(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == ResponseCode::Ok
    }
}

impl From<u8> for ResponseCode {
    fn from(value: u8) -> Self {
        match value {
            0 => ResponseCode::Ok,
            1 => ResponseCode::UnknownServerError,
            50 => ResponseCode::QueryEnd,
            51 => ResponseCode::SecurityNotSupported,
            52 => ResponseCode::SecurityNotEnabled,
            54 => ResponseCode::InvalidCommand,
            55 => ResponseCode::UnrecognizedFieldId,
            56 => ResponseCode::ValidButUnexpectedCommands,
            60 => ResponseCode::NoUserOrUnrecognizedUser,
            61 => ResponseCode::UserAlreadyExists,
            62 => ResponseCode::NoPasswordOrBadPassword,
            63 => ResponseCode::ExpiredPassword,
            64 => ResponseCode::ForbiddenPassword,
            65 => ResponseCode::NoCredentialOrBadCredential,
            66 => ResponseCode::ExpiredSession,
            70 => ResponseCode::NoRoleOrInvalidRole,
            71 => ResponseCode::RoleAlreadyExists,
            72 => ResponseCode::NoPrivilegesOrUnrecognizedPrivileges,
            73 => ResponseCode::BadWhitelist,
            74 => ResponseCode::QuotasNotEnabled,
            75 => ResponseCode::BadRateQuota,
            80 => ResponseCode::NotAuthenticated,
            81 => ResponseCode::RoleOrPrivilegeViolation,
            82 => ResponseCode::NotWhitelisted,
            83 => ResponseCode::RateQuotaExceeded,
            other => ResponseCode::Unrecognized(other),
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ResponseCode::Ok => "Ok",
            ResponseCode::UnknownServerError => "Unknown server error",
            ResponseCode::QueryEnd => "Query end",
            ResponseCode::SecurityNotSupported => "Security not supported",
            ResponseCode::SecurityNotEnabled => "Security not enabled",
            ResponseCode::InvalidCommand => "Invalid command",
            ResponseCode::UnrecognizedFieldId => "Unrecognized field id",
            ResponseCode::ValidButUnexpectedCommands => "Valid but unexpected commands",
            ResponseCode::NoUserOrUnrecognizedUser => "No user or unrecognized user",
            ResponseCode::UserAlreadyExists => "User already exists",
            ResponseCode::NoPasswordOrBadPassword => "No password or bad password",
            ResponseCode::ExpiredPassword => "Expired password",
            ResponseCode::ForbiddenPassword => "Forbidden password",
            ResponseCode::NoCredentialOrBadCredential => "No credential or bad credential",
            ResponseCode::ExpiredSession => "Expired session",
            ResponseCode::NoRoleOrInvalidRole => "No role or invalid role",
            ResponseCode::RoleAlreadyExists => "Role already exists",
            ResponseCode::NoPrivilegesOrUnrecognizedPrivileges => {
                "No privileges or unrecognized privileges"
            }
            ResponseCode::BadWhitelist => "Bad whitelist",
            ResponseCode::QuotasNotEnabled => "Quotas not enabled",
            ResponseCode::BadRateQuota => "Bad rate quota",
            ResponseCode::NotAuthenticated => "Not authenticated",
            ResponseCode::RoleOrPrivilegeViolation => "Role or privilege violation",
            ResponseCode::NotWhitelisted => "Not whitelisted",
            ResponseCode::RateQuotaExceeded => "Rate quota exceeded",
            ResponseCode::Unrecognized(code) => {
                return write!(f, "Unrecognized response code {}", code)
            }
        };
        f.write_str(text)
    }
}
