//! Wire enumerations: admin commands, field types and privileges.
//!
//! These codes are part of the server protocol and must not change.

use crate::error::ProtocolError;
use std::fmt;

/// Admin command carried in the admin header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AdminCommand {
    Authenticate = 0,
    CreateUser = 1,
    DropUser = 2,
    SetPassword = 3,
    ChangePassword = 4,
    GrantRoles = 5,
    RevokeRoles = 6,
    QueryUsers = 9,
    CreateRole = 10,
    DeleteRole = 11,
    AddPrivileges = 12,
    DeletePrivileges = 13,
    SetWhitelist = 14,
    SetRateQuotas = 15,
    QueryRoles = 16,
    Login = 20,
}

impl AdminCommand {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for AdminCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdminCommand::Authenticate => "AUTHENTICATE",
            AdminCommand::CreateUser => "CREATE_USER",
            AdminCommand::DropUser => "DROP_USER",
            AdminCommand::SetPassword => "SET_PASSWORD",
            AdminCommand::ChangePassword => "CHANGE_PASSWORD",
            AdminCommand::GrantRoles => "GRANT_ROLES",
            AdminCommand::RevokeRoles => "REVOKE_ROLES",
            AdminCommand::QueryUsers => "QUERY_USERS",
            AdminCommand::CreateRole => "CREATE_ROLE",
            AdminCommand::DeleteRole => "DELETE_ROLE",
            AdminCommand::AddPrivileges => "ADD_PRIVILEGES",
            AdminCommand::DeletePrivileges => "DELETE_PRIVILEGES",
            AdminCommand::SetWhitelist => "SET_WHITELIST",
            AdminCommand::SetRateQuotas => "SET_RATE_QUOTAS",
            AdminCommand::QueryRoles => "QUERY_ROLES",
            AdminCommand::Login => "LOGIN",
        };
        f.write_str(name)
    }
}

/// Type tag of an admin field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldType {
    User = 0,
    Password = 1,
    OldPassword = 2,
    Credential = 3,
    ClearPassword = 4,
    SessionToken = 5,
    SessionTtl = 6,
    Roles = 10,
    Role = 11,
    Privileges = 12,
    Whitelist = 13,
    ReadQuota = 14,
    WriteQuota = 15,
    ReadInfo = 16,
    WriteInfo = 17,
    Connections = 18,
}

impl FieldType {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Maps a wire code to a field type. Unknown codes return `None` and are
    /// skipped by response decoders.
    pub fn from_code(code: u8) -> Option<Self> {
        let field = match code {
            0 => FieldType::User,
            1 => FieldType::Password,
            2 => FieldType::OldPassword,
            3 => FieldType::Credential,
            4 => FieldType::ClearPassword,
            5 => FieldType::SessionToken,
            6 => FieldType::SessionTtl,
            10 => FieldType::Roles,
            11 => FieldType::Role,
            12 => FieldType::Privileges,
            13 => FieldType::Whitelist,
            14 => FieldType::ReadQuota,
            15 => FieldType::WriteQuota,
            16 => FieldType::ReadInfo,
            17 => FieldType::WriteInfo,
            18 => FieldType::Connections,
            _ => return None,
        };
        Some(field)
    }

    /// Quota fields carry a 4-byte integer regardless of the value given.
    pub fn is_quota(self) -> bool {
        matches!(self, FieldType::ReadQuota | FieldType::WriteQuota)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::User => "USER",
            FieldType::Password => "PASSWORD",
            FieldType::OldPassword => "OLD_PASSWORD",
            FieldType::Credential => "CREDENTIAL",
            FieldType::ClearPassword => "CLEAR_PASSWORD",
            FieldType::SessionToken => "SESSION_TOKEN",
            FieldType::SessionTtl => "SESSION_TTL",
            FieldType::Roles => "ROLES",
            FieldType::Role => "ROLE",
            FieldType::Privileges => "PRIVILEGES",
            FieldType::Whitelist => "WHITELIST",
            FieldType::ReadQuota => "READ_QUOTA",
            FieldType::WriteQuota => "WRITE_QUOTA",
            FieldType::ReadInfo => "READ_INFO",
            FieldType::WriteInfo => "WRITE_INFO",
            FieldType::Connections => "CONNECTIONS",
        };
        f.write_str(name)
    }
}

/// Permission granted by a role privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Privilege {
    UserAdmin = 0,
    SysAdmin = 1,
    DataAdmin = 2,
    Read = 10,
    ReadWrite = 11,
    ReadWriteUdf = 12,
    Write = 13,
    /// Sent for permission names the client does not recognise; the server
    /// rejects it.
    Error = 255,
}

impl Privilege {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parses a permission name. Case-insensitive, `_` and `-` are equivalent.
    /// Unknown names map to [`Privilege::Error`].
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().replace('_', "-").as_str() {
            "user-admin" => Privilege::UserAdmin,
            "sys-admin" => Privilege::SysAdmin,
            "data-admin" => Privilege::DataAdmin,
            "read" => Privilege::Read,
            "read-write" => Privilege::ReadWrite,
            "read-write-udf" => Privilege::ReadWriteUdf,
            "write" => Privilege::Write,
            _ => Privilege::Error,
        }
    }

    /// Global-only permissions are never qualified by namespace or set, and
    /// carry no scope bytes on the wire.
    pub fn is_global_only_scope(self) -> bool {
        matches!(
            self,
            Privilege::UserAdmin | Privilege::SysAdmin | Privilege::DataAdmin
        )
    }
}

impl TryFrom<u8> for Privilege {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(Privilege::UserAdmin),
            1 => Ok(Privilege::SysAdmin),
            2 => Ok(Privilege::DataAdmin),
            10 => Ok(Privilege::Read),
            11 => Ok(Privilege::ReadWrite),
            12 => Ok(Privilege::ReadWriteUdf),
            13 => Ok(Privilege::Write),
            255 => Ok(Privilege::Error),
            other => Err(ProtocolError::UnknownPrivilege(other)),
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Privilege::UserAdmin => "user-admin",
            Privilege::SysAdmin => "sys-admin",
            Privilege::DataAdmin => "data-admin",
            Privilege::Read => "read",
            Privilege::ReadWrite => "read-write",
            Privilege::ReadWriteUdf => "read-write-udf",
            Privilege::Write => "write",
            Privilege::Error => "error",
        };
        f.write_str(name)
    }
}
