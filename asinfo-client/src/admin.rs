//! Security/admin commands.
//!
//! One function per admin command, generic over the transport. Each sends a
//! single request and returns the status the server reported. A non-OK status
//! is data, not an error; `Err` means the exchange itself failed.

use crate::error::ClientError;
use crate::password::hash_password;
use crate::session::{AuthMode, LoginOutcome, Session};
use crate::transport::{receive_body, receive_protocol_header, send, send_and_get_admin_header};
use asinfo_protocol::{
    parse_session_info, AdminCommand, AdminRequest, FieldType, FieldValue, QueryRecord,
    QueryStream, ResponseCode, RoleInfo, UserInfo, ADMIN_HEADER_SIZE,
};
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::io::{AsyncRead, AsyncWrite};

/// A rate quota, given as a number or as numeric text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota<'a> {
    Limit(u32),
    /// Parsed when the request is encoded; non-numeric text is an error.
    Text(&'a str),
}

impl From<u32> for Quota<'_> {
    fn from(value: u32) -> Self {
        Quota::Limit(value)
    }
}

impl<'a> From<&'a str> for Quota<'a> {
    fn from(value: &'a str) -> Self {
        Quota::Text(value)
    }
}

impl<'a> From<Quota<'a>> for FieldValue<'a> {
    fn from(quota: Quota<'a>) -> Self {
        match quota {
            Quota::Limit(limit) => FieldValue::Integer(limit),
            Quota::Text(text) => FieldValue::Text(text),
        }
    }
}

/// Users keyed by name.
pub type Users = BTreeMap<String, UserInfo>;

/// Roles keyed by name.
pub type Roles = BTreeMap<String, RoleInfo>;

async fn execute<S>(stream: &mut S, request: AdminRequest<'_>) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let buf = request.encode()?;
    let reply = send_and_get_admin_header(stream, &buf).await?;
    let code = reply.admin.result();

    tracing::debug!("{} -> {}", request.command(), code);
    Ok(code)
}

// =========================================================================
// Authentication
// =========================================================================

async fn authenticate<S>(
    stream: &mut S,
    user: &str,
    field: FieldType,
    secret: &[u8],
) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = AdminRequest::new(AdminCommand::Authenticate)
        .field(FieldType::User, FieldValue::Text(user))
        .field(field, FieldValue::Bytes(secret));
    execute(stream, request).await
}

/// Authenticates with a session token issued by an earlier login.
pub async fn authenticate_new<S>(
    stream: &mut S,
    user: &str,
    token: &[u8],
) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    authenticate(stream, user, FieldType::SessionToken, token).await
}

/// Authenticates with a hashed password, for servers without LOGIN.
pub async fn authenticate_old<S>(
    stream: &mut S,
    user: &str,
    password: &str,
) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let credential = hash_password(password)?;
    authenticate(stream, user, FieldType::Credential, credential.as_bytes()).await
}

/// Logs in and returns the resulting session.
///
/// A server that answers INVALID_COMMAND predates LOGIN; the credential is
/// then sent once with AUTHENTICATE and that result is returned instead.
pub async fn login<S>(
    stream: &mut S,
    user: &str,
    password: &str,
    mode: AuthMode,
) -> Result<LoginOutcome, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let credential = hash_password(password)?;
    let clear_password = mode
        .sends_clear_password()
        .then_some(FieldValue::Text(password));

    let request = AdminRequest::new(AdminCommand::Login)
        .field(FieldType::User, FieldValue::Text(user))
        .field(FieldType::Credential, FieldValue::Text(&credential))
        .optional_field(FieldType::ClearPassword, clear_password);
    let buf = request.encode()?;

    let reply = send_and_get_admin_header(stream, &buf).await?;
    let code = reply.admin.result();

    if !code.is_ok() {
        if code == ResponseCode::InvalidCommand {
            tracing::debug!("LOGIN not supported, falling back to AUTHENTICATE");
            let legacy =
                authenticate(stream, user, FieldType::Credential, credential.as_bytes()).await?;
            return Ok(LoginOutcome::Legacy(legacy));
        }

        tracing::debug!("LOGIN -> {}", code);
        return Ok(LoginOutcome::Failed(code));
    }

    let field_count = reply.admin.field_count;
    let data_size = reply
        .protocol
        .size
        .checked_sub(ADMIN_HEADER_SIZE as u64)
        .ok_or(ClientError::MissingSessionToken)?;
    if field_count < 1 {
        return Err(ClientError::MissingSessionToken);
    }

    let mut body_header = reply.protocol;
    body_header.size = data_size;
    let body = receive_body(stream, &body_header).await?;

    let info = parse_session_info(&body, field_count)?;
    let token = info.token.ok_or(ClientError::MissingSessionToken)?;
    let session = Session::new(token, info.ttl, Utc::now());

    tracing::debug!(
        "LOGIN -> {} (session expires at {})",
        code,
        session.expiration_epoch()
    );
    Ok(LoginOutcome::Authenticated(session))
}

// =========================================================================
// Users
// =========================================================================

pub async fn create_user<S>(
    stream: &mut S,
    user: &str,
    password: &str,
    roles: &[&str],
) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let hashed = hash_password(password)?;
    let request = AdminRequest::new(AdminCommand::CreateUser)
        .field(FieldType::User, FieldValue::Text(user))
        .field(FieldType::Password, FieldValue::Text(&hashed))
        .field(FieldType::Roles, FieldValue::List(roles));
    execute(stream, request).await
}

pub async fn drop_user<S>(stream: &mut S, user: &str) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request =
        AdminRequest::new(AdminCommand::DropUser).field(FieldType::User, FieldValue::Text(user));
    execute(stream, request).await
}

/// Sets a user's password without knowing the old one.
pub async fn set_password<S>(
    stream: &mut S,
    user: &str,
    password: &str,
) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let hashed = hash_password(password)?;
    let request = AdminRequest::new(AdminCommand::SetPassword)
        .field(FieldType::User, FieldValue::Text(user))
        .field(FieldType::Password, FieldValue::Text(&hashed));
    execute(stream, request).await
}

pub async fn change_password<S>(
    stream: &mut S,
    user: &str,
    old_password: &str,
    new_password: &str,
) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let old_hashed = hash_password(old_password)?;
    let new_hashed = hash_password(new_password)?;
    let request = AdminRequest::new(AdminCommand::ChangePassword)
        .field(FieldType::User, FieldValue::Text(user))
        .field(FieldType::OldPassword, FieldValue::Text(&old_hashed))
        .field(FieldType::Password, FieldValue::Text(&new_hashed));
    execute(stream, request).await
}

pub async fn grant_roles<S>(
    stream: &mut S,
    user: &str,
    roles: &[&str],
) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = AdminRequest::new(AdminCommand::GrantRoles)
        .field(FieldType::User, FieldValue::Text(user))
        .field(FieldType::Roles, FieldValue::List(roles));
    execute(stream, request).await
}

pub async fn revoke_roles<S>(
    stream: &mut S,
    user: &str,
    roles: &[&str],
) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = AdminRequest::new(AdminCommand::RevokeRoles)
        .field(FieldType::User, FieldValue::Text(user))
        .field(FieldType::Roles, FieldValue::List(roles));
    execute(stream, request).await
}

/// Sends a query and accumulates its streamed reply until a record with a
/// non-OK status ends it. A server that never ends the stream blocks this
/// call; bound it with a timeout.
async fn query<S, T>(
    stream: &mut S,
    request: AdminRequest<'_>,
) -> Result<(ResponseCode, BTreeMap<String, T>), ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    T: QueryRecord,
{
    let buf = request.encode()?;
    send(stream, &buf).await?;

    let mut records = QueryStream::<T>::new();
    loop {
        let header = receive_protocol_header(stream).await?;
        let chunk = receive_body(stream, &header).await?;

        if let Some(code) = records.feed_chunk(&chunk)? {
            let entries = records.into_entries();
            tracing::debug!("{} -> {} ({} entries)", request.command(), code, entries.len());
            return Ok((code, entries));
        }
    }
}

/// Lists users, or the one named user.
///
/// On a failing status the users received before it are still returned.
pub async fn query_users<S>(
    stream: &mut S,
    user: Option<&str>,
) -> Result<(ResponseCode, Users), ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = AdminRequest::new(AdminCommand::QueryUsers)
        .optional_field(FieldType::User, user.map(FieldValue::Text));
    query(stream, request).await
}

// =========================================================================
// Roles
// =========================================================================

/// Creates a role. Empty privilege and whitelist lists are left out of the
/// request, as are absent quotas.
pub async fn create_role<S>(
    stream: &mut S,
    role: &str,
    privileges: Option<&[&str]>,
    whitelist: Option<&[&str]>,
    read_quota: Option<Quota<'_>>,
    write_quota: Option<Quota<'_>>,
) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let privileges = privileges.filter(|privileges| !privileges.is_empty());
    let whitelist = whitelist
        .filter(|whitelist| !whitelist.is_empty())
        .map(|whitelist| whitelist.join(","));

    let request = AdminRequest::new(AdminCommand::CreateRole)
        .field(FieldType::Role, FieldValue::Text(role))
        .optional_field(FieldType::Privileges, privileges.map(FieldValue::List))
        .optional_field(FieldType::Whitelist, whitelist.as_deref().map(FieldValue::Text))
        .optional_field(FieldType::ReadQuota, read_quota.map(FieldValue::from))
        .optional_field(FieldType::WriteQuota, write_quota.map(FieldValue::from));
    execute(stream, request).await
}

pub async fn delete_role<S>(stream: &mut S, role: &str) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request =
        AdminRequest::new(AdminCommand::DeleteRole).field(FieldType::Role, FieldValue::Text(role));
    execute(stream, request).await
}

pub async fn add_privileges<S>(
    stream: &mut S,
    role: &str,
    privileges: &[&str],
) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = AdminRequest::new(AdminCommand::AddPrivileges)
        .field(FieldType::Role, FieldValue::Text(role))
        .field(FieldType::Privileges, FieldValue::List(privileges));
    execute(stream, request).await
}

pub async fn delete_privileges<S>(
    stream: &mut S,
    role: &str,
    privileges: &[&str],
) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = AdminRequest::new(AdminCommand::DeletePrivileges)
        .field(FieldType::Role, FieldValue::Text(role))
        .field(FieldType::Privileges, FieldValue::List(privileges));
    execute(stream, request).await
}

/// Replaces a role's whitelist. `None` clears it; an empty list is still
/// sent as an empty field.
pub async fn set_whitelist<S>(
    stream: &mut S,
    role: &str,
    whitelist: Option<&[&str]>,
) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let whitelist = whitelist.map(|whitelist| whitelist.join(","));
    let request = AdminRequest::new(AdminCommand::SetWhitelist)
        .field(FieldType::Role, FieldValue::Text(role))
        .optional_field(FieldType::Whitelist, whitelist.as_deref().map(FieldValue::Text));
    execute(stream, request).await
}

pub async fn delete_whitelist<S>(stream: &mut S, role: &str) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    set_whitelist(stream, role, None).await
}

/// Sets whichever quotas are given and leaves the others untouched.
pub async fn set_quotas<S>(
    stream: &mut S,
    role: &str,
    read_quota: Option<Quota<'_>>,
    write_quota: Option<Quota<'_>>,
) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = AdminRequest::new(AdminCommand::SetRateQuotas)
        .field(FieldType::Role, FieldValue::Text(role))
        .optional_field(FieldType::ReadQuota, read_quota.map(FieldValue::from))
        .optional_field(FieldType::WriteQuota, write_quota.map(FieldValue::from));
    execute(stream, request).await
}

/// Removes quotas by setting the flagged ones to zero. The server cannot
/// tell this apart from an explicit zero quota.
pub async fn delete_quotas<S>(
    stream: &mut S,
    role: &str,
    read_quota: bool,
    write_quota: bool,
) -> Result<ResponseCode, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let read = read_quota.then_some(Quota::Limit(0));
    let write = write_quota.then_some(Quota::Limit(0));
    set_quotas(stream, role, read, write).await
}

/// Lists roles, or the one named role.
///
/// On a failing status the roles received before it are still returned.
pub async fn query_roles<S>(
    stream: &mut S,
    role: Option<&str>,
) -> Result<(ResponseCode, Roles), ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = AdminRequest::new(AdminCommand::QueryRoles)
        .optional_field(FieldType::Role, role.map(FieldValue::Text));
    query(stream, request).await
}
