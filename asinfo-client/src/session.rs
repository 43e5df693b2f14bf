//! Login sessions.

use asinfo_protocol::ResponseCode;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};

/// Seconds shaved off the advertised TTL so the local copy expires before
/// the server's.
pub const SESSION_EXPIRY_MARGIN_SECS: i64 = 60;

/// How the server should validate a login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Server-side users; only the credential hash is sent.
    #[default]
    Internal,
    /// External directory; the clear password is sent too, so use TLS.
    External,
    /// External directory over an unencrypted connection.
    ExternalInsecure,
    /// Certificate-based authentication.
    Pki,
}

impl AuthMode {
    /// Whether the login carries a CLEAR_PASSWORD field.
    pub fn sends_clear_password(self) -> bool {
        !matches!(self, AuthMode::Internal)
    }
}

/// Session issued by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: Bytes,
    expiration: Option<DateTime<Utc>>,
}

impl Session {
    /// Builds a session from a login reply received at `now`.
    pub fn new(token: Bytes, ttl_secs: Option<u32>, now: DateTime<Utc>) -> Self {
        let expiration = ttl_secs.map(|ttl| {
            now + Duration::seconds(i64::from(ttl) - SESSION_EXPIRY_MARGIN_SECS)
        });

        Self { token, expiration }
    }

    pub fn token(&self) -> &Bytes {
        &self.token
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    /// Expiration as Unix seconds, 0 when the server advertised no TTL.
    pub fn expiration_epoch(&self) -> i64 {
        self.expiration.map_or(0, |at| at.timestamp())
    }

    /// Sessions without a TTL never expire locally.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|at| now >= at)
    }
}

/// Terminal state of a login exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The server issued a session.
    Authenticated(Session),
    /// The server predates LOGIN; this is the result of the credential
    /// authentication sent in its place.
    Legacy(ResponseCode),
    /// The server rejected the login.
    Failed(ResponseCode),
}

impl LoginOutcome {
    /// Status to report for this outcome. A legacy fallback reports the
    /// fallback's status, never INVALID_COMMAND.
    pub fn code(&self) -> ResponseCode {
        match self {
            LoginOutcome::Authenticated(_) => ResponseCode::Ok,
            LoginOutcome::Legacy(code) | LoginOutcome::Failed(code) => *code,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            LoginOutcome::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    /// Whether the connection is now authenticated.
    pub fn is_ok(&self) -> bool {
        self.code().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_expiration_subtracts_margin() {
        let session = Session::new(Bytes::from_static(b"tok"), Some(3600), at(1_000_000));
        assert_eq!(session.expiration_epoch(), 1_000_000 + 3600 - 60);
        assert!(!session.is_expired_at(at(1_003_539)));
        assert!(session.is_expired_at(at(1_003_540)));
    }

    #[test]
    fn test_no_ttl_never_expires() {
        let session = Session::new(Bytes::from_static(b"tok"), None, at(1_000_000));
        assert_eq!(session.expiration_epoch(), 0);
        assert_eq!(session.expiration(), None);
        assert!(!session.is_expired());
        assert_eq!(session.token().as_ref(), b"tok");
    }

    #[test]
    fn test_outcome_codes() {
        let session = Session::new(Bytes::from_static(b"tok"), None, at(0));
        let outcome = LoginOutcome::Authenticated(session.clone());
        assert_eq!(outcome.code(), ResponseCode::Ok);
        assert_eq!(outcome.session(), Some(&session));
        assert!(outcome.is_ok());

        let outcome = LoginOutcome::Legacy(ResponseCode::Ok);
        assert!(outcome.is_ok());
        assert_eq!(outcome.session(), None);

        let outcome = LoginOutcome::Failed(ResponseCode::NotAuthenticated);
        assert_eq!(outcome.code(), ResponseCode::NotAuthenticated);
        assert!(!outcome.is_ok());
    }

    #[test]
    fn test_auth_mode_fields() {
        assert!(!AuthMode::Internal.sends_clear_password());
        assert!(AuthMode::External.sends_clear_password());
        assert!(AuthMode::ExternalInsecure.sends_clear_password());
        assert!(AuthMode::Pki.sends_clear_password());
        assert_eq!(AuthMode::default(), AuthMode::Internal);
    }
}
