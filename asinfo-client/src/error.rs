//! Client error types.

use asinfo_protocol::{ProtocolError, ResponseCode};
use std::io;
use thiserror::Error;

/// Client errors.
///
/// A non-OK status reported by the server is not an error: admin commands
/// return it as their `Ok` value.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("login failed to retrieve session token")]
    MissingSessionToken,

    #[error("empty info response")]
    EmptyResponse,

    #[error("no credentials configured")]
    MissingCredentials,

    #[error("authentication failed: {0}")]
    AuthenticationFailed(ResponseCode),

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),
}

impl From<io::Error> for ClientError {
    /// A read that hits end of stream before its byte count is a premature
    /// close, not a generic I/O failure.
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => ClientError::ConnectionClosed,
            _ => ClientError::Io(err),
        }
    }
}

impl ClientError {
    /// Whether the stream may now be out of step with the node, so the next
    /// exchange could read an earlier reply. Errors raised while encoding a
    /// request happen before anything is sent and leave the stream usable.
    pub fn desyncs_stream(&self) -> bool {
        match self {
            ClientError::Io(_) | ClientError::ConnectionClosed | ClientError::Timeout => true,
            ClientError::Protocol(err) => !matches!(
                err,
                ProtocolError::InvalidQuota { .. }
                    | ProtocolError::UnsupportedFieldValue { .. }
                    | ProtocolError::ValueTooLong { .. }
                    | ProtocolError::SizeMismatch { .. }
            ),
            _ => false,
        }
    }

    /// Returns whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_) | ClientError::Timeout | ClientError::ConnectionClosed
        )
    }
}
