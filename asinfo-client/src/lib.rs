//! # asinfo-client
//!
//! Async client for a node's info and security/admin ports.
//!
//! This crate provides:
//! - Plain info requests (`info`, `info_all`, `info_single`, `info_many`)
//! - Every security/admin command, including login with session tokens
//! - Fixed-salt credential hashing
//! - A single-node TCP or TLS connection with optional login
//!
//! Commands are generic over any `AsyncRead + AsyncWrite + Unpin` stream, so
//! they run on a [`Connection`]'s stream or on a transport the caller owns.

pub mod admin;
pub mod connection;
pub mod error;
pub mod info;
pub mod password;
pub mod session;
pub mod stream;
pub mod tls;

mod transport;

pub use admin::{Quota, Roles, Users};
pub use connection::{Connection, ConnectionConfig, Credentials, TlsClientConfig};
pub use error::ClientError;
pub use password::hash_password;
pub use session::{AuthMode, LoginOutcome, Session};
pub use stream::ClientStream;
