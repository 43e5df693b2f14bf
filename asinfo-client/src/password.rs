//! Credential hashing.
//!
//! The server checks credentials against a bcrypt hash made with one fixed
//! salt, so every client must hash with exactly [`ADMIN_SALT`].

use crate::error::ClientError;
use asinfo_protocol::ADMIN_SALT;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

/// bcrypt's own base64 alphabet, unpadded.
const BCRYPT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::BCRYPT,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// Splits `$2a$<cost>$<22 chars>` into cost and raw salt bytes.
fn decode_salt(salt: &str) -> Result<(u32, [u8; 16]), ClientError> {
    let invalid = || ClientError::PasswordHash(format!("malformed salt {:?}", salt));

    let mut parts = salt.strip_prefix('$').ok_or_else(invalid)?.split('$');
    let (_version, cost, encoded) = match (parts.next(), parts.next(), parts.next()) {
        (Some(version), Some(cost), Some(encoded)) => (version, cost, encoded),
        _ => return Err(invalid()),
    };

    let cost = cost.parse::<u32>().map_err(|_| invalid())?;
    let decoded = BCRYPT_BASE64.decode(encoded).map_err(|_| invalid())?;
    let raw: [u8; 16] = decoded.as_slice().try_into().map_err(|_| invalid())?;

    Ok((cost, raw))
}

/// Hashes a password with the fixed admin salt, returning the 60-byte
/// `$2a$` credential string.
pub fn hash_password(password: impl AsRef<[u8]>) -> Result<String, ClientError> {
    let (cost, salt) = decode_salt(ADMIN_SALT)?;
    let parts = bcrypt::hash_with_salt(password, cost, salt)
        .map_err(|e| ClientError::PasswordHash(e.to_string()))?;

    Ok(parts.format_for_version(bcrypt::Version::TwoA))
}
