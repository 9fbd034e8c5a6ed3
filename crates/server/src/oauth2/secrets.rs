//! Secret handling: random values, client secret hashing, token hashing.
//!
//! Client secrets use Argon2id. Access tokens are high-entropy random values,
//! so a plain SHA-256 digest is enough to index them.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of authorization codes and of the random part of access tokens.
pub const RANDOM_VALUE_LENGTH: usize = 48;

/// Generate a random string over `[A-Za-z0-9]` from the OS CSPRNG.
///
/// Bytes above the largest multiple of 62 are rejected so every character is
/// equally likely.
pub fn generate_alphanumeric(len: usize) -> Result<String, getrandom::Error> {
    const LIMIT: u8 = (256 / ALPHANUMERIC.len() * ALPHANUMERIC.len()) as u8;
    let mut out = String::with_capacity(len);
    let mut buf = [0u8; 64];
    while out.len() < len {
        getrandom::fill(&mut buf)?;
        for &b in buf.iter().filter(|&&b| b < LIMIT) {
            if out.len() == len {
                break;
            }
            out.push(ALPHANUMERIC[(b as usize) % ALPHANUMERIC.len()] as char);
        }
    }
    Ok(out)
}

/// Hash a client secret using Argon2id.
///
/// Returns the PHC-formatted hash string suitable for storage.
pub fn hash_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(secret.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a client secret against a stored hash.
pub fn verify_secret_hash(secret: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Digest under which an access token is stored and looked up.
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
}

pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
