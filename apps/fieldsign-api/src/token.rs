//! Public link tokens and recipient address validation
//!
//! Tokens are 128 bits of hex. The format is checked before any store
//! lookup so malformed links are rejected without a round trip.

use lazy_static::lazy_static;
use rand::RngCore;
use regex::Regex;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"^[0-9a-f]{32}$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// Generate an unguessable public link token
pub fn generate() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn is_valid(token: &str) -> bool {
    TOKEN_RE.is_match(token)
}

/// Syntactic check only; deliverability is out of scope
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}
