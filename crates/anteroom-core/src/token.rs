//! Admission token generation.
//!
//! Tokens identify one waiting visitor for the life of their session and
//! travel as both cookie value and queue message body. They must be
//! unpredictable: 128 bits from a CSPRNG, hex-encoded.

use rand::Rng;

/// Generate a fresh admission token (32 lowercase hex characters).
pub fn generate() -> String {
    let value: u128 = rand::rng().random();
    format!("{value:032x}")
}
