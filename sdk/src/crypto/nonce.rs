//! Random `nonce_str` values for signed requests.
//!
//! The platform de-duplicates requests by nonce within a window, so nonces
//! come from the OS CSPRNG rather than a time-seeded generator. 32
//! alphanumeric characters is ~190 bits, far past anything a replay window
//! could collide on.

use rand::distributions::{Alphanumeric, DistString, Distribution, Uniform};
use rand::rngs::OsRng;

use crate::config::NONCE_LENGTH;

/// A fresh 32-character alphanumeric nonce.
pub fn nonce_str() -> String {
    random_alphanumeric(NONCE_LENGTH)
}

/// `len` random characters from `[A-Za-z0-9]`.
pub fn random_alphanumeric(len: usize) -> String {
    Alphanumeric.sample_string(&mut OsRng, len)
}

/// `len` random decimal digits. Leading zeros are kept.
pub fn random_digits(len: usize) -> String {
    let digits = Uniform::from(b'0'..=b'9');
    digits
        .sample_iter(OsRng)
        .take(len)
        .map(char::from)
        .collect()
}
