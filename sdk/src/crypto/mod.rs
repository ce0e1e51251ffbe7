//! # Cryptographic Core
//!
//! Everything that touches a secret lives here: the canonical signing string,
//! the keyed digests over it, and the AES-CBC codec that recovers encrypted
//! identity payloads. The payment and login flows are thin consumers of this
//! module.
//!
//! All functions are pure. Secrets come in as parameters, nothing is cached,
//! nothing is global, and every function is safe to call from any number of
//! threads at once.
//!
//! - **canonical**: [`SigningRecord`] and the `name=value&...&key=secret`
//!   rendering.
//! - **signing**: MD5 / HMAC-SHA256 digests and constant-time verification.
//! - **cbc**: AES-CBC with strict PKCS#7, explicit-IV and key-as-IV schemes.
//! - **nonce**: CSPRNG nonce strings.

pub mod canonical;
pub mod cbc;
pub mod nonce;
pub mod signing;

pub use canonical::{canonicalize, Signable, SigningRecord};
pub use cbc::{decrypt, decrypt_envelope, encrypt, CodecError};
pub use nonce::nonce_str;
pub use signing::{attach_signature, sign, verify, verify_record, SignType, SigningError};
