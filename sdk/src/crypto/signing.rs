//! # Parameter Signatures
//!
//! Keyed digests over the canonical signing string. This is the only thing
//! standing between a forged payment notification and an order marked paid,
//! so verification is mandatory on every inbound message and the comparison
//! runs in constant time.
//!
//! Two digests are supported, matching the platform's `sign_type` values:
//!
//! - **MD5** (default): `md5(canonical)`, 32 hex characters. The secret is
//!   only "keyed" in the sense that it is part of the hashed string.
//! - **HMAC-SHA256**: `hmac_sha256(key = secret, canonical)`, 64 hex
//!   characters. Opt-in through configuration.
//!
//! Digests come out lower-case. The platform sends and expects upper-case
//! on the wire; [`attach_signature`] upper-cases, and [`verify`] compares hex
//! case-insensitively because both spellings encode the same bytes.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use tracing::warn;

use super::canonical::{canonicalize, SigningRecord};
use crate::config::SIGN_FIELD;
use crate::error::SdkError;

type HmacSha256 = Hmac<Sha256>;

/// Errors from the signing primitives themselves.
///
/// A mismatch is not an error at this level; [`verify`] returns `false`.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The keyed hash could not be constructed. Configuration problem.
    #[error("failed to initialise {0} signer")]
    KeyInit(SignType),

    #[error("unknown sign type: {0}")]
    UnknownSignType(String),
}

/// Digest algorithm, as named by the platform's `sign_type` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignType {
    #[default]
    #[serde(rename = "MD5")]
    Md5,
    #[serde(rename = "HMAC-SHA256")]
    HmacSha256,
}

impl SignType {
    /// Wire value for the `sign_type` / `signType` fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignType::Md5 => "MD5",
            SignType::HmacSha256 => "HMAC-SHA256",
        }
    }

    /// Hex length of a digest of this type.
    pub fn digest_len(&self) -> usize {
        match self {
            SignType::Md5 => 32,
            SignType::HmacSha256 => 64,
        }
    }
}

impl fmt::Display for SignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignType {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MD5" => Ok(SignType::Md5),
            "HMAC-SHA256" | "HMAC_SHA256" => Ok(SignType::HmacSha256),
            _ => Err(SigningError::UnknownSignType(s.to_string())),
        }
    }
}

/// Compute the lower-case hex digest of `record` under `secret`.
///
/// # Example
///
/// ```
/// use wechat_sdk::crypto::{sign, SignType, SigningRecord};
///
/// let record = SigningRecord::new()
///     .with("appid", "wx1")
///     .with("mch_id", "10")
///     .with("out_trade_no", "T1")
///     .with("total_fee", 100);
///
/// let digest = sign(&record, "key123", SignType::Md5).unwrap();
/// assert_eq!(digest, "50c5c1ea6c2711d1d55654ff1ca95fb5");
/// ```
pub fn sign(record: &SigningRecord, secret: &str, sign_type: SignType) -> Result<String, SigningError> {
    let canonical = canonicalize(record, secret);
    match sign_type {
        SignType::Md5 => Ok(format!("{:x}", md5::compute(canonical.as_bytes()))),
        SignType::HmacSha256 => {
            let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
                .map_err(|_| SigningError::KeyInit(sign_type))?;
            mac.update(canonical.as_bytes());
            Ok(hex::encode(mac.finalize().into_bytes()))
        }
    }
}

/// Check `candidate` against the digest of `record`.
///
/// Returns `Ok(false)` on any mismatch, including a candidate of the wrong
/// length. Hex case is ignored; nothing else is.
pub fn verify(
    record: &SigningRecord,
    secret: &str,
    sign_type: SignType,
    candidate: &str,
) -> Result<bool, SigningError> {
    let expected = sign(record, secret, sign_type)?;
    let candidate = candidate.to_ascii_lowercase();
    if candidate.len() != expected.len() {
        return Ok(false);
    }
    Ok(expected.as_bytes().ct_eq(candidate.as_bytes()).into())
}

/// Sign `record` and store the upper-case digest in its `sign` field.
///
/// Any previous `sign` value is ignored for the digest and overwritten.
pub fn attach_signature(
    record: &mut SigningRecord,
    secret: &str,
    sign_type: SignType,
) -> Result<String, SigningError> {
    let digest = sign(record, secret, sign_type)?.to_ascii_uppercase();
    record.insert(SIGN_FIELD, &digest);
    Ok(digest)
}

/// Verify a received record against its own `sign` field.
///
/// Every field present takes part, including ones the caller never models.
/// A missing `sign` is a mismatch.
pub fn verify_record(
    record: &SigningRecord,
    secret: &str,
    sign_type: SignType,
) -> Result<(), SdkError> {
    let candidate = record.signature().unwrap_or_default();
    if verify(record, secret, sign_type, candidate)? {
        Ok(())
    } else {
        warn!(%sign_type, fields = record.len(), "signature mismatch on received record");
        Err(SdkError::SignatureMismatch)
    }
}
