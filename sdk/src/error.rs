//! Error types for the SDK.
//!
//! Every flow returns [`SdkError`]. The variants separate failures the caller
//! caused (validation), failures the platform reported (remote rejection),
//! failures that must be treated as attacks (signature mismatch), and
//! failures of the network underneath (transport). Nothing is retried
//! internally: a re-signed request carries a new nonce and is a new request.

use thiserror::Error;

use crate::crypto::cbc::CodecError;
use crate::crypto::signing::SigningError;
use crate::transport::TransportError;

/// Errors returned by the SDK.
#[derive(Debug, Error)]
pub enum SdkError {
    /// A required field is missing or malformed, or the call is not allowed
    /// with the current configuration.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The symmetric codec rejected its input: wrong key or IV length, bad
    /// base64, or ciphertext that does not unpad (wrong key / corrupted).
    #[error("decryption failed: {0}")]
    Codec(#[from] CodecError),

    /// A payload decrypted or arrived intact but could not be parsed.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The platform answered with a failure status or error message.
    #[error("rejected by platform: [{code}] {message}")]
    RemoteRejected {
        /// Platform status or error code, verbatim.
        code: String,
        /// Platform message, verbatim.
        message: String,
    },

    /// A signed message did not verify. Treat as a security event.
    #[error("signature mismatch")]
    SignatureMismatch,

    /// The keyed digest could not be computed.
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// The transport failed. Passed through unmodified.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SdkError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        SdkError::Validation(msg.into())
    }

    pub(crate) fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        SdkError::RemoteRejected {
            code: code.into(),
            message: message.into(),
        }
    }

    /// True for failures caused by local input: never worth retrying as-is.
    pub fn is_validation(&self) -> bool {
        matches!(self, SdkError::Validation(_) | SdkError::Codec(_))
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(SdkError::validation("x").is_validation());
        assert!(SdkError::from(CodecError::InvalidPadding).is_validation());
        assert!(!SdkError::SignatureMismatch.is_validation());
        assert!(!SdkError::remote("FAIL", "nope").is_validation());
    }

    #[test]
    fn test_remote_message_is_verbatim() {
        let err = SdkError::remote("ORDERPAID", "该订单已支付");
        assert_eq!(err.to_string(), "rejected by platform: [ORDERPAID] 该订单已支付");
    }
}
