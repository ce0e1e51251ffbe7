//! # Platform Constants & Configuration
//!
//! Every endpoint, field name and magic length the SDK shares with the
//! platform lives here. These values are dictated by the remote side: they
//! are not ours to rename, and a typo in any of them fails silently as a
//! signature mismatch or an empty response.
//!
//! The second half of the file holds the caller-supplied configuration
//! ([`AppCredentials`], [`PayConfig`], [`TlsPaths`]). They are plain serde
//! structs so the CLI (or any host application) can load them from TOML,
//! environment variables, or wherever it keeps secrets.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::crypto::signing::SignType;
use crate::pay::order::TradeType;

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// Unified order creation (payments).
pub const UNIFIED_ORDER_URL: &str = "https://api.mch.weixin.qq.com/pay/unifiedorder";

/// Red-envelope disbursement. Requires the merchant client certificate.
pub const SEND_RED_PACK_URL: &str = "https://api.mch.weixin.qq.com/mmpaymkttransfers/sendredpack";

/// Exchange an authorization code for an access token.
pub const ACCESS_TOKEN_URL: &str = "https://api.weixin.qq.com/sns/oauth2/access_token";

/// Refresh an access token.
pub const REFRESH_TOKEN_URL: &str = "https://api.weixin.qq.com/sns/oauth2/refresh_token";

/// Fetch the user profile behind an access token.
pub const USER_INFO_URL: &str = "https://api.weixin.qq.com/sns/userinfo";

/// Check whether an access token is still valid.
pub const CHECK_ACCESS_TOKEN_URL: &str = "https://api.weixin.qq.com/sns/auth";

/// Mini-program login: `js_code` to session key.
pub const JS_CODE_TO_SESSION_URL: &str = "https://api.weixin.qq.com/sns/jscode2session";

// ---------------------------------------------------------------------------
// Wire field names and status values
// ---------------------------------------------------------------------------

/// Name of the signature field. Always excluded from canonicalization.
pub const SIGN_FIELD: &str = "sign";

/// Name under which the shared secret is appended to the canonical string.
pub const KEY_FIELD: &str = "key";

/// Status value the platform uses for `return_code` / `result_code` success.
pub const STATUS_SUCCESS: &str = "SUCCESS";

/// Status value for failures in notification replies.
pub const STATUS_FAIL: &str = "FAIL";

/// `grant_type` for authorization-code exchanges.
pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";

/// `grant_type` for token refresh.
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";

/// `package` value of the in-app client payload. Fixed by the platform.
pub const APP_PAY_PACKAGE: &str = "Sign=WXPay";

/// Prefix of the mini-program client payload `package` value.
pub const PREPAY_PACKAGE_PREFIX: &str = "prepay_id=";

// ---------------------------------------------------------------------------
// Cryptographic parameters
// ---------------------------------------------------------------------------

/// AES block size in bytes. Also the IV length and the PKCS#7 pad ceiling.
pub const AES_BLOCK_SIZE: usize = 16;

/// Session keys are AES-128 keys: 16 raw bytes, 24 characters of base64.
pub const SESSION_KEY_LENGTH: usize = 16;

/// Key lengths accepted by the general-purpose codec (AES-128/192/256).
pub const AES_KEY_LENGTHS: [usize; 3] = [16, 24, 32];

/// Length of the random `nonce_str` attached to every signed request.
/// The platform caps it at 32 characters; we always use the full width.
pub const NONCE_LENGTH: usize = 32;

/// Total length of a red-envelope `mch_billno`.
pub const BILL_NO_LENGTH: usize = 28;

// ---------------------------------------------------------------------------
// Caller configuration
// ---------------------------------------------------------------------------

/// Application credentials used by the login flows.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppCredentials {
    /// Application (or mini-program) id, `appid` on the wire.
    pub app_id: String,
    /// Application secret, `secret` on the wire.
    pub secret: String,
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Paths of the merchant client certificate bundle.
///
/// Only disbursement calls need these. All three files are PEM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsPaths {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
    /// Optional extra root to trust for the platform endpoint.
    #[serde(default)]
    pub root_ca_file: Option<PathBuf>,
}

/// Merchant configuration for the payment flows.
#[derive(Clone, Serialize, Deserialize)]
pub struct PayConfig {
    /// App id of the application or mini-program taking the payment.
    pub app_id: String,
    /// Merchant id (`mch_id`).
    pub mch_id: String,
    /// API key used to sign every payment request.
    pub pay_key: String,
    /// Callback URL for payment-result notifications. No query string.
    pub notify_url: String,
    /// Default trade type for orders built from this configuration.
    #[serde(default = "default_trade_type")]
    pub trade_type: TradeType,
    /// Digest used for request signatures.
    #[serde(default)]
    pub sign_type: SignType,
    /// Product description used when an order does not supply one.
    #[serde(default)]
    pub body: String,
    /// Client certificate for red-envelope disbursement.
    #[serde(default)]
    pub tls: Option<TlsPaths>,
}

fn default_trade_type() -> TradeType {
    TradeType::App
}

impl fmt::Debug for PayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayConfig")
            .field("app_id", &self.app_id)
            .field("mch_id", &self.mch_id)
            .field("pay_key", &"<redacted>")
            .field("notify_url", &self.notify_url)
            .field("trade_type", &self.trade_type)
            .field("sign_type", &self.sign_type)
            .field("body", &self.body)
            .field("tls", &self.tls)
            .finish()
    }
}
