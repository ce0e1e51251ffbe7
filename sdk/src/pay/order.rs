//! Unified order request and response shapes.
//!
//! [`UnifiedOrder`] is the full wire request. Most callers never build one by
//! hand: they describe the purchase with an [`OrderRequest`] and let
//! [`WePay`](super::WePay) fill in merchant identifiers, nonce and trade
//! number. Amounts are integer fen throughout.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::STATUS_SUCCESS;
use crate::crypto::{Signable, SignType, SigningRecord};
use crate::error::{Result, SdkError};
use crate::pay::trade_no::MAX_TRADE_NO_LENGTH;

// ---------------------------------------------------------------------------
// TradeType
// ---------------------------------------------------------------------------

/// Payment channel, the `trade_type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeType {
    /// In-app payment.
    #[serde(rename = "APP")]
    App,
    /// Mini-program and official-account payment. Requires `openid`.
    #[serde(rename = "JSAPI")]
    Jsapi,
    /// QR-code payment.
    #[serde(rename = "NATIVE")]
    Native,
    /// Mobile browser (H5) payment.
    #[serde(rename = "MWEB")]
    Mweb,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::App => "APP",
            Self::Jsapi => "JSAPI",
            Self::Native => "NATIVE",
            Self::Mweb => "MWEB",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeType {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "APP" => Ok(Self::App),
            "JSAPI" => Ok(Self::Jsapi),
            "NATIVE" => Ok(Self::Native),
            "MWEB" => Ok(Self::Mweb),
            other => Err(SdkError::validation(format!("unknown trade type: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// OrderRequest
// ---------------------------------------------------------------------------

/// The business half of an order: what is being bought, for how much, by
/// whom. Merchant identifiers come from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Amount in fen. Must be positive.
    pub total_fee: u64,
    /// Payer's IP address (`spbill_create_ip`).
    pub client_ip: String,
    /// Product description. Falls back to the configured body when `None`.
    #[serde(default)]
    pub body: Option<String>,
    /// Free-form data echoed back in the notification.
    #[serde(default)]
    pub attach: Option<String>,
    /// Merchant trade number. Generated when `None`.
    #[serde(default)]
    pub out_trade_no: Option<String>,
    /// Order start, `yyyyMMddHHmmss`.
    #[serde(default)]
    pub time_start: Option<String>,
    /// Order expiry, `yyyyMMddHHmmss`.
    #[serde(default)]
    pub time_expire: Option<String>,
    /// Scene information JSON, passed through verbatim.
    #[serde(default)]
    pub scene_info: Option<String>,
}

impl OrderRequest {
    pub fn new(total_fee: u64, client_ip: impl Into<String>) -> Self {
        Self {
            total_fee,
            client_ip: client_ip.into(),
            ..Self::default()
        }
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn attach(mut self, attach: impl Into<String>) -> Self {
        self.attach = Some(attach.into());
        self
    }

    pub fn out_trade_no(mut self, no: impl Into<String>) -> Self {
        self.out_trade_no = Some(no.into());
        self
    }

    pub fn time_window(mut self, start: impl Into<String>, expire: impl Into<String>) -> Self {
        self.time_start = Some(start.into());
        self.time_expire = Some(expire.into());
        self
    }
}

// ---------------------------------------------------------------------------
// UnifiedOrder
// ---------------------------------------------------------------------------

/// A complete unified order request, minus its signature.
///
/// String fields left empty are omitted from the XML body and from the
/// signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedOrder {
    pub appid: String,
    pub mch_id: String,
    pub device_info: String,
    pub nonce_str: String,
    /// Emitted as `sign_type` only for HMAC-SHA256; MD5 is the platform default.
    pub sign_type: SignType,
    pub body: String,
    pub detail: String,
    pub attach: String,
    pub out_trade_no: String,
    pub fee_type: String,
    /// Amount in fen.
    pub total_fee: u64,
    pub spbill_create_ip: String,
    pub time_start: String,
    pub time_expire: String,
    pub goods_tag: String,
    pub notify_url: String,
    pub trade_type: TradeType,
    pub product_id: String,
    pub limit_pay: String,
    pub openid: String,
    pub scene_info: String,
}

impl UnifiedOrder {
    /// An order with only the trade type and amount set.
    pub fn new(trade_type: TradeType, total_fee: u64) -> Self {
        Self {
            appid: String::new(),
            mch_id: String::new(),
            device_info: String::new(),
            nonce_str: String::new(),
            sign_type: SignType::default(),
            body: String::new(),
            detail: String::new(),
            attach: String::new(),
            out_trade_no: String::new(),
            fee_type: String::new(),
            total_fee,
            spbill_create_ip: String::new(),
            time_start: String::new(),
            time_expire: String::new(),
            goods_tag: String::new(),
            notify_url: String::new(),
            trade_type,
            product_id: String::new(),
            limit_pay: String::new(),
            openid: String::new(),
            scene_info: String::new(),
        }
    }

    /// Check that every field the platform requires is present.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("appid", &self.appid),
            ("mch_id", &self.mch_id),
            ("nonce_str", &self.nonce_str),
            ("body", &self.body),
            ("out_trade_no", &self.out_trade_no),
            ("spbill_create_ip", &self.spbill_create_ip),
            ("notify_url", &self.notify_url),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(SdkError::validation(format!("unified order: {name} is required")));
            }
        }
        if self.out_trade_no.len() > MAX_TRADE_NO_LENGTH {
            return Err(SdkError::validation(format!(
                "unified order: out_trade_no is longer than {MAX_TRADE_NO_LENGTH} characters"
            )));
        }
        if self.total_fee == 0 {
            return Err(SdkError::validation("unified order: total_fee must be positive"));
        }
        if self.trade_type == TradeType::Jsapi && self.openid.trim().is_empty() {
            return Err(SdkError::validation("unified order: openid is required for JSAPI"));
        }
        Ok(())
    }
}

impl Signable for UnifiedOrder {
    fn signing_fields(&self) -> Vec<(&'static str, String)> {
        let sign_type = match self.sign_type {
            SignType::Md5 => String::new(),
            other => other.as_str().to_string(),
        };
        vec![
            ("appid", self.appid.clone()),
            ("mch_id", self.mch_id.clone()),
            ("device_info", self.device_info.clone()),
            ("nonce_str", self.nonce_str.clone()),
            ("sign_type", sign_type),
            ("body", self.body.clone()),
            ("detail", self.detail.clone()),
            ("attach", self.attach.clone()),
            ("out_trade_no", self.out_trade_no.clone()),
            ("fee_type", self.fee_type.clone()),
            ("total_fee", self.total_fee.to_string()),
            ("spbill_create_ip", self.spbill_create_ip.clone()),
            ("time_start", self.time_start.clone()),
            ("time_expire", self.time_expire.clone()),
            ("goods_tag", self.goods_tag.clone()),
            ("notify_url", self.notify_url.clone()),
            ("trade_type", self.trade_type.as_str().to_string()),
            ("product_id", self.product_id.clone()),
            ("limit_pay", self.limit_pay.clone()),
            ("openid", self.openid.clone()),
            ("scene_info", self.scene_info.clone()),
        ]
    }
}

// ---------------------------------------------------------------------------
// UnifiedOrderResponse
// ---------------------------------------------------------------------------

/// The platform's reply to a unified order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedOrderResponse {
    pub return_code: String,
    pub return_msg: String,
    pub appid: String,
    pub mch_id: String,
    pub device_info: String,
    pub nonce_str: String,
    pub sign: String,
    pub result_code: String,
    pub err_code: String,
    pub err_code_des: String,
    pub trade_type: String,
    pub prepay_id: String,
    /// QR-code link, `NATIVE` orders only.
    pub code_url: String,
    /// Redirect link, `MWEB` orders only.
    pub mweb_url: String,
}

impl UnifiedOrderResponse {
    pub fn from_record(record: &SigningRecord) -> Self {
        let f = |name: &str| record.get_or_empty(name).to_string();
        Self {
            return_code: f("return_code"),
            return_msg: f("return_msg"),
            appid: f("appid"),
            mch_id: f("mch_id"),
            device_info: f("device_info"),
            nonce_str: f("nonce_str"),
            sign: f("sign"),
            result_code: f("result_code"),
            err_code: f("err_code"),
            err_code_des: f("err_code_des"),
            trade_type: f("trade_type"),
            prepay_id: f("prepay_id"),
            code_url: f("code_url"),
            mweb_url: f("mweb_url"),
        }
    }

    /// Communication-level status. Failure means nothing else is meaningful.
    pub fn is_return_success(&self) -> bool {
        self.return_code == STATUS_SUCCESS
    }

    /// Business-level status.
    pub fn is_result_success(&self) -> bool {
        self.result_code == STATUS_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_order() -> UnifiedOrder {
        let mut o = UnifiedOrder::new(TradeType::App, 100);
        o.appid = "wx1".into();
        o.mch_id = "10".into();
        o.nonce_str = "n".repeat(32);
        o.body = "Tea".into();
        o.out_trade_no = "T1".into();
        o.spbill_create_ip = "1.2.3.4".into();
        o.notify_url = "https://example.com/notify".into();
        o
    }

    #[test]
    fn test_valid_order_passes() {
        assert!(valid_order().validate().is_ok());
    }

    #[test]
    fn test_missing_fields_rejected() {
        let mut o = valid_order();
        o.body.clear();
        assert!(o.validate().unwrap_err().to_string().contains("body"));

        let mut o = valid_order();
        o.total_fee = 0;
        assert!(o.validate().unwrap_err().is_validation());

        let mut o = valid_order();
        o.spbill_create_ip = "  ".into();
        assert!(o.validate().is_err());
    }

    #[test]
    fn test_out_trade_no_length_limit() {
        let mut o = valid_order();
        o.out_trade_no = "T".repeat(MAX_TRADE_NO_LENGTH);
        assert!(o.validate().is_ok());

        o.out_trade_no.push('1');
        let err = o.validate().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("out_trade_no"));
    }

    #[test]
    fn test_jsapi_requires_openid() {
        let mut o = valid_order();
        o.trade_type = TradeType::Jsapi;
        assert!(o.validate().unwrap_err().to_string().contains("openid"));
        o.openid = "o1".into();
        assert!(o.validate().is_ok());
    }

    #[test]
    fn test_record_omits_empty_and_md5_sign_type() {
        let r = valid_order().to_record();
        assert_eq!(r.get("total_fee"), Some("100"));
        assert_eq!(r.get("trade_type"), Some("APP"));
        assert_eq!(r.get("attach"), None);
        assert_eq!(r.get("sign_type"), None);
    }

    #[test]
    fn test_record_emits_hmac_sign_type() {
        let mut o = valid_order();
        o.sign_type = SignType::HmacSha256;
        assert_eq!(o.to_record().get("sign_type"), Some("HMAC-SHA256"));
    }

    #[test]
    fn test_trade_type_wire_names() {
        assert_eq!(TradeType::Jsapi.to_string(), "JSAPI");
        assert_eq!("mweb".parse::<TradeType>().unwrap(), TradeType::Mweb);
        assert!("CARD".parse::<TradeType>().is_err());
        assert_eq!(serde_json::to_string(&TradeType::App).unwrap(), "\"APP\"");
    }

    #[test]
    fn test_response_from_record() {
        let r = SigningRecord::new()
            .with("return_code", "SUCCESS")
            .with("result_code", "FAIL")
            .with("err_code", "ORDERPAID");
        let resp = UnifiedOrderResponse::from_record(&r);
        assert!(resp.is_return_success());
        assert!(!resp.is_result_success());
        assert_eq!(resp.err_code, "ORDERPAID");
        assert!(resp.prepay_id.is_empty());
    }
}
