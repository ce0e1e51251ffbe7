//! Payment-result notifications.
//!
//! The platform POSTs a signed XML document to the configured notify URL
//! when a payment settles. Anyone can POST to that URL, so nothing from the
//! body is trusted until the signature over **every** received field checks
//! out. Only then are the status codes looked at, and only then is the typed
//! notification handed to the caller.
//!
//! The platform keeps re-sending until it receives a SUCCESS reply; see
//! [`notify_reply`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{STATUS_FAIL, STATUS_SUCCESS};
use crate::crypto::{verify_record, SignType, SigningRecord};
use crate::error::{Result, SdkError};
use crate::wire;

/// A verified payment-result notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayNotification {
    pub appid: String,
    pub mch_id: String,
    pub openid: String,
    pub out_trade_no: String,
    pub transaction_id: String,
    /// Order amount in fen.
    pub total_fee: u64,
    /// Amount actually paid in cash, in fen.
    pub cash_fee: u64,
    pub fee_type: String,
    pub bank_type: String,
    pub trade_type: String,
    /// Settlement time, `yyyyMMddHHmmss`.
    pub time_end: String,
    pub is_subscribe: String,
    pub attach: String,
    /// Every field as received, including ones not modelled above.
    #[serde(skip)]
    pub raw: SigningRecord,
}

impl PayNotification {
    /// Parse and verify a notification body.
    ///
    /// Fails with [`SdkError::SignatureMismatch`] before reading any status
    /// when the signature does not verify, with
    /// [`SdkError::RemoteRejected`] when the notification reports a failure,
    /// and with [`SdkError::MalformedPayload`] when an amount is not an
    /// integer.
    pub fn verify(xml: &str, pay_key: &str, sign_type: SignType) -> Result<Self> {
        let record = wire::from_xml(xml)?;
        verify_record(&record, pay_key, sign_type)?;

        let return_code = record.get_or_empty("return_code");
        if return_code != STATUS_SUCCESS {
            let msg = record.get_or_empty("return_msg");
            warn!(code = return_code, msg, "payment notification reports failure");
            return Err(SdkError::remote(return_code, msg));
        }
        let result_code = record.get_or_empty("result_code");
        if result_code != STATUS_SUCCESS {
            let (code, msg) = (record.get_or_empty("err_code"), record.get_or_empty("err_code_des"));
            warn!(code, msg, "payment notification reports unsuccessful payment");
            return Err(SdkError::remote(code, msg));
        }

        let notification = Self {
            appid: text(&record, "appid"),
            mch_id: text(&record, "mch_id"),
            openid: text(&record, "openid"),
            out_trade_no: text(&record, "out_trade_no"),
            transaction_id: text(&record, "transaction_id"),
            total_fee: amount(&record, "total_fee")?,
            cash_fee: amount(&record, "cash_fee")?,
            fee_type: text(&record, "fee_type"),
            bank_type: text(&record, "bank_type"),
            trade_type: text(&record, "trade_type"),
            time_end: text(&record, "time_end"),
            is_subscribe: text(&record, "is_subscribe"),
            attach: text(&record, "attach"),
            raw: record,
        };
        debug!(
            out_trade_no = %notification.out_trade_no,
            transaction_id = %notification.transaction_id,
            "payment notification verified"
        );
        Ok(notification)
    }
}

fn text(record: &SigningRecord, name: &str) -> String {
    record.get_or_empty(name).to_string()
}

fn amount(record: &SigningRecord, name: &str) -> Result<u64> {
    match record.get(name) {
        None | Some("") => Ok(0),
        Some(v) => v
            .parse()
            .map_err(|_| SdkError::MalformedPayload(format!("{name} is not an integer: {v}"))),
    }
}

/// The XML acknowledgment the notify endpoint must answer with.
///
/// `Ok(())` renders `SUCCESS/OK`; `Err(msg)` renders `FAIL/msg`, which makes
/// the platform retry later.
pub fn notify_reply(outcome: std::result::Result<(), &str>) -> String {
    let (code, msg) = match outcome {
        Ok(()) => (STATUS_SUCCESS, "OK"),
        Err(msg) => (STATUS_FAIL, msg),
    };
    wire::to_xml(
        &SigningRecord::new()
            .with("return_code", code)
            .with("return_msg", msg),
    )
}
