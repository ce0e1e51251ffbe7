//! Red-envelope (cash bonus) disbursement.
//!
//! Moving money out of the merchant account needs more than the shared-key
//! signature: the endpoint only accepts connections authenticated with the
//! merchant's client certificate. A [`WePay`] without one refuses to send
//! rather than falling back to a plain connection.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::client::WePay;
use super::trade_no::bill_no;
use crate::config::{BILL_NO_LENGTH, SEND_RED_PACK_URL, STATUS_SUCCESS};
use crate::crypto::{attach_signature, nonce_str, SignType, Signable, SigningRecord};
use crate::error::{Result, SdkError};
use crate::transport::{Method, Transport};
use crate::wire;

/// Client IP reported for server-initiated disbursements.
const DEFAULT_CLIENT_IP: &str = "127.0.0.1";

/// A `sendredpack` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRedPack {
    pub nonce_str: String,
    pub mch_billno: String,
    pub mch_id: String,
    pub wxappid: String,
    pub send_name: String,
    pub re_openid: String,
    /// Amount in fen.
    pub total_amount: u64,
    pub total_num: u32,
    pub wishing: String,
    pub client_ip: String,
    pub act_name: String,
    pub remark: String,
    pub scene_id: String,
    pub risk_info: String,
    pub consume_mch_id: String,
}

impl SendRedPack {
    fn validate(&self) -> Result<()> {
        let required = [
            ("nonce_str", &self.nonce_str),
            ("mch_billno", &self.mch_billno),
            ("mch_id", &self.mch_id),
            ("wxappid", &self.wxappid),
            ("send_name", &self.send_name),
            ("re_openid", &self.re_openid),
            ("wishing", &self.wishing),
            ("client_ip", &self.client_ip),
            ("act_name", &self.act_name),
            ("remark", &self.remark),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(SdkError::validation(format!("red envelope: {name} is required")));
            }
        }
        if self.total_amount == 0 || self.total_num == 0 {
            return Err(SdkError::validation(
                "red envelope: total_amount and total_num must be positive",
            ));
        }
        Ok(())
    }
}

impl Signable for SendRedPack {
    fn signing_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("nonce_str", self.nonce_str.clone()),
            ("mch_billno", self.mch_billno.clone()),
            ("mch_id", self.mch_id.clone()),
            ("wxappid", self.wxappid.clone()),
            ("send_name", self.send_name.clone()),
            ("re_openid", self.re_openid.clone()),
            ("total_amount", self.total_amount.to_string()),
            ("total_num", self.total_num.to_string()),
            ("wishing", self.wishing.clone()),
            ("client_ip", self.client_ip.clone()),
            ("act_name", self.act_name.clone()),
            ("remark", self.remark.clone()),
            ("scene_id", self.scene_id.clone()),
            ("risk_info", self.risk_info.clone()),
            ("consume_mch_id", self.consume_mch_id.clone()),
        ]
    }
}

/// The platform's reply to `sendredpack`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedPackResponse {
    pub return_code: String,
    pub return_msg: String,
    pub result_code: String,
    pub err_code: String,
    pub err_code_des: String,
    pub mch_billno: String,
    pub mch_id: String,
    pub wxappid: String,
    pub re_openid: String,
    pub total_amount: String,
    /// Fission envelopes only.
    pub send_time: String,
    /// Fission envelopes only.
    pub send_listid: String,
}

impl RedPackResponse {
    pub fn from_record(record: &SigningRecord) -> Self {
        let f = |name: &str| record.get_or_empty(name).to_string();
        Self {
            return_code: f("return_code"),
            return_msg: f("return_msg"),
            result_code: f("result_code"),
            err_code: f("err_code"),
            err_code_des: f("err_code_des"),
            mch_billno: f("mch_billno"),
            mch_id: f("mch_id"),
            wxappid: f("wxappid"),
            re_openid: f("re_openid"),
            total_amount: f("total_amount"),
            send_time: f("send_time"),
            send_listid: f("send_listid"),
        }
    }

    /// Fail unless both status codes are SUCCESS.
    ///
    /// The error code reads `result_code,err_code`; the message is
    /// `err_code_des`, falling back to `return_msg`.
    pub fn check(&self) -> Result<()> {
        if self.return_code == STATUS_SUCCESS && self.result_code == STATUS_SUCCESS {
            return Ok(());
        }
        let message = if self.err_code_des.is_empty() {
            &self.return_msg
        } else {
            &self.err_code_des
        };
        Err(SdkError::remote(
            format!("{},{}", self.result_code, self.err_code),
            message.clone(),
        ))
    }
}

impl<T: Transport> WePay<T> {
    /// Build a single-recipient envelope request with a fresh bill number.
    pub fn red_pack(
        &self,
        re_openid: &str,
        total_amount: u64,
        send_name: &str,
        wishing: &str,
        act_name: &str,
        remark: &str,
    ) -> Result<SendRedPack> {
        let config = self.config();
        Ok(SendRedPack {
            nonce_str: nonce_str(),
            mch_billno: bill_no(&config.mch_id, BILL_NO_LENGTH)?,
            mch_id: config.mch_id.clone(),
            wxappid: config.app_id.clone(),
            send_name: send_name.to_string(),
            re_openid: re_openid.to_string(),
            total_amount,
            total_num: 1,
            wishing: wishing.to_string(),
            client_ip: DEFAULT_CLIENT_IP.to_string(),
            act_name: act_name.to_string(),
            remark: remark.to_string(),
            ..SendRedPack::default()
        })
    }

    /// Sign and send `req` over mutual TLS.
    ///
    /// Returns the bill number with the checked response. Envelopes are
    /// always signed with MD5, the only digest this endpoint accepts.
    pub async fn send_red_pack(&self, req: &SendRedPack) -> Result<(String, RedPackResponse)> {
        req.validate()?;
        let identity = self.client_identity()?;

        let mut record = req.to_record();
        attach_signature(&mut record, &self.config().pay_key, SignType::Md5)?;
        let body = wire::to_xml(&record);

        debug!(mch_billno = %req.mch_billno, total_amount = req.total_amount, "sending red envelope");
        let raw = self
            .transport()
            .send_with_identity(Method::Post, SEND_RED_PACK_URL, body.into_bytes(), &identity)
            .await?;
        let response = RedPackResponse::from_record(&wire::from_xml_bytes(&raw)?);

        if let Err(e) = response.check() {
            warn!(mch_billno = %req.mch_billno, error = %e, "red envelope rejected");
            return Err(e);
        }
        info!(mch_billno = %req.mch_billno, "red envelope sent");
        Ok((req.mch_billno.clone(), response))
    }
}
