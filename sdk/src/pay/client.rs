//! [`WePay`]: unified orders and the client payloads built from them.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::order::{OrderRequest, TradeType, UnifiedOrder, UnifiedOrderResponse};
use super::trade_no::out_trade_no;
use crate::config::{PayConfig, APP_PAY_PACKAGE, PREPAY_PACKAGE_PREFIX, UNIFIED_ORDER_URL};
use crate::crypto::{attach_signature, nonce_str, sign, verify_record, Signable, SignType};
use crate::error::{Result, SdkError};
use crate::transport::{ClientIdentity, Method, Transport};
use crate::wire;

// ---------------------------------------------------------------------------
// Client payloads
// ---------------------------------------------------------------------------

/// Second-stage payload handed to the mobile app's payment SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppPayParams {
    pub appid: String,
    pub partnerid: String,
    pub prepayid: String,
    pub package: String,
    pub noncestr: String,
    pub timestamp: String,
    pub sign: String,
}

impl Signable for AppPayParams {
    fn signing_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("appid", self.appid.clone()),
            ("partnerid", self.partnerid.clone()),
            ("prepayid", self.prepayid.clone()),
            ("package", self.package.clone()),
            ("noncestr", self.noncestr.clone()),
            ("timestamp", self.timestamp.clone()),
        ]
    }
}

/// Second-stage payload for `wx.requestPayment` in a mini-program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniProgramPayParams {
    pub app_id: String,
    pub time_stamp: String,
    pub nonce_str: String,
    pub package: String,
    pub sign_type: SignType,
    pub pay_sign: String,
}

impl Signable for MiniProgramPayParams {
    fn signing_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("appId", self.app_id.clone()),
            ("timeStamp", self.time_stamp.clone()),
            ("nonceStr", self.nonce_str.clone()),
            ("package", self.package.clone()),
            ("signType", self.sign_type.as_str().to_string()),
        ]
    }
}

// ---------------------------------------------------------------------------
// WePay
// ---------------------------------------------------------------------------

/// Payment client for one merchant configuration.
///
/// Holds no mutable state; share it behind an `Arc` freely.
pub struct WePay<T> {
    config: PayConfig,
    transport: T,
    identity: Option<ClientIdentity>,
}

impl<T: Transport> WePay<T> {
    pub fn new(config: PayConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            identity: None,
        }
    }

    /// Use an already-loaded client certificate for disbursements instead of
    /// reading `config.tls` on each call.
    pub fn with_identity(mut self, identity: ClientIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn config(&self) -> &PayConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// The identity for mutual-TLS calls, or a validation error when none is
    /// configured.
    pub(crate) fn client_identity(&self) -> Result<ClientIdentity> {
        if let Some(identity) = &self.identity {
            return Ok(identity.clone());
        }
        match &self.config.tls {
            Some(paths) => Ok(ClientIdentity::from_paths(paths)?),
            None => Err(SdkError::validation(
                "no client certificate configured; disbursement requires mutual TLS",
            )),
        }
    }

    /// Fill a [`UnifiedOrder`] from configuration and the caller's request.
    pub fn prepare_order(&self, req: &OrderRequest, trade_type: TradeType) -> UnifiedOrder {
        let mut order = UnifiedOrder::new(trade_type, req.total_fee);
        order.appid = self.config.app_id.clone();
        order.mch_id = self.config.mch_id.clone();
        order.nonce_str = nonce_str();
        order.sign_type = self.config.sign_type;
        order.body = req.body.clone().unwrap_or_else(|| self.config.body.clone());
        order.attach = req.attach.clone().unwrap_or_default();
        order.out_trade_no = req
            .out_trade_no
            .clone()
            .unwrap_or_else(|| out_trade_no(&self.config.mch_id));
        order.spbill_create_ip = req.client_ip.clone();
        order.time_start = req.time_start.clone().unwrap_or_default();
        order.time_expire = req.time_expire.clone().unwrap_or_default();
        order.scene_info = req.scene_info.clone().unwrap_or_default();
        order.notify_url = self.config.notify_url.clone();
        order
    }

    /// Place a unified order.
    ///
    /// The reply is accepted only when `return_code` is SUCCESS, its
    /// signature verifies, `result_code` is SUCCESS and it carries a
    /// `prepay_id`, checked in that order.
    pub async fn unified_order(&self, order: &UnifiedOrder) -> Result<UnifiedOrderResponse> {
        order.validate()?;
        let sign_type = order.sign_type;

        let mut record = order.to_record();
        attach_signature(&mut record, &self.config.pay_key, sign_type)?;
        let body = wire::to_xml(&record);

        debug!(
            out_trade_no = %order.out_trade_no,
            trade_type = %order.trade_type,
            total_fee = order.total_fee,
            "placing unified order"
        );
        let raw = self
            .transport
            .send(Method::Post, UNIFIED_ORDER_URL, body.into_bytes())
            .await?;
        let reply = wire::from_xml_bytes(&raw)?;
        let response = UnifiedOrderResponse::from_record(&reply);

        if !response.is_return_success() {
            warn!(code = %response.return_code, msg = %response.return_msg, "unified order rejected");
            return Err(SdkError::remote(response.return_code, response.return_msg));
        }
        verify_record(&reply, &self.config.pay_key, sign_type)?;
        if !response.is_result_success() {
            warn!(code = %response.err_code, msg = %response.err_code_des, "unified order failed");
            return Err(SdkError::remote(response.err_code, response.err_code_des));
        }
        if response.prepay_id.is_empty() {
            return Err(SdkError::MalformedPayload(
                "unified order reply has no prepay_id".into(),
            ));
        }

        info!(out_trade_no = %order.out_trade_no, prepay_id = %response.prepay_id, "unified order placed");
        Ok(response)
    }

    /// Place an `APP` order and sign the payload for the app SDK.
    ///
    /// Returns the payload and the merchant trade number.
    pub async fn app_pay(&self, req: &OrderRequest) -> Result<(AppPayParams, String)> {
        let order = self.prepare_order(req, TradeType::App);
        let response = self.unified_order(&order).await?;

        let mut params = AppPayParams {
            appid: self.config.app_id.clone(),
            partnerid: self.config.mch_id.clone(),
            prepayid: response.prepay_id,
            package: APP_PAY_PACKAGE.to_string(),
            noncestr: nonce_str(),
            timestamp: Utc::now().timestamp().to_string(),
            sign: String::new(),
        };
        params.sign = self.sign_payload(&params)?;
        Ok((params, order.out_trade_no))
    }

    /// Place a `JSAPI` order for `openid` and sign the mini-program payload.
    ///
    /// Returns the payload and the merchant trade number.
    pub async fn mini_program_pay(
        &self,
        req: &OrderRequest,
        openid: &str,
    ) -> Result<(MiniProgramPayParams, String)> {
        let mut order = self.prepare_order(req, TradeType::Jsapi);
        order.openid = openid.to_string();
        let response = self.unified_order(&order).await?;

        let mut params = MiniProgramPayParams {
            app_id: self.config.app_id.clone(),
            time_stamp: Utc::now().timestamp().to_string(),
            nonce_str: nonce_str(),
            package: format!("{PREPAY_PACKAGE_PREFIX}{}", response.prepay_id),
            sign_type: self.config.sign_type,
            pay_sign: String::new(),
        };
        params.pay_sign = self.sign_payload(&params)?;
        Ok((params, order.out_trade_no))
    }

    fn sign_payload(&self, payload: &impl Signable) -> Result<String> {
        let digest = sign(&payload.to_record(), &self.config.pay_key, self.config.sign_type)?;
        Ok(digest.to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::verify;

    #[test]
    fn test_app_params_signature_covers_fixed_fields() {
        let params = AppPayParams {
            appid: "wx1".into(),
            partnerid: "10".into(),
            prepayid: "wx2014".into(),
            package: APP_PAY_PACKAGE.into(),
            noncestr: "abc".into(),
            timestamp: "1700000000".into(),
            sign: "ignored".into(),
        };
        let record = params.to_record();
        assert_eq!(record.len(), 6);
        assert_eq!(record.get("package"), Some("Sign=WXPay"));
        assert_eq!(record.get("sign"), None);
    }

    #[test]
    fn test_mini_program_params_wire_names() {
        let params = MiniProgramPayParams {
            app_id: "wx1".into(),
            time_stamp: "1700000000".into(),
            nonce_str: "abc".into(),
            package: "prepay_id=wx2014".into(),
            sign_type: SignType::Md5,
            pay_sign: "X".into(),
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["appId"], "wx1");
        assert_eq!(json["timeStamp"], "1700000000");
        assert_eq!(json["signType"], "MD5");
        assert_eq!(json["paySign"], "X");

        let record = params.to_record();
        let digest = sign(&record, "k", SignType::Md5).unwrap();
        assert!(verify(&record, "k", SignType::Md5, &digest.to_ascii_uppercase()).unwrap());
        assert_eq!(record.get("paySign"), None);
    }
}
