//! OAuth-style login for apps and web pages.
//!
//! `code → access token → user profile`. Tokens can be refreshed and checked
//! for validity; none of these calls is retried.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{
    AppCredentials, ACCESS_TOKEN_URL, CHECK_ACCESS_TOKEN_URL, GRANT_AUTHORIZATION_CODE,
    GRANT_REFRESH_TOKEN, REFRESH_TOKEN_URL, USER_INFO_URL,
};
use crate::error::{Result, SdkError};
use crate::transport::{Method, Transport};
use crate::wire;

/// `errmsg` the token-check endpoint answers with for a valid token.
const ERRMSG_OK: &str = "ok";

/// Token issued by the authorization-code or refresh exchange.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    /// Lifetime in seconds from issue.
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub openid: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub unionid: String,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &"<redacted>")
            .field("openid", &self.openid)
            .field("scope", &self.scope)
            .field("unionid", &self.unionid)
            .finish()
    }
}

/// Profile returned by `sns/userinfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub openid: String,
    #[serde(default)]
    pub nickname: String,
    /// 1 male, 2 female, 0 unknown.
    #[serde(default)]
    pub sex: u32,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub headimgurl: String,
    #[serde(default)]
    pub privilege: Vec<String>,
    #[serde(default)]
    pub unionid: String,
}

/// The `errcode` / `errmsg` pair every login endpoint may answer with.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PlatformStatus {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

impl PlatformStatus {
    fn is_error(&self) -> bool {
        self.errcode != 0 || (!self.errmsg.is_empty() && self.errmsg != ERRMSG_OK)
    }
}

/// Decode a login-API JSON reply, turning a platform error into
/// [`SdkError::RemoteRejected`].
pub(crate) fn parse_reply<R: DeserializeOwned>(endpoint: &str, raw: &[u8]) -> Result<R> {
    let status: PlatformStatus = serde_json::from_slice(raw)
        .map_err(|e| SdkError::MalformedPayload(format!("{endpoint}: {e}")))?;
    if status.is_error() {
        warn!(endpoint, errcode = status.errcode, errmsg = %status.errmsg, "login call rejected");
        return Err(SdkError::remote(status.errcode.to_string(), status.errmsg));
    }
    serde_json::from_slice(raw).map_err(|e| SdkError::MalformedPayload(format!("{endpoint}: {e}")))
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(SdkError::validation(format!("{name} is required")));
    }
    Ok(())
}

/// Login client for one application.
pub struct WxLogin<T> {
    credentials: AppCredentials,
    transport: T,
}

impl<T: Transport> WxLogin<T> {
    pub fn new(credentials: AppCredentials, transport: T) -> Self {
        Self {
            credentials,
            transport,
        }
    }

    pub fn app_id(&self) -> &str {
        &self.credentials.app_id
    }

    pub(crate) fn credentials(&self) -> &AppCredentials {
        &self.credentials
    }

    pub(crate) async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Vec<u8>> {
        debug!(endpoint, "login request");
        let url = wire::with_query(endpoint, params);
        Ok(self.transport.send(Method::Get, &url, Vec::new()).await?)
    }

    /// Exchange an authorization code for an access token.
    pub async fn access_token(&self, code: &str) -> Result<AccessToken> {
        require("code", code)?;
        let raw = self
            .get(
                ACCESS_TOKEN_URL,
                &[
                    ("appid", self.credentials.app_id.as_str()),
                    ("secret", self.credentials.secret.as_str()),
                    ("code", code),
                    ("grant_type", GRANT_AUTHORIZATION_CODE),
                ],
            )
            .await?;
        let token: AccessToken = parse_reply(ACCESS_TOKEN_URL, &raw)?;
        if token.access_token.is_empty() {
            return Err(SdkError::MalformedPayload("token reply has no access_token".into()));
        }
        Ok(token)
    }

    /// Fetch the profile of the user behind `token`.
    pub async fn user_info(&self, token: &AccessToken) -> Result<UserProfile> {
        require("access_token", &token.access_token)?;
        require("openid", &token.openid)?;
        let raw = self
            .get(
                USER_INFO_URL,
                &[("access_token", token.access_token.as_str()), ("openid", token.openid.as_str())],
            )
            .await?;
        let profile: UserProfile = parse_reply(USER_INFO_URL, &raw)?;
        if profile.openid.is_empty() {
            return Err(SdkError::MalformedPayload("userinfo reply has no openid".into()));
        }
        Ok(profile)
    }

    /// App and web login in one step: code, then token, then profile.
    pub async fn login_with_code(&self, code: &str) -> Result<UserProfile> {
        let token = self.access_token(code).await?;
        self.user_info(&token).await
    }

    /// Obtain a new token from `token`'s refresh token.
    ///
    /// `token` is not modified, so a failed refresh leaves the caller with
    /// what it had.
    pub async fn refresh_token(&self, token: &AccessToken) -> Result<AccessToken> {
        require("refresh_token", &token.refresh_token)?;
        require("openid", &token.openid)?;
        let raw = self
            .get(
                REFRESH_TOKEN_URL,
                &[
                    ("appid", self.credentials.app_id.as_str()),
                    ("grant_type", GRANT_REFRESH_TOKEN),
                    ("refresh_token", token.refresh_token.as_str()),
                ],
            )
            .await?;
        let refreshed: AccessToken = parse_reply(REFRESH_TOKEN_URL, &raw)?;
        if refreshed.access_token.is_empty() {
            return Err(SdkError::MalformedPayload("refresh reply has no access_token".into()));
        }
        Ok(refreshed)
    }

    /// `Ok(())` when the platform confirms `token` is still valid.
    pub async fn check_access_token(&self, token: &AccessToken) -> Result<()> {
        require("access_token", &token.access_token)?;
        require("openid", &token.openid)?;
        let raw = self
            .get(
                CHECK_ACCESS_TOKEN_URL,
                &[("access_token", token.access_token.as_str()), ("openid", token.openid.as_str())],
            )
            .await?;
        let status: PlatformStatus = parse_reply(CHECK_ACCESS_TOKEN_URL, &raw)?;
        if status.errmsg != ERRMSG_OK {
            return Err(SdkError::remote(status.errcode.to_string(), status.errmsg));
        }
        Ok(())
    }
}
