//! Mini-program login.
//!
//! `js_code → session key`, then the session key decrypts the identity
//! envelope the mini-program obtained client-side. The decrypted payload
//! carries a watermark naming the app it was issued for; a payload whose
//! watermark names another app is rejected, since it was minted for a
//! different application's session.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;
use zeroize::Zeroizing;

use super::oauth::{parse_reply, WxLogin};
use crate::config::{GRANT_AUTHORIZATION_CODE, JS_CODE_TO_SESSION_URL};
use crate::crypto::decrypt_envelope;
use crate::error::{Result, SdkError};
use crate::transport::Transport;

/// Result of `jscode2session`. The session key is wiped on drop and never
/// printed.
#[derive(Clone)]
pub struct MiniProgramSession {
    pub openid: String,
    /// Base64 AES-128 key for this login.
    session_key: Zeroizing<String>,
    pub unionid: String,
}

#[derive(Deserialize)]
struct SessionReply {
    #[serde(default)]
    openid: String,
    #[serde(default)]
    session_key: String,
    #[serde(default)]
    unionid: String,
}

impl MiniProgramSession {
    pub fn new(openid: impl Into<String>, session_key: impl Into<String>, unionid: impl Into<String>) -> Self {
        Self {
            openid: openid.into(),
            session_key: Zeroizing::new(session_key.into()),
            unionid: unionid.into(),
        }
    }

    /// The base64 session key. Hand it only to code that needs to decrypt.
    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    /// Decrypt an envelope into any JSON shape.
    ///
    /// A bad key, IV or padding is [`SdkError::Codec`]; plaintext that does
    /// not parse as `P` is [`SdkError::MalformedPayload`].
    pub fn decrypt_payload<P: DeserializeOwned>(&self, encrypted_data: &str, iv: &str) -> Result<P> {
        let plain = Zeroizing::new(decrypt_envelope(&self.session_key, iv, encrypted_data)?);
        serde_json::from_slice(&plain)
            .map_err(|e| SdkError::MalformedPayload(format!("decrypted payload: {e}")))
    }

    /// Decrypt the user identity envelope.
    pub fn decrypt_identity(&self, encrypted_data: &str, iv: &str) -> Result<DecryptedIdentity> {
        self.decrypt_payload(encrypted_data, iv)
    }
}

impl fmt::Debug for MiniProgramSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiniProgramSession")
            .field("openid", &self.openid)
            .field("session_key", &"<redacted>")
            .field("unionid", &self.unionid)
            .finish()
    }
}

/// App binding embedded in every decrypted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    pub appid: String,
    pub timestamp: u64,
}

/// Decrypted user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptedIdentity {
    #[serde(default)]
    pub open_id: String,
    #[serde(default)]
    pub nick_name: String,
    /// 0 unknown, 1 male, 2 female.
    #[serde(default)]
    pub gender: u8,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub union_id: String,
    pub watermark: Watermark,
}

impl DecryptedIdentity {
    /// Fail unless the watermark names `app_id`.
    pub fn check_watermark(&self, app_id: &str) -> Result<()> {
        if self.watermark.appid != app_id {
            warn!(expected = app_id, found = %self.watermark.appid, "watermark app id mismatch");
            return Err(SdkError::validation(format!(
                "watermark app id {} does not match {app_id}",
                self.watermark.appid
            )));
        }
        Ok(())
    }
}

impl<T: Transport> WxLogin<T> {
    /// Exchange a mini-program `js_code` for a session.
    pub async fn code_to_session(&self, js_code: &str) -> Result<MiniProgramSession> {
        if js_code.is_empty() {
            return Err(SdkError::validation("js_code is required"));
        }
        let credentials = self.credentials();
        let raw = Zeroizing::new(
            self.get(
                JS_CODE_TO_SESSION_URL,
                &[
                    ("appid", credentials.app_id.as_str()),
                    ("secret", credentials.secret.as_str()),
                    ("js_code", js_code),
                    ("grant_type", GRANT_AUTHORIZATION_CODE),
                ],
            )
            .await?,
        );
        let reply: SessionReply = parse_reply(JS_CODE_TO_SESSION_URL, &raw)?;
        if reply.openid.is_empty() || reply.session_key.is_empty() {
            return Err(SdkError::MalformedPayload(
                "jscode2session reply lacks openid or session_key".into(),
            ));
        }
        Ok(MiniProgramSession::new(reply.openid, reply.session_key, reply.unionid))
    }

    /// Full mini-program login: session, decryption, watermark check.
    pub async fn mini_program_login(
        &self,
        js_code: &str,
        encrypted_data: &str,
        iv: &str,
    ) -> Result<(MiniProgramSession, DecryptedIdentity)> {
        let session = self.code_to_session(js_code).await?;
        let identity = session.decrypt_identity(encrypted_data, iv)?;
        identity.check_watermark(self.app_id())?;
        Ok((session, identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    use crate::crypto::cbc::{encrypt_envelope, CodecError};

    // Published sample from the mini-program data decryption docs.
    const SAMPLE_APP_ID: &str = "wx4f4bc4dec97d474b";
    const SAMPLE_SESSION_KEY: &str = "tiihtNczf5v6AKRyjwEUhQ==";
    const SAMPLE_IV: &str = "r7BXXKkLb8qrSNn05n0qiA==";
    const SAMPLE_DATA: &str = "CiyLU1Aw2KjvrjMdj8YKliAjtP4gsMZMQmRzooG2xrDcvSnxIMXFufNstNGTyaGS9uT5geRa0W4oTOb1WT7fJlAC+oNPdbB+3hVbJSRgv+4lGOETKUQz6OYStslQ142dNCuabNPGBzlooOmB231qMM85d2/fV6ChevvXvQP8Hkue1poOFtnEtpyxVLW1zAo6/1Xx1COxFvrc2d7UL/lmHInNlxuacJXwu0fjpXfz/YqYzBIBzD6WUfTIF9GRHpOn/Hz7saL8xz+W//FRAUid1OksQaQx4CMs8LOddcQhULW4ucetDf96JcR3g0gfRK4PC7E/r7Z6xNrXd2UIeorGj5Ef7b1pJAYB6Y5anaHqZ9J6nKEBvB4DnNLIVWSgARns/8wR2SiRS7MNACwTyrGvt9ts8p12PKFdlqYTopNHR1Vf7XjfhQlVsAJdNiKdYmYVoKlaRv85IfVunYzO0IKXsyl7JCUjCpoG20f0a04COwfneQAGGwd5oa+T8yO5hzuyDb/XcxxmK01EpqOyuxINew==";

    fn sample_session() -> MiniProgramSession {
        MiniProgramSession::new("oGZUI0egBJY1zhBYw2KhdUfwVJJE", SAMPLE_SESSION_KEY, "")
    }

    #[test]
    fn test_published_sample_identity() {
        let identity = sample_session().decrypt_identity(SAMPLE_DATA, SAMPLE_IV).unwrap();
        assert_eq!(identity.open_id, "oGZUI0egBJY1zhBYw2KhdUfwVJJE");
        assert_eq!(identity.nick_name, "Band");
        assert_eq!(identity.gender, 1);
        assert_eq!(identity.city, "Guangzhou");
        assert_eq!(identity.union_id, "ocMvos6NjeKLIBqg5Mr9QjxrP1FA");
        assert_eq!(identity.watermark.timestamp, 1477314187);
        assert!(identity.check_watermark(SAMPLE_APP_ID).is_ok());
        assert!(identity.check_watermark("wx0000000000000000").unwrap_err().is_validation());
    }

    #[test]
    fn test_wrong_length_session_key() {
        // 24 raw bytes: a valid AES-192 key, but not a session key.
        let session = MiniProgramSession::new("o", "AAECAwQFBgcICQoLDA0ODxAREhMUFRYX", "");
        match session.decrypt_identity(SAMPLE_DATA, SAMPLE_IV) {
            Err(SdkError::Codec(CodecError::InvalidKeyLength { actual: 24, .. })) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_key_is_codec_or_malformed() {
        let session = MiniProgramSession::new("o", "AAAAAAAAAAAAAAAAAAAAAA==", "");
        let err = session.decrypt_identity(SAMPLE_DATA, SAMPLE_IV).unwrap_err();
        assert!(matches!(err, SdkError::Codec(_) | SdkError::MalformedPayload(_)));
    }

    #[test]
    fn test_non_json_plaintext_is_malformed() {
        let key = [7u8; 16];
        let iv = [9u8; 16];
        let data = encrypt_envelope(&key, &iv, b"definitely not json").unwrap();
        let session = MiniProgramSession::new("o", STANDARD.encode(key), "");
        assert!(matches!(
            session.decrypt_identity(&data, &STANDARD.encode(iv)),
            Err(SdkError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_debug_hides_session_key() {
        let out = format!("{:?}", sample_session());
        assert!(!out.contains(SAMPLE_SESSION_KEY));
        assert!(out.contains("oGZUI0egBJY1zhBYw2KhdUfwVJJE"));
    }
}
