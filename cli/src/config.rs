//! # Configuration File
//!
//! `wxsdk` reads merchant and app settings from a TOML file:
//!
//! ```toml
//! [pay]
//! app_id = "wx2421b1c4370ec43b"
//! mch_id = "10000100"
//! pay_key = "..."
//! notify_url = "https://shop.example.com/wxpay/notify"
//! sign_type = "MD5"
//!
//! [pay.tls]
//! cert_file = "apiclient_cert.pem"
//! key_file = "apiclient_key.pem"
//!
//! [app]
//! app_id = "wx2421b1c4370ec43b"
//! secret = "..."
//! ```
//!
//! Both sections are optional; commands that need one fail with a pointed
//! error when it is missing.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use wechat_sdk::config::{AppCredentials, PayConfig};

/// Contents of the configuration file.
#[derive(Debug, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub pay: Option<PayConfig>,
    #[serde(default)]
    pub app: Option<AppCredentials>,
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// The `[pay]` section, or an error naming the file.
    pub fn pay(self, path: &Path) -> Result<PayConfig> {
        self.pay
            .with_context(|| format!("{} has no [pay] section", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use wechat_sdk::crypto::SignType;
    use wechat_sdk::pay::TradeType;

    #[test]
    fn test_load_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[pay]
app_id = "wx1"
mch_id = "10"
pay_key = "key123"
notify_url = "https://example.com/notify"
trade_type = "JSAPI"
sign_type = "HMAC-SHA256"

[pay.tls]
cert_file = "cert.pem"
key_file = "key.pem"

[app]
app_id = "wx1"
secret = "s"
"#
        )
        .unwrap();

        let config = CliConfig::load(file.path()).unwrap();
        assert_eq!(config.app.as_ref().unwrap().secret, "s");
        let pay = config.pay(file.path()).unwrap();
        assert_eq!(pay.trade_type, TradeType::Jsapi);
        assert_eq!(pay.sign_type, SignType::HmacSha256);
        assert!(pay.tls.is_some());
    }

    #[test]
    fn test_missing_pay_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[app]\napp_id = \"wx1\"\nsecret = \"s\"").unwrap();
        let err = CliConfig::load(file.path()).unwrap().pay(file.path()).unwrap_err();
        assert!(err.to_string().contains("[pay]"));
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = CliConfig::load(Path::new("/no/such/wxsdk.toml")).unwrap_err();
        assert!(err.to_string().contains("/no/such/wxsdk.toml"));
    }
}
