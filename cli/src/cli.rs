//! # CLI Interface
//!
//! Defines the command-line argument structure for `wxsdk` using `clap`
//! derive. Subcommands: `sign`, `verify-notify`, `decrypt`, `order` and
//! `version`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use wechat_sdk::crypto::SignType;

use crate::logging::LogFormat;

/// WeChat payment and login toolbox.
///
/// Signs parameter sets, verifies payment notifications, decrypts
/// mini-program identity envelopes and places unified orders, using the
/// same code paths a server integration would.
#[derive(Parser, Debug)]
#[command(
    name = "wxsdk",
    about = "WeChat payment & login toolbox",
    version,
    propagate_version = true
)]
pub struct WxSdkCli {
    /// Log output format: `pretty` or `json`. Logs go to stderr.
    #[arg(long, global = true, env = "WXSDK_LOG_FORMAT", default_value = "pretty", value_parser = parse_log_format)]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the signature of a parameter set, as attached to requests.
    Sign(SignArgs),
    /// Verify a payment notification and print it as JSON.
    VerifyNotify(VerifyNotifyArgs),
    /// Decrypt a mini-program identity envelope and print it as JSON.
    Decrypt(DecryptArgs),
    /// Place a unified order and print the client payment payload.
    #[command(subcommand)]
    Order(OrderChannel),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `sign` subcommand.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// Merchant pay key.
    ///
    /// Prefer the environment variable: command lines end up in shell
    /// history.
    #[arg(long, env = "WXSDK_PAY_KEY", hide_env_values = true)]
    pub key: String,

    /// Digest algorithm: `md5` or `hmac-sha256`.
    #[arg(long, default_value = "md5", value_parser = parse_sign_type)]
    pub sign_type: SignType,

    /// Fields to sign, as `name=value`.
    #[arg(required = true, value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
}

/// Arguments for the `verify-notify` subcommand.
#[derive(Args, Debug)]
pub struct VerifyNotifyArgs {
    /// Path to the configuration file (TOML) holding the `[pay]` section.
    #[arg(long, short = 'c', env = "WXSDK_CONFIG")]
    pub config: PathBuf,

    /// Notification body as received. `-` reads stdin.
    pub file: PathBuf,
}

/// Arguments for the `decrypt` subcommand.
#[derive(Args, Debug)]
pub struct DecryptArgs {
    /// Base64 session key from `jscode2session`.
    #[arg(long, env = "WXSDK_SESSION_KEY", hide_env_values = true)]
    pub session_key: String,

    /// Base64 IV supplied with the envelope.
    #[arg(long)]
    pub iv: String,

    /// Base64 encrypted data.
    #[arg(long)]
    pub data: String,

    /// Reject the payload unless its watermark names this app id.
    #[arg(long)]
    pub app_id: Option<String>,
}

/// Payment channel for the `order` subcommand.
#[derive(Subcommand, Debug)]
pub enum OrderChannel {
    /// In-app payment (`APP`).
    App(OrderArgs),
    /// Mini-program payment (`JSAPI`).
    MiniProgram(MiniProgramOrderArgs),
}

/// Order fields shared by every channel.
#[derive(Args, Debug)]
pub struct OrderArgs {
    /// Path to the configuration file (TOML) holding the `[pay]` section.
    #[arg(long, short = 'c', env = "WXSDK_CONFIG")]
    pub config: PathBuf,

    /// Amount in fen.
    #[arg(long)]
    pub amount: u64,

    /// Payer IP address.
    #[arg(long)]
    pub client_ip: String,

    /// Product description. Defaults to the configured body.
    #[arg(long)]
    pub body: Option<String>,

    /// Free-form data echoed back in the notification.
    #[arg(long)]
    pub attach: Option<String>,

    /// Merchant trade number. Generated when omitted.
    #[arg(long)]
    pub out_trade_no: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

/// Arguments for `order mini-program`.
#[derive(Args, Debug)]
pub struct MiniProgramOrderArgs {
    #[command(flatten)]
    pub order: OrderArgs,

    /// Payer openid within the mini-program.
    #[arg(long)]
    pub openid: String,
}

fn parse_sign_type(s: &str) -> Result<SignType, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    match s.to_ascii_lowercase().as_str() {
        "pretty" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        other => Err(format!("unknown log format: {other}")),
    }
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {s:?}"))?;
    if name.is_empty() {
        return Err(format!("empty field name in {s:?}"));
    }
    Ok((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        WxSdkCli::command().debug_assert();
    }

    #[test]
    fn test_sign_arguments() {
        let cli = WxSdkCli::try_parse_from([
            "wxsdk",
            "sign",
            "--key",
            "key123",
            "--sign-type",
            "HMAC-SHA256",
            "appid=wx1",
            "attach=a=b",
        ])
        .unwrap();
        match cli.command {
            Commands::Sign(args) => {
                assert_eq!(args.sign_type, SignType::HmacSha256);
                assert_eq!(args.fields[1], ("attach".to_string(), "a=b".to_string()));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_field_without_equals_rejected() {
        assert!(WxSdkCli::try_parse_from(["wxsdk", "sign", "--key", "k", "appid"]).is_err());
    }

    #[test]
    fn test_order_mini_program_arguments() {
        let cli = WxSdkCli::try_parse_from([
            "wxsdk",
            "--log-format",
            "json",
            "order",
            "mini-program",
            "-c",
            "wxsdk.toml",
            "--amount",
            "100",
            "--client-ip",
            "1.2.3.4",
            "--openid",
            "o1",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Order(OrderChannel::MiniProgram(args)) => {
                assert_eq!(args.order.amount, 100);
                assert_eq!(args.openid, "o1");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
