// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # wxsdk
//!
//! Entry point for the `wxsdk` binary. Parses CLI arguments, initializes
//! logging, and runs one SDK operation.
//!
//! - `sign`: sign a parameter set
//! - `verify-notify`: verify a payment notification
//! - `decrypt`: open a mini-program identity envelope
//! - `order`: place a unified order (`app` or `mini-program`)
//! - `version`: print build version information
//!
//! Results go to stdout; logs and errors go to stderr.

mod cli;
mod config;
mod logging;

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use wechat_sdk::crypto::{sign, SigningRecord};
use wechat_sdk::login::MiniProgramSession;
use wechat_sdk::pay::{OrderRequest, PayNotification, WePay};
use wechat_sdk::transport::HttpTransport;

use cli::{Commands, OrderArgs, OrderChannel, WxSdkCli};
use config::CliConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = WxSdkCli::parse();
    logging::init_logging(logging::DEFAULT_FILTER, cli.log_format);

    match cli.command {
        Commands::Sign(args) => sign_fields(args),
        Commands::VerifyNotify(args) => verify_notify(args),
        Commands::Decrypt(args) => decrypt(args),
        Commands::Order(channel) => place_order(channel).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Prints the upper-case digest of the given fields.
fn sign_fields(args: cli::SignArgs) -> Result<()> {
    let record: SigningRecord = args.fields.into_iter().collect();
    let digest = sign(&record, &args.key, args.sign_type).context("failed to sign fields")?;
    tracing::debug!(fields = record.len(), sign_type = %args.sign_type, "signed");
    println!("{}", digest.to_ascii_uppercase());
    Ok(())
}

/// Verifies a notification body against the configured pay key.
fn verify_notify(args: cli::VerifyNotifyArgs) -> Result<()> {
    let pay = CliConfig::load(&args.config)?.pay(&args.config)?;
    let body = read_input(&args.file)?;
    let notification = PayNotification::verify(&body, &pay.pay_key, pay.sign_type)
        .context("notification rejected")?;
    tracing::info!(out_trade_no = %notification.out_trade_no, "notification verified");
    print_json(&notification)
}

/// Decrypts an identity envelope, optionally checking its watermark.
fn decrypt(args: cli::DecryptArgs) -> Result<()> {
    let session = MiniProgramSession::new("", args.session_key, "");
    let identity = session
        .decrypt_identity(&args.data, &args.iv)
        .context("failed to decrypt identity envelope")?;
    if let Some(app_id) = &args.app_id {
        identity.check_watermark(app_id)?;
    }
    print_json(&identity)
}

/// Places a unified order over HTTPS and prints the client payload.
async fn place_order(channel: OrderChannel) -> Result<()> {
    match channel {
        OrderChannel::App(args) => {
            let (pay, req) = order_client(&args)?;
            let (params, out_trade_no) = pay.app_pay(&req).await.context("app order failed")?;
            tracing::info!(%out_trade_no, "order placed");
            print_json(&params)
        }
        OrderChannel::MiniProgram(args) => {
            let (pay, req) = order_client(&args.order)?;
            let (params, out_trade_no) = pay
                .mini_program_pay(&req, &args.openid)
                .await
                .context("mini-program order failed")?;
            tracing::info!(%out_trade_no, "order placed");
            print_json(&params)
        }
    }
}

fn order_client(args: &OrderArgs) -> Result<(WePay<HttpTransport>, OrderRequest)> {
    let config = CliConfig::load(&args.config)?.pay(&args.config)?;
    let transport = HttpTransport::with_timeout(Duration::from_secs(args.timeout_secs))
        .context("failed to build HTTP client")?;

    let mut req = OrderRequest::new(args.amount, args.client_ip.clone());
    req.body = args.body.clone();
    req.attach = args.attach.clone();
    req.out_trade_no = args.out_trade_no.clone();
    Ok((WePay::new(config, transport), req))
}

/// Reads a file, or stdin when the path is `-`.
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("wxsdk {}", env!("CARGO_PKG_VERSION"));
    println!("rustc {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
