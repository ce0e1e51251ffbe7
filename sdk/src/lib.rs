// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # WeChat SDK: Core Library
//!
//! Client-side integration with the WeChat payment and identity platform:
//! OAuth and mini-program login, unified orders, payment notifications and
//! red-envelope disbursement.
//!
//! Underneath every flow sits a small cryptographic core. Requests are signed
//! over a canonical `name=value&...&key=secret` string (MD5 or HMAC-SHA256),
//! replies and callbacks are verified the same way in constant time, and
//! encrypted identity payloads are opened with AES-CBC under a strictly
//! checked PKCS#7 pad.
//!
//! ## Architecture
//!
//! - **crypto**: canonicalization, signatures, AES-CBC, nonces. Pure.
//! - **wire**: flat XML and query-string codecs.
//! - **transport**: the [`Transport`](transport::Transport) seam and the
//!   reqwest implementation, with mutual TLS for disbursements.
//! - **pay**: [`WePay`](pay::WePay) for orders, client payloads,
//!   notifications, red envelopes.
//! - **login**: [`WxLogin`](login::WxLogin) for access tokens, profiles,
//!   mini-program sessions.
//! - **config**: platform constants and caller configuration.
//! - **error**: the [`SdkError`] taxonomy.
//!
//! ## Ground Rules
//!
//! 1. Secrets are parameters. Nothing is cached, nothing is global.
//! 2. Every inbound signed message is verified before it is used.
//! 3. Nothing retries. A retried payment call is a new payment call.
//! 4. Secrets never reach a log line or a `Debug` impl.

pub mod config;
pub mod crypto;
pub mod error;
pub mod login;
pub mod pay;
pub mod transport;
pub mod wire;

pub use error::{Result, SdkError};
pub use login::WxLogin;
pub use pay::WePay;
