//! # Payments
//!
//! Merchant-side payment flows:
//!
//! - **order**: unified order request/response types and validation.
//! - **client**: [`WePay`], which places orders and signs the second-stage
//!   payloads for the app SDK and for mini-programs.
//! - **notify**: verification of payment-result callbacks.
//! - **redpack**: red-envelope disbursement over mutual TLS.
//! - **trade_no**: merchant trade and bill numbers.
//!
//! Every outbound request is signed with the merchant pay key; every inbound
//! message is verified with it before any of its fields are acted on.

pub mod client;
pub mod notify;
pub mod order;
pub mod redpack;
pub mod trade_no;

pub use client::{AppPayParams, MiniProgramPayParams, WePay};
pub use notify::{notify_reply, PayNotification};
pub use order::{OrderRequest, TradeType, UnifiedOrder, UnifiedOrderResponse};
pub use redpack::{RedPackResponse, SendRedPack};
