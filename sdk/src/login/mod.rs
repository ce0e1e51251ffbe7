//! # Login
//!
//! Identity flows for apps, web pages and mini-programs. Two paths, both
//! linear:
//!
//! - `code → access token → user profile` for app and web login
//!   ([`WxLogin::login_with_code`]).
//! - `js_code → session key → decrypted identity` for mini-programs
//!   ([`WxLogin::mini_program_login`]).
//!
//! Platform errors (`errcode` / `errmsg`) surface verbatim as
//! [`SdkError::RemoteRejected`](crate::error::SdkError::RemoteRejected).

pub mod mini_program;
pub mod oauth;

pub use mini_program::{DecryptedIdentity, MiniProgramSession, Watermark};
pub use oauth::{AccessToken, UserProfile, WxLogin};
