//! Merchant-side identifiers: trade numbers and red-envelope bill numbers.
//!
//! Both are prefixed with the merchant id so numbers from different merchants
//! sharing a reconciliation pipeline never collide. Uniqueness beyond that
//! rests on the timestamp plus random digits; the platform rejects a reused
//! number, it never silently merges two orders.

use chrono::Local;

use crate::crypto::nonce::random_digits;
use crate::error::{Result, SdkError};

/// Random digits appended to a trade number.
const TRADE_NO_RANDOM_DIGITS: usize = 6;

/// Platform limit on `out_trade_no`.
pub const MAX_TRADE_NO_LENGTH: usize = 32;

/// `prefix + yyyyMMddHHmmss + 6 random digits`.
pub fn out_trade_no(prefix: &str) -> String {
    format!(
        "{prefix}{}{}",
        Local::now().format("%Y%m%d%H%M%S"),
        random_digits(TRADE_NO_RANDOM_DIGITS)
    )
}

/// `mch_id + yyyyMMdd + random digits`, exactly `total_len` characters.
///
/// Fails when the merchant id and date alone leave no room for randomness.
pub fn bill_no(mch_id: &str, total_len: usize) -> Result<String> {
    let date = Local::now().format("%Y%m%d").to_string();
    let fixed = mch_id.len() + date.len();
    if fixed >= total_len {
        return Err(SdkError::validation(format!(
            "mch_id {mch_id} leaves no room for a {total_len}-character bill number"
        )));
    }
    Ok(format!("{mch_id}{date}{}", random_digits(total_len - fixed)))
}
