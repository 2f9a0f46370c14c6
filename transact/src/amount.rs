//! Satoshi-precision amount codec.
//!
//! Bitcoin amounts travel as decimal BTC values with at most eight
//! fractional digits. Every amount that leaves this workspace goes through
//! [`quantize`], which truncates toward zero so the wallet never sends more
//! than the caller asked for.
//!
//! Values are [`Decimal`]s end to end. JSON numbers are read and written
//! through their textual representation (serde_json's `arbitrary_precision`),
//! so `0.1 + 0.2` stays `0.3`.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use crate::error::ValidationError;

/// Number of fractional digits in one satoshi.
pub const SATOSHI_SCALE: u32 = 8;

/// Satoshis per bitcoin.
pub const SATOSHIS_PER_BTC: i64 = 100_000_000;

/// Truncates `value` to satoshi precision (eight fractional digits, toward zero).
///
/// Idempotent: `quantize(quantize(x)) == quantize(x)`.
#[must_use]
pub fn quantize(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SATOSHI_SCALE, RoundingStrategy::ToZero)
}

/// Parses a decimal BTC string and quantizes it.
///
/// Accepts plain (`"0.5"`) and scientific (`"5e-1"`) notation.
///
/// # Errors
///
/// Returns [`ValidationError`] if `input` is not a number.
pub fn parse(input: &str) -> Result<Decimal, ValidationError> {
    let trimmed = input.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map(quantize)
        .map_err(|_| ValidationError::new(format!("'{input}' is not a numeric amount")))
}

/// Reads an exact decimal from a JSON number.
///
/// The value is returned as received; callers that send it back out must
/// [`quantize`] it.
///
/// # Errors
///
/// Returns [`ValidationError`] if `value` is not a JSON number.
pub fn from_json(value: &Value) -> Result<Decimal, ValidationError> {
    let Value::Number(number) = value else {
        return Err(ValidationError::new(format!(
            "expected a numeric amount, got {value}"
        )));
    };
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| ValidationError::new(format!("amount {text} is out of range")))
}

/// Encodes `value` as a JSON number after quantizing it.
///
/// # Errors
///
/// Returns [`ValidationError`] if the decimal cannot be represented as a JSON number.
pub fn to_json(value: Decimal) -> Result<Value, ValidationError> {
    let quantized = quantize(value);
    serde_json::from_str(&quantized.to_string())
        .map_err(|e| ValidationError::new(format!("cannot encode amount {quantized}: {e}")))
}

/// Converts a BTC amount into whole satoshis, truncating sub-satoshi digits.
///
/// # Errors
///
/// Returns [`ValidationError`] if the amount does not fit in an `i64`.
pub fn to_satoshis(value: Decimal) -> Result<i64, ValidationError> {
    quantize(value)
        .checked_mul(Decimal::from(SATOSHIS_PER_BTC))
        .and_then(|sats| sats.to_i64())
        .ok_or_else(|| ValidationError::new(format!("amount {value} overflows satoshi range")))
}

/// Converts whole satoshis into a BTC amount.
#[must_use]
pub fn from_satoshis(sats: i64) -> Decimal {
    Decimal::new(sats, SATOSHI_SCALE)
}
