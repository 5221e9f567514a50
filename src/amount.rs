use ethers::types::U256;
use log::debug;
use thiserror::Error;

use crate::types::{pow10, Currency, CurrencyAmount};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseAmountError {
    #[error("invalid decimal number")]
    Malformed,

    #[error("fractional component exceeds decimals")]
    TooManyDecimals,

    #[error("value overflows uint256")]
    Overflow,
}

/// Parses a user-typed amount into the currency's smallest unit. Empty input,
/// a missing currency, a parse failure and an exact zero are all "unset".
pub fn try_parse_amount(value: &str, currency: Option<&Currency>) -> Option<CurrencyAmount> {
    let currency = currency?;
    if value.is_empty() {
        return None;
    }

    match parse_units(value, currency.decimals()) {
        Ok(raw) if !raw.is_zero() => Some(CurrencyAmount::new(currency.clone(), raw)),
        Ok(_) => None,
        Err(err) => {
            // expected when the user types too many decimal places
            debug!("Failed to parse input amount: {:?} - {}", value, err);
            None
        }
    }
}

/// Exact decimal-to-integer conversion. Unlike float based parsing, excess
/// precision is rejected rather than truncated.
pub fn parse_units(value: &str, decimals: u8) -> Result<U256, ParseAmountError> {
    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (value, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(ParseAmountError::Malformed);
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(ParseAmountError::Malformed);
    }
    if fraction.len() > decimals as usize {
        return Err(ParseAmountError::TooManyDecimals);
    }

    let scale = pow10(decimals as usize).ok_or(ParseAmountError::Overflow)?;
    let whole = parse_digits(whole)?;
    let fraction_scale =
        pow10(decimals as usize - fraction.len()).ok_or(ParseAmountError::Overflow)?;
    let fraction = parse_digits(fraction)?;

    whole
        .checked_mul(scale)
        .and_then(|whole| {
            fraction
                .checked_mul(fraction_scale)
                .and_then(|fraction| whole.checked_add(fraction))
        })
        .ok_or(ParseAmountError::Overflow)
}

fn parse_digits(digits: &str) -> Result<U256, ParseAmountError> {
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_dec_str(digits).map_err(|_| ParseAmountError::Overflow)
}
