use ethers::utils::to_checksum;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use url::form_urlencoded;

use crate::derived_state::SwapFormState;
use crate::recipient::{is_address, looks_like_ens_name};
use crate::types::Field;

static NUMERIC_PREFIX_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-+]?(\d+(\.\d*)?|\.\d+)").unwrap());

fn parse_currency_parameter(value: Option<&str>) -> String {
    match value.and_then(is_address) {
        Some(address) => format!("{:?}", address),
        None => "ETH".to_string(),
    }
}

fn parse_amount_parameter(value: Option<&str>) -> String {
    match value {
        Some(value) if NUMERIC_PREFIX_REGEX.is_match(value) => value.to_string(),
        _ => String::new(),
    }
}

fn parse_independent_field_parameter(value: Option<&str>) -> Field {
    match value {
        Some(value) if value.eq_ignore_ascii_case("output") => Field::Output,
        _ => Field::Input,
    }
}

fn validated_recipient(value: Option<&str>) -> Option<String> {
    let value = value?;
    if let Some(address) = is_address(value) {
        return Some(to_checksum(&address, None));
    }
    if looks_like_ens_name(value) {
        return Some(value.to_string());
    }
    None
}

/// Builds the initial form from a query string such as
/// `inputCurrency=ETH&outputCurrency=0x...&exactAmount=1.5&exactField=input`.
/// A leading `?` is ignored.
pub fn query_parameters_to_swap_state(query: &str) -> SwapFormState {
    let query = query.strip_prefix('?').unwrap_or(query);
    let params: HashMap<String, String> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    let param = |key: &str| params.get(key).map(String::as_str);

    let mut input_currency = Some(parse_currency_parameter(param("inputCurrency")));
    let mut output_currency = Some(parse_currency_parameter(param("outputCurrency")));
    if input_currency == output_currency {
        if param("outputCurrency").is_some() {
            input_currency = None;
        } else {
            output_currency = None;
        }
    }

    SwapFormState {
        independent_field: parse_independent_field_parameter(param("exactField")),
        typed_value: parse_amount_parameter(param("exactAmount")),
        input_currency_id: input_currency,
        output_currency_id: output_currency,
        recipient: validated_recipient(param("recipient")),
    }
}
