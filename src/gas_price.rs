use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::types::U256;
use log::debug;
use serde_json::Value;

/// Source of the current gas price quote, in wei.
#[async_trait]
pub trait GasPriceOracle: Send + Sync {
    async fn gas_price(&self) -> Result<U256>;
}

/// Gas price read from a JSON HTTP endpoint. `pointer` is a JSON pointer
/// (e.g. `/data/rapid`) to a wei value, given as a number, a decimal string or
/// a 0x-prefixed hex string.
pub struct HttpGasPriceOracle {
    pub url: String,
    pub pointer: String,
    http_client: reqwest::Client,
}

impl HttpGasPriceOracle {
    pub fn new(url: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pointer: pointer.into(),
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl GasPriceOracle for HttpGasPriceOracle {
    async fn gas_price(&self) -> Result<U256> {
        let response = self.http_client.get(&self.url).send().await?;

        let response_body = match response.error_for_status_ref() {
            Ok(_) => response.json::<Value>().await?,
            Err(err) => {
                debug!("GET gas price failed with body: {:?}", response.text().await?);
                return Err(anyhow!(err));
            }
        };

        debug!("Got back the following gas price body: {:?}", response_body);

        extract_gas_price(&response_body, &self.pointer)
    }
}

pub fn extract_gas_price(body: &Value, pointer: &str) -> Result<U256> {
    let value = body
        .pointer(pointer)
        .with_context(|| format!("unable to find `{}` in gas price response", pointer))?;

    match value {
        Value::Number(number) => number
            .as_u64()
            .map(U256::from)
            .context("gas price is not an unsigned integer"),
        Value::String(text) => match text.strip_prefix("0x") {
            Some(hex) => U256::from_str_radix(hex, 16).context("gas price is not valid hex"),
            None => U256::from_dec_str(text).context("gas price is not a decimal integer"),
        },
        other => Err(anyhow!("unexpected gas price value {:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_gas_price() {
        let body = json!({ "data": { "rapid": 42_000_000_000u64, "fast": "35000000000", "slow": "0x3b9aca00" } });

        assert_eq!(
            extract_gas_price(&body, "/data/rapid").unwrap(),
            U256::from(42_000_000_000u64)
        );
        assert_eq!(
            extract_gas_price(&body, "/data/fast").unwrap(),
            U256::from(35_000_000_000u64)
        );
        assert_eq!(
            extract_gas_price(&body, "/data/slow").unwrap(),
            U256::from(1_000_000_000u64)
        );
        assert!(extract_gas_price(&body, "/data/missing").is_err());
        assert!(extract_gas_price(&json!({ "data": 1.5 }), "/data").is_err());
    }
}
