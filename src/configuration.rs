use anyhow::{anyhow, Context, Result};
use ethers::types::{Address, U256};
use log::debug;
use std::env;
use std::str::FromStr;

use crate::constants::{
    default_eth_tip, DEFAULT_DEADLINE_FROM_NOW, INITIAL_ALLOWED_SLIPPAGE, V2_FACTORY_ADDRESS,
    V2_ROUTER_ADDRESS,
};
use crate::swap_call::RouterMode;

/// User settings the swap pipeline is parameterised with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPreferences {
    pub allowed_slippage_bips: u32,
    pub deadline_secs: u64,
    pub use_relay: bool,
    pub eth_tip: U256,
    /// When set, the suggested tip is never refreshed.
    pub tip_manual_override: bool,
}

impl Default for SwapPreferences {
    fn default() -> Self {
        Self {
            allowed_slippage_bips: INITIAL_ALLOWED_SLIPPAGE,
            deadline_secs: DEFAULT_DEADLINE_FROM_NOW,
            use_relay: false,
            eth_tip: default_eth_tip(),
            tip_manual_override: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeAddresses {
    pub router: Address,
    pub relay_router: Option<Address>,
    pub factory: Address,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub infura_api_key: Option<String>,
    pub network: String, // whatever infura accepts as a network e.g., 'mainnet' or 'rinkeby'
    pub node_base_url: Option<String>,
    pub exchange: ExchangeAddresses,
    pub account: Option<Address>,
    pub preferences: SwapPreferences,
    pub sign_only: bool,
    pub polling_frequency_secs: u64,
    pub gas_price_api_url: Option<String>,
    pub gas_price_api_pointer: String,
}

impl Configuration {
    pub fn get_from_environment() -> Result<Self> {
        let infura_api_key = collect_optional_environment_variable("INFURA_API_KEY")?;
        let node_base_url = collect_optional_environment_variable("NODE_BASE_URL")?;

        if infura_api_key.is_none() && node_base_url.is_none() {
            return Err(anyhow!(
                "either `infura_api_key` or `node_base_url` must be set"
            ));
        }

        let network = collect_optional_environment_variable("RELAYSWAP_NETWORK")?
            .unwrap_or_else(|| "mainnet".to_string());

        let router: Address = match parse_optional_environment_variable("ROUTER_ADDRESS")? {
            Some(router) => router,
            None => V2_ROUTER_ADDRESS.parse()?,
        };
        let factory: Address = match parse_optional_environment_variable("FACTORY_ADDRESS")? {
            Some(factory) => factory,
            None => V2_FACTORY_ADDRESS.parse()?,
        };
        let relay_router = parse_optional_environment_variable("RELAY_ROUTER_ADDRESS")?;
        let account = parse_optional_environment_variable("ACCOUNT_ADDRESS")?;

        let use_relay = parse_optional_environment_variable("USE_RELAY")?.unwrap_or(false);
        if use_relay && relay_router.is_none() {
            return Err(anyhow!(
                "`relay_router_address` must be set when `use_relay` is enabled"
            ));
        }

        let eth_tip = match collect_optional_environment_variable("ETH_TIP_WEI")? {
            Some(tip) => U256::from_dec_str(&tip).context("ETH_TIP_WEI must be a decimal integer")?,
            None => default_eth_tip(),
        };

        let preferences = SwapPreferences {
            allowed_slippage_bips: parse_optional_environment_variable("ALLOWED_SLIPPAGE_BIPS")?
                .unwrap_or(INITIAL_ALLOWED_SLIPPAGE),
            deadline_secs: parse_optional_environment_variable("DEADLINE_SECS")?
                .unwrap_or(DEFAULT_DEADLINE_FROM_NOW),
            use_relay,
            eth_tip,
            tip_manual_override: parse_optional_environment_variable("TIP_MANUAL_OVERRIDE")?
                .unwrap_or(false),
        };

        let sign_only = parse_optional_environment_variable("SIGN_ONLY")?.unwrap_or(false);
        let polling_frequency_secs =
            parse_optional_environment_variable("POLLING_FREQUENCY_SECS")?.unwrap_or(12);

        let gas_price_api_url = collect_optional_environment_variable("GAS_PRICE_API_URL")?;
        let gas_price_api_pointer = collect_optional_environment_variable("GAS_PRICE_API_POINTER")?
            .unwrap_or_else(|| "/data/rapid".to_string());

        Ok(Self {
            infura_api_key,
            network,
            node_base_url,
            exchange: ExchangeAddresses {
                router,
                relay_router,
                factory,
            },
            account,
            preferences,
            sign_only,
            polling_frequency_secs,
            gas_price_api_url,
            gas_price_api_pointer,
        })
    }

    pub fn node_url(&self) -> Result<String> {
        match (&self.node_base_url, &self.infura_api_key) {
            (Some(node_base_url), _) => Ok(node_base_url.clone()),
            (None, Some(infura_api_key)) => Ok(format!(
                "https://{}.infura.io/v3/{}",
                self.network, infura_api_key
            )),
            (None, None) => Err(anyhow!("no node url configured")),
        }
    }

    /// Where swaps are sent, given the current tip.
    pub fn router_mode(&self, eth_tip: U256) -> RouterMode {
        match (self.preferences.use_relay, self.exchange.relay_router) {
            (true, Some(relay_router)) => RouterMode::Relayed {
                relay_router,
                router: self.exchange.router,
                eth_tip,
            },
            _ => RouterMode::Direct {
                router: self.exchange.router,
            },
        }
    }
}

fn collect_optional_environment_variable(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            debug!(
                "environment variable {} not set but it wasn't required",
                key
            );
            Ok(None)
        }
    }
}

fn parse_optional_environment_variable<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    collect_optional_environment_variable(key)?
        .map(|value| value.parse::<T>())
        .transpose()
        .with_context(|| format!("environment variable {} is malformed", key))
}
