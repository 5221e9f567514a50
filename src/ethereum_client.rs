use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::abi::{self, ParamType};
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use log::debug;
use std::convert::TryFrom;
use std::sync::Arc;

use crate::configuration::Configuration;
use crate::derived_state::{BalanceReader, CurrencyResolver};
use crate::error::CallError;
use crate::estimation::ContractCaller;
use crate::executor::TransactionSender;
use crate::gas_price::GasPriceOracle;
use crate::recipient::NameResolver;
use crate::types::{BlockNumber, Currency, CurrencyAmount, Token};

abigen!(
    RawERC20,
    r#"[
        function name() external view returns (string)
        function symbol() external view returns (string)
        function decimals() external view returns (uint8)
        function balanceOf(address owner) external view returns (uint256)
    ]"#,
);

pub type ERC20 = RawERC20<Provider<Http>>;

// keccak256("Error(string)")[..4]
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

pub struct EthereumClient {
    inner_client: Arc<Provider<Http>>,
    chain_id: u64,
}

impl EthereumClient {
    pub async fn new(config: &Configuration) -> Result<Self> {
        let node_url = config.node_url()?;
        let provider = Provider::<Http>::try_from(node_url.as_str())
            .with_context(|| format!("invalid node url {}", node_url))?;
        let chain_id = provider.get_chainid().await?.as_u64();

        debug!("connected to chain {}", chain_id);

        Ok(Self {
            inner_client: Arc::new(provider),
            chain_id,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn erc20(&self, address: Address) -> ERC20 {
        ERC20::new(address, Arc::clone(&self.inner_client))
    }

    pub async fn get_latest_block_number(&self) -> Result<BlockNumber> {
        Ok(self.inner_client.get_block_number().await?.as_u64())
    }

    pub async fn get_current_timestamp(&self) -> Result<u64> {
        Ok(self
            .inner_client
            .get_block(ethers::core::types::BlockNumber::Latest)
            .await?
            .ok_or_else(|| anyhow!("Error fetching latest block."))?
            .timestamp
            .as_u64())
    }
}

/// Maps a node failure to a [`CallError`], decoding the revert reason when the
/// node attached one.
pub fn to_call_error(err: ProviderError) -> CallError {
    let (code, message, data) = match &err {
        ProviderError::JsonRpcClientError(inner) => match inner.downcast_ref::<HttpClientError>()
        {
            Some(HttpClientError::JsonRpcError(rpc_error)) => (
                Some(rpc_error.code),
                rpc_error.message.clone(),
                rpc_error.data.clone(),
            ),
            _ => (None, err.to_string(), None),
        },
        _ => (None, err.to_string(), None),
    };

    let reason = data
        .as_ref()
        .and_then(|data| data.as_str())
        .and_then(decode_revert_reason)
        .or_else(|| {
            message
                .split_once("execution reverted: ")
                .map(|(_, reason)| reason.to_string())
        });

    CallError {
        code,
        message,
        reason,
    }
}

/// Decodes `Error(string)` revert data given as a 0x-prefixed hex string.
pub fn decode_revert_reason(data: &str) -> Option<String> {
    let bytes = hex::decode(data.strip_prefix("0x").unwrap_or(data)).ok()?;
    if bytes.len() < 4 || bytes[..4] != ERROR_STRING_SELECTOR {
        return None;
    }
    abi::decode(&[ParamType::String], &bytes[4..])
        .ok()?
        .pop()?
        .into_string()
}

#[async_trait]
impl ContractCaller for EthereumClient {
    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, CallError> {
        self.inner_client
            .request("eth_estimateGas", [tx])
            .await
            .map_err(to_call_error)
    }

    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes, CallError> {
        self.inner_client
            .request("eth_call", (tx, "latest"))
            .await
            .map_err(to_call_error)
    }
}

#[async_trait]
impl TransactionSender for EthereumClient {
    async fn send_transaction(&self, tx: TypedTransaction) -> Result<TxHash, CallError> {
        let pending = self
            .inner_client
            .send_transaction(tx, None)
            .await
            .map_err(to_call_error)?;
        Ok(pending.tx_hash())
    }

    async fn populate_transaction(&self, tx: &mut TypedTransaction) -> Result<(), CallError> {
        self.inner_client
            .fill_transaction(tx, None)
            .await
            .map_err(to_call_error)
    }
}

#[async_trait]
impl NameResolver for EthereumClient {
    async fn resolve_name(&self, name: &str) -> Option<Address> {
        match self.inner_client.resolve_name(name).await {
            Ok(address) => Some(address),
            Err(err) => {
                debug!("unable to resolve {}: {}", name, err);
                None
            }
        }
    }
}

#[async_trait]
impl CurrencyResolver for EthereumClient {
    async fn currency(&self, id: &str) -> Option<Currency> {
        if id.eq_ignore_ascii_case("ETH") {
            return Some(Currency::Ether);
        }

        let address: Address = id.parse().ok()?;
        let erc20 = self.erc20(address);

        let decimals = match erc20.decimals().call().await {
            Ok(decimals) => decimals,
            Err(err) => {
                debug!("{:?} does not look like a token: {}", address, err);
                return None;
            }
        };
        let symbol = erc20.symbol().call().await.ok();
        let name = erc20.name().call().await.ok();

        let mut token = Token::new(self.chain_id, address, decimals, symbol);
        token.name = name;
        Some(Currency::Token(token))
    }
}

#[async_trait]
impl BalanceReader for EthereumClient {
    async fn balance(&self, account: Address, currency: &Currency) -> Option<CurrencyAmount> {
        let raw = match currency {
            Currency::Ether => self
                .inner_client
                .get_balance(account, None)
                .await
                .map_err(|err| err.to_string()),
            Currency::Token(token) => self
                .erc20(token.address)
                .balance_of(account)
                .call()
                .await
                .map_err(|err| err.to_string()),
        };

        match raw {
            Ok(raw) => Some(CurrencyAmount::new(currency.clone(), raw)),
            Err(err) => {
                debug!("unable to read {} balance: {}", currency.symbol(), err);
                None
            }
        }
    }
}

#[async_trait]
impl GasPriceOracle for EthereumClient {
    async fn gas_price(&self) -> Result<U256> {
        Ok(self.inner_client.get_gas_price().await?)
    }
}
