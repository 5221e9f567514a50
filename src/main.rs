use anyhow::{anyhow, Result};
use ethers::types::{Address, U256};
use log::{error, info, warn};
use std::{env, sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

use relayswap::configuration::Configuration;
use relayswap::constants::weth_address;
use relayswap::derived_state::{DerivedSwapState, SwapDataSources, SwapFormState, TipSuggester};
use relayswap::estimation::ContractCaller;
use relayswap::ethereum_client::EthereumClient;
use relayswap::gas_price::{GasPriceOracle, HttpGasPriceOracle};
use relayswap::routing::V2RouterQuoter;
use relayswap::swap_call::{build_swap_calls, transaction_deadline, ChainContext};
use relayswap::swap_callback::{
    build_swap_callback, SwapCallbackState, SwapClients, SwapEnvironment,
};
use relayswap::transactions::TransactionHistory;
use relayswap::types::{BlockNumber, Token};
use relayswap::url_params::query_parameters_to_swap_state;

/// Derive a swap from a query string (`inputCurrency=ETH&outputCurrency=0x...&exactAmount=1`)
/// and either execute it, or with `--watch` keep the derived state and the
/// suggested relay tip current on every new block.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("=== RELAYSWAP STARTING ===");

    let args: Vec<String> = env::args().skip(1).collect();
    let watch = args.iter().any(|arg| arg == "--watch");
    let query = args
        .iter()
        .find(|arg| !arg.starts_with("--"))
        .cloned()
        .unwrap_or_default();

    let config = Configuration::get_from_environment()?;
    let client = Arc::new(EthereumClient::new(&config).await?);

    let weth = weth_address(client.chain_id())
        .ok_or_else(|| anyhow!("no WETH deployment known for chain {}", client.chain_id()))?;
    let weth = Token::new(client.chain_id(), weth.parse()?, 18, Some("WETH".to_string()));
    let caller: Arc<dyn ContractCaller> = client.clone();
    let quoter = V2RouterQuoter::new(
        caller,
        config.exchange.router,
        config.exchange.factory,
        weth,
    );

    let http_oracle;
    let oracle: &dyn GasPriceOracle = match &config.gas_price_api_url {
        Some(url) => {
            http_oracle = HttpGasPriceOracle::new(url.as_str(), config.gas_price_api_pointer.as_str());
            &http_oracle
        }
        None => client.as_ref(),
    };

    let form = query_parameters_to_swap_state(&query);
    info!("swap form: {:?}", form);

    let sources = SwapDataSources {
        currencies: client.as_ref(),
        balances: client.as_ref(),
        router: &quoter,
        resolver: client.as_ref(),
    };

    if watch {
        watch_blocks(&config, &client, oracle, &form, sources).await
    } else {
        execute_once(&config, &client, &form, sources).await
    }
}

async fn execute_once(
    config: &Configuration,
    client: &EthereumClient,
    form: &SwapFormState,
    sources: SwapDataSources<'_>,
) -> Result<()> {
    let preferences = &config.preferences;
    let block_number = client.get_latest_block_number().await?;

    let mut state = DerivedSwapState::new();
    let derived = state
        .derive(
            form,
            config.account,
            preferences.allowed_slippage_bips,
            Some(block_number),
            sources,
        )
        .await;

    if let Some(trade) = &derived.trade {
        info!(
            "best trade: {} for {}",
            trade.input_amount, trade.output_amount
        );
    }
    if let Some(input_error) = &derived.input_error {
        warn!("{}", input_error);
        return Ok(());
    }

    let deadline = transaction_deadline(
        client.get_current_timestamp().await?,
        preferences.deadline_secs,
    );
    let history = TransactionHistory::new();
    let environment = SwapEnvironment {
        chain: config.account.map(|account| ChainContext {
            chain_id: client.chain_id(),
            account,
        }),
        deadline: Some(deadline),
        router_mode: Some(config.router_mode(preferences.eth_tip)),
        clients: SwapClients {
            caller: client,
            sender: client,
            recorder: &history,
            resolver: client,
        },
    };

    let callback = build_swap_callback(
        derived.trade.as_ref(),
        preferences.allowed_slippage_bips,
        form.recipient.as_deref(),
        config.sign_only,
        &environment,
    )
    .await;

    match (callback.state, callback.callback, callback.error) {
        (SwapCallbackState::Valid, Some(swap), _) => match swap.execute().await {
            Ok(result) => {
                info!("{}", serde_json::to_string_pretty(&result)?);
                Ok(())
            }
            Err(err) => Err(anyhow!(err)),
        },
        (SwapCallbackState::Loading, _, _) => {
            warn!("recipient is still resolving");
            Ok(())
        }
        (_, _, error) => Err(anyhow!(
            "swap is not executable: {}",
            error.map(|err| err.to_string()).unwrap_or_default()
        )),
    }
}

async fn watch_blocks(
    config: &Configuration,
    client: &EthereumClient,
    oracle: &dyn GasPriceOracle,
    form: &SwapFormState,
    sources: SwapDataSources<'_>,
) -> Result<()> {
    let preferences = &config.preferences;
    let chain = config.account.map(|account| ChainContext {
        chain_id: client.chain_id(),
        account,
    });

    let mut state = DerivedSwapState::new();
    let mut suggester = TipSuggester::new();
    let mut eth_tip: U256 = preferences.eth_tip;
    let mut last_block: Option<BlockNumber> = None;

    loop {
        let block_number = match client.get_latest_block_number().await {
            Ok(block_number) => block_number,
            Err(err) => {
                error!("unable to fetch latest block: {:?}", err);
                tokio::time::sleep(Duration::from_secs(config.polling_frequency_secs)).await;
                continue;
            }
        };

        if last_block != Some(block_number) {
            last_block = Some(block_number);
            suggester.begin(block_number);

            let derived = state
                .derive(
                    form,
                    config.account,
                    preferences.allowed_slippage_bips,
                    Some(block_number),
                    sources,
                )
                .await;
            match &derived.input_error {
                Some(input_error) => info!("block {}: {}", block_number, input_error),
                None => info!("block {}: swap is ready", block_number),
            }

            let deadline = match client.get_current_timestamp().await {
                Ok(timestamp) => Some(transaction_deadline(timestamp, preferences.deadline_secs)),
                Err(err) => {
                    warn!("unable to read block timestamp: {:?}", err);
                    None
                }
            };
            let calls = build_swap_calls(
                derived.trade.as_ref(),
                preferences.allowed_slippage_bips,
                derived.recipient,
                deadline,
                chain.as_ref(),
                Some(&config.router_mode(eth_tip)),
            );

            match TipSuggester::refresh(
                block_number,
                preferences.tip_manual_override,
                oracle,
                client,
                derived.trade.as_ref(),
                &calls,
                config.account.unwrap_or_else(Address::zero),
            )
            .await
            {
                Ok(Some(update)) => {
                    if let Some(tip) = suggester.accept(update).and_then(|update| update.eth_tip) {
                        eth_tip = tip;
                        info!("suggested tip is now {} wei", eth_tip);
                    }
                }
                Ok(None) => {}
                Err(err) => warn!("tip refresh failed: {:?}", err),
            }
        }

        tokio::time::sleep(Duration::from_secs(config.polling_frequency_secs)).await;
    }
}
