use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, U256};
use log::{debug, info};

use crate::amount::try_parse_amount;
use crate::constants::default_eth_tip;
use crate::error::InputError;
use crate::estimation::{estimate_swap_calls, select_successful_estimation, ContractCaller};
use crate::gas_price::GasPriceOracle;
use crate::recipient::{resolve_recipient, validate_recipient, NameResolver};
use crate::routing::TradeRouter;
use crate::swap_call::SwapCall;
use crate::types::{
    compute_slippage_adjusted_amounts, BlockNumber, Currency, CurrencyAmount, Field, Trade,
};

/// What the user has entered in the swap form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SwapFormState {
    pub independent_field: Field,
    pub typed_value: String,
    pub input_currency_id: Option<String>,
    pub output_currency_id: Option<String>,
    /// `None` sends the output to the connected account.
    pub recipient: Option<String>,
}

impl Default for SwapFormState {
    fn default() -> Self {
        Self {
            independent_field: Field::Input,
            typed_value: String::new(),
            input_currency_id: None,
            output_currency_id: None,
            recipient: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues<T> {
    pub input: T,
    pub output: T,
}

impl<T> FieldValues<T> {
    pub fn get(&self, field: Field) -> &T {
        match field {
            Field::Input => &self.input,
            Field::Output => &self.output,
        }
    }
}

/// Looks up currencies by form identifier (`ETH` or a token address).
#[async_trait]
pub trait CurrencyResolver: Send + Sync {
    async fn currency(&self, id: &str) -> Option<Currency>;
}

#[async_trait]
pub trait BalanceReader: Send + Sync {
    async fn balance(&self, account: Address, currency: &Currency) -> Option<CurrencyAmount>;
}

/// Collaborators the derivation reads from.
#[derive(Clone, Copy)]
pub struct SwapDataSources<'a> {
    pub currencies: &'a dyn CurrencyResolver,
    pub balances: &'a dyn BalanceReader,
    pub router: &'a dyn TradeRouter,
    pub resolver: &'a dyn NameResolver,
}

/// One recomputation of the swap form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedSwapInfo {
    pub currencies: FieldValues<Option<Currency>>,
    pub currency_balances: FieldValues<Option<CurrencyAmount>>,
    pub parsed_amount: Option<CurrencyAmount>,
    pub trade: Option<Trade>,
    pub input_error: Option<InputError>,
    pub recipient: Option<Address>,
}

/// Returns the first problem with the form, in priority order: wallet, amount,
/// tokens, recipient, balance.
#[allow(clippy::too_many_arguments)]
pub fn compute_input_error(
    account: Option<Address>,
    parsed_amount: Option<&CurrencyAmount>,
    currencies: &FieldValues<Option<Currency>>,
    to: Option<Address>,
    trade: Option<&Trade>,
    balance_in: Option<&CurrencyAmount>,
    allowed_slippage_bips: u32,
) -> Option<InputError> {
    if account.is_none() {
        return Some(InputError::ConnectWallet);
    }
    if parsed_amount.is_none() {
        return Some(InputError::EnterAmount);
    }
    if currencies.input.is_none() || currencies.output.is_none() {
        return Some(InputError::SelectToken);
    }
    if let Err(err) = validate_recipient(to, trade) {
        return Some(err);
    }

    let trade = trade?;
    let balance_in = balance_in?;
    let amount_in = compute_slippage_adjusted_amounts(trade, allowed_slippage_bips).input;
    if balance_in.less_than(&amount_in) {
        return Some(InputError::InsufficientBalance(
            amount_in.currency.symbol().to_string(),
        ));
    }

    None
}

/// Recomputes the form from scratch.
pub async fn derive_swap_info(
    form: &SwapFormState,
    account: Option<Address>,
    allowed_slippage_bips: u32,
    sources: SwapDataSources<'_>,
) -> DerivedSwapInfo {
    let input_currency = match &form.input_currency_id {
        Some(id) => sources.currencies.currency(id).await,
        None => None,
    };
    let output_currency = match &form.output_currency_id {
        Some(id) => sources.currencies.currency(id).await,
        None => None,
    };

    let to = resolve_recipient(form.recipient.as_deref(), account, sources.resolver).await;

    let currency_balances = match account {
        Some(account) => FieldValues {
            input: balance_of(sources.balances, account, input_currency.as_ref()).await,
            output: balance_of(sources.balances, account, output_currency.as_ref()).await,
        },
        None => FieldValues::default(),
    };

    let is_exact_in = form.independent_field == Field::Input;
    let independent_currency = if is_exact_in {
        input_currency.as_ref()
    } else {
        output_currency.as_ref()
    };
    let parsed_amount = try_parse_amount(&form.typed_value, independent_currency);

    let trade = match (&parsed_amount, &input_currency, &output_currency) {
        (Some(amount), _, Some(output)) if is_exact_in => {
            sources.router.best_trade_exact_in(amount, output).await
        }
        (Some(amount), Some(input), _) if !is_exact_in => {
            sources.router.best_trade_exact_out(input, amount).await
        }
        _ => None,
    };

    let currencies = FieldValues {
        input: input_currency,
        output: output_currency,
    };

    let input_error = compute_input_error(
        account,
        parsed_amount.as_ref(),
        &currencies,
        to,
        trade.as_ref(),
        currency_balances.input.as_ref(),
        allowed_slippage_bips,
    );

    DerivedSwapInfo {
        currencies,
        currency_balances,
        parsed_amount,
        trade,
        input_error,
        recipient: to,
    }
}

async fn balance_of(
    balances: &dyn BalanceReader,
    account: Address,
    currency: Option<&Currency>,
) -> Option<CurrencyAmount> {
    match currency {
        Some(currency) => balances.balance(account, currency).await,
        None => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DerivationKey {
    form: SwapFormState,
    account: Option<Address>,
    allowed_slippage_bips: u32,
    block_number: Option<BlockNumber>,
}

/// Memoizes [`derive_swap_info`] on its inputs and the current block, so an
/// unchanged form on an unchanged block costs no network calls.
#[derive(Debug, Default)]
pub struct DerivedSwapState {
    last: Option<(DerivationKey, DerivedSwapInfo)>,
}

impl DerivedSwapState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn derive(
        &mut self,
        form: &SwapFormState,
        account: Option<Address>,
        allowed_slippage_bips: u32,
        block_number: Option<BlockNumber>,
        sources: SwapDataSources<'_>,
    ) -> DerivedSwapInfo {
        let key = DerivationKey {
            form: form.clone(),
            account,
            allowed_slippage_bips,
            block_number,
        };

        if let Some((last_key, info)) = &self.last {
            if *last_key == key {
                return info.clone();
            }
        }

        let info = derive_swap_info(form, account, allowed_slippage_bips, sources).await;
        self.last = Some((key, info.clone()));
        info
    }

    pub fn latest(&self) -> Option<&DerivedSwapInfo> {
        self.last.as_ref().map(|(_, info)| info)
    }
}

/// Tip that would pay for the winning candidate at `gas_price`, or the default
/// tip when no candidate estimates.
pub async fn suggest_eth_tip(
    caller: &dyn ContractCaller,
    calls: &[SwapCall],
    from: Address,
    gas_price: U256,
) -> U256 {
    let estimates = estimate_swap_calls(caller, calls, from).await;
    match select_successful_estimation(&estimates) {
        Ok(successful) => successful.gas_estimate.saturating_mul(gas_price),
        Err(err) => {
            debug!("falling back to the default tip: {}", err);
            default_eth_tip()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipUpdate {
    pub block_number: BlockNumber,
    pub gas_price: U256,
    /// `None` when there was no trade to price.
    pub eth_tip: Option<U256>,
}

/// Drives tip suggestions from new blocks. Refreshes run concurrently with
/// block arrival; an update computed for an older block than the most recent
/// refresh is dropped rather than applied.
#[derive(Debug, Default)]
pub struct TipSuggester {
    latest_block: Option<BlockNumber>,
}

impl TipSuggester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the start of a refresh for `block_number`.
    pub fn begin(&mut self, block_number: BlockNumber) {
        self.latest_block = Some(
            self.latest_block
                .map_or(block_number, |latest| latest.max(block_number)),
        );
    }

    /// Returns the update if it is still current.
    pub fn accept(&self, update: TipUpdate) -> Option<TipUpdate> {
        match self.latest_block {
            Some(latest) if update.block_number < latest => {
                debug!(
                    "discarding tip computed for block {} (latest {})",
                    update.block_number, latest
                );
                None
            }
            _ => Some(update),
        }
    }

    #[tracing::instrument(skip(oracle, caller, trade, calls))]
    #[allow(clippy::too_many_arguments)]
    pub async fn refresh(
        block_number: BlockNumber,
        tip_manual_override: bool,
        oracle: &dyn GasPriceOracle,
        caller: &dyn ContractCaller,
        trade: Option<&Trade>,
        calls: &[SwapCall],
        from: Address,
    ) -> Result<Option<TipUpdate>> {
        if tip_manual_override {
            return Ok(None);
        }

        let gas_price = oracle.gas_price().await?;

        let eth_tip = match trade {
            Some(_) if !calls.is_empty() => {
                Some(suggest_eth_tip(caller, calls, from, gas_price).await)
            }
            _ => None,
        };

        info!(
            "block {} gas price {} suggested tip {:?}",
            block_number, gas_price, eth_tip
        );

        Ok(Some(TipUpdate {
            block_number,
            gas_price,
            eth_tip,
        }))
    }
}
