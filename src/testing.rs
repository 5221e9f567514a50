//! Fixtures and in-memory collaborators shared by the unit tests.

use async_trait::async_trait;
use ethers::abi::{self, short_signature, ParamType, Token as AbiToken};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TxHash, U256};
use ethers::utils::keccak256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::derived_state::{BalanceReader, CurrencyResolver};
use crate::error::CallError;
use crate::estimation::ContractCaller;
use crate::executor::TransactionSender;
use crate::gas_price::GasPriceOracle;
use crate::recipient::NameResolver;
use crate::routing::TradeRouter;
use crate::swap_call::{SwapCall, SwapMethod};
use crate::types::{
    Currency, CurrencyAmount, Pair, ProtocolVersion, Route, Token, Trade, TradeType,
};

const FACTORY: Address = Address::repeat_byte(0x05);

const ALL_METHODS: [SwapMethod; 15] = [
    SwapMethod::SwapExactETHForTokens,
    SwapMethod::SwapExactETHForTokensSupportingFeeOnTransferTokens,
    SwapMethod::SwapExactTokensForETH,
    SwapMethod::SwapExactTokensForETHSupportingFeeOnTransferTokens,
    SwapMethod::SwapExactTokensForTokens,
    SwapMethod::SwapExactTokensForTokensSupportingFeeOnTransferTokens,
    SwapMethod::SwapETHForExactTokens,
    SwapMethod::SwapTokensForExactETH,
    SwapMethod::SwapTokensForExactTokens,
    SwapMethod::SwapExactETHForTokensWithTipAmount,
    SwapMethod::SwapExactTokensForETHAndTipAmount,
    SwapMethod::SwapExactTokensForTokensWithTipAmount,
    SwapMethod::SwapETHForExactTokensWithTipAmount,
    SwapMethod::SwapTokensForExactETHAndTipAmount,
    SwapMethod::SwapTokensForExactTokensWithTipAmount,
];

pub fn token(seed: u8, decimals: u8, symbol: &str) -> Token {
    Token::new(
        1,
        Address::repeat_byte(seed),
        decimals,
        Some(symbol.to_string()),
    )
}

fn weth() -> Token {
    token(0xee, 18, "WETH")
}

fn trade_over(
    path: Vec<Token>,
    trade_type: TradeType,
    input: Currency,
    output: Currency,
    amount_in: u64,
    amount_out: u64,
) -> Trade {
    let pairs = path
        .windows(2)
        .map(|hop| Pair::new(hop[0].clone(), hop[1].clone(), FACTORY))
        .collect();

    Trade {
        route: Route {
            pairs,
            path,
            input: input.clone(),
            output: output.clone(),
        },
        trade_type,
        input_amount: CurrencyAmount::new(input, U256::from(amount_in)),
        output_amount: CurrencyAmount::new(output, U256::from(amount_out)),
        version: ProtocolVersion::V2,
    }
}

/// AAA -> BBB -> CCC, all with 6 decimals.
pub fn two_hop_trade(trade_type: TradeType, amount_in: u64, amount_out: u64) -> Trade {
    let a = token(0x0a, 6, "AAA");
    let b = token(0x0b, 6, "BBB");
    let c = token(0x0c, 6, "CCC");

    trade_over(
        vec![a.clone(), b, c.clone()],
        trade_type,
        Currency::Token(a),
        Currency::Token(c),
        amount_in,
        amount_out,
    )
}

/// ETH -> CCC when `ether_in`, AAA -> ETH otherwise.
pub fn ether_trade(trade_type: TradeType, ether_in: bool, amount_in: u64, amount_out: u64) -> Trade {
    if ether_in {
        let c = token(0x0c, 6, "CCC");
        trade_over(
            vec![weth(), c.clone()],
            trade_type,
            Currency::Ether,
            Currency::Token(c),
            amount_in,
            amount_out,
        )
    } else {
        let a = token(0x0a, 6, "AAA");
        trade_over(
            vec![a.clone(), weth()],
            trade_type,
            Currency::Token(a),
            Currency::Ether,
            amount_in,
            amount_out,
        )
    }
}

/// A candidate call whose arguments are irrelevant to the test.
pub fn swap_call(method: SwapMethod) -> SwapCall {
    SwapCall {
        contract: Address::repeat_byte(0x02),
        method,
        args: vec![AbiToken::Uint(U256::one())],
        value: U256::zero(),
    }
}

#[derive(Debug, Clone)]
enum CallBehaviour {
    Estimate(U256),
    Revert(String),
    EstimateFailsCallSucceeds,
}

/// Node stand-in. Swap calls are matched by selector; `getAmountsOut` and
/// `getAmountsIn` are answered by path length. Anything else fails.
#[derive(Debug, Default)]
pub struct MockContractCaller {
    behaviours: HashMap<[u8; 4], CallBehaviour>,
    quotes: HashMap<usize, Vec<U256>>,
    estimates: AtomicUsize,
    dry_runs: AtomicUsize,
}

impl MockContractCaller {
    pub fn estimate(mut self, method: SwapMethod, gas: u64) -> Self {
        self.behaviours
            .insert(method.selector(), CallBehaviour::Estimate(U256::from(gas)));
        self
    }

    pub fn revert(mut self, method: SwapMethod, reason: &str) -> Self {
        self.behaviours
            .insert(method.selector(), CallBehaviour::Revert(reason.to_string()));
        self
    }

    pub fn estimate_fails_but_call_succeeds(mut self, method: SwapMethod) -> Self {
        self.behaviours
            .insert(method.selector(), CallBehaviour::EstimateFailsCallSucceeds);
        self
    }

    pub fn quote_path(mut self, path_len: usize, amounts: &[U256]) -> Self {
        self.quotes.insert(path_len, amounts.to_vec());
        self
    }

    pub fn estimate_count(&self) -> usize {
        self.estimates.load(Ordering::SeqCst)
    }

    pub fn dry_run_count(&self) -> usize {
        self.dry_runs.load(Ordering::SeqCst)
    }

    fn behaviour(&self, tx: &TypedTransaction) -> Option<(SwapMethod, &CallBehaviour)> {
        let selector = selector_of(tx)?;
        let method = ALL_METHODS
            .iter()
            .find(|method| method.selector() == selector)?;
        self.behaviours
            .get(&selector)
            .map(|behaviour| (*method, behaviour))
    }

    fn quote(&self, tx: &TypedTransaction) -> Option<Result<Bytes, CallError>> {
        let selector = selector_of(tx)?;
        let params = [
            ParamType::Uint(256),
            ParamType::Array(Box::new(ParamType::Address)),
        ];
        if selector != short_signature("getAmountsOut", &params)
            && selector != short_signature("getAmountsIn", &params)
        {
            return None;
        }

        let data = tx.data()?;
        let path_len = match abi::decode(&params, &data[4..]) {
            Ok(tokens) => match tokens.get(1) {
                Some(AbiToken::Array(path)) => path.len(),
                _ => return Some(Err(CallError::new("malformed quote"))),
            },
            Err(err) => return Some(Err(CallError::new(err.to_string()))),
        };

        Some(match self.quotes.get(&path_len) {
            Some(amounts) => Ok(abi::encode(&[AbiToken::Array(
                amounts.iter().copied().map(AbiToken::Uint).collect(),
            )])
            .into()),
            None => Err(CallError::reverted(
                "UniswapV2Library: INSUFFICIENT_LIQUIDITY",
            )),
        })
    }
}

fn selector_of(tx: &TypedTransaction) -> Option<[u8; 4]> {
    let data = tx.data()?;
    if data.len() < 4 {
        return None;
    }
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&data[..4]);
    Some(selector)
}

#[async_trait]
impl ContractCaller for MockContractCaller {
    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, CallError> {
        self.estimates.fetch_add(1, Ordering::SeqCst);
        match self.behaviour(tx) {
            Some((_, CallBehaviour::Estimate(gas))) => Ok(*gas),
            Some((method, _)) => Err(CallError::new(format!(
                "cannot estimate gas for {}",
                method.name()
            ))
            .with_code(-32000)),
            None => Err(CallError::new("unknown call")),
        }
    }

    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes, CallError> {
        if let Some(quote) = self.quote(tx) {
            return quote;
        }

        self.dry_runs.fetch_add(1, Ordering::SeqCst);
        match self.behaviour(tx) {
            Some((_, CallBehaviour::Revert(reason))) => Err(CallError::reverted(reason.clone())),
            Some(_) => Ok(Bytes::default()),
            None => Err(CallError::new("unknown call")),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockNameResolver {
    names: HashMap<String, Address>,
}

impl MockNameResolver {
    pub fn with_name(mut self, name: &str, address: Address) -> Self {
        self.names.insert(name.to_string(), address);
        self
    }
}

#[async_trait]
impl NameResolver for MockNameResolver {
    async fn resolve_name(&self, name: &str) -> Option<Address> {
        self.names.get(name).copied()
    }
}

/// Wallet stand-in that records what it was asked to send.
#[derive(Debug, Default)]
pub struct MockSender {
    failure: Option<CallError>,
    sent: Mutex<Vec<TypedTransaction>>,
    populated: AtomicUsize,
}

impl MockSender {
    pub fn failing(error: CallError) -> Self {
        Self {
            failure: Some(error),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<TypedTransaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn populate_count(&self) -> usize {
        self.populated.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSender for MockSender {
    async fn send_transaction(&self, tx: TypedTransaction) -> Result<TxHash, CallError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        let hash = TxHash::from(keccak256(tx.rlp()));
        self.sent.lock().unwrap().push(tx);
        Ok(hash)
    }

    async fn populate_transaction(&self, tx: &mut TypedTransaction) -> Result<(), CallError> {
        self.populated.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        tx.set_nonce(7u64);
        tx.set_gas_price(20_000_000_000u64);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockCurrencies {
    currencies: HashMap<String, Currency>,
}

impl MockCurrencies {
    pub fn with(mut self, id: &str, currency: Currency) -> Self {
        self.currencies.insert(id.to_string(), currency);
        self
    }
}

#[async_trait]
impl CurrencyResolver for MockCurrencies {
    async fn currency(&self, id: &str) -> Option<Currency> {
        self.currencies.get(id).cloned()
    }
}

#[derive(Debug, Default)]
pub struct MockBalances {
    balances: Vec<(Currency, U256)>,
}

impl MockBalances {
    pub fn with(mut self, currency: Currency, raw: u64) -> Self {
        self.balances.push((currency, U256::from(raw)));
        self
    }
}

#[async_trait]
impl BalanceReader for MockBalances {
    async fn balance(&self, _account: Address, currency: &Currency) -> Option<CurrencyAmount> {
        self.balances
            .iter()
            .find(|(known, _)| known == currency)
            .map(|(known, raw)| CurrencyAmount::new(known.clone(), *raw))
    }
}

/// Routing engine that always answers with the same trade.
#[derive(Debug)]
pub struct MockRouter {
    trade: Trade,
    calls: AtomicUsize,
}

impl MockRouter {
    pub fn returning(trade: Trade) -> Self {
        Self {
            trade,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TradeRouter for MockRouter {
    async fn best_trade_exact_in(
        &self,
        _amount_in: &CurrencyAmount,
        _currency_out: &Currency,
    ) -> Option<Trade> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(self.trade.clone())
    }

    async fn best_trade_exact_out(
        &self,
        _currency_in: &Currency,
        _amount_out: &CurrencyAmount,
    ) -> Option<Trade> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(self.trade.clone())
    }
}

#[derive(Debug)]
pub struct MockGasPriceOracle {
    gas_price: U256,
    calls: AtomicUsize,
}

impl MockGasPriceOracle {
    pub fn new(gas_price: U256) -> Self {
        Self {
            gas_price,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GasPriceOracle for MockGasPriceOracle {
    async fn gas_price(&self) -> anyhow::Result<U256> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.gas_price)
    }
}
