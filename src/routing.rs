use async_trait::async_trait;
use ethers::abi::{self, short_signature, ParamType, Token as AbiToken};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use log::debug;
use std::sync::Arc;

use crate::estimation::ContractCaller;
use crate::types::{Currency, CurrencyAmount, Pair, ProtocolVersion, Route, Token, Trade, TradeType};

/// Routing engine: finds the best trade for an exact input or exact output.
#[async_trait]
pub trait TradeRouter: Send + Sync {
    async fn best_trade_exact_in(
        &self,
        amount_in: &CurrencyAmount,
        currency_out: &Currency,
    ) -> Option<Trade>;

    async fn best_trade_exact_out(
        &self,
        currency_in: &Currency,
        amount_out: &CurrencyAmount,
    ) -> Option<Trade>;
}

/// Quotes trades through a V2 router's `getAmountsOut` / `getAmountsIn`,
/// considering the direct pair and the hop through WETH.
pub struct V2RouterQuoter {
    caller: Arc<dyn ContractCaller>,
    router: Address,
    factory: Address,
    weth: Token,
}

impl V2RouterQuoter {
    pub fn new(
        caller: Arc<dyn ContractCaller>,
        router: Address,
        factory: Address,
        weth: Token,
    ) -> Self {
        Self {
            caller,
            router,
            factory,
            weth,
        }
    }

    fn wrapped(&self, currency: &Currency) -> Token {
        match currency {
            Currency::Ether => self.weth.clone(),
            Currency::Token(token) => token.clone(),
        }
    }

    fn candidate_paths(&self, input: &Currency, output: &Currency) -> Vec<Vec<Token>> {
        let token_in = self.wrapped(input);
        let token_out = self.wrapped(output);
        if token_in == token_out {
            return Vec::new();
        }

        let mut paths = vec![vec![token_in.clone(), token_out.clone()]];
        if token_in != self.weth && token_out != self.weth {
            paths.push(vec![token_in, self.weth.clone(), token_out]);
        }
        paths
    }

    async fn quote(&self, method: &str, amount: U256, path: &[Token]) -> Option<Vec<U256>> {
        let params = [
            ParamType::Uint(256),
            ParamType::Array(Box::new(ParamType::Address)),
        ];
        let mut data = short_signature(method, &params).to_vec();
        data.extend(abi::encode(&[
            AbiToken::Uint(amount),
            AbiToken::Array(path.iter().map(|token| AbiToken::Address(token.address)).collect()),
        ]));

        let tx: TypedTransaction = TransactionRequest::new()
            .to(self.router)
            .data(Bytes::from(data))
            .into();

        let result = match self.caller.call(&tx).await {
            Ok(result) => result,
            Err(err) => {
                debug!("{} reverted for path {:?}: {}", method, path_symbols(path), err);
                return None;
            }
        };

        match abi::decode(&[ParamType::Array(Box::new(ParamType::Uint(256)))], &result) {
            Ok(mut tokens) => match tokens.pop() {
                Some(AbiToken::Array(amounts)) => amounts
                    .into_iter()
                    .map(|amount| amount.into_uint())
                    .collect(),
                _ => None,
            },
            Err(err) => {
                debug!("unable to decode {} result: {}", method, err);
                None
            }
        }
    }

    fn build_trade(
        &self,
        path: Vec<Token>,
        trade_type: TradeType,
        input_amount: CurrencyAmount,
        output_amount: CurrencyAmount,
    ) -> Trade {
        let pairs = path
            .windows(2)
            .map(|hop| Pair::new(hop[0].clone(), hop[1].clone(), self.factory))
            .collect();

        Trade {
            route: Route {
                pairs,
                path,
                input: input_amount.currency.clone(),
                output: output_amount.currency.clone(),
            },
            trade_type,
            input_amount,
            output_amount,
            version: ProtocolVersion::V2,
        }
    }
}

#[async_trait]
impl TradeRouter for V2RouterQuoter {
    async fn best_trade_exact_in(
        &self,
        amount_in: &CurrencyAmount,
        currency_out: &Currency,
    ) -> Option<Trade> {
        let mut best: Option<Trade> = None;

        for path in self.candidate_paths(&amount_in.currency, currency_out) {
            let amount_out = match self.quote("getAmountsOut", amount_in.raw, &path).await {
                Some(amounts) => amounts.last().copied().unwrap_or_default(),
                None => continue,
            };
            if amount_out.is_zero() {
                continue;
            }
            if best
                .as_ref()
                .map_or(true, |best| amount_out > best.output_amount.raw)
            {
                best = Some(self.build_trade(
                    path,
                    TradeType::ExactInput,
                    amount_in.clone(),
                    CurrencyAmount::new(currency_out.clone(), amount_out),
                ));
            }
        }

        best
    }

    async fn best_trade_exact_out(
        &self,
        currency_in: &Currency,
        amount_out: &CurrencyAmount,
    ) -> Option<Trade> {
        let mut best: Option<Trade> = None;

        for path in self.candidate_paths(currency_in, &amount_out.currency) {
            let amount_in = match self.quote("getAmountsIn", amount_out.raw, &path).await {
                Some(amounts) => amounts.first().copied().unwrap_or_default(),
                None => continue,
            };
            if amount_in.is_zero() {
                continue;
            }
            if best
                .as_ref()
                .map_or(true, |best| amount_in < best.input_amount.raw)
            {
                best = Some(self.build_trade(
                    path,
                    TradeType::ExactOutput,
                    CurrencyAmount::new(currency_in.clone(), amount_in),
                    amount_out.clone(),
                ));
            }
        }

        best
    }
}

fn path_symbols(path: &[Token]) -> Vec<&str> {
    path.iter()
        .map(|token| token.symbol.as_deref().unwrap_or("?"))
        .collect()
}
