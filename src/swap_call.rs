use ethers::abi::{self, short_signature, ParamType, Token as AbiToken};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use log::debug;

use crate::types::{ProtocolVersion, Trade, TradeType};

/// Router entry points a swap can be encoded against. The first nine belong to
/// the V2 router, the rest to the relay router which forwards to a V2 router
/// and pays the miner tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapMethod {
    SwapExactETHForTokens,
    SwapExactETHForTokensSupportingFeeOnTransferTokens,
    SwapExactTokensForETH,
    SwapExactTokensForETHSupportingFeeOnTransferTokens,
    SwapExactTokensForTokens,
    SwapExactTokensForTokensSupportingFeeOnTransferTokens,
    SwapETHForExactTokens,
    SwapTokensForExactETH,
    SwapTokensForExactTokens,
    SwapExactETHForTokensWithTipAmount,
    SwapExactTokensForETHAndTipAmount,
    SwapExactTokensForTokensWithTipAmount,
    SwapETHForExactTokensWithTipAmount,
    SwapTokensForExactETHAndTipAmount,
    SwapTokensForExactTokensWithTipAmount,
}

impl SwapMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SwapExactETHForTokens => "swapExactETHForTokens",
            Self::SwapExactETHForTokensSupportingFeeOnTransferTokens => {
                "swapExactETHForTokensSupportingFeeOnTransferTokens"
            }
            Self::SwapExactTokensForETH => "swapExactTokensForETH",
            Self::SwapExactTokensForETHSupportingFeeOnTransferTokens => {
                "swapExactTokensForETHSupportingFeeOnTransferTokens"
            }
            Self::SwapExactTokensForTokens => "swapExactTokensForTokens",
            Self::SwapExactTokensForTokensSupportingFeeOnTransferTokens => {
                "swapExactTokensForTokensSupportingFeeOnTransferTokens"
            }
            Self::SwapETHForExactTokens => "swapETHForExactTokens",
            Self::SwapTokensForExactETH => "swapTokensForExactETH",
            Self::SwapTokensForExactTokens => "swapTokensForExactTokens",
            Self::SwapExactETHForTokensWithTipAmount => "swapExactETHForTokensWithTipAmount",
            Self::SwapExactTokensForETHAndTipAmount => "swapExactTokensForETHAndTipAmount",
            Self::SwapExactTokensForTokensWithTipAmount => "swapExactTokensForTokensWithTipAmount",
            Self::SwapETHForExactTokensWithTipAmount => "swapETHForExactTokensWithTipAmount",
            Self::SwapTokensForExactETHAndTipAmount => "swapTokensForExactETHAndTipAmount",
            Self::SwapTokensForExactTokensWithTipAmount => "swapTokensForExactTokensWithTipAmount",
        }
    }

    pub fn param_types(&self) -> Vec<ParamType> {
        let path = ParamType::Array(Box::new(ParamType::Address));
        match self {
            // (amountOutMin | amountOut, path, to, deadline)
            Self::SwapExactETHForTokens
            | Self::SwapExactETHForTokensSupportingFeeOnTransferTokens
            | Self::SwapETHForExactTokens => vec![
                ParamType::Uint(256),
                path,
                ParamType::Address,
                ParamType::Uint(256),
            ],
            // (amountIn | amountOut, amountOutMin | amountInMax, path, to, deadline)
            Self::SwapExactTokensForETH
            | Self::SwapExactTokensForETHSupportingFeeOnTransferTokens
            | Self::SwapExactTokensForTokens
            | Self::SwapExactTokensForTokensSupportingFeeOnTransferTokens
            | Self::SwapTokensForExactETH
            | Self::SwapTokensForExactTokens => vec![
                ParamType::Uint(256),
                ParamType::Uint(256),
                path,
                ParamType::Address,
                ParamType::Uint(256),
            ],
            // (router, (amountIn, amountOut, path, to, deadline), tipAmount)
            Self::SwapExactETHForTokensWithTipAmount
            | Self::SwapExactTokensForETHAndTipAmount
            | Self::SwapExactTokensForTokensWithTipAmount
            | Self::SwapETHForExactTokensWithTipAmount
            | Self::SwapTokensForExactETHAndTipAmount
            | Self::SwapTokensForExactTokensWithTipAmount => vec![
                ParamType::Address,
                ParamType::Tuple(vec![
                    ParamType::Uint(256),
                    ParamType::Uint(256),
                    path,
                    ParamType::Address,
                    ParamType::Uint(256),
                ]),
                ParamType::Uint(256),
            ],
        }
    }

    pub fn selector(&self) -> [u8; 4] {
        short_signature(self.name(), &self.param_types())
    }

    pub fn is_relayed(&self) -> bool {
        matches!(
            self,
            Self::SwapExactETHForTokensWithTipAmount
                | Self::SwapExactTokensForETHAndTipAmount
                | Self::SwapExactTokensForTokensWithTipAmount
                | Self::SwapETHForExactTokensWithTipAmount
                | Self::SwapTokensForExactETHAndTipAmount
                | Self::SwapTokensForExactTokensWithTipAmount
        )
    }

    /// Relay methods that take the tip out of the ETH the swap produces.
    fn tips_from_output(&self) -> bool {
        matches!(
            self,
            Self::SwapExactTokensForETHAndTipAmount | Self::SwapTokensForExactETHAndTipAmount
        )
    }
}

/// A fully encoded candidate call: target, method, positional arguments and
/// the native currency sent along.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapCall {
    pub contract: Address,
    pub method: SwapMethod,
    pub args: Vec<AbiToken>,
    pub value: U256,
}

impl SwapCall {
    pub fn calldata(&self) -> Bytes {
        let mut data = self.method.selector().to_vec();
        data.extend(abi::encode(&self.args));
        data.into()
    }

    /// Transaction for estimation, dry-run or submission. Value is attached
    /// only when non-zero.
    pub fn to_transaction(&self, from: Address) -> TypedTransaction {
        let mut request = TransactionRequest::new()
            .to(self.contract)
            .from(from)
            .data(self.calldata());
        if !self.value.is_zero() {
            request = request.value(self.value);
        }
        request.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainContext {
    pub chain_id: u64,
    pub account: Address,
}

/// Which contract the swap is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterMode {
    Direct {
        router: Address,
    },
    Relayed {
        relay_router: Address,
        router: Address,
        eth_tip: U256,
    },
}

pub fn transaction_deadline(current_timestamp: u64, ttl_secs: u64) -> U256 {
    U256::from(current_timestamp) + U256::from(ttl_secs)
}

/// Builds the ordered candidate calls for a trade. Returns an empty list when
/// any input is missing or the trade is not a V2 trade. In direct mode the
/// plain call always precedes the fee-on-transfer one.
pub fn build_swap_calls(
    trade: Option<&Trade>,
    allowed_slippage_bips: u32,
    recipient: Option<Address>,
    deadline: Option<U256>,
    chain: Option<&ChainContext>,
    mode: Option<&RouterMode>,
) -> Vec<SwapCall> {
    let (trade, recipient, deadline, mode) = match (trade, recipient, deadline, chain, mode) {
        (Some(trade), Some(recipient), Some(deadline), Some(_), Some(mode)) => {
            (trade, recipient, deadline, mode)
        }
        _ => return Vec::new(),
    };
    if trade.version != ProtocolVersion::V2 {
        return Vec::new();
    }

    let params = SwapParameters::new(trade, allowed_slippage_bips, recipient, deadline);

    let calls: Vec<SwapCall> = match *mode {
        RouterMode::Direct { router } => {
            let mut calls = vec![params.direct_call(router, false)];
            if trade.trade_type == TradeType::ExactInput {
                calls.push(params.direct_call(router, true));
            }
            calls
        }
        RouterMode::Relayed {
            relay_router,
            router,
            eth_tip,
        } => vec![params.relayed_call(relay_router, router, eth_tip)],
    };

    debug!(
        "built swap calls: {:?}",
        calls.iter().map(|call| call.method.name()).collect::<Vec<_>>()
    );

    calls
}

struct SwapParameters {
    trade_type: TradeType,
    ether_in: bool,
    ether_out: bool,
    amount_in: U256,
    amount_out: U256,
    path: AbiToken,
    to: AbiToken,
    deadline: AbiToken,
}

impl SwapParameters {
    fn new(trade: &Trade, allowed_slippage_bips: u32, recipient: Address, deadline: U256) -> Self {
        let path = trade
            .route
            .path_addresses()
            .into_iter()
            .map(AbiToken::Address)
            .collect();

        Self {
            trade_type: trade.trade_type,
            ether_in: trade.input_amount.currency.is_ether(),
            ether_out: trade.output_amount.currency.is_ether(),
            amount_in: trade.maximum_amount_in(allowed_slippage_bips).raw,
            amount_out: trade.minimum_amount_out(allowed_slippage_bips).raw,
            path: AbiToken::Array(path),
            to: AbiToken::Address(recipient),
            deadline: AbiToken::Uint(deadline),
        }
    }

    // Fee-on-transfer only applies to exact-input trades; exact-output ignores it.
    fn direct_call(&self, router: Address, fee_on_transfer: bool) -> SwapCall {
        use SwapMethod::*;

        let (method, args, value) = match (self.trade_type, self.ether_in, self.ether_out) {
            (TradeType::ExactInput, true, _) => (
                if fee_on_transfer {
                    SwapExactETHForTokensSupportingFeeOnTransferTokens
                } else {
                    SwapExactETHForTokens
                },
                vec![
                    AbiToken::Uint(self.amount_out),
                    self.path.clone(),
                    self.to.clone(),
                    self.deadline.clone(),
                ],
                self.amount_in,
            ),
            (TradeType::ExactInput, false, ether_out) => (
                match (ether_out, fee_on_transfer) {
                    (true, true) => SwapExactTokensForETHSupportingFeeOnTransferTokens,
                    (true, false) => SwapExactTokensForETH,
                    (false, true) => SwapExactTokensForTokensSupportingFeeOnTransferTokens,
                    (false, false) => SwapExactTokensForTokens,
                },
                vec![
                    AbiToken::Uint(self.amount_in),
                    AbiToken::Uint(self.amount_out),
                    self.path.clone(),
                    self.to.clone(),
                    self.deadline.clone(),
                ],
                U256::zero(),
            ),
            (TradeType::ExactOutput, true, _) => (
                SwapETHForExactTokens,
                vec![
                    AbiToken::Uint(self.amount_out),
                    self.path.clone(),
                    self.to.clone(),
                    self.deadline.clone(),
                ],
                self.amount_in,
            ),
            (TradeType::ExactOutput, false, ether_out) => (
                if ether_out {
                    SwapTokensForExactETH
                } else {
                    SwapTokensForExactTokens
                },
                vec![
                    AbiToken::Uint(self.amount_out),
                    AbiToken::Uint(self.amount_in),
                    self.path.clone(),
                    self.to.clone(),
                    self.deadline.clone(),
                ],
                U256::zero(),
            ),
        };

        SwapCall {
            contract: router,
            method,
            args,
            value,
        }
    }

    fn relayed_call(&self, relay_router: Address, router: Address, eth_tip: U256) -> SwapCall {
        use SwapMethod::*;

        let method = match (self.trade_type, self.ether_in, self.ether_out) {
            (TradeType::ExactInput, true, _) => SwapExactETHForTokensWithTipAmount,
            (TradeType::ExactInput, false, true) => SwapExactTokensForETHAndTipAmount,
            (TradeType::ExactInput, false, false) => SwapExactTokensForTokensWithTipAmount,
            (TradeType::ExactOutput, true, _) => SwapETHForExactTokensWithTipAmount,
            (TradeType::ExactOutput, false, true) => SwapTokensForExactETHAndTipAmount,
            (TradeType::ExactOutput, false, false) => SwapTokensForExactTokensWithTipAmount,
        };

        let mut value = if method.tips_from_output() {
            U256::zero()
        } else {
            eth_tip
        };
        if self.ether_in {
            value += self.amount_in;
        }

        SwapCall {
            contract: relay_router,
            method,
            args: vec![
                AbiToken::Address(router),
                AbiToken::Tuple(vec![
                    AbiToken::Uint(self.amount_in),
                    AbiToken::Uint(self.amount_out),
                    self.path.clone(),
                    self.to.clone(),
                    self.deadline.clone(),
                ]),
                AbiToken::Uint(eth_tip),
            ],
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ether_trade, two_hop_trade};
    use crate::types::Currency;

    const RECIPIENT: Address = Address::repeat_byte(0xaa);

    fn chain() -> ChainContext {
        ChainContext {
            chain_id: 1,
            account: Address::repeat_byte(0x01),
        }
    }

    fn direct() -> RouterMode {
        RouterMode::Direct {
            router: Address::repeat_byte(0x02),
        }
    }

    fn relayed(eth_tip: u64) -> RouterMode {
        RouterMode::Relayed {
            relay_router: Address::repeat_byte(0x03),
            router: Address::repeat_byte(0x02),
            eth_tip: U256::from(eth_tip),
        }
    }

    fn build(trade: &Trade, mode: &RouterMode) -> Vec<SwapCall> {
        build_swap_calls(
            Some(trade),
            50,
            Some(RECIPIENT),
            Some(U256::from(1_700_000_000u64)),
            Some(&chain()),
            Some(mode),
        )
    }

    #[test]
    fn test_direct_exact_input_builds_two_calls_plain_first() {
        let trade = two_hop_trade(TradeType::ExactInput, 1_000, 2_000);
        let calls = build(&trade, &direct());

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, SwapMethod::SwapExactTokensForTokens);
        assert_eq!(
            calls[1].method,
            SwapMethod::SwapExactTokensForTokensSupportingFeeOnTransferTokens
        );
        // same arguments, only the method differs
        assert_eq!(calls[0].args, calls[1].args);
        assert!(calls.iter().all(|call| call.value.is_zero()));
    }

    #[test]
    fn test_direct_exact_output_builds_one_call() {
        let trade = two_hop_trade(TradeType::ExactOutput, 1_000, 2_000);
        let calls = build(&trade, &direct());

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, SwapMethod::SwapTokensForExactTokens);
        assert_eq!(calls[0].args[0], AbiToken::Uint(U256::from(2_000u64)));
        // 1_000 * 10050 / 10000
        assert_eq!(calls[0].args[1], AbiToken::Uint(U256::from(1_005u64)));
    }

    #[test]
    fn test_direct_ether_in_attaches_value() {
        let trade = ether_trade(TradeType::ExactInput, true, 1_000, 2_000);
        let calls = build(&trade, &direct());

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, SwapMethod::SwapExactETHForTokens);
        assert_eq!(calls[0].value, U256::from(1_000u64));
        assert_eq!(calls[1].value, U256::from(1_000u64));

        let trade = ether_trade(TradeType::ExactOutput, false, 1_000, 2_000);
        let calls = build(&trade, &direct());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, SwapMethod::SwapTokensForExactETH);
        assert!(calls[0].value.is_zero());
    }

    #[test]
    fn test_relayed_builds_one_call_with_tip() {
        for trade_type in [TradeType::ExactInput, TradeType::ExactOutput] {
            let trade = two_hop_trade(trade_type, 1_000, 2_000);
            let calls = build(&trade, &relayed(777));

            assert_eq!(calls.len(), 1);
            let call = &calls[0];
            assert!(call.method.is_relayed());
            assert_eq!(call.contract, Address::repeat_byte(0x03));
            assert_eq!(call.args[0], AbiToken::Address(Address::repeat_byte(0x02)));
            assert_eq!(call.args[2], AbiToken::Uint(U256::from(777u64)));
            assert_eq!(call.value, U256::from(777u64));
        }
    }

    #[test]
    fn test_relayed_ether_in_sends_input_and_tip() {
        let trade = ether_trade(TradeType::ExactInput, true, 1_000, 2_000);
        let calls = build(&trade, &relayed(5));
        assert_eq!(calls[0].method, SwapMethod::SwapExactETHForTokensWithTipAmount);
        assert_eq!(calls[0].value, U256::from(1_005u64));

        let trade = ether_trade(TradeType::ExactInput, false, 1_000, 2_000);
        let calls = build(&trade, &relayed(5));
        assert_eq!(calls[0].method, SwapMethod::SwapExactTokensForETHAndTipAmount);
        assert!(calls[0].value.is_zero());
    }

    #[test]
    fn test_missing_inputs_build_nothing() {
        let trade = two_hop_trade(TradeType::ExactInput, 1_000, 2_000);
        let deadline = Some(U256::from(1u64));

        assert!(build_swap_calls(None, 50, Some(RECIPIENT), deadline, Some(&chain()), Some(&direct())).is_empty());
        assert!(build_swap_calls(Some(&trade), 50, None, deadline, Some(&chain()), Some(&direct())).is_empty());
        assert!(build_swap_calls(Some(&trade), 50, Some(RECIPIENT), None, Some(&chain()), Some(&direct())).is_empty());
        assert!(build_swap_calls(Some(&trade), 50, Some(RECIPIENT), deadline, None, Some(&direct())).is_empty());
        assert!(build_swap_calls(Some(&trade), 50, Some(RECIPIENT), deadline, Some(&chain()), None).is_empty());

        let mut v1_trade = trade;
        v1_trade.version = ProtocolVersion::V1;
        assert!(build(&v1_trade, &direct()).is_empty());
    }

    #[test]
    fn test_calldata_selectors() {
        assert_eq!(
            SwapMethod::SwapExactTokensForTokens.selector(),
            [0x38, 0xed, 0x17, 0x39]
        );
        assert_eq!(
            SwapMethod::SwapExactETHForTokens.selector(),
            [0x7f, 0xf3, 0x6a, 0xb5]
        );
        assert_eq!(
            SwapMethod::SwapExactTokensForTokensSupportingFeeOnTransferTokens.selector(),
            [0x5c, 0x11, 0xd7, 0x95]
        );

        let trade = two_hop_trade(TradeType::ExactInput, 1_000, 2_000);
        let call = &build(&trade, &direct())[0];
        let data = call.calldata();
        assert_eq!(&data[..4], &[0x38, 0xed, 0x17, 0x39]);
        // 5 head words + path length + 3 path entries
        assert_eq!(data.len(), 4 + 32 * (5 + 1 + 3));
    }

    #[test]
    fn test_to_transaction_omits_zero_value() {
        let trade = two_hop_trade(TradeType::ExactInput, 1_000, 2_000);
        let call = &build(&trade, &direct())[0];
        let tx = call.to_transaction(Address::repeat_byte(0x01));
        assert_eq!(tx.value(), None);
        assert_eq!(tx.from(), Some(&Address::repeat_byte(0x01)));

        let trade = ether_trade(TradeType::ExactInput, true, 1_000, 2_000);
        let call = &build(&trade, &direct())[0];
        let tx = call.to_transaction(Address::repeat_byte(0x01));
        assert_eq!(tx.value(), Some(&U256::from(1_000u64)));
        assert!(matches!(trade.input_amount.currency, Currency::Ether));
    }
}
