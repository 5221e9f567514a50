use ethers::types::{Address, Bytes, U256};
use ethers::utils::{get_create2_address_from_hash, keccak256};
use hex::FromHex;
use once_cell::sync::Lazy;
use std::fmt;

use crate::constants::{BIPS_BASE, V2_PAIR_INIT_CODE_HASH};

static PAIR_INIT_CODE_HASH: Lazy<Vec<u8>> =
    Lazy::new(|| Vec::from_hex(V2_PAIR_INIT_CODE_HASH).unwrap());

pub type BlockNumber = u64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub chain_id: u64,
    pub address: Address,
    pub decimals: u8,
    pub symbol: Option<String>,
    pub name: Option<String>,
}

impl Token {
    pub fn new(chain_id: u64, address: Address, decimals: u8, symbol: Option<String>) -> Self {
        Self {
            chain_id,
            address,
            decimals,
            symbol,
            name: None,
        }
    }

    /// Pair ordering used by the V2 factory.
    pub fn sorts_before(&self, other: &Token) -> bool {
        self.address < other.address
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Currency {
    Ether,
    Token(Token),
}

impl Currency {
    pub fn decimals(&self) -> u8 {
        match self {
            Currency::Ether => 18,
            Currency::Token(token) => token.decimals,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Currency::Ether => "ETH",
            Currency::Token(token) => token.symbol.as_deref().unwrap_or("UNKNOWN"),
        }
    }

    pub fn is_ether(&self) -> bool {
        matches!(self, Currency::Ether)
    }

    /// Identifier used by the swap form state: `ETH` or the token address.
    pub fn id(&self) -> String {
        match self {
            Currency::Ether => "ETH".to_string(),
            Currency::Token(token) => format!("{:?}", token.address),
        }
    }
}

/// An exact amount of a currency, in its smallest unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyAmount {
    pub currency: Currency,
    pub raw: U256,
}

impl CurrencyAmount {
    pub fn new(currency: Currency, raw: U256) -> Self {
        Self { currency, raw }
    }

    pub fn ether(raw: U256) -> Self {
        Self::new(Currency::Ether, raw)
    }

    pub fn less_than(&self, other: &CurrencyAmount) -> bool {
        self.raw < other.raw
    }

    /// Renders the amount rounded half-up to `significant_digits`, without
    /// trailing zeros.
    pub fn to_significant(&self, significant_digits: usize) -> String {
        if self.raw.is_zero() || significant_digits == 0 {
            return "0".to_string();
        }

        let digit_count = self.raw.to_string().len();
        let rounded = if digit_count > significant_digits {
            match pow10(digit_count - significant_digits) {
                Some(divisor) => {
                    let (mut quotient, remainder) = self.raw.div_mod(divisor);
                    if remainder.saturating_mul(U256::from(2)) >= divisor {
                        quotient += U256::one();
                    }
                    quotient.saturating_mul(divisor)
                }
                None => self.raw,
            }
        } else {
            self.raw
        };

        format_decimal(rounded, self.currency.decimals())
    }
}

impl fmt::Display for CurrencyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            format_decimal(self.raw, self.currency.decimals()),
            self.currency.symbol()
        )
    }
}

pub fn pow10(exponent: usize) -> Option<U256> {
    U256::from(10).checked_pow(U256::from(exponent))
}

/// Formats `raw` as a decimal number with `decimals` fractional digits,
/// trimming trailing zeros.
pub fn format_decimal(raw: U256, decimals: u8) -> String {
    let digits = raw.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeType {
    ExactInput,
    ExactOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    V1,
    V2,
}

/// A V2 liquidity pool, identified by its pair (liquidity token) address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pair {
    pub token0: Token,
    pub token1: Token,
    pub liquidity_token: Address,
}

impl Pair {
    pub fn new(token_a: Token, token_b: Token, factory: Address) -> Self {
        let (token0, token1) = if token_a.sorts_before(&token_b) {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        };
        let liquidity_token = pair_address(factory, token0.address, token1.address);

        Self {
            token0,
            token1,
            liquidity_token,
        }
    }

    pub fn involves_token(&self, token: &Token) -> bool {
        &self.token0 == token || &self.token1 == token
    }
}

/// CREATE2 address of the pair contract for two sorted token addresses.
pub fn pair_address(factory: Address, token0: Address, token1: Address) -> Address {
    let mut packed = Vec::with_capacity(40);
    packed.extend_from_slice(token0.as_bytes());
    packed.extend_from_slice(token1.as_bytes());
    let salt = keccak256(packed);

    get_create2_address_from_hash(
        factory,
        Bytes::from(salt.to_vec()),
        Bytes::from(PAIR_INIT_CODE_HASH.clone()),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    pub pairs: Vec<Pair>,
    pub path: Vec<Token>,
    pub input: Currency,
    pub output: Currency,
}

impl Route {
    pub fn path_addresses(&self) -> Vec<Address> {
        self.path.iter().map(|token| token.address).collect()
    }
}

/// A priced route between two currencies. Produced by the routing engine and
/// replaced wholesale on every recompute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Trade {
    pub route: Route,
    pub trade_type: TradeType,
    pub input_amount: CurrencyAmount,
    pub output_amount: CurrencyAmount,
    pub version: ProtocolVersion,
}

impl Trade {
    pub fn minimum_amount_out(&self, allowed_slippage_bips: u32) -> CurrencyAmount {
        match self.trade_type {
            TradeType::ExactOutput => self.output_amount.clone(),
            TradeType::ExactInput => {
                let raw = self.output_amount.raw.saturating_mul(U256::from(BIPS_BASE))
                    / (U256::from(BIPS_BASE) + U256::from(allowed_slippage_bips));
                CurrencyAmount::new(self.output_amount.currency.clone(), raw)
            }
        }
    }

    pub fn maximum_amount_in(&self, allowed_slippage_bips: u32) -> CurrencyAmount {
        match self.trade_type {
            TradeType::ExactInput => self.input_amount.clone(),
            TradeType::ExactOutput => {
                let raw = self
                    .input_amount
                    .raw
                    .saturating_mul(U256::from(BIPS_BASE) + U256::from(allowed_slippage_bips))
                    / U256::from(BIPS_BASE);
                CurrencyAmount::new(self.input_amount.currency.clone(), raw)
            }
        }
    }

    /// True if any token or pool along the route has the given address.
    pub fn involves_address(&self, address: Address) -> bool {
        self.route.path.iter().any(|token| token.address == address)
            || self
                .route
                .pairs
                .iter()
                .any(|pair| pair.liquidity_token == address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlippageAdjustedAmounts {
    pub input: CurrencyAmount,
    pub output: CurrencyAmount,
}

pub fn compute_slippage_adjusted_amounts(
    trade: &Trade,
    allowed_slippage_bips: u32,
) -> SlippageAdjustedAmounts {
    SlippageAdjustedAmounts {
        input: trade.maximum_amount_in(allowed_slippage_bips),
        output: trade.minimum_amount_out(allowed_slippage_bips),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{token, two_hop_trade};

    #[test]
    fn test_to_significant() {
        let usdc = Currency::Token(token(1, 6, "USDC"));

        let amount = CurrencyAmount::new(usdc.clone(), U256::from(1_234_567u64));
        assert_eq!(amount.to_significant(3), "1.23");

        let amount = CurrencyAmount::new(usdc.clone(), U256::from(1_235_000u64));
        assert_eq!(amount.to_significant(3), "1.24");

        let amount = CurrencyAmount::new(usdc.clone(), U256::from(1_500u64));
        assert_eq!(amount.to_significant(3), "0.0015");

        let amount = CurrencyAmount::new(usdc, U256::from(123_456_789_000u64));
        assert_eq!(amount.to_significant(3), "123000");

        let amount = CurrencyAmount::ether(U256::exp10(18));
        assert_eq!(amount.to_significant(3), "1");
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(U256::from(5u64), 3), "0.005");
        assert_eq!(format_decimal(U256::from(5000u64), 3), "5");
        assert_eq!(format_decimal(U256::from(5u64), 0), "5");
        assert_eq!(format_decimal(U256::zero(), 6), "0");
    }

    #[test]
    fn test_slippage_adjusted_amounts() {
        let trade = two_hop_trade(TradeType::ExactInput, 1_000_000, 2_000_000);
        let amounts = compute_slippage_adjusted_amounts(&trade, 50);
        assert_eq!(amounts.input.raw, U256::from(1_000_000u64));
        // 2_000_000 * 10000 / 10050
        assert_eq!(amounts.output.raw, U256::from(1_990_049u64));

        let trade = two_hop_trade(TradeType::ExactOutput, 1_000_000, 2_000_000);
        let amounts = compute_slippage_adjusted_amounts(&trade, 50);
        assert_eq!(amounts.input.raw, U256::from(1_005_000u64));
        assert_eq!(amounts.output.raw, U256::from(2_000_000u64));
    }

    #[test]
    fn test_pair_address_matches_factory() {
        // USDC / WETH on mainnet
        let usdc: Address = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".parse().unwrap();
        let weth: Address = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2".parse().unwrap();
        let factory: Address = crate::constants::V2_FACTORY_ADDRESS.parse().unwrap();
        let expected: Address = "0xB4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc".parse().unwrap();

        assert_eq!(pair_address(factory, usdc, weth), expected);
    }

    #[test]
    fn test_involves_address() {
        let trade = two_hop_trade(TradeType::ExactInput, 1, 1);
        for token in &trade.route.path {
            assert!(trade.involves_address(token.address));
        }
        for pair in &trade.route.pairs {
            assert!(trade.involves_address(pair.liquidity_token));
        }
        assert!(!trade.involves_address(Address::repeat_byte(0xee)));
    }
}
