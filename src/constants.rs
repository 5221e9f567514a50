use ethers::types::U256;

pub const BIPS_BASE: u64 = 10_000;

// 0.5%
pub const INITIAL_ALLOWED_SLIPPAGE: u32 = 50;

// 20 minutes, denominated in seconds
pub const DEFAULT_DEADLINE_FROM_NOW: u64 = 60 * 20;

// 0.005 ETH
pub const DEFAULT_ETH_TIP_WEI: u128 = 5_000_000_000_000_000;

/// Added on top of every gas estimate, in bips.
pub const GAS_MARGIN_BIPS: u64 = 1_000;

pub const USER_REJECTED_REQUEST_CODE: i64 = 4001;

pub const INSUFFICIENT_OUTPUT_AMOUNT: &str = "UniswapV2Router: INSUFFICIENT_OUTPUT_AMOUNT";
pub const EXCESSIVE_INPUT_AMOUNT: &str = "UniswapV2Router: EXCESSIVE_INPUT_AMOUNT";

/// Protocol infrastructure that must never receive swap output.
pub const BAD_RECIPIENT_ADDRESSES: [&str; 3] = [
    "0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f", // v2 factory
    "0xf164fC0Ec4E93095b804a4795bBe1e041497b92a", // v2 router 01
    "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D", // v2 router 02
];

pub const V2_FACTORY_ADDRESS: &str = "0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f";
pub const V2_ROUTER_ADDRESS: &str = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D";
pub const V2_PAIR_INIT_CODE_HASH: &str =
    "96e8ac4277198ff8b6f785478aa9a39f403cb768dd02cbee326c3e7da348845f";

pub const MAINNET_CHAIN_ID: u64 = 1;
pub const RINKEBY_CHAIN_ID: u64 = 4;

pub fn weth_address(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        MAINNET_CHAIN_ID => Some("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
        RINKEBY_CHAIN_ID => Some("0xc778417E063141139Fce010982780140Aa0cD5Ab"),
        _ => None,
    }
}

pub fn default_eth_tip() -> U256 {
    U256::from(DEFAULT_ETH_TIP_WEI)
}
