use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::TransactionRequest;

use crate::constants::{MAINNET_CHAIN_ID, RINKEBY_CHAIN_ID};
use crate::error::SwapError;

/// Transaction formatting rules for a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainRules {
    pub chain_id: u64,
    pub chain: &'static str,
    pub hardfork: &'static str,
}

/// Looks up the rules for a chain. Building a signable payload for any other
/// chain is a configuration error.
pub fn chain_rules(chain_id: u64) -> Result<ChainRules, SwapError> {
    let chain = match chain_id {
        MAINNET_CHAIN_ID => "mainnet",
        RINKEBY_CHAIN_ID => "rinkeby",
        _ => return Err(SwapError::UnknownChain(chain_id)),
    };

    Ok(ChainRules {
        chain_id,
        chain,
        hardfork: "berlin",
    })
}

impl ChainRules {
    /// Rebuilds a populated transaction as a legacy EIP-155 envelope bound to
    /// this chain.
    pub fn format_transaction(&self, tx: &TypedTransaction) -> TypedTransaction {
        let mut request = TransactionRequest::new().chain_id(self.chain_id);

        request.from = tx.from().copied();
        request.to = tx.to().cloned();
        request.gas = tx.gas().copied();
        request.gas_price = tx.gas_price();
        request.value = tx.value().copied();
        request.data = tx.data().cloned();
        request.nonce = tx.nonce().copied();

        request.into()
    }
}
