use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TxHash, U256};
use log::{error, info};
use serde::Serialize;

use crate::chain_rules::chain_rules;
use crate::constants::{BIPS_BASE, GAS_MARGIN_BIPS};
use crate::error::{CallError, SwapError};
use crate::estimation::SuccessfulCall;
use crate::recipient::{is_address, shorten_address};
use crate::transactions::TransactionRecorder;
use crate::types::Trade;

/// State-changing half of the contract call layer, backed by the wallet.
#[async_trait]
pub trait TransactionSender: Send + Sync {
    async fn send_transaction(&self, tx: TypedTransaction) -> Result<TxHash, CallError>;

    /// Fills nonce, gas price and chain id the way a signer would before signing.
    async fn populate_transaction(&self, tx: &mut TypedTransaction) -> Result<(), CallError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Submit,
    SignOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapExecutionResult {
    pub hash: TxHash,
    /// Unsigned envelope, only present in sign-only mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_transaction: Option<Bytes>,
}

pub fn calculate_gas_margin(value: U256) -> U256 {
    value.saturating_mul(U256::from(BIPS_BASE + GAS_MARGIN_BIPS)) / U256::from(BIPS_BASE)
}

/// `Swap 1.5 WETH for 2700 USDC[ to recipient]`
pub fn swap_summary(
    trade: &Trade,
    account: Address,
    recipient: Address,
    recipient_address_or_name: Option<&str>,
) -> String {
    let base = format!(
        "Swap {} {} for {} {}",
        trade.input_amount.to_significant(3),
        trade.input_amount.currency.symbol(),
        trade.output_amount.to_significant(3),
        trade.output_amount.currency.symbol()
    );

    if recipient == account {
        return base;
    }

    let shown = match recipient_address_or_name {
        Some(identifier) => match is_address(identifier) {
            Some(address) => shorten_address(address, 4),
            None => identifier.to_string(),
        },
        None => shorten_address(recipient, 4),
    };
    format!("{} to {}", base, shown)
}

/// Everything the executor needs besides the selected call.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub account: Address,
    pub chain_id: u64,
    pub trade: &'a Trade,
    pub recipient: Address,
    pub recipient_address_or_name: Option<&'a str>,
}

pub struct SwapExecutor<'a> {
    sender: &'a dyn TransactionSender,
    recorder: &'a dyn TransactionRecorder,
}

impl<'a> SwapExecutor<'a> {
    pub fn new(sender: &'a dyn TransactionSender, recorder: &'a dyn TransactionRecorder) -> Self {
        Self { sender, recorder }
    }

    pub async fn execute(
        &self,
        selected: &SuccessfulCall,
        mode: ExecutionMode,
        context: ExecutionContext<'_>,
    ) -> Result<SwapExecutionResult, SwapError> {
        match mode {
            ExecutionMode::Submit => self.submit(selected, context).await,
            ExecutionMode::SignOnly => self.build_signable(selected, context).await,
        }
    }

    async fn submit(
        &self,
        selected: &SuccessfulCall,
        context: ExecutionContext<'_>,
    ) -> Result<SwapExecutionResult, SwapError> {
        let mut tx = selected.call.to_transaction(context.account);
        tx.set_gas(calculate_gas_margin(selected.gas_estimate));

        let hash = self
            .sender
            .send_transaction(tx)
            .await
            .map_err(|err| log_submission_failure(selected, err))?;

        let summary = swap_summary(
            context.trade,
            context.account,
            context.recipient,
            context.recipient_address_or_name,
        );
        self.recorder.add_transaction(hash, summary);

        Ok(SwapExecutionResult {
            hash,
            raw_transaction: None,
        })
    }

    // No signature is produced here: the caller gets the signing digest and
    // the unsigned RLP envelope to sign out of band.
    async fn build_signable(
        &self,
        selected: &SuccessfulCall,
        context: ExecutionContext<'_>,
    ) -> Result<SwapExecutionResult, SwapError> {
        let rules = chain_rules(context.chain_id)?;

        let mut tx = selected.call.to_transaction(context.account);
        tx.set_gas(calculate_gas_margin(selected.gas_estimate));

        self.sender
            .populate_transaction(&mut tx)
            .await
            .map_err(|err| log_submission_failure(selected, err))?;

        let envelope = rules.format_transaction(&tx);
        let hash = envelope.sighash();
        let raw_transaction = envelope.rlp();

        info!(
            "built {} transaction for signing, hash {:?}, rawTransaction 0x{}",
            rules.chain,
            hash,
            hex::encode(&raw_transaction)
        );

        Ok(SwapExecutionResult {
            hash,
            raw_transaction: Some(raw_transaction),
        })
    }
}

fn log_submission_failure(selected: &SuccessfulCall, err: CallError) -> SwapError {
    if !err.is_user_rejection() {
        error!(
            "Swap failed: {} - method {}, args {:?}, value {}",
            err,
            selected.call.method.name(),
            selected.call.args,
            selected.call.value
        );
    }
    err.into_submission_error()
}
