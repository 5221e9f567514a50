use ethers::types::{Address, U256};
use log::debug;

use crate::chain_rules::chain_rules;
use crate::error::SwapError;
use crate::estimation::{estimate_and_select, ContractCaller};
use crate::executor::{
    ExecutionContext, ExecutionMode, SwapExecutionResult, SwapExecutor, TransactionSender,
};
use crate::recipient::{resolve_recipient, NameResolver};
use crate::swap_call::{build_swap_calls, ChainContext, RouterMode, SwapCall};
use crate::transactions::TransactionRecorder;
use crate::types::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapCallbackState {
    Invalid,
    Loading,
    Valid,
}

/// Network-facing collaborators of a swap.
#[derive(Clone, Copy)]
pub struct SwapClients<'a> {
    pub caller: &'a dyn ContractCaller,
    pub sender: &'a dyn TransactionSender,
    pub recorder: &'a dyn TransactionRecorder,
    pub resolver: &'a dyn NameResolver,
}

/// Wallet, deadline and routing context resolved outside the swap core.
#[derive(Clone, Copy)]
pub struct SwapEnvironment<'a> {
    pub chain: Option<ChainContext>,
    pub deadline: Option<U256>,
    pub router_mode: Option<RouterMode>,
    pub clients: SwapClients<'a>,
}

/// A swap that is ready to run: its candidate calls are fixed, estimation and
/// submission happen when [`PreparedSwap::execute`] is awaited.
pub struct PreparedSwap<'a> {
    calls: Vec<SwapCall>,
    trade: Trade,
    chain: ChainContext,
    recipient: Address,
    recipient_address_or_name: Option<String>,
    mode: ExecutionMode,
    clients: SwapClients<'a>,
}

impl<'a> PreparedSwap<'a> {
    pub fn calls(&self) -> &[SwapCall] {
        &self.calls
    }

    #[tracing::instrument(skip_all, fields(mode = ?self.mode, calls = self.calls.len()))]
    pub async fn execute(&self) -> Result<SwapExecutionResult, SwapError> {
        if self.mode == ExecutionMode::SignOnly {
            chain_rules(self.chain.chain_id)?;
        }

        let selected =
            estimate_and_select(self.clients.caller, &self.calls, self.chain.account).await?;
        debug!(
            "selected {} with gas estimate {}",
            selected.call.method.name(),
            selected.gas_estimate
        );

        let executor = SwapExecutor::new(self.clients.sender, self.clients.recorder);
        executor
            .execute(
                &selected,
                self.mode,
                ExecutionContext {
                    account: self.chain.account,
                    chain_id: self.chain.chain_id,
                    trade: &self.trade,
                    recipient: self.recipient,
                    recipient_address_or_name: self.recipient_address_or_name.as_deref(),
                },
            )
            .await
    }
}

pub struct SwapCallback<'a> {
    pub state: SwapCallbackState,
    pub callback: Option<PreparedSwap<'a>>,
    pub error: Option<SwapError>,
}

impl<'a> SwapCallback<'a> {
    fn invalid(error: SwapError) -> Self {
        Self {
            state: SwapCallbackState::Invalid,
            callback: None,
            error: Some(error),
        }
    }
}

/// Returns a callback that executes the swap when every input is valid.
pub async fn build_swap_callback<'a>(
    trade: Option<&Trade>,
    allowed_slippage_bips: u32,
    recipient_address_or_name: Option<&str>,
    sign_only: bool,
    environment: &SwapEnvironment<'a>,
) -> SwapCallback<'a> {
    let (trade, chain) = match (trade, environment.chain) {
        (Some(trade), Some(chain)) => (trade, chain),
        _ => return SwapCallback::invalid(SwapError::MissingDependencies),
    };

    let recipient = resolve_recipient(
        recipient_address_or_name,
        Some(chain.account),
        environment.clients.resolver,
    )
    .await;

    let recipient = match recipient {
        Some(recipient) => recipient,
        None if recipient_address_or_name.is_some() => {
            return SwapCallback::invalid(SwapError::InvalidRecipient)
        }
        None => {
            return SwapCallback {
                state: SwapCallbackState::Loading,
                callback: None,
                error: None,
            }
        }
    };

    let calls = build_swap_calls(
        Some(trade),
        allowed_slippage_bips,
        Some(recipient),
        environment.deadline,
        Some(&chain),
        environment.router_mode.as_ref(),
    );

    SwapCallback {
        state: SwapCallbackState::Valid,
        callback: Some(PreparedSwap {
            calls,
            trade: trade.clone(),
            chain,
            recipient,
            recipient_address_or_name: recipient_address_or_name.map(str::to_string),
            mode: if sign_only {
                ExecutionMode::SignOnly
            } else {
                ExecutionMode::Submit
            },
            clients: environment.clients,
        }),
        error: None,
    }
}
