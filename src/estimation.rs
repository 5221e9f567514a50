use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, U256};
use futures::future::join_all;
use log::debug;

use crate::constants::{EXCESSIVE_INPUT_AMOUNT, INSUFFICIENT_OUTPUT_AMOUNT};
use crate::error::{CallError, SwapError};
use crate::swap_call::SwapCall;

/// Read-only half of the contract call layer.
#[async_trait]
pub trait ContractCaller: Send + Sync {
    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, CallError>;

    /// Executes the call without changing state (`eth_call`).
    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes, CallError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuccessfulCall {
    pub call: SwapCall,
    pub gas_estimate: U256,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedCall {
    pub call: SwapCall,
    pub error: SwapError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EstimatedSwapCall {
    Estimated(SuccessfulCall),
    Failed(FailedCall),
}

impl EstimatedSwapCall {
    pub fn is_estimated(&self) -> bool {
        matches!(self, EstimatedSwapCall::Estimated(_))
    }

    pub fn call(&self) -> &SwapCall {
        match self {
            EstimatedSwapCall::Estimated(success) => &success.call,
            EstimatedSwapCall::Failed(failure) => &failure.call,
        }
    }
}

/// Maps the revert reason of a failed dry-run to the message shown to the user.
pub fn classify_call_error(call_error: &CallError) -> SwapError {
    match call_error.reason.as_deref() {
        Some(INSUFFICIENT_OUTPUT_AMOUNT) | Some(EXCESSIVE_INPUT_AMOUNT) => SwapError::PriceMovement,
        Some(reason) => SwapError::TokenIssue(reason.to_string()),
        None => SwapError::TokenIssue(call_error.message.clone()),
    }
}

/// Estimates one candidate. On failure the call is replayed with `eth_call`
/// to recover the revert reason.
pub async fn estimate_swap_call(
    caller: &dyn ContractCaller,
    call: SwapCall,
    from: Address,
) -> EstimatedSwapCall {
    let tx = call.to_transaction(from);

    let gas_error = match caller.estimate_gas(&tx).await {
        Ok(gas_estimate) => {
            return EstimatedSwapCall::Estimated(SuccessfulCall { call, gas_estimate })
        }
        Err(err) => err,
    };
    debug!(
        "Gas estimate failed for {}, trying eth_call to extract error: {}",
        call.method.name(),
        gas_error
    );

    let error = match caller.call(&tx).await {
        Ok(result) => {
            debug!(
                "Unexpected successful call after failed estimate gas for {}: {} / {:?}",
                call.method.name(),
                gas_error,
                result
            );
            SwapError::UnexpectedEstimateFailure
        }
        Err(call_error) => {
            debug!("Call threw error for {}: {}", call.method.name(), call_error);
            classify_call_error(&call_error)
        }
    };

    EstimatedSwapCall::Failed(FailedCall { call, error })
}

/// Estimates every candidate concurrently. Output order matches input order.
pub async fn estimate_swap_calls(
    caller: &dyn ContractCaller,
    calls: &[SwapCall],
    from: Address,
) -> Vec<EstimatedSwapCall> {
    join_all(
        calls
            .iter()
            .cloned()
            .map(|call| estimate_swap_call(caller, call, from)),
    )
    .await
}

/// Picks the call to execute: the last successful estimate whose successor, if
/// any, also estimated. With a plain call and a fee-on-transfer call, the
/// fee-on-transfer call wins when both estimate. If no success is followed by
/// another, the last success is taken.
///
/// When nothing estimated, the error of the last failed call is returned.
pub fn select_successful_estimation(
    estimates: &[EstimatedSwapCall],
) -> Result<&SuccessfulCall, SwapError> {
    let trailing_run = (0..estimates.len()).rev().find(|&ix| {
        estimates[ix].is_estimated()
            && estimates
                .get(ix + 1)
                .map_or(true, EstimatedSwapCall::is_estimated)
    });
    let selected =
        trailing_run.or_else(|| estimates.iter().rposition(EstimatedSwapCall::is_estimated));

    if let Some(EstimatedSwapCall::Estimated(success)) = selected.map(|ix| &estimates[ix]) {
        return Ok(success);
    }

    let last_failure = estimates.iter().rev().find_map(|estimate| match estimate {
        EstimatedSwapCall::Failed(failure) => Some(failure.error.clone()),
        EstimatedSwapCall::Estimated(_) => None,
    });

    Err(last_failure.unwrap_or(SwapError::NoFailureRecorded))
}

/// Runs the whole pipeline for one swap attempt.
pub async fn estimate_and_select(
    caller: &dyn ContractCaller,
    calls: &[SwapCall],
    from: Address,
) -> Result<SuccessfulCall, SwapError> {
    let estimates = estimate_swap_calls(caller, calls, from).await;
    select_successful_estimation(&estimates).cloned()
}
