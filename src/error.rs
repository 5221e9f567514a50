use std::fmt;

use thiserror::Error;

use crate::constants::USER_REJECTED_REQUEST_CODE;

/// Errors raised by the swap callback. The `Display` text is what the user sees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwapError {
    #[error("This transaction will not succeed either due to price movement or fee on transfer. Try increasing your slippage tolerance.")]
    PriceMovement,

    #[error("The transaction cannot succeed due to error: {0}. This is probably an issue with one of the tokens you are swapping.")]
    TokenIssue(String),

    #[error("Unexpected issue with estimating the gas. Please try again.")]
    UnexpectedEstimateFailure,

    #[error("Unexpected error. Please contact support: none of the calls threw an error")]
    NoFailureRecorded,

    #[error("Transaction rejected.")]
    Rejected,

    #[error("Swap failed: {0}")]
    Failed(String),

    #[error("Unknown chain ID {0} when building transaction")]
    UnknownChain(u64),

    #[error("Missing dependencies")]
    MissingDependencies,

    #[error("Invalid recipient")]
    InvalidRecipient,
}

/// Validation problems with the swap form. Returned as state, never raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Connect Wallet")]
    ConnectWallet,

    #[error("Enter an amount")]
    EnterAmount,

    #[error("Select a token")]
    SelectToken,

    #[error("Enter a recipient")]
    EnterRecipient,

    #[error("Invalid recipient")]
    InvalidRecipient,

    #[error("Insufficient {0} balance")]
    InsufficientBalance(String),
}

/// A failure reported by the node or wallet for a single RPC request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct CallError {
    pub code: Option<i64>,
    pub message: String,
    /// Decoded `Error(string)` revert reason, when the node returned one.
    pub reason: Option<String>,
}

impl CallError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            reason: None,
        }
    }

    pub fn reverted(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            code: Some(3),
            message: format!("execution reverted: {}", reason),
            reason: Some(reason),
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == Some(USER_REJECTED_REQUEST_CODE)
    }

    /// Maps a submission failure to what the user sees.
    pub fn into_submission_error(self) -> SwapError {
        if self.is_user_rejection() {
            SwapError::Rejected
        } else {
            SwapError::Failed(self.message)
        }
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}
