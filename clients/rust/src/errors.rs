//! Error types for the mint client.
//!
//! Provides rich error types with retry hints and categorization
//! for better error handling and observability.

use candy_machine_core::{CandyMachineErrorCode, CoreError};
use solana_sdk::transaction::TransactionError;
use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for mint client operations.
#[derive(Error, Debug)]
pub enum MintError {
    // Network Errors
    #[error("RPC error: {0}")]
    Rpc(#[from] solana_client::client_error::ClientError),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Connection timeout")]
    ConnectionTimeout,

    // Transaction Errors
    #[error("Transaction failed: {0}")]
    TransactionFailed(TransactionError),

    #[error("Transaction rejected: {reason}")]
    TransactionRejected { reason: String },

    #[error("Confirmation timeout after {timeout_ms}ms")]
    ConfirmationTimeout { timeout_ms: u64 },

    // Program Errors
    #[error("Candy machine program error {0:?} ({code:#x})", code = .0.code())]
    Program(CandyMachineErrorCode),

    // Configuration Errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Candy machine account not found: {address}")]
    MachineNotFound { address: String },

    #[error("Account {address} is not a candy machine: {source}")]
    NotACandyMachine {
        address: String,
        #[source]
        source: CoreError,
    },

    #[error("Mint requires an attestation gate for network {network}")]
    GateRequired { network: String },

    #[error("Attestation gate serves network {actual}, candy machine expects {expected}")]
    GateMismatch { expected: String, actual: String },

    // Account Errors
    #[error("Account decode failed: {0}")]
    Decode(#[from] CoreError),

    // Input Validation Errors
    #[error("Signer error: {0}")]
    Signer(String),

    #[error("A mint is already in progress")]
    MintInProgress,

    #[error("No candy machine state loaded yet")]
    NotLoaded,

    // Internal Errors
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl MintError {
    /// Check if this error is retryable.
    ///
    /// Only read paths retry. Sends are never retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MintError::Rpc(_) | MintError::RateLimited { .. } | MintError::ConnectionTimeout
        )
    }

    /// Get a retry hint in milliseconds, if available.
    pub fn retry_hint_ms(&self) -> Option<u64> {
        match self {
            MintError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            MintError::ConnectionTimeout => Some(1000),
            _ => None,
        }
    }

    /// Categorize the error for logging and user messaging.
    pub fn category(&self) -> ErrorCategory {
        match self {
            MintError::Rpc(_) | MintError::RateLimited { .. } | MintError::ConnectionTimeout => {
                ErrorCategory::Network
            }

            MintError::TransactionFailed(_)
            | MintError::TransactionRejected { .. }
            | MintError::ConfirmationTimeout { .. } => ErrorCategory::Transaction,

            MintError::Program(_) => ErrorCategory::Program,

            MintError::InvalidConfig(_)
            | MintError::MachineNotFound { .. }
            | MintError::NotACandyMachine { .. }
            | MintError::GateRequired { .. }
            | MintError::GateMismatch { .. } => ErrorCategory::Config,

            MintError::Decode(_) => ErrorCategory::Account,

            MintError::Signer(_) | MintError::MintInProgress | MintError::NotLoaded => {
                ErrorCategory::Validation
            }

            MintError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Structured program error code, if one can be recovered.
    ///
    /// Falls back to scanning the error text for a hex code fragment when the
    /// provider returned an opaque error.
    pub fn program_error_code(&self) -> Option<CandyMachineErrorCode> {
        match self {
            MintError::Program(code) => Some(*code),
            MintError::TransactionFailed(err) => program_error_from_transaction(err),
            MintError::Rpc(err) => err
                .get_transaction_error()
                .as_ref()
                .and_then(program_error_from_transaction)
                .or_else(|| CandyMachineErrorCode::from_error_text(&err.to_string())),
            other => CandyMachineErrorCode::from_error_text(&other.to_string()),
        }
    }

    /// Message shown to the user for refresh-time failures.
    pub fn user_message(&self) -> String {
        match self {
            MintError::MachineNotFound { address } | MintError::NotACandyMachine { address, .. } => {
                format!(
                    "Couldn't fetch candy machine state from candy machine with address: {}! \
                     Check the CANDY_MACHINE_ID value in your .env file, or make sure you are \
                     using the right RPC for its cluster.",
                    address
                )
            }
            MintError::InvalidConfig(e) => format!("Configuration problem: {}", e),
            e if e.category() == ErrorCategory::Network => format!(
                "Couldn't fetch candy machine state ({}). This usually means a problem with \
                 the SOLANA_RPC_HOST value in your .env file, or you are not using a custom RPC.",
                e
            ),
            e => e.to_string(),
        }
    }
}

pub(crate) fn program_error_from_transaction(
    err: &TransactionError,
) -> Option<CandyMachineErrorCode> {
    match err {
        TransactionError::InstructionError(_, solana_sdk::instruction::InstructionError::Custom(code)) => {
            CandyMachineErrorCode::from_code(*code)
        }
        _ => None,
    }
}

/// Error category for logging and messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (RPC, rate limiting, timeouts)
    Network,
    /// Transaction-related errors (rejection, confirmation)
    Transaction,
    /// Candy machine program errors
    Program,
    /// Configuration errors, fatal to the session
    Config,
    /// Input validation errors
    Validation,
    /// Account-related errors
    Account,
    /// Internal errors (unexpected failures)
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Transaction => write!(f, "transaction"),
            ErrorCategory::Program => write!(f, "program"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Account => write!(f, "account"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

/// Result type alias for mint client operations.
pub type MintResult<T> = Result<T, MintError>;
