//! Terminal results of a mint attempt and their classification.

use candy_machine_core::CandyMachineErrorCode;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::TransactionError};

use crate::errors::{program_error_from_transaction, ErrorCategory, MintError};

/// Why a mint attempt failed in a way the user can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// No terminal status before the timeout. The transaction may still land.
    Timeout,
    TransactionRejected,
    /// The mint confirmed but its metadata account was not created.
    RecordNotFound,
    InsufficientFunds,
    NotYetLive,
    SoldOut,
}

impl FailureReason {
    /// Whether a fee may already have been paid, so the user should check
    /// the explorer before retrying.
    pub fn fee_may_have_been_charged(&self) -> bool {
        matches!(self, FailureReason::Timeout | FailureReason::RecordNotFound)
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            FailureReason::Timeout => {
                "Transaction Timeout! The transaction may still land and a fee may already have \
                 been charged. Check the explorer before trying again."
            }
            FailureReason::TransactionRejected => "Mint failed! Please try again!",
            FailureReason::RecordNotFound => {
                "Mint likely failed! Anti-bot SOL 0.01 fee potentially charged! Check the explorer \
                 to confirm the mint failed and if so, make sure you are eligible to mint before \
                 trying again."
            }
            FailureReason::InsufficientFunds => {
                "Insufficient funds to mint. Please fund your wallet."
            }
            FailureReason::NotYetLive => "Minting period hasn't started yet.",
            FailureReason::SoldOut => "SOLD OUT!",
        }
    }
}

impl From<CandyMachineErrorCode> for FailureReason {
    fn from(code: CandyMachineErrorCode) -> Self {
        match code {
            CandyMachineErrorCode::NotEnoughSol => FailureReason::InsufficientFunds,
            CandyMachineErrorCode::CandyMachineEmpty => FailureReason::SoldOut,
            CandyMachineErrorCode::CandyMachineNotLive => FailureReason::NotYetLive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        minted_asset: Pubkey,
        signature: Signature,
        explorer_url: String,
    },
    RecoverableFailure {
        reason: FailureReason,
    },
    /// Unexpected failure; carries the raw diagnostic for support.
    FatalFailure {
        diagnostic: String,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn recoverable(reason: FailureReason) -> Self {
        Outcome::RecoverableFailure { reason }
    }

    pub fn fatal(diagnostic: impl Into<String>) -> Self {
        Outcome::FatalFailure {
            diagnostic: diagnostic.into(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Outcome::Success { .. } => "Congratulations! Minted!".to_string(),
            Outcome::RecoverableFailure { reason } => reason.user_message().to_string(),
            Outcome::FatalFailure { diagnostic } => {
                format!("Minting failed! Please try again! ({})", diagnostic)
            }
        }
    }
}

/// Classify a transaction that executed and failed on chain.
pub fn classify_transaction_error(err: &TransactionError) -> FailureReason {
    if let Some(code) = program_error_from_transaction(err) {
        return code.into();
    }
    match err {
        TransactionError::InsufficientFundsForFee
        | TransactionError::InsufficientFundsForRent { .. } => FailureReason::InsufficientFunds,
        _ => FailureReason::TransactionRejected,
    }
}

/// Classify any error raised while running an attempt.
///
/// Structured codes are used first; the text of opaque provider errors is
/// scanned only as a fallback.
pub fn classify_error(err: &MintError) -> Outcome {
    match err {
        MintError::TransactionFailed(tx_err) => Outcome::recoverable(classify_transaction_error(tx_err)),
        MintError::ConfirmationTimeout { .. } => Outcome::recoverable(FailureReason::Timeout),
        MintError::TransactionRejected { .. } | MintError::Signer(_) => Outcome::recoverable(
            err.program_error_code()
                .map(FailureReason::from)
                .unwrap_or(FailureReason::TransactionRejected),
        ),
        other => match other.program_error_code() {
            Some(code) => Outcome::recoverable(code.into()),
            None if other.category() == ErrorCategory::Program => {
                Outcome::recoverable(FailureReason::TransactionRejected)
            }
            None => Outcome::fatal(other.to_string()),
        },
    }
}
