//! Attestation gate collaborator (gatekeeper / captcha networks).
//!
//! When a candy machine carries a gatekeeper rule the mint transaction is
//! handed to the gate instead of being sent directly.

use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};

use crate::errors::MintError;

#[async_trait]
pub trait AttestationGate: Send + Sync {
    /// Gatekeeper network this gate issues tokens for.
    fn network(&self) -> Pubkey;

    /// Clear the challenge and submit the signed mint transaction.
    async fn submit(&self, transaction: Transaction) -> Result<Signature, MintError>;
}
