//! Signing collaborator. The mint core never touches key material directly.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
    transaction::Transaction,
};

use crate::config::ConfigError;
use crate::errors::MintError;

/// A wallet that can sign transactions on behalf of the minter.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Add the wallet's signature. Existing partial signatures are preserved.
    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction, MintError>;

    async fn sign_all_transactions(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, MintError> {
        let mut signed = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            signed.push(self.sign_transaction(transaction).await?);
        }
        Ok(signed)
    }
}

/// Signer backed by a local keypair.
#[derive(Clone)]
pub struct KeypairSigner {
    keypair: Arc<Keypair>,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        read_keypair_file(path)
            .map(Self::new)
            .map_err(|e| ConfigError::InvalidKeypair(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(
        &self,
        mut transaction: Transaction,
    ) -> Result<Transaction, MintError> {
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[self.keypair.as_ref()], blockhash)
            .map_err(|e| MintError::Signer(e.to_string()))?;
        Ok(transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{hash::Hash, system_instruction};

    #[tokio::test]
    async fn test_keypair_signer_completes_signatures() {
        let signer = KeypairSigner::new(Keypair::new());
        let payer = signer.pubkey();
        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 1);
        let mut tx = Transaction::new_with_payer(&[ix], Some(&payer));
        tx.message.recent_blockhash = Hash::new_unique();

        let signed = signer.sign_all_transactions(vec![tx]).await.unwrap();
        assert!(signed[0].is_signed());
    }

    #[tokio::test]
    async fn test_foreign_transaction_is_rejected() {
        let signer = KeypairSigner::new(Keypair::new());
        let other = Pubkey::new_unique();
        let ix = system_instruction::transfer(&other, &Pubkey::new_unique(), 1);
        let tx = Transaction::new_with_payer(&[ix], Some(&other));

        assert!(matches!(
            signer.sign_transaction(tx).await,
            Err(MintError::Signer(_))
        ));
    }
}
