//! The connection seam between the mint core and a Solana node.

use std::sync::Arc;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};

use crate::config::{Cluster, MintClientConfig};
use crate::errors::MintError;
use crate::rpc::{RetryExecutor, RpcRateLimiter};

/// Status of a submitted signature as seen at the session's commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    /// Not yet observed at the requested commitment.
    Pending,
    Confirmed,
    Failed(TransactionError),
}

/// Node operations used by the reader and the submission engine.
#[async_trait]
pub trait ChainConnection: Send + Sync {
    /// Fetch an account; `Ok(None)` when it does not exist.
    async fn get_account(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<Option<Account>, MintError>;

    /// Native balance in lamports.
    async fn get_balance(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<u64, MintError>;

    async fn get_latest_blockhash(&self) -> Result<Hash, MintError>;

    async fn get_minimum_balance_for_rent_exemption(&self, len: usize) -> Result<u64, MintError>;

    /// Submit a signed transaction. Never retried.
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, MintError>;

    async fn get_signature_status(&self, signature: &Signature)
        -> Result<SignatureState, MintError>;
}

/// Production connection: nonblocking `RpcClient` behind the rate limiter,
/// with reads wrapped in the retry executor.
pub struct RpcConnection {
    rpc: Arc<RpcClient>,
    rate_limiter: Arc<RpcRateLimiter>,
    retry_executor: RetryExecutor,
    status_commitment: CommitmentConfig,
}

impl RpcConnection {
    pub fn new(config: &MintClientConfig) -> Self {
        let rpc = Arc::new(RpcClient::new_with_commitment(
            config.rpc_url.clone(),
            config.commitment,
        ));
        let rate_limiter = match config.cluster {
            Cluster::Localnet => RpcRateLimiter::unlimited(),
            _ => RpcRateLimiter::new(config.rate_limit.clone()),
        };
        Self {
            rpc,
            rate_limiter: Arc::new(rate_limiter),
            retry_executor: RetryExecutor::new(config.retry.clone()),
            status_commitment: config.commitment,
        }
    }

    pub fn rpc(&self) -> &Arc<RpcClient> {
        &self.rpc
    }
}

#[async_trait]
impl ChainConnection for RpcConnection {
    async fn get_account(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<Option<Account>, MintError> {
        let (rpc, limiter) = (&self.rpc, &self.rate_limiter);
        self.retry_executor
            .execute(|| async move {
                let _guard = limiter.acquire().await?;
                Ok(rpc
                    .get_account_with_commitment(address, commitment)
                    .await?
                    .value)
            })
            .await
    }

    async fn get_balance(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<u64, MintError> {
        let (rpc, limiter) = (&self.rpc, &self.rate_limiter);
        self.retry_executor
            .execute(|| async move {
                let _guard = limiter.acquire().await?;
                Ok(rpc
                    .get_balance_with_commitment(address, commitment)
                    .await?
                    .value)
            })
            .await
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, MintError> {
        let (rpc, limiter) = (&self.rpc, &self.rate_limiter);
        self.retry_executor
            .execute(|| async move {
                let _guard = limiter.acquire().await?;
                Ok(rpc.get_latest_blockhash().await?)
            })
            .await
    }

    async fn get_minimum_balance_for_rent_exemption(&self, len: usize) -> Result<u64, MintError> {
        let (rpc, limiter) = (&self.rpc, &self.rate_limiter);
        self.retry_executor
            .execute(|| async move {
                let _guard = limiter.acquire().await?;
                Ok(rpc.get_minimum_balance_for_rent_exemption(len).await?)
            })
            .await
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, MintError> {
        let _guard = self.rate_limiter.acquire().await?;
        self.rpc
            .send_transaction(transaction)
            .await
            .map_err(|e| match e.get_transaction_error() {
                Some(tx_err) => MintError::TransactionFailed(tx_err),
                None => MintError::Rpc(e),
            })
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<SignatureState, MintError> {
        let (rpc, limiter, commitment) = (&self.rpc, &self.rate_limiter, self.status_commitment);
        let status = self
            .retry_executor
            .execute(|| async move {
                let _guard = limiter.acquire().await?;
                Ok(rpc
                    .get_signature_status_with_commitment(signature, commitment)
                    .await?)
            })
            .await?;

        Ok(match status {
            None => SignatureState::Pending,
            Some(Ok(())) => SignatureState::Confirmed,
            Some(Err(e)) => SignatureState::Failed(e),
        })
    }
}
