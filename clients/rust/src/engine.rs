//! Submission & Confirmation Engine.
//!
//! Drives one mint attempt through its stages:
//!
//! ```text
//! Idle -> [AwaitingSetupConfirmation] -> AwaitingMintConfirmation -> Succeeded
//!   \______________________\___________________________\______-> Failed
//! ```
//!
//! Every attempt ends in an [`Outcome`]; errors and panics raised by
//! collaborators are classified rather than propagated.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::{Transaction, TransactionError},
};
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::config::{Cluster, MintClientConfig};
use crate::errors::MintError;
use crate::gate::AttestationGate;
use crate::instructions::{metadata_address, mint_instructions, setup_instructions, NFT_MINT_SPACE};
use crate::outcome::{classify_error, classify_transaction_error, FailureReason, Outcome};
use crate::rpc::{ChainConnection, SignatureState};
use crate::signer::TransactionSigner;
use crate::types::MachineSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStage {
    Idle,
    AwaitingSetupConfirmation,
    AwaitingMintConfirmation,
    Succeeded,
    Failed,
}

/// Setup transaction sent during an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupTransaction {
    pub mint: Pubkey,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintTransaction {
    pub mint: Pubkey,
    pub signature: Signature,
    /// Whether the setup instructions were packed into this transaction.
    pub includes_setup: bool,
    pub via_gate: bool,
}

/// Record of a finished attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReport {
    pub outcome: Outcome,
    /// Stages entered, in order, starting at `Idle`.
    pub stages: Vec<AttemptStage>,
    pub setup: Option<SetupTransaction>,
    pub mint: Option<MintTransaction>,
}

/// Transient state of one user-initiated mint.
struct MintAttempt<'a> {
    stages: Vec<AttemptStage>,
    setup: Option<SetupTransaction>,
    mint: Option<MintTransaction>,
    on_stage: &'a (dyn Fn(AttemptStage) + Send + Sync),
}

impl<'a> MintAttempt<'a> {
    fn new(on_stage: &'a (dyn Fn(AttemptStage) + Send + Sync)) -> Self {
        let attempt = Self {
            stages: vec![AttemptStage::Idle],
            setup: None,
            mint: None,
            on_stage,
        };
        (attempt.on_stage)(AttemptStage::Idle);
        attempt
    }

    fn enter(&mut self, stage: AttemptStage) {
        self.stages.push(stage);
        (self.on_stage)(stage);
    }

    fn finish(mut self, outcome: Outcome) -> AttemptReport {
        self.enter(if outcome.is_success() {
            AttemptStage::Succeeded
        } else {
            AttemptStage::Failed
        });
        AttemptReport {
            outcome,
            stages: self.stages,
            setup: self.setup,
            mint: self.mint,
        }
    }
}

enum Confirmation {
    Confirmed,
    Failed(TransactionError),
    TimedOut,
}

pub struct MintEngine {
    connection: Arc<dyn ChainConnection>,
    signer: Arc<dyn TransactionSigner>,
    gate: Option<Arc<dyn AttestationGate>>,
    tx_timeout: Duration,
    poll_interval: Duration,
    cluster: Cluster,
    /// Mint account provisioned by a confirmed setup transaction that no
    /// successful mint has consumed yet.
    confirmed_setup: Mutex<Option<Arc<Keypair>>>,
}

impl MintEngine {
    pub fn new(
        config: &MintClientConfig,
        connection: Arc<dyn ChainConnection>,
        signer: Arc<dyn TransactionSigner>,
        gate: Option<Arc<dyn AttestationGate>>,
    ) -> Self {
        Self {
            connection,
            signer,
            gate,
            tx_timeout: config.tx_timeout,
            poll_interval: config.poll_interval,
            cluster: config.cluster,
            confirmed_setup: Mutex::new(None),
        }
    }

    pub fn wallet(&self) -> Pubkey {
        self.signer.pubkey()
    }

    /// Whether a confirmed setup is waiting to be used by the next mint.
    pub async fn has_pending_setup(&self) -> bool {
        self.confirmed_setup.lock().await.is_some()
    }

    pub async fn mint(&self, snapshot: &MachineSnapshot) -> AttemptReport {
        self.mint_with(snapshot, &|_| {}).await
    }

    /// Run one attempt, reporting each stage transition to `on_stage`.
    pub async fn mint_with(
        &self,
        snapshot: &MachineSnapshot,
        on_stage: &(dyn Fn(AttemptStage) + Send + Sync),
    ) -> AttemptReport {
        let mut attempt = MintAttempt::new(on_stage);

        let result = AssertUnwindSafe(self.run(snapshot, &mut attempt))
            .catch_unwind()
            .await;

        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, category = %e.category(), "Mint attempt errored");
                classify_error(&e)
            }
            Err(panic) => {
                let diagnostic = panic_message(&*panic);
                tracing::error!(diagnostic = %diagnostic, "Mint attempt panicked");
                Outcome::fatal(diagnostic)
            }
        };

        match &outcome {
            Outcome::Success { minted_asset, signature, .. } => {
                tracing::info!(mint = %minted_asset, signature = %signature, "Mint succeeded");
            }
            Outcome::RecoverableFailure { reason } => {
                tracing::warn!(reason = ?reason, "Mint failed");
            }
            Outcome::FatalFailure { diagnostic } => {
                tracing::error!(diagnostic = %diagnostic, "Mint failed unexpectedly");
            }
        }

        attempt.finish(outcome)
    }

    async fn run(
        &self,
        snapshot: &MachineSnapshot,
        attempt: &mut MintAttempt<'_>,
    ) -> Result<Outcome, MintError> {
        let gate = self.resolve_gate(snapshot)?;
        let payer = self.signer.pubkey();
        let prior_setup = self.confirmed_setup.lock().await.clone();

        let (mint, includes_setup) = match prior_setup {
            Some(mint) => {
                tracing::debug!(mint = %mint.pubkey(), "Reusing confirmed setup");
                (mint, false)
            }
            None if snapshot.needs_split() => {
                attempt.enter(AttemptStage::AwaitingSetupConfirmation);
                let mint = Arc::new(Keypair::new());
                let instructions = self.setup_instructions(&payer, &mint.pubkey()).await?;
                let transaction = self
                    .build_signed(&instructions, &payer, Some(mint.as_ref()))
                    .await?;
                let signature = self.connection.send_transaction(&transaction).await?;
                tracing::info!(
                    signature = %signature,
                    mint = %mint.pubkey(),
                    estimated_bytes = snapshot.size.bytes,
                    "Sent setup transaction"
                );
                attempt.setup = Some(SetupTransaction {
                    mint: mint.pubkey(),
                    signature,
                });

                match self.await_confirmation(&signature).await {
                    Confirmation::Confirmed => {
                        *self.confirmed_setup.lock().await = Some(mint.clone());
                    }
                    Confirmation::Failed(e) => {
                        return Ok(Outcome::recoverable(classify_transaction_error(&e)));
                    }
                    Confirmation::TimedOut => {
                        return Ok(Outcome::recoverable(FailureReason::Timeout));
                    }
                }
                (mint, false)
            }
            None => (Arc::new(Keypair::new()), true),
        };

        attempt.enter(AttemptStage::AwaitingMintConfirmation);
        let mint_address = mint.pubkey();

        let mut instructions = if includes_setup {
            self.setup_instructions(&payer, &mint_address).await?
        } else {
            Vec::new()
        };
        instructions.extend(mint_instructions(snapshot, &payer, &mint_address));

        let co_signer = includes_setup.then_some(mint.as_ref());
        let transaction = self.build_signed(&instructions, &payer, co_signer).await?;

        let signature = match gate {
            Some(gate) => gate.submit(transaction).await?,
            None => self.connection.send_transaction(&transaction).await?,
        };
        tracing::info!(
            signature = %signature,
            mint = %mint_address,
            via_gate = gate.is_some(),
            "Sent mint transaction"
        );
        attempt.mint = Some(MintTransaction {
            mint: mint_address,
            signature,
            includes_setup,
            via_gate: gate.is_some(),
        });

        match self.await_confirmation(&signature).await {
            Confirmation::Confirmed => {}
            Confirmation::Failed(e) => {
                return Ok(Outcome::recoverable(classify_transaction_error(&e)));
            }
            Confirmation::TimedOut => return Ok(Outcome::recoverable(FailureReason::Timeout)),
        }

        let metadata = metadata_address(&mint_address);
        let record = self
            .connection
            .get_account(&metadata, CommitmentConfig::processed())
            .await?;
        if record.is_none() {
            tracing::warn!(metadata = %metadata, "Mint confirmed without a metadata account");
            return Ok(Outcome::recoverable(FailureReason::RecordNotFound));
        }

        *self.confirmed_setup.lock().await = None;

        Ok(Outcome::Success {
            minted_asset: mint_address,
            signature,
            explorer_url: self.cluster.explorer_token_url(&mint_address),
        })
    }

    fn resolve_gate(
        &self,
        snapshot: &MachineSnapshot,
    ) -> Result<Option<&Arc<dyn AttestationGate>>, MintError> {
        let Some(rule) = &snapshot.state.gatekeeper_rule else {
            return Ok(None);
        };
        let gate = self.gate.as_ref().ok_or_else(|| MintError::GateRequired {
            network: rule.network.to_string(),
        })?;
        if gate.network() != rule.network {
            return Err(MintError::GateMismatch {
                expected: rule.network.to_string(),
                actual: gate.network().to_string(),
            });
        }
        Ok(Some(gate))
    }

    async fn setup_instructions(
        &self,
        payer: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Vec<Instruction>, MintError> {
        let rent = self
            .connection
            .get_minimum_balance_for_rent_exemption(NFT_MINT_SPACE)
            .await?;
        setup_instructions(payer, mint, rent)
    }

    async fn build_signed(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        co_signer: Option<&Keypair>,
    ) -> Result<Transaction, MintError> {
        let blockhash = self.connection.get_latest_blockhash().await?;
        let mut transaction = Transaction::new_with_payer(instructions, Some(payer));
        transaction.message.recent_blockhash = blockhash;
        if let Some(keypair) = co_signer {
            transaction
                .try_partial_sign(&[keypair], blockhash)
                .map_err(|e| MintError::Signer(e.to_string()))?;
        }
        self.signer.sign_transaction(transaction).await
    }

    /// Poll the signature until it reaches a terminal status or the
    /// timeout elapses. Poll errors are logged and polling continues.
    async fn await_confirmation(&self, signature: &Signature) -> Confirmation {
        let poll = async {
            loop {
                match self.connection.get_signature_status(signature).await {
                    Ok(SignatureState::Confirmed) => return Confirmation::Confirmed,
                    Ok(SignatureState::Failed(e)) => return Confirmation::Failed(e),
                    Ok(SignatureState::Pending) => {}
                    Err(e) => {
                        tracing::warn!(signature = %signature, error = %e, "Signature status poll failed");
                    }
                }
                sleep(self.poll_interval).await;
            }
        };

        match tokio::time::timeout(self.tx_timeout, poll).await {
            Ok(confirmation) => confirmation,
            Err(_) => {
                tracing::warn!(
                    signature = %signature,
                    timeout_ms = self.tx_timeout.as_millis() as u64,
                    "Confirmation timed out"
                );
                Confirmation::TimedOut
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
