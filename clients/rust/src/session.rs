//! `MintSession`: the orchestration the UI collaborator drives.
//!
//! A session owns the latest [`SessionView`], refreshes it on demand or on
//! a timer, and runs mint attempts one at a time. Refreshes keep running
//! while a mint is in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use candy_machine_core::EligibilityEvaluator;
use solana_sdk::commitment_config::CommitmentConfig;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::time::interval;

use crate::config::MintClientConfig;
use crate::engine::{AttemptReport, AttemptStage, MintEngine};
use crate::errors::{ErrorCategory, MintError};
use crate::gate::AttestationGate;
use crate::reader::ChainReader;
use crate::reconciler::{follow_up_commitment, reconcile};
use crate::rpc::{ChainConnection, RpcConnection};
use crate::signer::TransactionSigner;
use crate::types::SessionView;

const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Events emitted to subscribers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Refreshed(Box<SessionView>),
    RefreshFailed {
        category: ErrorCategory,
        message: String,
    },
    MintStage(AttemptStage),
    MintFinished(Box<AttemptReport>),
}

pub struct MintSession {
    config: MintClientConfig,
    reader: ChainReader,
    evaluator: EligibilityEvaluator,
    engine: MintEngine,
    view: RwLock<Option<CachedView>>,
    minting: AtomicBool,
    subscribers: std::sync::Mutex<Vec<mpsc::Sender<SessionEvent>>>,
}

/// Latest view tagged with the refresh that produced it.
struct CachedView {
    generation: u64,
    view: SessionView,
}

/// Clears the in-flight flag however the attempt ends.
struct MintingGuard<'a>(&'a AtomicBool);

impl Drop for MintingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MintSession {
    pub fn new(
        config: MintClientConfig,
        connection: Arc<dyn ChainConnection>,
        signer: Arc<dyn TransactionSigner>,
        gate: Option<Arc<dyn AttestationGate>>,
    ) -> Self {
        let reader = ChainReader::new(connection.clone(), config.candy_machine_id);
        let evaluator = EligibilityEvaluator::new(config.pricing.clone());
        let engine = MintEngine::new(&config, connection, signer, gate);
        Self {
            config,
            reader,
            evaluator,
            engine,
            view: RwLock::new(None),
            minting: AtomicBool::new(false),
            subscribers: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Session over the configured RPC endpoint.
    pub fn connect(
        config: MintClientConfig,
        signer: Arc<dyn TransactionSigner>,
        gate: Option<Arc<dyn AttestationGate>>,
    ) -> Self {
        let connection: Arc<dyn ChainConnection> = Arc::new(RpcConnection::new(&config));
        Self::new(config, connection, signer, gate)
    }

    pub fn config(&self) -> &MintClientConfig {
        &self.config
    }

    /// Latest view, if a refresh has succeeded.
    pub async fn view(&self) -> Option<SessionView> {
        self.view.read().await.as_ref().map(|cached| cached.view.clone())
    }

    pub fn is_minting(&self) -> bool {
        self.minting.load(Ordering::Acquire)
    }

    /// Subscribe to session events. Every subscriber receives every event.
    pub fn subscribe(&self) -> mpsc::Receiver<SessionEvent> {
        let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(sender);
        }
        receiver
    }

    fn emit(&self, event: SessionEvent) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return;
        };
        subscribers.retain(|sender| match sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!("Session subscriber lagging, dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Re-read the candy machine and wallet and recompute eligibility.
    pub async fn refresh(&self, commitment: CommitmentConfig) -> Result<SessionView, MintError> {
        match self.load(commitment).await {
            Ok(view) => {
                {
                    let mut cached = self.view.write().await;
                    let generation = cached.as_ref().map_or(0, |c| c.generation + 1);
                    *cached = Some(CachedView {
                        generation,
                        view: view.clone(),
                    });
                }
                tracing::info!(
                    active = view.eligibility.active,
                    items_remaining = view.eligibility.items_remaining,
                    price = view.eligibility.effective_unit_price,
                    currency = %view.eligibility.currency_label,
                    "Refreshed candy machine state"
                );
                self.emit(SessionEvent::Refreshed(Box::new(view.clone())));
                Ok(view)
            }
            Err(e) => {
                tracing::warn!(error = %e, category = %e.category(), "Refresh failed");
                self.emit(SessionEvent::RefreshFailed {
                    category: e.category(),
                    message: e.user_message(),
                });
                Err(e)
            }
        }
    }

    async fn load(&self, commitment: CommitmentConfig) -> Result<SessionView, MintError> {
        let snapshot = self.reader.fetch_state(commitment).await?;
        let wallet = self
            .reader
            .fetch_wallet(&self.engine.wallet(), &snapshot.state, commitment)
            .await?;
        let eligibility =
            self.evaluator
                .evaluate(&snapshot.state, wallet.discount_token_balance, unix_now());
        Ok(SessionView {
            snapshot,
            wallet,
            eligibility,
        })
    }

    /// Run one mint attempt against the latest snapshot.
    ///
    /// Rejected with `MintInProgress` while another attempt is running and
    /// with `NotLoaded` before the first successful refresh. The attempt's
    /// own failures are reported in the returned report, not as `Err`.
    pub async fn mint(&self) -> Result<AttemptReport, MintError> {
        if self
            .minting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(MintError::MintInProgress);
        }
        let _guard = MintingGuard(&self.minting);

        let (generation, snapshot) = self
            .view
            .read()
            .await
            .as_ref()
            .map(|cached| (cached.generation, cached.view.snapshot.clone()))
            .ok_or(MintError::NotLoaded)?;

        let report = self
            .engine
            .mint_with(&snapshot, &|stage| self.emit(SessionEvent::MintStage(stage)))
            .await;

        // A refresh that landed during the attempt already reflects the
        // chain; only the read the attempt started from gets the estimate.
        let commitment = {
            let mut cached = self.view.write().await;
            match cached.as_mut() {
                Some(cached) if cached.generation == generation => {
                    reconcile(&mut cached.view, &report.outcome)
                }
                Some(cached) => {
                    tracing::debug!(
                        started_from = generation,
                        current = cached.generation,
                        "View refreshed during mint, skipping local estimate"
                    );
                    follow_up_commitment(&report.outcome)
                }
                None => self.config.commitment,
            }
        };
        self.emit(SessionEvent::MintFinished(Box::new(report.clone())));

        if let Err(e) = self.refresh(commitment).await {
            tracing::warn!(error = %e, "Post-mint refresh failed; showing local estimate");
        }

        Ok(report)
    }

    /// Refresh on the configured interval until the handle is stopped.
    pub fn start_auto_refresh(self: &Arc<Self>) -> RefreshHandle {
        let (stop_sender, mut stop_receiver) = oneshot::channel();
        let session = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(session.config.refresh_interval);
            loop {
                tokio::select! {
                    _ = &mut stop_receiver => break,
                    _ = ticker.tick() => {
                        // Failures are already logged and emitted.
                        let _ = session.refresh(session.config.commitment).await;
                    }
                }
            }
        });

        RefreshHandle {
            stop_sender: Some(stop_sender),
            handle: Some(handle),
        }
    }
}

/// Handle to the background refresh loop.
pub struct RefreshHandle {
    stop_sender: Option<oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl RefreshHandle {
    pub fn stop(&mut self) {
        if let Some(sender) = self.stop_sender.take() {
            let _ = sender.send(());
        }
    }

    /// Stop the loop and wait for it to exit.
    pub async fn join(&mut self) -> Result<(), tokio::task::JoinError> {
        self.stop();
        match self.handle.take() {
            Some(handle) => handle.await,
            None => Ok(()),
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
