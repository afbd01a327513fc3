//! Candy Mint Client
//!
//! Async client that reads a candy machine v2, decides whether and at what
//! price the connected wallet may mint, and drives the setup and mint
//! transactions to a classified outcome.
//!
//! # Features
//!
//! - **Chain Reader**: decodes the candy machine and collection PDA each refresh
//! - **Submission Engine**: optional setup transaction, confirmation polling, metadata check
//! - **Reconciler**: optimistic counters and balances until the next refresh
//! - **Rate Limiting / Retry**: token bucket in front of every RPC call, backoff on reads
//!
//! # Example
//!
//! ```ignore
//! use candy_mint_client::{KeypairSigner, MintClientConfig, MintSession};
//! use solana_sdk::commitment_config::CommitmentConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MintClientConfig::from_env()?;
//!     let signer = Arc::new(KeypairSigner::from_file("~/.config/solana/id.json")?);
//!     let session = MintSession::connect(config, signer, None);
//!
//!     let view = session.refresh(CommitmentConfig::confirmed()).await?;
//!     if view.eligibility.active {
//!         let report = session.mint().await?;
//!         println!("{}", report.outcome.user_message());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod errors;
pub mod gate;
pub mod instructions;
pub mod outcome;
pub mod reader;
pub mod reconciler;
pub mod rpc;
pub mod session;
pub mod signer;
pub mod types;

pub use config::{
    Cluster, ConfigError, MintClientConfig, MintClientConfigBuilder, RateLimitConfig, RetryConfig,
};
pub use engine::{AttemptReport, AttemptStage, MintEngine, MintTransaction, SetupTransaction};
pub use errors::{ErrorCategory, MintError, MintResult};
pub use gate::AttestationGate;
pub use outcome::{FailureReason, Outcome};
pub use reader::ChainReader;
pub use rpc::{ChainConnection, RpcConnection, SignatureState};
pub use session::{MintSession, RefreshHandle, SessionEvent};
pub use signer::{KeypairSigner, TransactionSigner};
pub use types::{CollectionInfo, MachineSnapshot, SessionView, WalletContext};

pub use candy_machine_core::{MachineState, MintEligibility, PricingConfig};
