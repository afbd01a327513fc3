//! Configuration types for the mint client.
//!
//! Everything the session needs is passed in explicitly through
//! [`MintClientConfig`] and validated once by the builder.

use std::str::FromStr;
use std::time::Duration;

use candy_machine_core::PricingConfig;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};

pub const ENV_CANDY_MACHINE_ID: &str = "CANDY_MACHINE_ID";
pub const ENV_RPC_HOST: &str = "SOLANA_RPC_HOST";
pub const ENV_NETWORK: &str = "SOLANA_NETWORK";
pub const ENV_TIMEOUT_MS: &str = "CONNECTION_TIMEOUT_MS";
pub const ENV_PAYMENT_DECIMALS: &str = "SPL_TOKEN_TO_MINT_DECIMALS";
pub const ENV_PAYMENT_LABEL: &str = "SPL_TOKEN_TO_MINT_NAME";

const MAX_PAYMENT_DECIMALS: u8 = 19;

/// Cluster the candy machine lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cluster {
    MainnetBeta,
    #[default]
    Devnet,
    Testnet,
    Localnet,
}

impl Cluster {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::MainnetBeta => "mainnet-beta",
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::Localnet => "localnet",
        }
    }

    /// Solscan page for a minted token.
    pub fn explorer_token_url(&self, mint: &Pubkey) -> String {
        match self {
            Cluster::Devnet | Cluster::Testnet => {
                format!("https://solscan.io/token/{}?cluster={}", mint, self.as_str())
            }
            _ => format!("https://solscan.io/token/{}", mint),
        }
    }
}

impl FromStr for Cluster {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet-beta" => Ok(Cluster::MainnetBeta),
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "localnet" => Ok(Cluster::Localnet),
            other => Err(ConfigError::InvalidCluster(other.to_string())),
        }
    }
}

impl std::fmt::Display for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate limiting configuration for RPC requests.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per second
    pub max_rps: u32,
    /// Burst capacity for token bucket
    pub burst_size: u32,
    /// Whether to queue requests when rate limited
    pub queue_on_limit: bool,
    /// Maximum queue depth before rejecting
    pub max_queue_depth: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_rps: 10,
            burst_size: 20,
            queue_on_limit: true,
            max_queue_depth: 100,
        }
    }
}

/// Retry configuration for idempotent reads.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Main configuration for a mint session.
#[derive(Debug, Clone)]
pub struct MintClientConfig {
    /// Candy machine account address
    pub candy_machine_id: Pubkey,
    /// Solana RPC URL
    pub rpc_url: String,
    /// Cluster label, used for explorer links
    pub cluster: Cluster,
    /// How long to wait for a submitted transaction to confirm
    pub tx_timeout: Duration,
    /// Interval between signature status polls
    pub poll_interval: Duration,
    /// Commitment used for refreshes unless a caller asks otherwise
    pub commitment: CommitmentConfig,
    /// Interval of the background refresh loop
    pub refresh_interval: Duration,
    /// Decimals and label of the payment asset
    pub pricing: PricingConfig,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl MintClientConfig {
    pub fn builder() -> MintClientConfigBuilder {
        MintClientConfigBuilder::new()
    }

    /// Build a configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        MintClientConfigBuilder::from_env()?.build()
    }
}

/// Builder for MintClientConfig.
#[derive(Default)]
pub struct MintClientConfigBuilder {
    candy_machine_id: Option<String>,
    rpc_url: Option<String>,
    cluster: Option<String>,
    tx_timeout_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    commitment: Option<CommitmentConfig>,
    refresh_interval_ms: Option<u64>,
    payment_decimals: Option<u8>,
    payment_label: Option<String>,
    rate_limit: Option<RateLimitConfig>,
    retry: Option<RetryConfig>,
}

impl MintClientConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder prefilled from environment variables.
    ///
    /// Unset variables are left for the defaults; values that are set but
    /// unparseable are rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Self::new();
        builder.candy_machine_id = lookup(ENV_CANDY_MACHINE_ID);
        builder.rpc_url = lookup(ENV_RPC_HOST);
        builder.cluster = lookup(ENV_NETWORK);
        builder.payment_label = lookup(ENV_PAYMENT_LABEL);
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            builder.tx_timeout_ms = Some(parse_env(ENV_TIMEOUT_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_PAYMENT_DECIMALS) {
            builder.payment_decimals = Some(parse_env(ENV_PAYMENT_DECIMALS, &raw)?);
        }
        Ok(builder)
    }

    /// Set the candy machine address (base-58).
    pub fn candy_machine_id(mut self, id: impl Into<String>) -> Self {
        self.candy_machine_id = Some(id.into());
        self
    }

    /// Set the RPC URL.
    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    /// Set the cluster label.
    pub fn cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    /// Set the transaction confirmation timeout in milliseconds.
    pub fn tx_timeout_ms(mut self, timeout: u64) -> Self {
        self.tx_timeout_ms = Some(timeout);
        self
    }

    /// Set the signature status poll interval in milliseconds.
    pub fn poll_interval_ms(mut self, interval: u64) -> Self {
        self.poll_interval_ms = Some(interval);
        self
    }

    pub fn commitment(mut self, commitment: CommitmentConfig) -> Self {
        self.commitment = Some(commitment);
        self
    }

    /// Set the background refresh interval in milliseconds.
    pub fn refresh_interval_ms(mut self, interval: u64) -> Self {
        self.refresh_interval_ms = Some(interval);
        self
    }

    /// Set the payment token decimals.
    pub fn payment_decimals(mut self, decimals: u8) -> Self {
        self.payment_decimals = Some(decimals);
        self
    }

    /// Set the payment token display label.
    pub fn payment_label(mut self, label: impl Into<String>) -> Self {
        self.payment_label = Some(label.into());
        self
    }

    /// Set the rate limiting configuration.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Set the retry configuration.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<MintClientConfig, ConfigError> {
        let raw_id = self
            .candy_machine_id
            .ok_or(ConfigError::MissingField("candy_machine_id"))?;
        let candy_machine_id = Pubkey::from_str(raw_id.trim())
            .map_err(|_| ConfigError::InvalidProgramAddress(raw_id.clone()))?;
        if candy_machine_id == Pubkey::default() {
            return Err(ConfigError::InvalidProgramAddress(raw_id));
        }

        let rpc_url = self.rpc_url.ok_or(ConfigError::MissingField("rpc_url"))?;
        if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
            return Err(ConfigError::InvalidRpcUrl(rpc_url));
        }

        let cluster = match self.cluster {
            Some(label) => label.parse()?,
            None => Cluster::default(),
        };

        let tx_timeout_ms = self.tx_timeout_ms.unwrap_or(60_000);
        if tx_timeout_ms == 0 {
            return Err(ConfigError::Invalid("transaction timeout must be > 0".to_string()));
        }
        let poll_interval_ms = self.poll_interval_ms.unwrap_or(500);
        if poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll interval must be > 0".to_string()));
        }
        let refresh_interval_ms = self.refresh_interval_ms.unwrap_or(30_000);
        if refresh_interval_ms == 0 {
            return Err(ConfigError::Invalid("refresh interval must be > 0".to_string()));
        }

        let payment_decimals = self.payment_decimals.unwrap_or(9);
        if payment_decimals > MAX_PAYMENT_DECIMALS {
            return Err(ConfigError::Invalid(format!(
                "payment decimals {} exceeds {}",
                payment_decimals, MAX_PAYMENT_DECIMALS
            )));
        }
        let payment_label = self.payment_label.unwrap_or_else(|| "TOKEN".to_string());
        if payment_label.trim().is_empty() {
            return Err(ConfigError::Invalid("payment label is empty".to_string()));
        }

        Ok(MintClientConfig {
            candy_machine_id,
            rpc_url,
            cluster,
            tx_timeout: Duration::from_millis(tx_timeout_ms),
            poll_interval: Duration::from_millis(poll_interval_ms),
            commitment: self.commitment.unwrap_or_else(CommitmentConfig::confirmed),
            refresh_interval: Duration::from_millis(refresh_interval_ms),
            pricing: PricingConfig {
                payment_decimals,
                payment_label,
            },
            rate_limit: self.rate_limit.unwrap_or_default(),
            retry: self.retry.unwrap_or_default(),
        })
    }
}

fn parse_env<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv {
            key,
            value: raw.to_string(),
        })
}

/// Error type for configuration issues.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Candy machine ID {0:?} is not a plain base-58 address")]
    InvalidProgramAddress(String),

    #[error("RPC URL {0:?} must start with http:// or https://")]
    InvalidRpcUrl(String),

    #[error("Unknown cluster {0:?}, expected mainnet-beta, devnet, testnet or localnet")]
    InvalidCluster(String),

    #[error("Environment variable {key} has invalid value {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),
}
