use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{mint::MintArgs, state::StateArgs, watch::WatchArgs};

#[derive(Parser)]
#[command(name = "candy-mint-cli")]
#[command(about = "Inspect a candy machine v2 and mint from it", long_about = None)]
#[command(version)]
struct Cli {
    /// Solana RPC URL (overrides SOLANA_RPC_HOST)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Candy machine address (overrides CANDY_MACHINE_ID)
    #[arg(long, short = 'c', global = true)]
    candy_machine_id: Option<String>,

    /// Cluster: mainnet-beta, devnet, testnet or localnet (overrides SOLANA_NETWORK)
    #[arg(long, global = true)]
    cluster: Option<String>,

    /// Path to wallet keypair file
    #[arg(long, short = 'k', global = true)]
    keypair: Option<PathBuf>,

    /// Confirmation timeout in milliseconds (overrides CONNECTION_TIMEOUT_MS)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the candy machine and print eligibility and price for the wallet
    State(StateArgs),

    /// Mint one item
    Mint(MintArgs),

    /// Refresh on an interval and print every session event
    Watch(WatchArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let global = commands::GlobalArgs {
        rpc_url: cli.rpc_url,
        candy_machine_id: cli.candy_machine_id,
        cluster: cli.cluster,
        keypair: cli.keypair,
        timeout_ms: cli.timeout_ms,
    };

    match cli.command {
        Commands::State(args) => commands::state::execute(global, args).await,
        Commands::Mint(args) => commands::mint::execute(global, args).await,
        Commands::Watch(args) => commands::watch::execute(global, args).await,
    }
}
