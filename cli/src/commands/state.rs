use anyhow::Result;
use clap::Args;
use solana_sdk::commitment_config::CommitmentConfig;

use super::{print_view, GlobalArgs};

#[derive(Args)]
pub struct StateArgs {
    /// Read at processed commitment instead of confirmed
    #[arg(long)]
    processed: bool,
}

pub async fn execute(global: GlobalArgs, args: StateArgs) -> Result<()> {
    let session = global.session()?;
    let commitment = if args.processed {
        CommitmentConfig::processed()
    } else {
        CommitmentConfig::confirmed()
    };

    let view = session
        .refresh(commitment)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    print_view(&view);
    Ok(())
}
