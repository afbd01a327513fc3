use anyhow::{bail, Result};
use candy_mint_client::Outcome;
use clap::Args;

use super::{print_view, GlobalArgs};

#[derive(Args)]
pub struct MintArgs {
    /// Submit even when the wallet does not look eligible
    #[arg(long)]
    force: bool,
}

pub async fn execute(global: GlobalArgs, args: MintArgs) -> Result<()> {
    let session = global.session()?;
    let commitment = session.config().commitment;

    let view = session
        .refresh(commitment)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    print_view(&view);

    if !view.eligibility.active && !args.force {
        bail!("Wallet is not eligible to mint right now (use --force to submit anyway)");
    }

    println!("\nMinting from {}...", view.snapshot.state.address);
    let report = session.mint().await?;
    if let Some(setup) = &report.setup {
        println!("  Setup transaction: {}", setup.signature);
    }
    if let Some(mint) = &report.mint {
        println!("  Mint transaction:  {}", mint.signature);
    }

    println!("\n{}", report.outcome.user_message());
    match &report.outcome {
        Outcome::Success { explorer_url, .. } => {
            println!("  {}", explorer_url);
            if let Some(view) = session.view().await {
                println!();
                print_view(&view);
            }
            Ok(())
        }
        Outcome::RecoverableFailure { reason } => bail!("Mint failed: {:?}", reason),
        Outcome::FatalFailure { diagnostic } => bail!("Mint failed: {}", diagnostic),
    }
}
