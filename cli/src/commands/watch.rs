use std::sync::Arc;

use anyhow::Result;
use candy_mint_client::SessionEvent;
use clap::Args;

use super::GlobalArgs;

#[derive(Args)]
pub struct WatchArgs {
    /// Stop after this many refreshes (runs until Ctrl-C when unset)
    #[arg(long)]
    count: Option<usize>,
}

pub async fn execute(global: GlobalArgs, args: WatchArgs) -> Result<()> {
    let session = Arc::new(global.session()?);
    let mut events = session.subscribe();
    let mut handle = session.start_auto_refresh();
    let mut refreshes = 0usize;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    SessionEvent::Refreshed(view) => {
                        let e = &view.eligibility;
                        println!(
                            "{} remaining, {} {}, active: {}",
                            e.items_remaining, e.effective_unit_price, e.currency_label, e.active
                        );
                        refreshes += 1;
                        if args.count.is_some_and(|count| refreshes >= count) {
                            break;
                        }
                    }
                    SessionEvent::RefreshFailed { category, message } => {
                        println!("refresh failed ({}): {}", category, message);
                    }
                    SessionEvent::MintStage(stage) => println!("mint stage: {:?}", stage),
                    SessionEvent::MintFinished(report) => {
                        println!("mint finished: {}", report.outcome.user_message());
                    }
                }
            }
        }
    }

    handle.stop();
    handle.join().await?;
    Ok(())
}
