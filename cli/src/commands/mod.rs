pub mod mint;
pub mod state;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use candy_mint_client::{
    KeypairSigner, MintClientConfig, MintClientConfigBuilder, MintSession, SessionView,
};

/// Flags shared by every command. Each one overrides its environment variable.
pub struct GlobalArgs {
    pub rpc_url: Option<String>,
    pub candy_machine_id: Option<String>,
    pub cluster: Option<String>,
    pub keypair: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
}

impl GlobalArgs {
    pub fn config(&self) -> Result<MintClientConfig> {
        let mut builder = MintClientConfigBuilder::from_env()?;
        if let Some(url) = &self.rpc_url {
            builder = builder.rpc_url(url.clone());
        }
        if let Some(id) = &self.candy_machine_id {
            builder = builder.candy_machine_id(id.clone());
        }
        if let Some(cluster) = &self.cluster {
            builder = builder.cluster(cluster.clone());
        }
        if let Some(timeout) = self.timeout_ms {
            builder = builder.tx_timeout_ms(timeout);
        }
        Ok(builder.build()?)
    }

    pub fn session(&self) -> Result<MintSession> {
        let config = self.config()?;
        let signer = Arc::new(load_signer(self.keypair.clone())?);
        Ok(MintSession::connect(config, signer, None))
    }
}

fn load_signer(keypair_path: Option<PathBuf>) -> Result<KeypairSigner> {
    let path = match keypair_path {
        Some(path) => PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref()),
        None => dirs::home_dir()
            .map(|h| h.join(".config/solana/id.json"))
            .context("Could not determine home directory")?,
    };
    KeypairSigner::from_file(&path).map_err(|e| {
        anyhow!(
            "Failed to read keypair from {:?}. Use --keypair to specify a path: {}",
            path,
            e
        )
    })
}

pub fn print_view(view: &SessionView) {
    let e = &view.eligibility;
    println!("Candy machine: {}", view.snapshot.state.address);
    println!("  Wallet:          {}", view.wallet.address);
    println!(
        "  Items:           {} remaining of {} ({} redeemed)",
        e.items_remaining, e.items_available, e.items_redeemed
    );
    println!("  Price:           {} {}", e.effective_unit_price, e.currency_label);
    if e.discounted_price != e.base_price {
        println!(
            "  Base / discount: {} / {} {}",
            e.base_price, e.discounted_price, e.currency_label
        );
    }
    match e.start_timestamp {
        Some(ts) => println!("  Go-live:         {} (started: {})", ts, e.started),
        None => println!("  Go-live:         not set"),
    }
    if let Some(ts) = e.end_timestamp {
        println!("  Ends at:         {}", ts);
    }
    if e.is_presale_only || e.is_whitelist_only {
        println!(
            "  Whitelist:       {} token(s) held{}{}",
            view.wallet.discount_token_balance,
            if e.is_presale_only { ", presale" } else { ", whitelist only" },
            if e.burns_discount_token { ", burned per mint" } else { "" }
        );
    }
    if e.requires_gate {
        println!("  Gate:            attestation required");
    }
    println!("  Native balance:  {} lamports", view.wallet.native_balance);
    println!(
        "  Transactions:    {} (estimated {} bytes)",
        if view.snapshot.needs_split() { "setup + mint" } else { "single" },
        view.snapshot.size.bytes
    );
    let status = if e.sold_out {
        "SOLD OUT"
    } else if e.ended {
        "ENDED"
    } else if e.active {
        "ACTIVE"
    } else {
        "NOT ELIGIBLE"
    };
    println!("  Status:          {}", status);
}
