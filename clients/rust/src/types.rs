//! Snapshot types shared between the reader, engine and session.

use candy_machine_core::{MachineState, MintEligibility, SizeEstimate};
use solana_sdk::pubkey::Pubkey;

/// Collection attached to the candy machine through its collection PDA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionInfo {
    pub pda: Pubkey,
    pub mint: Pubkey,
}

/// One read of the candy machine and its collection PDA.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineSnapshot {
    pub state: MachineState,
    /// Present when the collection PDA account exists.
    pub collection: Option<CollectionInfo>,
    pub size: SizeEstimate,
}

impl MachineSnapshot {
    pub fn needs_split(&self) -> bool {
        self.size.needs_split()
    }
}

/// Wallet balances as last read (or optimistically adjusted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletContext {
    pub address: Pubkey,
    /// Lamports.
    pub native_balance: u64,
    pub discount_token_balance: u64,
}

/// Everything the UI renders after a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub snapshot: MachineSnapshot,
    pub wallet: WalletContext,
    pub eligibility: MintEligibility,
}
