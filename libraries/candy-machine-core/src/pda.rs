//! Program-derived addresses used by the mint flow.

use sha2::{Digest, Sha256};
use solana_program::pubkey::Pubkey;

use crate::constants::{CANDY_MACHINE_PROGRAM_ID, GATEWAY_PROGRAM_ID};

/// Anchor account discriminator: `sha256("account:<Name>")[..8]`.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    anchor_hash("account", name)
}

/// Anchor instruction discriminator: `sha256("global:<name>")[..8]`.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    anchor_hash("global", name)
}

fn anchor_hash(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{}:{}", namespace, name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

pub fn collection_pda(candy_machine: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[b"collection", candy_machine.as_ref()],
        &CANDY_MACHINE_PROGRAM_ID,
    )
}

pub fn candy_machine_creator(candy_machine: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[b"candy_machine", candy_machine.as_ref()],
        &CANDY_MACHINE_PROGRAM_ID,
    )
}

/// Gateway token a wallet holds for a gatekeeper network (seed index 0).
pub fn gateway_token(wallet: &Pubkey, gatekeeper_network: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[
            wallet.as_ref(),
            b"gateway",
            &[0u8; 8],
            gatekeeper_network.as_ref(),
        ],
        &GATEWAY_PROGRAM_ID,
    )
    .0
}

pub fn network_expire_feature(gatekeeper_network: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[gatekeeper_network.as_ref(), b"expire"],
        &GATEWAY_PROGRAM_ID,
    )
    .0
}
