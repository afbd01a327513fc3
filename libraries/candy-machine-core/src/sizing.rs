//! Linear byte-cost model for the mint transaction.
//!
//! A transaction carrying every optional feature does not fit in a single
//! packet, in which case account setup is sent as its own transaction first.

use crate::state::MachineState;

/// Per-transaction payload ceiling in bytes.
pub const TX_PAYLOAD_CEILING: u32 = 1230;

pub const BASE_COST: u32 = 892;
pub const COLLECTION_COST: u32 = 182;
pub const TOKEN_PAYMENT_COST: u32 = 66;
pub const DISCOUNT_RULE_COST: u32 = 34;
pub const BURN_PER_MINT_COST: u32 = 34;
pub const GATEKEEPER_COST: u32 = 33;
pub const GATE_EXPIRE_ON_USE_COST: u32 = 66;

/// Optional features that add accounts or instructions to the mint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizingFeatures {
    pub collection_retained: bool,
    pub token_payment: bool,
    pub discount_rule: bool,
    pub burn_per_mint: bool,
    pub attestation_gate: bool,
    pub gate_expire_on_use: bool,
}

impl SizingFeatures {
    pub fn from_state(state: &MachineState, collection_account_exists: bool) -> Self {
        Self {
            collection_retained: collection_account_exists && state.retain_authority,
            token_payment: !state.pays_with_native(),
            discount_rule: state.discount_rule.is_some(),
            burn_per_mint: state.burns_discount_token(),
            attestation_gate: state.gatekeeper_rule.is_some(),
            gate_expire_on_use: state
                .gatekeeper_rule
                .map(|g| g.expire_on_use)
                .unwrap_or(false),
        }
    }

    pub fn estimate(&self) -> SizeEstimate {
        let cost = |on: bool, bytes: u32| if on { bytes } else { 0 };
        let bytes = BASE_COST
            + cost(self.collection_retained, COLLECTION_COST)
            + cost(self.token_payment, TOKEN_PAYMENT_COST)
            + cost(self.discount_rule, DISCOUNT_RULE_COST)
            + cost(self.burn_per_mint, BURN_PER_MINT_COST)
            + cost(self.attestation_gate, GATEKEEPER_COST)
            + cost(self.gate_expire_on_use, GATE_EXPIRE_ON_USE_COST);
        SizeEstimate {
            bytes,
            ceiling: TX_PAYLOAD_CEILING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeEstimate {
    pub bytes: u32,
    pub ceiling: u32,
}

impl SizeEstimate {
    pub fn needs_split(&self) -> bool {
        self.bytes > self.ceiling
    }
}

/// Whether the mint must be preceded by a separate setup transaction.
pub fn needs_split(state: &MachineState, collection_account_exists: bool) -> bool {
    SizingFeatures::from_state(state, collection_account_exists)
        .estimate()
        .needs_split()
}
