//! Local State Reconciler.
//!
//! Applies a finished attempt to the cached view so the UI reflects it
//! before the next chain read. The adjusted values are estimates; the
//! refresh that always follows replaces them.

use candy_machine_core::constants::MINT_FEE_ESTIMATE_LAMPORTS;
use solana_sdk::commitment_config::CommitmentConfig;

use crate::outcome::Outcome;
use crate::types::SessionView;

/// Apply `outcome` to `view` and return the commitment the follow-up
/// refresh should read at.
pub fn reconcile(view: &mut SessionView, outcome: &Outcome) -> CommitmentConfig {
    if outcome.is_success() {
        apply_success(view, 1);
    }
    follow_up_commitment(outcome)
}

/// Commitment for the refresh that follows an attempt: `processed` after a
/// success so the new mint is visible, `confirmed` otherwise.
pub fn follow_up_commitment(outcome: &Outcome) -> CommitmentConfig {
    if outcome.is_success() {
        CommitmentConfig::processed()
    } else {
        CommitmentConfig::confirmed()
    }
}

/// Optimistic update after `quantity` items were minted.
pub fn apply_success(view: &mut SessionView, quantity: u64) {
    let eligibility = &mut view.eligibility;
    let wallet = &mut view.wallet;
    let state = &mut view.snapshot.state;

    // Price actually paid, before any repricing below.
    let paid_per_item = eligibility.effective_unit_price_raw;

    eligibility.items_remaining = eligibility.items_remaining.saturating_sub(quantity);
    eligibility.items_redeemed = eligibility.items_redeemed.saturating_add(quantity);
    state.items_remaining = state.items_remaining.saturating_sub(quantity);
    state.items_redeemed = state.items_redeemed.saturating_add(quantity);

    if eligibility.burns_discount_token && wallet.discount_token_balance > 0 {
        wallet.discount_token_balance = wallet.discount_token_balance.saturating_sub(quantity);
        eligibility.reprice(wallet.discount_token_balance);
    }

    if eligibility.items_remaining == 0 {
        state.sold_out = true;
        eligibility.mark_sold_out(wallet.discount_token_balance);
    }

    if eligibility.pays_with_native && wallet.native_balance > 0 {
        let debit = paid_per_item
            .saturating_mul(quantity)
            .saturating_add(MINT_FEE_ESTIMATE_LAMPORTS);
        wallet.native_balance = wallet.native_balance.saturating_sub(debit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::FailureReason;
    use crate::types::{MachineSnapshot, WalletContext};
    use candy_machine_core::{
        ConsumptionMode, DiscountApplicability, DiscountRule, EligibilityEvaluator, EndRule,
        MachineState, PaymentAsset, PricingConfig, SizingFeatures,
    };
    use solana_sdk::{pubkey::Pubkey, signature::Signature};

    const NOW: i64 = 1_700_000_000;

    fn machine(available: u64, redeemed: u64) -> MachineState {
        MachineState {
            address: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            treasury: Pubkey::new_unique(),
            items_available: available,
            items_redeemed: redeemed,
            items_remaining: available.saturating_sub(redeemed),
            unit_price: 1_000_000_000,
            payment_asset: PaymentAsset::Native,
            discount_rule: None,
            end_rule: None,
            start_timestamp: Some(NOW - 60),
            gatekeeper_rule: None,
            retain_authority: true,
            sold_out: redeemed >= available,
        }
    }

    fn view(state: MachineState, native_balance: u64, token_balance: u64) -> SessionView {
        let eligibility = EligibilityEvaluator::new(PricingConfig::default()).evaluate(
            &state,
            token_balance,
            NOW,
        );
        let size = SizingFeatures::from_state(&state, false).estimate();
        SessionView {
            snapshot: MachineSnapshot {
                state,
                collection: None,
                size,
            },
            wallet: WalletContext {
                address: Pubkey::new_unique(),
                native_balance,
                discount_token_balance: token_balance,
            },
            eligibility,
        }
    }

    fn success() -> Outcome {
        Outcome::Success {
            minted_asset: Pubkey::new_unique(),
            signature: Signature::default(),
            explorer_url: String::new(),
        }
    }

    #[test]
    fn test_burning_last_token_revokes_presale_access() {
        let mut state = machine(100, 10);
        state.start_timestamp = Some(NOW + 3600);
        state.discount_rule = Some(DiscountRule {
            mint: Pubkey::new_unique(),
            discount_price: Some(500_000_000),
            applicability: DiscountApplicability::PresaleOnly,
            consumption: ConsumptionMode::BurnPerMint,
        });
        let mut view = view(state, 0, 1);
        assert!(view.eligibility.active);

        let commitment = reconcile(&mut view, &success());

        assert_eq!(commitment, CommitmentConfig::processed());
        assert_eq!(view.wallet.discount_token_balance, 0);
        assert!(!view.eligibility.active);
        assert_eq!(view.eligibility.items_remaining, 89);
        assert_eq!(view.eligibility.items_redeemed, 11);
        assert_eq!(view.snapshot.state.items_remaining, 89);
    }

    #[test]
    fn test_last_item_sells_out() {
        let mut state = machine(3333, 3332);
        state.end_rule = Some(EndRule::ByAmount(3333));
        let mut view = view(state, 5_000_000_000, 0);
        assert_eq!(view.eligibility.items_remaining, 1);
        assert!(view.eligibility.active);

        reconcile(&mut view, &success());

        assert_eq!(view.eligibility.items_remaining, 0);
        assert!(view.eligibility.sold_out);
        assert!(!view.eligibility.active);
        assert!(view.snapshot.state.sold_out);
    }

    #[test]
    fn test_native_balance_is_debited_with_fee() {
        let mut view = view(machine(10, 0), 5_000_000_000, 0);
        reconcile(&mut view, &success());
        assert_eq!(
            view.wallet.native_balance,
            5_000_000_000 - 1_000_000_000 - MINT_FEE_ESTIMATE_LAMPORTS
        );
    }

    #[test]
    fn test_token_payment_leaves_native_balance() {
        let mut state = machine(10, 0);
        state.payment_asset = PaymentAsset::Token {
            mint: Pubkey::new_unique(),
        };
        let mut view = view(state, 5_000_000_000, 0);
        reconcile(&mut view, &success());
        assert_eq!(view.wallet.native_balance, 5_000_000_000);
    }

    #[test]
    fn test_follow_up_commitment_without_applying() {
        let failed = Outcome::recoverable(FailureReason::Timeout);
        assert_eq!(follow_up_commitment(&success()), CommitmentConfig::processed());
        assert_eq!(follow_up_commitment(&failed), CommitmentConfig::confirmed());
    }

    #[test]
    fn test_failure_changes_nothing() {
        let mut view = view(machine(10, 3), 5_000_000_000, 0);
        let before = view.clone();
        let commitment = reconcile(
            &mut view,
            &Outcome::recoverable(FailureReason::Timeout),
        );
        assert_eq!(commitment, CommitmentConfig::confirmed());
        assert_eq!(view, before);
    }
}
