//! Eligibility and pricing.
//!
//! `EligibilityEvaluator::evaluate` is pure: identical `(state, balance, now)`
//! inputs always yield an identical `MintEligibility`.

use crate::constants::{LAMPORTS_PER_SOL, NATIVE_CURRENCY_LABEL};
use crate::state::{DiscountApplicability, EndRule, MachineState, PaymentAsset};

/// Display settings for the payment asset, supplied by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingConfig {
    /// Decimal precision of the SPL payment token (ignored for SOL).
    pub payment_decimals: u8,
    /// Label shown for the SPL payment token.
    pub payment_label: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            payment_decimals: 9,
            payment_label: "TOKEN".to_string(),
        }
    }
}

/// Derived verdict for one snapshot. Recomputed on every refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct MintEligibility {
    pub active: bool,
    pub ended: bool,
    pub sold_out: bool,
    /// Go-live date reached.
    pub started: bool,
    pub requires_gate: bool,
    pub is_presale_only: bool,
    /// Whitelist gates access at the public price (no discount configured).
    pub is_whitelist_only: bool,
    pub burns_discount_token: bool,
    pub pays_with_native: bool,
    /// Available supply after applying an amount-based end rule.
    pub items_available: u64,
    pub items_redeemed: u64,
    pub items_remaining: u64,
    pub base_price: f64,
    pub discounted_price: f64,
    pub effective_unit_price: f64,
    /// `effective_unit_price` in minor units.
    pub effective_unit_price_raw: u64,
    pub currency_label: String,
    pub start_timestamp: Option<i64>,
    pub end_timestamp: Option<i64>,
    has_discount_rule: bool,
    base_price_raw: u64,
    discounted_price_raw: u64,
    divider: u64,
}

impl MintEligibility {
    /// Access rule: may a wallet holding `discount_token_balance` mint now?
    pub fn access_permitted(&self, discount_token_balance: u64) -> bool {
        if self.ended || self.sold_out {
            return false;
        }
        let holds_token = discount_token_balance > 0;
        if self.is_presale_only {
            holds_token
        } else if self.is_whitelist_only {
            self.started && holds_token
        } else {
            self.started
        }
    }

    /// Recompute `active` and the effective price for a new token balance.
    pub fn reprice(&mut self, discount_token_balance: u64) {
        self.active = self.access_permitted(discount_token_balance);
        let discounted =
            self.active && self.has_discount_rule && discount_token_balance > 0;
        self.effective_unit_price_raw = if discounted {
            self.discounted_price_raw
        } else {
            self.base_price_raw
        };
        self.effective_unit_price = self.effective_unit_price_raw as f64 / self.divider as f64;
    }

    /// Mark the machine sold out (e.g. after the last item was minted locally).
    pub fn mark_sold_out(&mut self, discount_token_balance: u64) {
        self.sold_out = true;
        self.items_remaining = 0;
        self.reprice(discount_token_balance);
    }
}

#[derive(Debug, Clone, Default)]
pub struct EligibilityEvaluator {
    pricing: PricingConfig,
}

impl EligibilityEvaluator {
    pub fn new(pricing: PricingConfig) -> Self {
        Self { pricing }
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    /// Minor units per display unit for the given asset.
    pub fn divider(&self, asset: &PaymentAsset) -> u64 {
        match asset {
            PaymentAsset::Native => LAMPORTS_PER_SOL,
            PaymentAsset::Token { .. } => 10u64.saturating_pow(self.pricing.payment_decimals as u32),
        }
    }

    pub fn currency_label(&self, asset: &PaymentAsset) -> String {
        match asset {
            PaymentAsset::Native => NATIVE_CURRENCY_LABEL.to_string(),
            PaymentAsset::Token { .. } => self.pricing.payment_label.clone(),
        }
    }

    /// Evaluate eligibility at unix time `now` (seconds).
    pub fn evaluate(
        &self,
        state: &MachineState,
        discount_token_balance: u64,
        now: i64,
    ) -> MintEligibility {
        let divider = self.divider(&state.payment_asset).max(1);

        let base_price_raw = state.unit_price;
        let discounted_price_raw = state
            .discount_rule
            .and_then(|r| r.discount_price)
            .filter(|p| *p != base_price_raw)
            .unwrap_or(base_price_raw);

        let is_presale_only = state
            .discount_rule
            .map(|r| r.applicability == DiscountApplicability::PresaleOnly)
            .unwrap_or(false);
        let is_whitelist_only = !is_presale_only
            && state
                .discount_rule
                .map(|r| r.discount_price.is_none())
                .unwrap_or(false);

        let mut ended = false;
        let mut sold_out = state.sold_out;
        let mut items_available = state.items_available;
        let mut items_remaining = state.items_remaining;
        let mut end_timestamp = None;

        match state.end_rule {
            Some(EndRule::ByTimestamp(ts)) => {
                end_timestamp = Some(ts);
                ended = now >= ts;
            }
            Some(EndRule::ByAmount(amount)) => {
                let limit = amount.min(state.items_available);
                items_available = limit;
                if state.items_redeemed >= limit {
                    items_remaining = 0;
                    sold_out = true;
                    ended = true;
                } else {
                    items_remaining = limit - state.items_redeemed;
                }
            }
            None => {}
        }

        // The program refuses public mints until a go-live date is set.
        let started = state.start_timestamp.map(|ts| now >= ts).unwrap_or(false);

        let mut eligibility = MintEligibility {
            active: false,
            ended,
            sold_out,
            started,
            requires_gate: state.gatekeeper_rule.is_some(),
            is_presale_only,
            is_whitelist_only,
            burns_discount_token: state.burns_discount_token(),
            pays_with_native: state.pays_with_native(),
            items_available,
            items_redeemed: state.items_redeemed,
            items_remaining,
            base_price: base_price_raw as f64 / divider as f64,
            discounted_price: discounted_price_raw as f64 / divider as f64,
            effective_unit_price: 0.0,
            effective_unit_price_raw: 0,
            currency_label: self.currency_label(&state.payment_asset),
            start_timestamp: state.start_timestamp,
            end_timestamp,
            has_discount_rule: state.discount_rule.is_some(),
            base_price_raw,
            discounted_price_raw,
            divider,
        };
        eligibility.reprice(discount_token_balance);
        eligibility
    }
}
