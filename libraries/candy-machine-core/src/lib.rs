//! Pure candy machine logic shared by the mint client.
//!
//! Nothing in this crate performs I/O: account bytes go in, typed state and
//! decisions come out.

pub mod constants;
pub mod eligibility;
pub mod errors;
pub mod pda;
pub mod program_errors;
pub mod sizing;
pub mod state;

pub use eligibility::{EligibilityEvaluator, MintEligibility, PricingConfig};
pub use errors::CoreError;
pub use program_errors::CandyMachineErrorCode;
pub use sizing::{SizeEstimate, SizingFeatures};
pub use state::{
    ConsumptionMode, DiscountApplicability, DiscountRule, EndRule, GatekeeperRule, MachineState,
    PaymentAsset,
};
