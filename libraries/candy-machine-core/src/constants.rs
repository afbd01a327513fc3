use solana_program::pubkey::Pubkey;

pub const CANDY_MACHINE_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("cndy3Z4yapfJBmL3ShUp5exZKqR3z33thTzeNMm2gRZ");
pub const GATEWAY_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("gatem74V238djXdzWnJf94Wo1DcnuGkfijbf3AuBhfs");

/// Divider from lamports to SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Approximate rent paid for the accounts a mint creates (0.012 SOL).
pub const MINT_FEE_ESTIMATE_LAMPORTS: u64 = 12_000_000;

pub const NATIVE_CURRENCY_LABEL: &str = "SOL";
