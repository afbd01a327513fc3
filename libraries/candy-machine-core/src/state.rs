//! Candy machine v2 account layouts and the decoded `MachineState` snapshot.
//!
//! The raw structs mirror the Anchor/borsh layout byte for byte. Public keys
//! are kept as `[u8; 32]` in the raw layout and converted once when the
//! snapshot is built.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::errors::CoreError;
use crate::pda::account_discriminator;

pub const CANDY_MACHINE_ACCOUNT_NAME: &str = "CandyMachine";
pub const COLLECTION_PDA_ACCOUNT_NAME: &str = "CollectionPDA";

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct RawCandyMachine {
    pub authority: [u8; 32],
    pub wallet: [u8; 32],
    pub token_mint: Option<[u8; 32]>,
    pub items_redeemed: u64,
    pub data: RawCandyMachineData,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct RawCandyMachineData {
    pub uuid: String,
    pub price: u64,
    pub symbol: String,
    pub seller_fee_basis_points: u16,
    pub max_supply: u64,
    pub is_mutable: bool,
    pub retain_authority: bool,
    pub go_live_date: Option<i64>,
    pub end_settings: Option<RawEndSettings>,
    pub creators: Vec<RawCreator>,
    pub hidden_settings: Option<RawHiddenSettings>,
    pub whitelist_mint_settings: Option<RawWhitelistMintSettings>,
    pub items_available: u64,
    pub gatekeeper: Option<RawGatekeeperConfig>,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEndSettingType {
    Date,
    Amount,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEndSettings {
    pub end_setting_type: RawEndSettingType,
    pub number: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct RawCreator {
    pub address: [u8; 32],
    pub verified: bool,
    pub share: u8,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct RawHiddenSettings {
    pub name: String,
    pub uri: String,
    pub hash: [u8; 32],
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawWhitelistMintMode {
    BurnEveryTime,
    NeverBurn,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct RawWhitelistMintSettings {
    pub mode: RawWhitelistMintMode,
    pub mint: [u8; 32],
    pub presale: bool,
    pub discount_price: Option<u64>,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawGatekeeperConfig {
    pub gatekeeper_network: [u8; 32],
    pub expire_on_use: bool,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCollectionPda {
    pub mint: [u8; 32],
    pub candy_machine: [u8; 32],
}

/// Decode a candy machine account, verifying its Anchor discriminator.
///
/// Config lines stored after the fixed header are ignored.
pub fn decode_candy_machine(data: &[u8]) -> Result<RawCandyMachine, CoreError> {
    let mut body = strip_discriminator(data, CANDY_MACHINE_ACCOUNT_NAME)?;
    RawCandyMachine::deserialize(&mut body).map_err(|e| CoreError::Decode {
        account: CANDY_MACHINE_ACCOUNT_NAME,
        message: e.to_string(),
    })
}

pub fn decode_collection_pda(data: &[u8]) -> Result<RawCollectionPda, CoreError> {
    let mut body = strip_discriminator(data, COLLECTION_PDA_ACCOUNT_NAME)?;
    RawCollectionPda::deserialize(&mut body).map_err(|e| CoreError::Decode {
        account: COLLECTION_PDA_ACCOUNT_NAME,
        message: e.to_string(),
    })
}

fn strip_discriminator<'a>(data: &'a [u8], name: &'static str) -> Result<&'a [u8], CoreError> {
    if data.len() < 8 {
        return Err(CoreError::Truncated { len: data.len() });
    }
    if data[..8] != account_discriminator(name) {
        return Err(CoreError::DiscriminatorMismatch { expected: name });
    }
    Ok(&data[8..])
}

/// Encode an account with its discriminator. Used to build fixtures.
pub fn encode_account<T: BorshSerialize>(name: &str, account: &T) -> Vec<u8> {
    let mut data = account_discriminator(name).to_vec();
    // Writing into a Vec cannot fail.
    let _ = account.serialize(&mut data);
    data
}

/// What the buyer pays with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize_serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaymentAsset {
    Native,
    Token { mint: Pubkey },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize_serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiscountApplicability {
    /// Only token holders may mint, before and after go-live.
    PresaleOnly,
    /// Anyone may mint once live; holders pay the discount price.
    PublicDiscount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize_serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConsumptionMode {
    /// Holding the token is enough; the mint does not burn it.
    NeverBurn,
    /// One token is burned per mint.
    BurnPerMint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiscountRule {
    pub mint: Pubkey,
    pub discount_price: Option<u64>,
    pub applicability: DiscountApplicability,
    pub consumption: ConsumptionMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize_serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EndRule {
    /// Unix timestamp (seconds) at which minting ends.
    ByTimestamp(i64),
    /// Supply cap below `items_available`.
    ByAmount(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GatekeeperRule {
    pub network: Pubkey,
    pub expire_on_use: bool,
}

/// Snapshot of a candy machine account. Replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MachineState {
    pub address: Pubkey,
    pub authority: Pubkey,
    /// Treasury receiving payment (a token account when paying with a token).
    pub treasury: Pubkey,
    pub items_available: u64,
    pub items_redeemed: u64,
    pub items_remaining: u64,
    /// Price in minor units of the payment asset.
    pub unit_price: u64,
    pub payment_asset: PaymentAsset,
    pub discount_rule: Option<DiscountRule>,
    pub end_rule: Option<EndRule>,
    pub start_timestamp: Option<i64>,
    pub gatekeeper_rule: Option<GatekeeperRule>,
    pub retain_authority: bool,
    pub sold_out: bool,
}

impl MachineState {
    pub fn from_raw(address: Pubkey, raw: &RawCandyMachine) -> Self {
        let data = &raw.data;
        let items_remaining = data.items_available.saturating_sub(raw.items_redeemed);

        let payment_asset = match raw.token_mint {
            Some(mint) => PaymentAsset::Token {
                mint: Pubkey::new_from_array(mint),
            },
            None => PaymentAsset::Native,
        };

        let discount_rule = data.whitelist_mint_settings.as_ref().map(|ws| DiscountRule {
            mint: Pubkey::new_from_array(ws.mint),
            discount_price: ws.discount_price,
            applicability: if ws.presale {
                DiscountApplicability::PresaleOnly
            } else {
                DiscountApplicability::PublicDiscount
            },
            consumption: match ws.mode {
                RawWhitelistMintMode::BurnEveryTime => ConsumptionMode::BurnPerMint,
                RawWhitelistMintMode::NeverBurn => ConsumptionMode::NeverBurn,
            },
        });

        let end_rule = data.end_settings.map(|es| match es.end_setting_type {
            RawEndSettingType::Date => EndRule::ByTimestamp(es.number as i64),
            RawEndSettingType::Amount => EndRule::ByAmount(es.number),
        });

        let gatekeeper_rule = data.gatekeeper.map(|gk| GatekeeperRule {
            network: Pubkey::new_from_array(gk.gatekeeper_network),
            expire_on_use: gk.expire_on_use,
        });

        Self {
            address,
            authority: Pubkey::new_from_array(raw.authority),
            treasury: Pubkey::new_from_array(raw.wallet),
            items_available: data.items_available,
            items_redeemed: raw.items_redeemed,
            items_remaining,
            unit_price: data.price,
            payment_asset,
            discount_rule,
            end_rule,
            start_timestamp: data.go_live_date,
            gatekeeper_rule,
            retain_authority: data.retain_authority,
            sold_out: items_remaining == 0,
        }
    }

    pub fn decode(address: Pubkey, data: &[u8]) -> Result<Self, CoreError> {
        Ok(Self::from_raw(address, &decode_candy_machine(data)?))
    }

    pub fn pays_with_native(&self) -> bool {
        matches!(self.payment_asset, PaymentAsset::Native)
    }

    pub fn burns_discount_token(&self) -> bool {
        self.discount_rule
            .map(|r| r.consumption == ConsumptionMode::BurnPerMint)
            .unwrap_or(false)
    }
}
