//! Chain Reader: fetches the candy machine, its collection PDA and the
//! wallet balances. No caching; every call re-reads the chain.

use std::sync::Arc;

use candy_machine_core::{
    pda::collection_pda,
    state::decode_collection_pda,
    MachineState, SizingFeatures,
};
use solana_sdk::{commitment_config::CommitmentConfig, program_pack::Pack, pubkey::Pubkey};
use spl_associated_token_account::get_associated_token_address;

use crate::errors::MintError;
use crate::rpc::ChainConnection;
use crate::types::{CollectionInfo, MachineSnapshot, WalletContext};

pub struct ChainReader {
    connection: Arc<dyn ChainConnection>,
    candy_machine_id: Pubkey,
}

impl ChainReader {
    pub fn new(connection: Arc<dyn ChainConnection>, candy_machine_id: Pubkey) -> Self {
        Self {
            connection,
            candy_machine_id,
        }
    }

    pub fn candy_machine_id(&self) -> Pubkey {
        self.candy_machine_id
    }

    /// Read and decode the candy machine plus its collection PDA.
    ///
    /// A missing account or one that does not decode as a candy machine is
    /// a configuration error. Transport failures surface as network errors.
    pub async fn fetch_state(
        &self,
        commitment: CommitmentConfig,
    ) -> Result<MachineSnapshot, MintError> {
        let address = self.candy_machine_id;
        let account = self
            .connection
            .get_account(&address, commitment)
            .await?
            .ok_or_else(|| MintError::MachineNotFound {
                address: address.to_string(),
            })?;

        let state = MachineState::decode(address, &account.data).map_err(|source| {
            MintError::NotACandyMachine {
                address: address.to_string(),
                source,
            }
        })?;

        let (pda, _) = collection_pda(&address);
        let collection = match self.connection.get_account(&pda, commitment).await? {
            Some(account) => {
                let raw = decode_collection_pda(&account.data)?;
                Some(CollectionInfo {
                    pda,
                    mint: Pubkey::new_from_array(raw.mint),
                })
            }
            None => None,
        };

        let size = SizingFeatures::from_state(&state, collection.is_some()).estimate();

        tracing::debug!(
            candy_machine = %address,
            items_available = state.items_available,
            items_redeemed = state.items_redeemed,
            has_collection = collection.is_some(),
            estimated_bytes = size.bytes,
            "Fetched candy machine state"
        );

        Ok(MachineSnapshot {
            state,
            collection,
            size,
        })
    }

    /// Read the wallet's native balance and whitelist token balance.
    pub async fn fetch_wallet(
        &self,
        wallet: &Pubkey,
        state: &MachineState,
        commitment: CommitmentConfig,
    ) -> Result<WalletContext, MintError> {
        let native_balance = self.connection.get_balance(wallet, commitment).await?;
        let discount_token_balance = match &state.discount_rule {
            Some(rule) => self.token_balance(wallet, &rule.mint, commitment).await,
            None => 0,
        };

        Ok(WalletContext {
            address: *wallet,
            native_balance,
            discount_token_balance,
        })
    }

    /// Balance of the owner's associated token account. Missing or
    /// unreadable accounts count as zero.
    async fn token_balance(&self, owner: &Pubkey, mint: &Pubkey, commitment: CommitmentConfig) -> u64 {
        let ata = get_associated_token_address(owner, mint);
        match self.connection.get_account(&ata, commitment).await {
            Ok(Some(account)) => match spl_token::state::Account::unpack(&account.data) {
                Ok(token_account) => token_account.amount,
                Err(e) => {
                    tracing::warn!(token_account = %ata, error = %e, "Unreadable whitelist token account");
                    0
                }
            },
            Ok(None) => {
                tracing::warn!(token_account = %ata, mint = %mint, "No whitelist token account for wallet");
                0
            }
            Err(e) => {
                tracing::warn!(token_account = %ata, error = %e, "Failed to read whitelist token balance");
                0
            }
        }
    }
}
