//! Instruction builders for the setup and mint transactions.

use candy_machine_core::{
    constants::{CANDY_MACHINE_PROGRAM_ID, GATEWAY_PROGRAM_ID},
    pda::{candy_machine_creator, gateway_token, instruction_discriminator, network_expire_feature},
    ConsumptionMode, MachineState, PaymentAsset,
};
use mpl_token_metadata::accounts::{CollectionAuthorityRecord, MasterEdition, Metadata};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    program_pack::Pack,
    pubkey::Pubkey,
    system_instruction, system_program, sysvar,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account,
};
use spl_token::state::Mint;

use crate::errors::MintError;
use crate::types::{CollectionInfo, MachineSnapshot};

/// Space of the NFT mint account created during setup.
pub const NFT_MINT_SPACE: usize = Mint::LEN;

pub fn metadata_address(mint: &Pubkey) -> Pubkey {
    Metadata::find_pda(mint).0
}

/// Create and initialize the NFT mint, create the payer's token account for
/// it and mint the single token.
pub fn setup_instructions(
    payer: &Pubkey,
    mint: &Pubkey,
    mint_rent_lamports: u64,
) -> Result<Vec<Instruction>, MintError> {
    let token_account = get_associated_token_address(payer, mint);

    let init_mint = spl_token::instruction::initialize_mint(
        &spl_token::id(),
        mint,
        payer,
        Some(payer),
        0,
    )
    .map_err(|e| MintError::Internal(e.into()))?;

    let mint_one = spl_token::instruction::mint_to(
        &spl_token::id(),
        mint,
        &token_account,
        payer,
        &[],
        1,
    )
    .map_err(|e| MintError::Internal(e.into()))?;

    Ok(vec![
        system_instruction::create_account(
            payer,
            mint,
            mint_rent_lamports,
            NFT_MINT_SPACE as u64,
            &spl_token::id(),
        ),
        init_mint,
        create_associated_token_account(payer, payer, mint, &spl_token::id()),
        mint_one,
    ])
}

/// The `mint_nft` instruction followed, when the collection is retained,
/// by `set_collection_during_mint`.
pub fn mint_instructions(snapshot: &MachineSnapshot, payer: &Pubkey, mint: &Pubkey) -> Vec<Instruction> {
    let mut instructions = vec![mint_nft(&snapshot.state, payer, mint)];
    if let Some(collection) = &snapshot.collection {
        if snapshot.state.retain_authority {
            instructions.push(set_collection_during_mint(
                &snapshot.state,
                payer,
                mint,
                collection,
            ));
        }
    }
    instructions
}

pub fn mint_nft(state: &MachineState, payer: &Pubkey, mint: &Pubkey) -> Instruction {
    let (creator, creator_bump) = candy_machine_creator(&state.address);

    let mut accounts = vec![
        AccountMeta::new(state.address, false),
        AccountMeta::new_readonly(creator, false),
        AccountMeta::new(*payer, true),
        AccountMeta::new(state.treasury, false),
        AccountMeta::new(metadata_address(mint), false),
        AccountMeta::new(*mint, false),
        // mint authority
        AccountMeta::new_readonly(*payer, true),
        // update authority
        AccountMeta::new_readonly(*payer, true),
        AccountMeta::new(MasterEdition::find_pda(mint).0, false),
        AccountMeta::new_readonly(mpl_token_metadata::ID, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(sysvar::slot_hashes::id(), false),
        AccountMeta::new_readonly(sysvar::instructions::id(), false),
    ];
    accounts.extend(remaining_accounts(state, payer));

    let mut data = instruction_discriminator("mint_nft").to_vec();
    data.push(creator_bump);

    Instruction {
        program_id: CANDY_MACHINE_PROGRAM_ID,
        accounts,
        data,
    }
}

/// Accounts appended after the fixed list, in the order the program
/// consumes them: gatekeeper, whitelist, then token payment.
fn remaining_accounts(state: &MachineState, payer: &Pubkey) -> Vec<AccountMeta> {
    let mut accounts = Vec::new();

    if let Some(gate) = &state.gatekeeper_rule {
        accounts.push(AccountMeta::new(gateway_token(payer, &gate.network), false));
        if gate.expire_on_use {
            accounts.push(AccountMeta::new_readonly(GATEWAY_PROGRAM_ID, false));
            accounts.push(AccountMeta::new_readonly(
                network_expire_feature(&gate.network),
                false,
            ));
        }
    }

    if let Some(rule) = &state.discount_rule {
        accounts.push(AccountMeta::new(
            get_associated_token_address(payer, &rule.mint),
            false,
        ));
        if rule.consumption == ConsumptionMode::BurnPerMint {
            accounts.push(AccountMeta::new(rule.mint, false));
            accounts.push(AccountMeta::new_readonly(*payer, true));
        }
    }

    if let PaymentAsset::Token { mint } = &state.payment_asset {
        accounts.push(AccountMeta::new(get_associated_token_address(payer, mint), false));
        accounts.push(AccountMeta::new_readonly(*payer, true));
    }

    accounts
}

pub fn set_collection_during_mint(
    state: &MachineState,
    payer: &Pubkey,
    mint: &Pubkey,
    collection: &CollectionInfo,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(state.address, false),
        AccountMeta::new_readonly(metadata_address(mint), false),
        AccountMeta::new_readonly(*payer, true),
        AccountMeta::new(collection.pda, false),
        AccountMeta::new_readonly(mpl_token_metadata::ID, false),
        AccountMeta::new_readonly(sysvar::instructions::id(), false),
        AccountMeta::new_readonly(collection.mint, false),
        AccountMeta::new_readonly(metadata_address(&collection.mint), false),
        AccountMeta::new_readonly(MasterEdition::find_pda(&collection.mint).0, false),
        AccountMeta::new_readonly(state.authority, false),
        AccountMeta::new_readonly(
            CollectionAuthorityRecord::find_pda(&collection.mint, &collection.pda).0,
            false,
        ),
    ];

    Instruction {
        program_id: CANDY_MACHINE_PROGRAM_ID,
        accounts,
        data: instruction_discriminator("set_collection_during_mint").to_vec(),
    }
}
