//! In-memory chain used by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use candy_machine_core::{
    constants::CANDY_MACHINE_PROGRAM_ID,
    pda::{collection_pda, instruction_discriminator},
    state::{
        encode_account, RawCandyMachine, RawCandyMachineData, RawCollectionPda, RawCreator,
        RawEndSettingType, RawEndSettings, RawGatekeeperConfig, RawWhitelistMintMode,
        RawWhitelistMintSettings, CANDY_MACHINE_ACCOUNT_NAME, COLLECTION_PDA_ACCOUNT_NAME,
    },
};
use candy_mint_client::{
    AttestationGate, ChainConnection, KeypairSigner, MintClientConfig, MintError,
    SignatureState, TransactionSigner,
};
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    hash::Hash,
    program_pack::Pack,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
use spl_associated_token_account::get_associated_token_address;

pub fn test_config(candy_machine: &Pubkey) -> MintClientConfig {
    MintClientConfig::builder()
        .candy_machine_id(candy_machine.to_string())
        .rpc_url("http://127.0.0.1:8899")
        .tx_timeout_ms(150)
        .poll_interval_ms(5)
        .build()
        .unwrap()
}

pub fn signer() -> Arc<KeypairSigner> {
    Arc::new(KeypairSigner::new(Keypair::new()))
}

// ============================================================================
// Account fixtures
// ============================================================================

pub fn raw_machine(items_available: u64, items_redeemed: u64, price: u64) -> RawCandyMachine {
    RawCandyMachine {
        authority: [1u8; 32],
        wallet: [2u8; 32],
        token_mint: None,
        items_redeemed,
        data: RawCandyMachineData {
            uuid: "fixture".to_string(),
            price,
            symbol: "CNDY".to_string(),
            seller_fee_basis_points: 500,
            max_supply: 0,
            is_mutable: true,
            retain_authority: true,
            go_live_date: Some(0),
            end_settings: None,
            creators: vec![RawCreator {
                address: [1u8; 32],
                verified: true,
                share: 100,
            }],
            hidden_settings: None,
            whitelist_mint_settings: None,
            items_available,
            gatekeeper: None,
        },
    }
}

pub fn with_amount_end(mut raw: RawCandyMachine, amount: u64) -> RawCandyMachine {
    raw.data.end_settings = Some(RawEndSettings {
        end_setting_type: RawEndSettingType::Amount,
        number: amount,
    });
    raw
}

pub fn with_whitelist(
    mut raw: RawCandyMachine,
    mint: Pubkey,
    presale: bool,
    burn: bool,
    discount_price: Option<u64>,
) -> RawCandyMachine {
    raw.data.whitelist_mint_settings = Some(RawWhitelistMintSettings {
        mode: if burn {
            RawWhitelistMintMode::BurnEveryTime
        } else {
            RawWhitelistMintMode::NeverBurn
        },
        mint: mint.to_bytes(),
        presale,
        discount_price,
    });
    raw
}

pub fn with_gatekeeper(mut raw: RawCandyMachine, network: Pubkey, expire_on_use: bool) -> RawCandyMachine {
    raw.data.gatekeeper = Some(RawGatekeeperConfig {
        gatekeeper_network: network.to_bytes(),
        expire_on_use,
    });
    raw
}

/// Every optional feature on: the estimate exceeds one transaction.
pub fn split_machine(gate_network: Pubkey) -> RawCandyMachine {
    let mut raw = raw_machine(100, 0, 1_000_000);
    raw.token_mint = Some(Pubkey::new_unique().to_bytes());
    let raw = with_whitelist(raw, Pubkey::new_unique(), false, true, Some(500_000));
    with_gatekeeper(raw, gate_network, true)
}

fn program_account(owner: Pubkey, data: Vec<u8>) -> Account {
    Account {
        lamports: 1_000_000,
        data,
        owner,
        executable: false,
        rent_epoch: 0,
    }
}

pub fn machine_account(raw: &RawCandyMachine) -> Account {
    program_account(
        CANDY_MACHINE_PROGRAM_ID,
        encode_account(CANDY_MACHINE_ACCOUNT_NAME, raw),
    )
}

pub fn collection_account(candy_machine: &Pubkey, collection_mint: &Pubkey) -> Account {
    let raw = RawCollectionPda {
        mint: collection_mint.to_bytes(),
        candy_machine: candy_machine.to_bytes(),
    };
    program_account(
        CANDY_MACHINE_PROGRAM_ID,
        encode_account(COLLECTION_PDA_ACCOUNT_NAME, &raw),
    )
}

pub fn token_account(mint: &Pubkey, owner: &Pubkey, amount: u64) -> Account {
    let state = spl_token::state::Account {
        mint: *mint,
        owner: *owner,
        amount,
        state: spl_token::state::AccountState::Initialized,
        ..Default::default()
    };
    let mut data = vec![0u8; spl_token::state::Account::LEN];
    spl_token::state::Account::pack(state, &mut data).unwrap();
    program_account(spl_token::id(), data)
}

// ============================================================================
// Mock connection
// ============================================================================

pub struct MockConnection {
    accounts: Mutex<HashMap<Pubkey, Account>>,
    balances: Mutex<HashMap<Pubkey, u64>>,
    sent: Mutex<Vec<Transaction>>,
    statuses: Mutex<HashMap<Signature, SignatureState>>,
    /// Final status for each successive send; `Confirmed` once exhausted.
    script: Mutex<VecDeque<SignatureState>>,
    /// Whether a confirmed `mint_nft` creates its metadata account.
    metadata_lands: AtomicBool,
    pub status_polls: AtomicUsize,
    /// Latency of each signature status poll.
    status_delay: Mutex<Duration>,
}

impl MockConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            accounts: Mutex::new(HashMap::new()),
            balances: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            statuses: Mutex::new(HashMap::new()),
            script: Mutex::new(VecDeque::new()),
            metadata_lands: AtomicBool::new(true),
            status_polls: AtomicUsize::new(0),
            status_delay: Mutex::new(Duration::ZERO),
        })
    }

    pub fn put_account(&self, address: Pubkey, account: Account) {
        self.accounts.lock().unwrap().insert(address, account);
    }

    pub fn remove_account(&self, address: &Pubkey) {
        self.accounts.lock().unwrap().remove(address);
    }

    pub fn put_machine(&self, address: Pubkey, raw: &RawCandyMachine) {
        self.put_account(address, machine_account(raw));
    }

    pub fn put_collection(&self, candy_machine: &Pubkey, collection_mint: &Pubkey) {
        let (pda, _) = collection_pda(candy_machine);
        self.put_account(pda, collection_account(candy_machine, collection_mint));
    }

    pub fn put_token_balance(&self, owner: &Pubkey, mint: &Pubkey, amount: u64) {
        let ata = get_associated_token_address(owner, mint);
        self.put_account(ata, token_account(mint, owner, amount));
    }

    pub fn set_balance(&self, address: Pubkey, lamports: u64) {
        self.balances.lock().unwrap().insert(address, lamports);
    }

    pub fn script_statuses(&self, states: impl IntoIterator<Item = SignatureState>) {
        self.script.lock().unwrap().extend(states);
    }

    pub fn metadata_lands(&self, lands: bool) {
        self.metadata_lands.store(lands, Ordering::SeqCst);
    }

    pub fn delay_status_polls(&self, delay: Duration) {
        *self.status_delay.lock().unwrap() = delay;
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Metadata account written by a `mint_nft` instruction in `transaction`.
    fn minted_metadata(transaction: &Transaction) -> Option<Pubkey> {
        let discriminator = instruction_discriminator("mint_nft");
        let keys = &transaction.message.account_keys;
        transaction.message.instructions.iter().find_map(|ix| {
            let program = keys[ix.program_id_index as usize];
            if program == CANDY_MACHINE_PROGRAM_ID && ix.data.starts_with(&discriminator) {
                Some(keys[ix.accounts[4] as usize])
            } else {
                None
            }
        })
    }
}

#[async_trait]
impl ChainConnection for MockConnection {
    async fn get_account(
        &self,
        address: &Pubkey,
        _commitment: CommitmentConfig,
    ) -> Result<Option<Account>, MintError> {
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn get_balance(
        &self,
        address: &Pubkey,
        _commitment: CommitmentConfig,
    ) -> Result<u64, MintError> {
        Ok(self.balances.lock().unwrap().get(address).copied().unwrap_or(0))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, MintError> {
        Ok(Hash::new_unique())
    }

    async fn get_minimum_balance_for_rent_exemption(&self, len: usize) -> Result<u64, MintError> {
        Ok(len as u64 * 6_960)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, MintError> {
        assert!(transaction.is_signed(), "transaction sent without all signatures");
        let signature = transaction.signatures[0];
        let status = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SignatureState::Confirmed);

        if status == SignatureState::Confirmed && self.metadata_lands.load(Ordering::SeqCst) {
            if let Some(metadata) = Self::minted_metadata(transaction) {
                self.put_account(metadata, program_account(Pubkey::new_unique(), vec![4u8; 8]));
            }
        }

        self.statuses.lock().unwrap().insert(signature, status);
        self.sent.lock().unwrap().push(transaction.clone());
        Ok(signature)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<SignatureState, MintError> {
        self.status_polls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.status_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(signature)
            .cloned()
            .unwrap_or(SignatureState::Pending))
    }
}

// ============================================================================
// Collaborators
// ============================================================================

/// Gate that forwards to the mock connection and counts submissions.
pub struct MockGate {
    network: Pubkey,
    connection: Arc<MockConnection>,
    pub submitted: AtomicUsize,
}

impl MockGate {
    pub fn new(network: Pubkey, connection: Arc<MockConnection>) -> Arc<Self> {
        Arc::new(Self {
            network,
            connection,
            submitted: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AttestationGate for MockGate {
    fn network(&self) -> Pubkey {
        self.network
    }

    async fn submit(&self, transaction: Transaction) -> Result<Signature, MintError> {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        self.connection.send_transaction(&transaction).await
    }
}

/// Wallet adapter that crashes while signing.
pub struct PanickingSigner(pub Pubkey);

#[async_trait]
impl TransactionSigner for PanickingSigner {
    fn pubkey(&self) -> Pubkey {
        self.0
    }

    async fn sign_transaction(&self, _transaction: Transaction) -> Result<Transaction, MintError> {
        panic!("wallet adapter crashed")
    }
}
