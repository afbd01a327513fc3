//! Session refresh, mint and reconciliation flows.

mod common;

use std::sync::Arc;
use std::time::Duration;

use candy_mint_client::{
    AttemptStage, ChainConnection, ErrorCategory, MintClientConfig, MintError, MintSession,
    SessionEvent, SignatureState, TransactionSigner,
};
use common::*;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};

const SOL: u64 = 1_000_000_000;

fn session_with(
    chain: &Arc<MockConnection>,
    config: MintClientConfig,
) -> (MintSession, Pubkey) {
    let signer = signer();
    let wallet = signer.pubkey();
    let connection: Arc<dyn ChainConnection> = chain.clone();
    (MintSession::new(config, connection, signer, None), wallet)
}

fn drain(receiver: &mut tokio::sync::mpsc::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_refresh_builds_view() {
    let chain = MockConnection::new();
    let candy_machine = Pubkey::new_unique();
    chain.put_machine(candy_machine, &raw_machine(3333, 1200, SOL));
    let (session, wallet) = session_with(&chain, test_config(&candy_machine));
    chain.set_balance(wallet, 5 * SOL);
    let mut events = session.subscribe();

    let view = session.refresh(CommitmentConfig::confirmed()).await.unwrap();

    assert!(view.eligibility.active);
    assert_eq!(view.eligibility.items_remaining, 2133);
    assert_eq!(view.eligibility.effective_unit_price, 1.0);
    assert_eq!(view.eligibility.currency_label, "SOL");
    assert_eq!(view.wallet.native_balance, 5 * SOL);
    assert!(view.snapshot.collection.is_none());
    assert_eq!(session.view().await, Some(view.clone()));

    match drain(&mut events).as_slice() {
        [SessionEvent::Refreshed(refreshed)] => assert_eq!(**refreshed, view),
        other => panic!("unexpected events {:?}", other),
    }
}

#[tokio::test]
async fn test_refresh_reads_whitelist_balance() {
    let chain = MockConnection::new();
    let candy_machine = Pubkey::new_unique();
    let whitelist_mint = Pubkey::new_unique();
    let mut raw = with_whitelist(raw_machine(100, 0, SOL), whitelist_mint, true, true, None);
    raw.data.go_live_date = Some(i64::MAX);
    chain.put_machine(candy_machine, &raw);
    let (session, wallet) = session_with(&chain, test_config(&candy_machine));

    let view = session.refresh(CommitmentConfig::confirmed()).await.unwrap();
    assert_eq!(view.wallet.discount_token_balance, 0);
    assert!(!view.eligibility.active);

    chain.put_token_balance(&wallet, &whitelist_mint, 2);
    let view = session.refresh(CommitmentConfig::confirmed()).await.unwrap();
    assert_eq!(view.wallet.discount_token_balance, 2);
    assert!(view.eligibility.is_presale_only);
    assert!(view.eligibility.active);
}

#[tokio::test]
async fn test_refresh_missing_machine() {
    let chain = MockConnection::new();
    let candy_machine = Pubkey::new_unique();
    let (session, _) = session_with(&chain, test_config(&candy_machine));
    let mut events = session.subscribe();

    let err = session.refresh(CommitmentConfig::confirmed()).await.unwrap_err();

    assert!(matches!(err, MintError::MachineNotFound { .. }));
    assert!(session.view().await.is_none());
    match drain(&mut events).as_slice() {
        [SessionEvent::RefreshFailed { category, .. }] => {
            assert_eq!(*category, ErrorCategory::Config)
        }
        other => panic!("unexpected events {:?}", other),
    }
}

#[tokio::test]
async fn test_mint_before_refresh_is_rejected() {
    let chain = MockConnection::new();
    let (session, _) = session_with(&chain, test_config(&Pubkey::new_unique()));

    assert!(matches!(session.mint().await, Err(MintError::NotLoaded)));
    assert!(!session.is_minting());
}

#[tokio::test]
async fn test_concurrent_mint_is_rejected() {
    let chain = MockConnection::new();
    let candy_machine = Pubkey::new_unique();
    chain.put_machine(candy_machine, &raw_machine(100, 0, SOL));
    chain.script_statuses([SignatureState::Pending]);
    let (session, _) = session_with(&chain, test_config(&candy_machine));
    session.refresh(CommitmentConfig::confirmed()).await.unwrap();

    let (first, second) = tokio::join!(session.mint(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        session.mint().await
    });

    assert!(first.is_ok());
    assert!(matches!(second, Err(MintError::MintInProgress)));
    assert!(!session.is_minting());
    assert_eq!(chain.sent_count(), 1);
}

#[tokio::test]
async fn test_mint_emits_stages_then_refreshes() {
    let chain = MockConnection::new();
    let candy_machine = Pubkey::new_unique();
    chain.put_machine(candy_machine, &raw_machine(100, 0, SOL));
    let (session, _) = session_with(&chain, test_config(&candy_machine));
    session.refresh(CommitmentConfig::confirmed()).await.unwrap();
    let mut events = session.subscribe();

    let report = session.mint().await.unwrap();
    assert!(report.outcome.is_success());

    let events = drain(&mut events);
    let stages: Vec<AttemptStage> = events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::MintStage(stage) => Some(*stage),
            _ => None,
        })
        .collect();
    assert_eq!(stages, report.stages);

    let finished = events
        .iter()
        .position(|event| matches!(event, SessionEvent::MintFinished(_)))
        .unwrap();
    assert!(matches!(events.last(), Some(SessionEvent::Refreshed(_))));
    assert_eq!(finished, events.len() - 2);
}

#[tokio::test]
async fn test_last_item_keeps_local_estimate_when_refresh_fails() {
    let chain = MockConnection::new();
    let candy_machine = Pubkey::new_unique();
    chain.put_machine(candy_machine, &raw_machine(3333, 3332, SOL));
    let (session, wallet) = session_with(&chain, test_config(&candy_machine));
    chain.set_balance(wallet, 5 * SOL);
    let before = session.refresh(CommitmentConfig::confirmed()).await.unwrap();
    assert!(before.eligibility.active);
    assert_eq!(before.eligibility.items_remaining, 1);

    // Post-mint refresh fails, leaving the reconciled view in place.
    chain.remove_account(&candy_machine);
    let report = session.mint().await.unwrap();
    assert!(report.outcome.is_success());

    let after = session.view().await.unwrap();
    assert_eq!(after.eligibility.items_remaining, 0);
    assert_eq!(after.eligibility.items_redeemed, 3333);
    assert!(after.eligibility.sold_out);
    assert!(!after.eligibility.active);
    assert!(after.snapshot.state.sold_out);
    assert_eq!(after.wallet.native_balance, 5 * SOL - SOL - 12_000_000);
}

#[tokio::test]
async fn test_refresh_during_confirmation_is_not_counted_twice() {
    let chain = MockConnection::new();
    let candy_machine = Pubkey::new_unique();
    chain.put_machine(candy_machine, &raw_machine(100, 10, SOL));
    chain.delay_status_polls(Duration::from_millis(60));
    let (session, _) = session_with(&chain, test_config(&candy_machine));
    let before = session.refresh(CommitmentConfig::confirmed()).await.unwrap();
    assert_eq!(before.eligibility.items_remaining, 90);

    let (report, (during, minting_after_refresh)) = tokio::join!(session.mint(), async {
        tokio::time::sleep(Duration::from_millis(15)).await;
        // The mint has landed but the status poll has not answered yet.
        chain.put_machine(candy_machine, &raw_machine(100, 11, SOL));
        let view = session.refresh(CommitmentConfig::confirmed()).await.unwrap();
        let minting = session.is_minting();
        // Make the post-mint refresh fail so the kept view is observable.
        chain.remove_account(&candy_machine);
        (view, minting)
    });

    assert!(report.unwrap().outcome.is_success());
    assert!(minting_after_refresh);
    assert_eq!(during.eligibility.items_remaining, 89);
    assert_eq!(during.eligibility.items_redeemed, 11);

    let after = session.view().await.unwrap();
    assert_eq!(after, during);
    assert_eq!(after.snapshot.state.items_remaining, 89);
}

#[tokio::test]
async fn test_failed_mint_leaves_view_unchanged() {
    let chain = MockConnection::new();
    let candy_machine = Pubkey::new_unique();
    chain.put_machine(candy_machine, &raw_machine(3333, 3332, SOL));
    chain.metadata_lands(false);
    let (session, _) = session_with(&chain, test_config(&candy_machine));
    let before = session.refresh(CommitmentConfig::confirmed()).await.unwrap();

    chain.remove_account(&candy_machine);
    let report = session.mint().await.unwrap();
    assert!(!report.outcome.is_success());

    assert_eq!(session.view().await, Some(before));
}

#[tokio::test]
async fn test_auto_refresh_until_stopped() {
    let chain = MockConnection::new();
    let candy_machine = Pubkey::new_unique();
    chain.put_machine(candy_machine, &raw_machine(100, 0, SOL));
    let config = MintClientConfig::builder()
        .candy_machine_id(candy_machine.to_string())
        .rpc_url("http://127.0.0.1:8899")
        .refresh_interval_ms(10)
        .build()
        .unwrap();
    let (session, _) = session_with(&chain, config);
    let session = Arc::new(session);
    let mut events = session.subscribe();

    let mut handle = session.start_auto_refresh();
    for _ in 0..2 {
        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, SessionEvent::Refreshed(_)));
    }

    handle.stop();
    handle.join().await.unwrap();
    assert!(session.view().await.is_some());
}
