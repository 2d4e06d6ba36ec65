//! End-to-end session runs: funding, signing and the transmitted transaction

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_program,
};
use spl_associated_token_account::get_associated_token_address;

use crate::errors::MintError;
use crate::funding::{FundingOptions, FundingOutcome};
use crate::programs::{ProgramIds, DEFAULT_UPDATE_AUTHORITY};
use crate::session::{MintSession, MintSettings};
use crate::submit::SubmitOptions;
use crate::test_utils::{mock_rent, MockLedger, MOCK_FEE_LAMPORTS};

fn settings() -> MintSettings {
    MintSettings {
        secondary_mint: Pubkey::new_unique(),
        update_authority: DEFAULT_UPDATE_AUTHORITY,
        submit: SubmitOptions {
            skip_preflight: true,
            poll_interval: Duration::from_millis(5),
            confirm_timeout: Duration::from_millis(200),
        },
        funding: FundingOptions {
            airdrop: true,
            poll_interval: Duration::from_millis(5),
            confirm_timeout: Duration::from_millis(50),
        },
    }
}

fn session(ledger: &Arc<MockLedger>, payer: &Arc<Keypair>) -> MintSession {
    MintSession::new(
        ledger.clone(),
        Arc::clone(payer),
        ProgramIds::new(Pubkey::new_unique()),
        settings(),
    )
}

fn required() -> u64 {
    MOCK_FEE_LAMPORTS + mock_rent(82) + mock_rent(165)
}

#[tokio::test]
async fn test_unfunded_payer_is_airdropped_then_mints() {
    let ledger = Arc::new(MockLedger::new());
    ledger.set_auto_confirm(true);
    let payer = Arc::new(Keypair::new());
    let mint = Keypair::new();

    let outcome = session(&ledger, &payer).run(&mint).await.unwrap();

    assert_eq!(ledger.airdrops(), vec![(payer.pubkey(), required())]);
    assert_eq!(
        outcome.funding,
        FundingOutcome::Airdropped {
            lamports: required(),
            balance: required()
        }
    );
    assert_eq!(outcome.mint, mint.pubkey());
    assert_eq!(ledger.sent_transactions().len(), 1);
}

#[tokio::test]
async fn test_funded_payer_skips_airdrop() {
    let ledger = Arc::new(MockLedger::new());
    ledger.set_auto_confirm(true);
    let payer = Arc::new(Keypair::new());
    ledger.set_balance(payer.pubkey(), 10 * required());

    let outcome = session(&ledger, &payer).mint_new().await.unwrap();

    assert!(ledger.airdrops().is_empty());
    assert!(matches!(outcome.funding, FundingOutcome::AlreadyFunded { .. }));
}

#[tokio::test]
async fn test_airdrop_shortfall_of_fee_only() {
    // Rent already covered; only the 5000 lamport fee is missing
    let ledger = Arc::new(MockLedger::new());
    ledger.set_auto_confirm(true);
    let payer = Arc::new(Keypair::new());
    ledger.set_balance(payer.pubkey(), mock_rent(82) + mock_rent(165));

    session(&ledger, &payer).mint_new().await.unwrap();

    assert_eq!(ledger.airdrops(), vec![(payer.pubkey(), 5_000)]);
}

#[tokio::test]
async fn test_withheld_airdrop_stops_before_submission() {
    let ledger = Arc::new(MockLedger::new());
    ledger.withhold_airdrops();
    let payer = Arc::new(Keypair::new());

    let result = session(&ledger, &payer).mint_new().await;

    match result {
        Err(MintError::InsufficientFunds {
            required: r,
            available,
        }) => {
            assert_eq!(r, required());
            assert_eq!(available, 0);
        }
        other => panic!("Expected InsufficientFunds, got {:?}", other),
    }
    assert_eq!(ledger.send_attempts(), 0);
}

#[tokio::test]
async fn test_transmitted_transaction_is_signed_and_ordered() {
    let ledger = Arc::new(MockLedger::new());
    ledger.set_auto_confirm(true);
    let payer = Arc::new(Keypair::new());
    let mint = Keypair::new();
    let session = session(&ledger, &payer);
    let minter = session.programs().minter;

    session.run(&mint).await.unwrap();

    let sent = ledger.sent_transactions();
    let (tx, skip_preflight) = &sent[0];
    assert!(*skip_preflight);
    assert!(tx.verify().is_ok());
    assert_eq!(tx.message.recent_blockhash, ledger.blockhash());
    assert_eq!(tx.message.header.num_required_signatures, 2);
    assert_eq!(tx.message.account_keys[0], payer.pubkey());
    assert_eq!(tx.message.account_keys[1], mint.pubkey());

    let programs: Vec<Pubkey> = tx
        .message
        .instructions
        .iter()
        .map(|ix| tx.message.account_keys[usize::from(ix.program_id_index)])
        .collect();
    assert_eq!(
        programs,
        vec![
            system_program::id(),
            spl_token::id(),
            spl_associated_token_account::id(),
            spl_token::id(),
            minter,
        ]
    );
    assert!(tx.message.instructions[4].data.is_empty());
}

#[tokio::test]
async fn test_blockhash_fetched_after_slow_airdrop() {
    let ledger = Arc::new(MockLedger::new());
    ledger.stall_airdrops();
    ledger.set_auto_confirm(true);
    let payer = Arc::new(Keypair::new());

    session(&ledger, &payer).mint_new().await.unwrap();

    let calls = ledger.calls();
    let last = |name: &str| calls.iter().rposition(|call| *call == name).unwrap();
    let first_fetch = calls
        .iter()
        .position(|call| *call == "get_latest_blockhash")
        .unwrap();
    let airdrop = last("request_airdrop");
    let airdrop_wait_end = last("confirm_transaction");
    let signing_fetch = last("get_latest_blockhash");
    let send = last("send_transaction");

    assert!(first_fetch < airdrop);
    assert!(airdrop_wait_end < signing_fetch);
    assert!(signing_fetch < send);

    let (tx, _) = &ledger.sent_transactions()[0];
    assert_eq!(tx.message.recent_blockhash, ledger.blockhash());
    assert!(tx.verify().is_ok());
}

#[tokio::test]
async fn test_associated_account_stable_across_sessions() {
    let payer = Arc::new(Keypair::new());
    let mint = Keypair::new();
    let mut seen = Vec::new();

    for _ in 0..2 {
        let ledger = Arc::new(MockLedger::new());
        ledger.set_auto_confirm(true);
        let outcome = session(&ledger, &payer).run(&mint).await.unwrap();
        seen.push(outcome.associated_token);
    }

    assert_eq!(seen[0], seen[1]);
    assert_eq!(
        seen[0],
        get_associated_token_address(&payer.pubkey(), &mint.pubkey())
    );
}
