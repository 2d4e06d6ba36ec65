//! Test Utilities Module
//!
//! In-memory [`LedgerClient`] and transaction fixtures for deterministic
//! tests. Nothing here touches the network.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{
    hash::Hash,
    message::Message,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};

use crate::derive::DerivedAccounts;
use crate::errors::{MintError, MintResult};
use crate::ledger::{LedgerClient, SignatureStatus};
use crate::programs::{ProgramIds, DEFAULT_UPDATE_AUTHORITY};
use crate::rent::RentRequirements;
use crate::tx_builder::{AssembledTransaction, InstructionFactory, TransactionAssembler};

/// Fee the mock charges per message
pub const MOCK_FEE_LAMPORTS: u64 = 5_000;

/// Rent the mock reports for `size` bytes (two years at the default rate)
pub fn mock_rent(size: usize) -> u64 {
    (128 + size as u64) * 6_960
}

#[derive(Default)]
struct MockState {
    calls: Vec<&'static str>,
    balances: HashMap<Pubkey, u64>,
    fee: u64,
    blockhash: Hash,
    blockhash_valid: bool,
    blockhash_check_error: Option<MintError>,
    executables: HashMap<Pubkey, bool>,

    airdrop_credits: bool,
    airdrop_confirms: bool,
    airdrops: Vec<(Pubkey, u64)>,
    airdrop_error: Option<MintError>,

    rent_queries: Vec<usize>,
    fail_rent: bool,
    fail_balance: bool,

    sent: Vec<(Transaction, bool)>,
    send_attempts: usize,
    send_error: Option<MintError>,

    statuses: VecDeque<MintResult<Option<SignatureStatus>>>,
    auto_confirm: bool,
    status_queries: usize,
}

impl MockState {
    fn record(&mut self, call: &'static str) {
        self.calls.push(call);
    }
}

/// Scriptable in-memory ledger
///
/// Defaults: every balance is zero, airdrops are credited and confirm on the
/// first check, each `get_latest_blockhash` hands out a new blockhash that
/// stays valid, and signature statuses are unknown until scripted with
/// [`MockLedger::push_status`] or [`MockLedger::set_auto_confirm`].
pub struct MockLedger {
    state: Mutex<MockState>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                fee: MOCK_FEE_LAMPORTS,
                blockhash: Hash::new_unique(),
                blockhash_valid: true,
                airdrop_credits: true,
                airdrop_confirms: true,
                ..MockState::default()
            }),
        }
    }

    pub fn set_balance(&self, address: Pubkey, lamports: u64) {
        self.state.lock().balances.insert(address, lamports);
    }

    pub fn balance_of(&self, address: &Pubkey) -> u64 {
        self.state.lock().balances.get(address).copied().unwrap_or(0)
    }

    pub fn set_fee(&self, lamports: u64) {
        self.state.lock().fee = lamports;
    }

    /// Most recent blockhash handed out by `get_latest_blockhash`
    pub fn blockhash(&self) -> Hash {
        self.state.lock().blockhash
    }

    pub fn set_blockhash_valid(&self, valid: bool) {
        self.state.lock().blockhash_valid = valid;
    }

    pub fn fail_next_blockhash_check(&self, err: MintError) {
        self.state.lock().blockhash_check_error = Some(err);
    }

    /// Trait methods invoked so far, in call order
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    pub fn set_executable(&self, address: Pubkey, executable: bool) {
        self.state.lock().executables.insert(address, executable);
    }

    /// Accept airdrop requests without adding the lamports
    pub fn withhold_airdrops(&self) {
        self.state.lock().airdrop_credits = false;
    }

    /// Airdrop signatures never reach confirmation
    pub fn stall_airdrops(&self) {
        self.state.lock().airdrop_confirms = false;
    }

    pub fn fail_next_airdrop(&self, err: MintError) {
        self.state.lock().airdrop_error = Some(err);
    }

    pub fn airdrops(&self) -> Vec<(Pubkey, u64)> {
        self.state.lock().airdrops.clone()
    }

    pub fn rent_queries(&self) -> Vec<usize> {
        self.state.lock().rent_queries.clone()
    }

    pub fn fail_rent_queries(&self) {
        self.state.lock().fail_rent = true;
    }

    pub fn fail_balance_queries(&self) {
        self.state.lock().fail_balance = true;
    }

    pub fn fail_next_send(&self, err: MintError) {
        self.state.lock().send_error = Some(err);
    }

    /// Transactions accepted by `send_transaction` with their preflight flag
    pub fn sent_transactions(&self) -> Vec<(Transaction, bool)> {
        self.state.lock().sent.clone()
    }

    pub fn send_attempts(&self) -> usize {
        self.state.lock().send_attempts
    }

    /// Queue the answer for the next status query
    pub fn push_status(&self, status: Option<SignatureStatus>) {
        self.state.lock().statuses.push_back(Ok(status));
    }

    /// Queue a failure for the next status query
    pub fn push_status_error(&self, err: MintError) {
        self.state.lock().statuses.push_back(Err(err));
    }

    /// Report every signature as confirmed once the script is exhausted
    pub fn set_auto_confirm(&self, enabled: bool) {
        self.state.lock().auto_confirm = enabled;
    }

    pub fn status_queries(&self) -> usize {
        self.state.lock().status_queries
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn get_version(&self) -> MintResult<String> {
        self.state.lock().record("get_version");
        Ok("2.3.0-mock".to_string())
    }

    async fn get_latest_blockhash(&self) -> MintResult<Hash> {
        let mut state = self.state.lock();
        state.record("get_latest_blockhash");
        state.blockhash = Hash::new_unique();
        Ok(state.blockhash)
    }

    async fn get_fee_for_message(&self, _message: &Message) -> MintResult<u64> {
        let mut state = self.state.lock();
        state.record("get_fee_for_message");
        if state.fail_balance {
            return Err(MintError::BalanceQueryFailure("mock fee query failed".to_string()));
        }
        Ok(state.fee)
    }

    async fn get_balance(&self, address: &Pubkey) -> MintResult<u64> {
        let mut state = self.state.lock();
        state.record("get_balance");
        if state.fail_balance {
            return Err(MintError::BalanceQueryFailure(format!(
                "mock balance query failed for {}",
                address
            )));
        }
        Ok(state.balances.get(address).copied().unwrap_or(0))
    }

    async fn get_minimum_balance_for_rent_exemption(&self, size: usize) -> MintResult<u64> {
        let mut state = self.state.lock();
        state.record("get_minimum_balance_for_rent_exemption");
        state.rent_queries.push(size);
        if state.fail_rent {
            return Err(MintError::BalanceQueryFailure(format!(
                "mock rent query failed for {} bytes",
                size
            )));
        }
        Ok(mock_rent(size))
    }

    async fn get_account_executable(&self, address: &Pubkey) -> MintResult<Option<bool>> {
        let mut state = self.state.lock();
        state.record("get_account_executable");
        Ok(state.executables.get(address).copied())
    }

    async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> MintResult<Signature> {
        let mut state = self.state.lock();
        state.record("request_airdrop");
        if let Some(err) = state.airdrop_error.take() {
            return Err(err);
        }
        state.airdrops.push((*address, lamports));
        if state.airdrop_credits {
            *state.balances.entry(*address).or_insert(0) += lamports;
        }
        Ok(Signature::new_unique())
    }

    async fn confirm_transaction(&self, _signature: &Signature) -> MintResult<bool> {
        let mut state = self.state.lock();
        state.record("confirm_transaction");
        Ok(state.airdrop_confirms)
    }

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        skip_preflight: bool,
    ) -> MintResult<Signature> {
        let mut state = self.state.lock();
        state.record("send_transaction");
        state.send_attempts += 1;
        if let Some(err) = state.send_error.take() {
            return Err(err);
        }
        state.sent.push((transaction.clone(), skip_preflight));
        Ok(transaction.signatures.first().copied().unwrap_or_default())
    }

    async fn get_signature_status(
        &self,
        _signature: &Signature,
    ) -> MintResult<Option<SignatureStatus>> {
        let mut state = self.state.lock();
        state.record("get_signature_status");
        state.status_queries += 1;
        if let Some(scripted) = state.statuses.pop_front() {
            return scripted;
        }
        if state.auto_confirm {
            return Ok(Some(SignatureStatus {
                slot: 1,
                err: None,
                confirmed: true,
            }));
        }
        Ok(None)
    }

    async fn is_blockhash_valid(&self, _blockhash: &Hash) -> MintResult<bool> {
        let mut state = self.state.lock();
        state.record("is_blockhash_valid");
        if let Some(err) = state.blockhash_check_error.take() {
            return Err(err);
        }
        Ok(state.blockhash_valid)
    }
}

/// Rent the mock ledger reports for the mint and token accounts
pub fn mock_rent_requirements() -> RentRequirements {
    RentRequirements {
        mint: mock_rent(82),
        token_account: mock_rent(165),
    }
}

/// Finalized, unsigned mint transaction against a random minter program
pub fn assembled_mint_transaction(payer: &Pubkey, mint: &Pubkey, blockhash: Hash) -> AssembledTransaction {
    let secondary_mint = Pubkey::new_unique();
    let programs = ProgramIds::new(Pubkey::new_unique());
    let derived = DerivedAccounts::resolve(payer, mint, &secondary_mint, &programs)
        .expect("derivation of fixture accounts");
    let factory = InstructionFactory::new(
        *payer,
        *mint,
        secondary_mint,
        DEFAULT_UPDATE_AUTHORITY,
        derived,
        programs,
    );

    let mut assembler = TransactionAssembler::new(*payer, factory.minter_program())
        .with_roles(factory.roles().clone());
    assembler
        .extend(
            factory
                .build_all(&mock_rent_requirements())
                .expect("fixture instructions"),
        )
        .expect("fixture order");
    assembler.finalize(blockhash).expect("fixture finalize")
}
