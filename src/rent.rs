//! Rent-exempt balances for the accounts a mint transaction creates

use spl_token::solana_program::program_pack::Pack;
use spl_token::state::{Account, Mint};
use tracing::debug;

use crate::errors::MintResult;
use crate::ledger::LedgerClient;

/// Account layouts the transaction allocates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    /// SPL token mint record
    Mint,
    /// SPL token holding account
    TokenAccount,
}

impl AccountKind {
    /// Serialized layout size in bytes
    pub fn size(self) -> usize {
        match self {
            Self::Mint => Mint::LEN,
            Self::TokenAccount => Account::LEN,
        }
    }
}

/// Rent-exempt minimum for an account of `kind`
///
/// Not cached: each build needs at most one lookup per kind.
pub async fn minimum_balance(ledger: &dyn LedgerClient, kind: AccountKind) -> MintResult<u64> {
    let size = kind.size();
    let lamports = ledger.get_minimum_balance_for_rent_exemption(size).await?;
    debug!(kind = ?kind, size, lamports, "Fetched rent-exempt minimum");
    Ok(lamports)
}

/// Rent the payer funds for this transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentRequirements {
    pub mint: u64,
    pub token_account: u64,
}

impl RentRequirements {
    pub async fn fetch(ledger: &dyn LedgerClient) -> MintResult<Self> {
        Ok(Self {
            mint: minimum_balance(ledger, AccountKind::Mint).await?,
            token_account: minimum_balance(ledger, AccountKind::TokenAccount).await?,
        })
    }

    pub fn total(&self) -> u64 {
        self.mint.saturating_add(self.token_account)
    }
}
