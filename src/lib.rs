//! Minter client library
//!
//! Builds, signs and submits the single atomic transaction that creates a
//! new one-unit token mint and hands it to a deployed minter program.

pub mod config;
pub mod derive;
pub mod errors;
pub mod funding;
pub mod ledger;
pub mod metrics;
pub mod observability;
pub mod programs;
pub mod rent;
pub mod session;
pub mod submit;
pub mod wallet;

// Modular transaction builder
pub mod tx_builder;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use errors::{MintError, MintResult};
pub use ledger::{LedgerClient, RpcLedger};
pub use session::{MintOutcome, MintSession, MintSettings, PreparedMint};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
