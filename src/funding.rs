//! Payer funding: balance check, airdrop of the shortfall, re-check

use std::time::Duration;

use solana_sdk::{pubkey::Pubkey, signature::Signature};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::errors::{MintError, MintResult};
use crate::ledger::LedgerClient;
use crate::metrics::metrics;

/// How the payer may be topped up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingOptions {
    /// Request an airdrop when the balance is short
    pub airdrop: bool,
    pub poll_interval: Duration,
    /// Upper bound on waiting for the airdrop to confirm
    pub confirm_timeout: Duration,
}

impl Default for FundingOptions {
    fn default() -> Self {
        Self {
            airdrop: true,
            poll_interval: Duration::from_millis(500),
            confirm_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundingOutcome {
    /// Balance already covered the requirement
    AlreadyFunded { balance: u64 },
    /// An airdrop closed the gap
    Airdropped { lamports: u64, balance: u64 },
}

impl FundingOutcome {
    pub fn balance(&self) -> u64 {
        match self {
            Self::AlreadyFunded { balance } | Self::Airdropped { balance, .. } => *balance,
        }
    }
}

/// Make sure `payer` holds at least `required` lamports
///
/// When short and airdrops are enabled, requests exactly the shortfall,
/// waits for it to confirm and reads the balance again.
#[instrument(skip_all, fields(payer = %payer, required = required))]
pub async fn ensure_funded(
    ledger: &dyn LedgerClient,
    payer: &Pubkey,
    required: u64,
    options: &FundingOptions,
) -> MintResult<FundingOutcome> {
    let balance = ledger.get_balance(payer).await?;
    if balance >= required {
        debug!(balance, required, "Payer already funded");
        return Ok(FundingOutcome::AlreadyFunded { balance });
    }

    let shortfall = required - balance;
    if !options.airdrop {
        return Err(MintError::InsufficientFunds {
            required,
            available: balance,
        });
    }

    info!(balance, required, shortfall, "Requesting airdrop");
    metrics().airdrops_requested.inc();
    metrics().airdrop_lamports.inc_by(shortfall);

    let signature = match ledger.request_airdrop(payer, shortfall).await {
        Ok(signature) => signature,
        Err(err) => {
            warn!(error = %err, "Airdrop request failed");
            return Err(MintError::InsufficientFunds {
                required,
                available: balance,
            });
        }
    };

    if !wait_for_airdrop(ledger, &signature, options).await? {
        warn!(signature = %signature, "Airdrop not confirmed in time, re-checking balance");
    }

    let balance = ledger.get_balance(payer).await?;
    if balance < required {
        return Err(MintError::InsufficientFunds {
            required,
            available: balance,
        });
    }

    info!(balance, lamports = shortfall, "Payer funded by airdrop");
    Ok(FundingOutcome::Airdropped {
        lamports: shortfall,
        balance,
    })
}

async fn wait_for_airdrop(
    ledger: &dyn LedgerClient,
    signature: &Signature,
    options: &FundingOptions,
) -> MintResult<bool> {
    let started = Instant::now();
    let mut interval = tokio::time::interval(options.poll_interval);

    loop {
        interval.tick().await;
        match ledger.confirm_transaction(signature).await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(err) if err.is_retryable() => {
                debug!(error = %err, "Airdrop status query failed");
            }
            Err(err) => return Err(err),
        }
        if started.elapsed() >= options.confirm_timeout {
            return Ok(false);
        }
    }
}
