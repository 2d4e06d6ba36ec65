//! Signing, transmission and confirmation polling
//!
//! The submitter never resubmits. Its only loop re-queries the signature
//! status at `poll_interval` until the transaction is confirmed, fails, its
//! blockhash expires, or `confirm_timeout` elapses.

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    signer::Signer,
};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::errors::{MintError, MintResult};
use crate::ledger::{classify_transaction_error, LedgerClient};
use crate::metrics::{metrics, Timer};
use crate::tx_builder::AssembledTransaction;

/// Transmission and polling options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Skip node-side simulation before transmission
    pub skip_preflight: bool,
    /// Delay between status queries
    pub poll_interval: Duration,
    /// Give up waiting after this long
    pub confirm_timeout: Duration,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            skip_preflight: true,
            poll_interval: Duration::from_millis(500),
            confirm_timeout: Duration::from_secs(60),
        }
    }
}

/// Outcome of a confirmed submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub signature: Signature,
    /// Slot reported with the confirmed status
    pub slot: Option<u64>,
    /// Status queries issued before confirmation
    pub polls: u32,
    pub elapsed: Duration,
}

/// Signs, sends and confirms assembled transactions
pub struct Submitter {
    ledger: Arc<dyn LedgerClient>,
    options: SubmitOptions,
}

impl Submitter {
    pub fn new(ledger: Arc<dyn LedgerClient>, options: SubmitOptions) -> Self {
        Self { ledger, options }
    }

    /// Sign with every required signer, transmit and wait for a terminal status
    pub async fn submit(
        &self,
        assembled: AssembledTransaction,
        signers: &[&dyn Signer],
    ) -> MintResult<TransactionReceipt> {
        let result = self.sign_and_send(assembled, signers).await;
        match &result {
            Ok(receipt) => {
                metrics().submissions_confirmed.inc();
                info!(
                    signature = %receipt.signature,
                    slot = ?receipt.slot,
                    polls = receipt.polls,
                    elapsed_ms = receipt.elapsed.as_millis() as u64,
                    "Mint transaction confirmed"
                );
            }
            Err(err) => {
                metrics().record_failure(err.category());
                warn!(error = %err, category = err.category(), "Mint transaction failed");
            }
        }
        result
    }

    async fn sign_and_send(
        &self,
        assembled: AssembledTransaction,
        signers: &[&dyn Signer],
    ) -> MintResult<TransactionReceipt> {
        let available: Vec<Pubkey> = signers.iter().map(|s| s.pubkey()).collect();
        let missing = assembled.missing_signers(&available);
        if !missing.is_empty() {
            return Err(MintError::Signing(format!(
                "missing required signers: {}",
                missing
                    .iter()
                    .map(|k| k.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        // Signers the message does not ask for would make signing fail
        let required: Vec<&dyn Signer> = signers
            .iter()
            .filter(|s| assembled.required_signers().contains(&s.pubkey()))
            .copied()
            .collect();

        let blockhash = assembled.blockhash;
        let mut tx = assembled.into_tx();
        tx.try_sign(&required, blockhash)
            .map_err(|e| MintError::Signing(e.to_string()))?;

        metrics().submissions_total.inc();
        let signature = self
            .ledger
            .send_transaction(&tx, self.options.skip_preflight)
            .await?;
        debug!(
            signature = %signature,
            skip_preflight = self.options.skip_preflight,
            "Transaction transmitted"
        );

        self.await_confirmation(&signature, &blockhash).await
    }

    /// Poll until the signature reaches a terminal status
    #[instrument(skip_all, fields(signature = %signature))]
    pub async fn await_confirmation(
        &self,
        signature: &Signature,
        blockhash: &Hash,
    ) -> MintResult<TransactionReceipt> {
        let timer = Timer::new();
        let started = Instant::now();
        let mut interval = tokio::time::interval(self.options.poll_interval);
        let mut polls = 0u32;

        loop {
            interval.tick().await;
            polls += 1;

            match self.ledger.get_signature_status(signature).await {
                Ok(Some(status)) => {
                    if let Some(err) = status.err {
                        metrics().confirmation_polls.observe(f64::from(polls));
                        return Err(classify_transaction_error(err));
                    }
                    if status.confirmed {
                        timer.observe_duration(&metrics().confirmation_latency);
                        metrics().confirmation_polls.observe(f64::from(polls));
                        return Ok(TransactionReceipt {
                            signature: *signature,
                            slot: Some(status.slot),
                            polls,
                            elapsed: started.elapsed(),
                        });
                    }
                    debug!(slot = status.slot, polls, "Processed, awaiting commitment");
                }
                Ok(None) => match self.ledger.is_blockhash_valid(blockhash).await {
                    Ok(true) => {}
                    // The transaction may have landed right before expiry
                    Ok(false) => match self.ledger.get_signature_status(signature).await {
                        Ok(Some(status)) => {
                            if let Some(err) = status.err {
                                return Err(classify_transaction_error(err));
                            }
                            if status.confirmed {
                                return Ok(TransactionReceipt {
                                    signature: *signature,
                                    slot: Some(status.slot),
                                    polls,
                                    elapsed: started.elapsed(),
                                });
                            }
                        }
                        Ok(None) => {
                            return Err(MintError::StaleBlockhash(format!(
                                "blockhash {} expired before signature {} was observed",
                                blockhash, signature
                            )));
                        }
                        Err(err) if err.is_retryable() => {
                            warn!(error = %err, polls, "Status re-query failed, polling again");
                        }
                        Err(err) => return Err(err),
                    },
                    Err(err) if err.is_retryable() => {
                        warn!(error = %err, polls, "Blockhash validity check failed, polling again");
                    }
                    Err(err) => return Err(err),
                },
                Err(err) if err.is_retryable() => {
                    warn!(error = %err, polls, "Status query failed, polling again");
                }
                Err(err) => return Err(err),
            }

            if started.elapsed() >= self.options.confirm_timeout {
                metrics().confirmation_polls.observe(f64::from(polls));
                return Err(MintError::ConfirmationTimeout {
                    signature: signature.to_string(),
                    elapsed_ms: timer.elapsed_ms(),
                });
            }
        }
    }
}
