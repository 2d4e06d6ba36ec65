//! Mint session: the explicit context driving one mint end to end
//!
//! A session owns the ledger handle, the payer and the program ids. Each call
//! to [`MintSession::run`] derives addresses, fetches rent, assembles and
//! prices the five instructions, funds the payer, then attaches a fresh
//! blockhash and submits.

use std::sync::Arc;

use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use tracing::{debug, info, Instrument};

use crate::config::Config;
use crate::derive::DerivedAccounts;
use crate::errors::{MintError, MintResult};
use crate::funding::{ensure_funded, FundingOptions, FundingOutcome};
use crate::ledger::LedgerClient;
use crate::metrics::{metrics, Timer};
use crate::observability::TraceContext;
use crate::programs::{ProgramIds, DEFAULT_UPDATE_AUTHORITY};
use crate::rent::RentRequirements;
use crate::submit::{SubmitOptions, Submitter, TransactionReceipt};
use crate::tx_builder::{AssembledTransaction, InstructionFactory, TransactionAssembler};

/// Per-mint inputs that are not keys the session holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintSettings {
    /// Existing token the minter program burns
    pub secondary_mint: Pubkey,
    /// Update authority handed to the minter program
    pub update_authority: Pubkey,
    pub submit: SubmitOptions,
    pub funding: FundingOptions,
}

impl MintSettings {
    pub fn new(secondary_mint: Pubkey) -> Self {
        Self {
            secondary_mint,
            update_authority: DEFAULT_UPDATE_AUTHORITY,
            submit: SubmitOptions::default(),
            funding: FundingOptions::default(),
        }
    }

    pub fn from_config(config: &Config) -> MintResult<Self> {
        Ok(Self {
            secondary_mint: config.secondary_mint()?,
            update_authority: config.update_authority()?,
            submit: config.submit_options(),
            funding: config.funding_options(),
        })
    }
}

/// Built transaction plus the balances it needs, before funding and signing
#[derive(Debug, Clone)]
pub struct PreparedMint {
    pub mint: Pubkey,
    pub derived: DerivedAccounts,
    pub rent: RentRequirements,
    /// Network fee for the finalized message
    pub fee: u64,
    pub assembled: AssembledTransaction,
    assembler: TransactionAssembler,
}

impl PreparedMint {
    /// Fee plus the rent of both accounts the transaction creates
    pub fn required_lamports(&self) -> u64 {
        self.fee.saturating_add(self.rent.total())
    }

    /// Re-finalize the same instructions against `blockhash`
    pub fn refresh(&mut self, blockhash: Hash) -> MintResult<()> {
        self.assembled = self.assembler.finalize(blockhash)?;
        Ok(())
    }
}

/// Result of a confirmed mint
#[derive(Debug, Clone)]
pub struct MintOutcome {
    pub mint: Pubkey,
    pub associated_token: Pubkey,
    pub funding: FundingOutcome,
    pub receipt: TransactionReceipt,
}

pub struct MintSession {
    ledger: Arc<dyn LedgerClient>,
    payer: Arc<Keypair>,
    programs: ProgramIds,
    settings: MintSettings,
    trace: TraceContext,
}

impl MintSession {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        payer: Arc<Keypair>,
        programs: ProgramIds,
        settings: MintSettings,
    ) -> Self {
        Self {
            ledger,
            payer,
            programs,
            settings,
            trace: TraceContext::new("mint_session"),
        }
    }

    pub fn payer(&self) -> Pubkey {
        self.payer.pubkey()
    }

    pub fn programs(&self) -> &ProgramIds {
        &self.programs
    }

    /// Fail with `ProgramNotDeployed` unless the minter program is executable
    pub async fn ensure_program_deployed(&self) -> MintResult<()> {
        match self.ledger.get_account_executable(&self.programs.minter).await? {
            Some(true) => {
                debug!(program = %self.programs.minter, "Minter program is deployed");
                Ok(())
            }
            _ => Err(MintError::ProgramNotDeployed(self.programs.minter)),
        }
    }

    /// Derive, fetch rent, assemble and price the transaction for `mint`
    pub async fn prepare(&self, mint: &Pubkey) -> MintResult<PreparedMint> {
        let span = self.trace.child_span("prepare").span();
        async {
            let timer = Timer::new();
            let payer = self.payer.pubkey();

            let derived =
                DerivedAccounts::resolve(&payer, mint, &self.settings.secondary_mint, &self.programs)?;
            let rent = RentRequirements::fetch(self.ledger.as_ref()).await?;

            let factory = InstructionFactory::new(
                payer,
                *mint,
                self.settings.secondary_mint,
                self.settings.update_authority,
                derived,
                self.programs,
            );
            let mut assembler = TransactionAssembler::new(payer, self.programs.minter)
                .with_roles(factory.roles().clone());
            assembler.extend(factory.build_all(&rent)?)?;

            let blockhash = self.ledger.get_latest_blockhash().await?;
            let assembled = assembler.finalize(blockhash)?;
            let fee = self.ledger.get_fee_for_message(assembled.message()).await?;
            timer.observe_duration(&metrics().build_latency);

            debug!(
                mint = %mint,
                blockhash = %blockhash,
                fee,
                mint_rent = rent.mint,
                token_account_rent = rent.token_account,
                "Prepared mint transaction"
            );

            Ok::<_, MintError>(PreparedMint {
                mint: *mint,
                derived,
                rent,
                fee,
                assembled,
                assembler,
            })
        }
        .instrument(span)
        .await
    }

    /// Prepare, fund the payer and submit, signed by payer and `mint`
    ///
    /// Funding may wait on an airdrop for up to its confirm timeout, so the
    /// blockhash used for pricing is replaced by a fresh one before signing.
    pub async fn run(&self, mint: &Keypair) -> MintResult<MintOutcome> {
        let span = self.trace.span();
        async {
            let mut prepared = self.prepare(&mint.pubkey()).await?;
            let required = prepared.required_lamports();

            let funding = ensure_funded(
                self.ledger.as_ref(),
                &self.payer.pubkey(),
                required,
                &self.settings.funding,
            )
            .await?;

            let blockhash = self.ledger.get_latest_blockhash().await?;
            prepared.refresh(blockhash)?;
            debug!(blockhash = %blockhash, "Attached fresh blockhash");

            let associated_token = prepared.derived.associated_token.address;
            let submitter = Submitter::new(Arc::clone(&self.ledger), self.settings.submit.clone());
            let signers: [&dyn Signer; 2] = [self.payer.as_ref(), mint];
            let receipt = submitter.submit(prepared.assembled, &signers).await?;

            info!(
                mint = %mint.pubkey(),
                associated_token = %associated_token,
                signature = %receipt.signature,
                "Mint complete"
            );

            Ok::<_, MintError>(MintOutcome {
                mint: mint.pubkey(),
                associated_token,
                funding,
                receipt,
            })
        }
        .instrument(span)
        .await
    }

    /// Run with a freshly generated mint keypair
    pub async fn mint_new(&self) -> MintResult<MintOutcome> {
        let mint = Keypair::new();
        self.run(&mint).await
    }
}
