//! Program address derivation
//!
//! A program-derived address is a SHA-256 hash of the seeds, a trailing bump
//! byte, the owning program id and a fixed marker, picked so that the result
//! is not a point on the ed25519 curve and therefore has no private key.
//! The bump search walks from 255 down to 0 and accepts the first off-curve
//! candidate, which makes the result a pure function of (seeds, owner).

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;
use tracing::trace;

use crate::errors::MintResult;
use crate::programs::{ProgramIds, AUTHORITY_SEED, METADATA_SEED};

/// Maximum length of a single seed in bytes
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds, including the bump
pub const MAX_SEEDS: usize = 16;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Errors produced while deriving a program address
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeriveError {
    /// Every bump from 255 to 0 produced an on-curve point
    #[error("no valid bump found")]
    NoValidBumpFound,

    /// A seed is too long or there are too many seeds
    #[error("seed limits exceeded: {0}")]
    MaxSeedLengthExceeded(String),
}

/// Derive the program address and bump for `seeds` under `owner`
pub fn derive(seeds: &[&[u8]], owner: &Pubkey) -> Result<(Pubkey, u8), DeriveError> {
    // The bump occupies one seed slot
    if seeds.len() >= MAX_SEEDS {
        return Err(DeriveError::MaxSeedLengthExceeded(format!(
            "{} seeds given, at most {} allowed",
            seeds.len(),
            MAX_SEEDS - 1
        )));
    }
    if let Some((idx, seed)) = seeds
        .iter()
        .enumerate()
        .find(|(_, seed)| seed.len() > MAX_SEED_LEN)
    {
        return Err(DeriveError::MaxSeedLengthExceeded(format!(
            "seed {} is {} bytes, at most {} allowed",
            idx,
            seed.len(),
            MAX_SEED_LEN
        )));
    }

    for bump in (0..=u8::MAX).rev() {
        let candidate = hash_candidate(seeds, bump, owner);
        if !candidate.is_on_curve() {
            return Ok((candidate, bump));
        }
    }

    Err(DeriveError::NoValidBumpFound)
}

fn hash_candidate(seeds: &[&[u8]], bump: u8, owner: &Pubkey) -> Pubkey {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update([bump]);
    hasher.update(owner.as_ref());
    hasher.update(PDA_MARKER);
    let bytes: [u8; 32] = hasher.finalize().into();
    Pubkey::new_from_array(bytes)
}

/// Per-build memo of derivations
///
/// Lives for a single `DerivedAccounts::resolve` call. Results depend only on
/// their inputs, so there is nothing to invalidate; the cache is simply not
/// carried across transactions.
#[derive(Debug, Default)]
pub struct DerivationCache {
    entries: HashMap<(Vec<Vec<u8>>, Pubkey), DerivedAddress>,
    hits: usize,
}

impl DerivationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive through the cache
    pub fn derive(&mut self, seeds: &[&[u8]], owner: &Pubkey) -> Result<DerivedAddress, DeriveError> {
        let key = (seeds.iter().map(|s| s.to_vec()).collect::<Vec<_>>(), *owner);
        if let Some(found) = self.entries.get(&key) {
            self.hits += 1;
            return Ok(*found);
        }
        let (address, bump) = derive(seeds, owner)?;
        let derived = DerivedAddress { address, bump };
        self.entries.insert(key, derived);
        Ok(derived)
    }

    /// Number of lookups answered without hashing
    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A derived address together with its bump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub bump: u8,
}

/// Metadata record address for `mint`
pub fn metadata_address(
    cache: &mut DerivationCache,
    metadata_program: &Pubkey,
    mint: &Pubkey,
) -> Result<DerivedAddress, DeriveError> {
    cache.derive(
        &[METADATA_SEED, metadata_program.as_ref(), mint.as_ref()],
        metadata_program,
    )
}

/// Signing authority the minter program uses for its metadata CPIs
pub fn authority_address(
    cache: &mut DerivationCache,
    minter_program: &Pubkey,
) -> Result<DerivedAddress, DeriveError> {
    cache.derive(
        &[AUTHORITY_SEED, minter_program.as_ref(), AUTHORITY_SEED],
        minter_program,
    )
}

/// Associated token account of `wallet` for `mint`
pub fn associated_token_address(
    cache: &mut DerivationCache,
    wallet: &Pubkey,
    mint: &Pubkey,
) -> Result<DerivedAddress, DeriveError> {
    let token_program = spl_token::id();
    cache.derive(
        &[wallet.as_ref(), token_program.as_ref(), mint.as_ref()],
        &spl_associated_token_account::id(),
    )
}

/// Every derived address the mint transaction references, one field per role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedAccounts {
    /// Metadata record of the new mint
    pub metadata: DerivedAddress,
    /// Minter program authority
    pub authority: DerivedAddress,
    /// Payer's associated token account for the new mint
    pub associated_token: DerivedAddress,
    /// Metadata record of the secondary mint
    pub secondary_metadata: DerivedAddress,
    /// Payer's associated token account for the secondary mint
    pub secondary_associated_token: DerivedAddress,
}

impl DerivedAccounts {
    /// Resolve all five derived addresses for one transaction build
    pub fn resolve(
        payer: &Pubkey,
        mint: &Pubkey,
        secondary_mint: &Pubkey,
        programs: &ProgramIds,
    ) -> MintResult<Self> {
        let mut cache = DerivationCache::new();

        let accounts = Self {
            metadata: metadata_address(&mut cache, &programs.metadata, mint)?,
            authority: authority_address(&mut cache, &programs.minter)?,
            associated_token: associated_token_address(&mut cache, payer, mint)?,
            secondary_metadata: metadata_address(&mut cache, &programs.metadata, secondary_mint)?,
            secondary_associated_token: associated_token_address(&mut cache, payer, secondary_mint)?,
        };

        trace!(
            derivations = cache.len(),
            cache_hits = cache.hits(),
            metadata = %accounts.metadata.address,
            authority = %accounts.authority.address,
            associated_token = %accounts.associated_token.address,
            "Resolved derived accounts"
        );

        Ok(accounts)
    }
}
