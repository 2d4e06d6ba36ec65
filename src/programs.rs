//! Program ids and seed constants shared with the on-chain minter program

use solana_sdk::{pubkey, pubkey::Pubkey};

/// Token metadata program that owns metadata records
pub const METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// Update authority the minter program expects at account index 12
pub const DEFAULT_UPDATE_AUTHORITY: Pubkey = pubkey!("VLawmZTgLAbdeqrU579ohsdey9H1h3Mi1UeUJpg2mQB");

/// Tag used by the metadata program for record addresses
pub const METADATA_SEED: &[u8] = b"metadata";

/// Tag the minter program wraps around its own id for the authority address
pub const AUTHORITY_SEED: &[u8] = b"amoebit_minter";

/// Program ids a mint transaction touches, besides the fixed SPL/system ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramIds {
    /// Deployed minter program receiving the custom instruction
    pub minter: Pubkey,
    /// Token metadata program
    pub metadata: Pubkey,
}

impl ProgramIds {
    pub fn new(minter: Pubkey) -> Self {
        Self {
            minter,
            metadata: METADATA_PROGRAM_ID,
        }
    }

    pub fn with_metadata(mut self, metadata: Pubkey) -> Self {
        self.metadata = metadata;
        self
    }
}
