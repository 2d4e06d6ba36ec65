//! Mint transaction builder
//!
//! This module turns resolved addresses and rent balances into the single
//! atomic transaction the minter program expects:
//! - **accounts**: the 13-entry account template and its conformance check
//! - **instructions**: the five instruction builders
//! - **assembler**: ordered `append` and blockhash finalization
//! - **output**: the finalized, unsigned transaction and its signer set
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use minter_client::derive::DerivedAccounts;
//! use minter_client::programs::{ProgramIds, DEFAULT_UPDATE_AUTHORITY};
//! use minter_client::rent::RentRequirements;
//! use minter_client::tx_builder::{InstructionFactory, TransactionAssembler};
//! use solana_sdk::{hash::Hash, pubkey::Pubkey};
//!
//! # fn example(payer: Pubkey, mint: Pubkey, secondary: Pubkey, program: Pubkey, rent: RentRequirements, blockhash: Hash)
//! #     -> Result<(), minter_client::MintError> {
//! let programs = ProgramIds::new(program);
//! let derived = DerivedAccounts::resolve(&payer, &mint, &secondary, &programs)?;
//! let factory = InstructionFactory::new(payer, mint, secondary, DEFAULT_UPDATE_AUTHORITY, derived, programs);
//!
//! let mut assembler = TransactionAssembler::new(payer, program).with_roles(factory.roles().clone());
//! assembler.extend(factory.build_all(&rent)?)?;
//! let assembled = assembler.finalize(blockhash)?;
//! assert_eq!(assembled.required_signers(), &[payer, mint]);
//! # Ok(())
//! # }
//! ```

pub mod accounts;
pub mod assembler;
pub mod instructions;
pub mod output;

pub use accounts::{
    build_account_metas, verify_account_metas, AccountRole, RoleAddresses, TemplateEntry,
    MINT_ACCOUNT_TEMPLATE,
};
pub use assembler::{sanity_check_ix_order, TransactionAssembler};
pub use instructions::{InstructionFactory, InstructionKind, MINT_AMOUNT, MINT_DECIMALS};
pub use output::AssembledTransaction;
