//! Instruction construction for the mint transaction
//!
//! Five instructions, always applied in this order:
//! 1. create the mint account (system program)
//! 2. initialize it as a zero-decimal mint (token program)
//! 3. create the payer's associated token account
//! 4. mint exactly one token into it
//! 5. call the minter program with the 13-account layout
//!
//! Each builder returns an immutable `Instruction`; the assembler owns the
//! ordering.

use std::fmt;

use solana_sdk::{instruction::Instruction, pubkey::Pubkey, system_instruction};
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::Mint;

use crate::derive::DerivedAccounts;
use crate::errors::{MintError, MintResult};
use crate::programs::ProgramIds;
use crate::rent::RentRequirements;
use crate::tx_builder::accounts::{build_account_metas, RoleAddresses};

/// Decimals of the newly created mint
pub const MINT_DECIMALS: u8 = 0;

/// Units minted into the payer's associated account
pub const MINT_AMOUNT: u64 = 1;

/// The five instruction kinds, in application order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionKind {
    CreateAccount,
    InitializeMint,
    CreateAssociatedAccount,
    MintTo,
    CustomInvoke,
}

impl InstructionKind {
    /// Fixed application order
    pub const ORDER: [InstructionKind; 5] = [
        InstructionKind::CreateAccount,
        InstructionKind::InitializeMint,
        InstructionKind::CreateAssociatedAccount,
        InstructionKind::MintTo,
        InstructionKind::CustomInvoke,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateAccount => "create_account",
            Self::InitializeMint => "initialize_mint",
            Self::CreateAssociatedAccount => "create_associated_account",
            Self::MintTo => "mint_to",
            Self::CustomInvoke => "custom_invoke",
        }
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds every instruction of one mint transaction from resolved inputs
#[derive(Debug, Clone)]
pub struct InstructionFactory {
    payer: Pubkey,
    mint: Pubkey,
    programs: ProgramIds,
    derived: DerivedAccounts,
    roles: RoleAddresses,
}

impl InstructionFactory {
    pub fn new(
        payer: Pubkey,
        mint: Pubkey,
        secondary_mint: Pubkey,
        update_authority: Pubkey,
        derived: DerivedAccounts,
        programs: ProgramIds,
    ) -> Self {
        let roles = RoleAddresses::for_mint(
            &payer,
            &mint,
            &secondary_mint,
            &update_authority,
            &derived,
            &programs,
        );
        Self {
            payer,
            mint,
            programs,
            derived,
            roles,
        }
    }

    /// Addresses per role of the minter instruction
    pub fn roles(&self) -> &RoleAddresses {
        &self.roles
    }

    pub fn minter_program(&self) -> Pubkey {
        self.programs.minter
    }

    /// Allocate the mint account, funded with its rent-exempt minimum
    pub fn create_account(&self, mint_rent: u64) -> MintResult<Instruction> {
        if mint_rent == 0 {
            return Err(MintError::instruction_failed(
                InstructionKind::CreateAccount.as_str(),
                "rent-exempt balance for the mint account is missing",
            ));
        }
        Ok(system_instruction::create_account(
            &self.payer,
            &self.mint,
            mint_rent,
            Mint::LEN as u64,
            &spl_token::id(),
        ))
    }

    /// Zero decimals, payer as mint authority, no freeze authority
    pub fn initialize_mint(&self) -> MintResult<Instruction> {
        spl_token::instruction::initialize_mint(
            &spl_token::id(),
            &self.mint,
            &self.payer,
            None,
            MINT_DECIMALS,
        )
        .map_err(|e| {
            MintError::instruction_failed(InstructionKind::InitializeMint.as_str(), e.to_string())
        })
    }

    /// Payer's associated token account for the new mint
    pub fn create_associated_account(&self) -> MintResult<Instruction> {
        let ix = spl_associated_token_account::instruction::create_associated_token_account(
            &self.payer,
            &self.payer,
            &self.mint,
            &spl_token::id(),
        );

        // The library derives the address itself; it has to agree with ours
        let target = ix.accounts.get(1).map(|meta| meta.pubkey);
        if target != Some(self.derived.associated_token.address) {
            return Err(MintError::instruction_failed(
                InstructionKind::CreateAssociatedAccount.as_str(),
                format!(
                    "associated account mismatch: derived {}, instruction targets {:?}",
                    self.derived.associated_token.address, target
                ),
            ));
        }
        Ok(ix)
    }

    /// Mint exactly one unit into the associated account
    pub fn mint_to(&self) -> MintResult<Instruction> {
        spl_token::instruction::mint_to(
            &spl_token::id(),
            &self.mint,
            &self.derived.associated_token.address,
            &self.payer,
            &[],
            MINT_AMOUNT,
        )
        .map_err(|e| MintError::instruction_failed(InstructionKind::MintTo.as_str(), e.to_string()))
    }

    /// Minter program call; the program takes no instruction data
    pub fn custom_invoke(&self) -> MintResult<Instruction> {
        let accounts = build_account_metas(&self.roles)?;
        Ok(Instruction::new_with_bytes(self.programs.minter, &[], accounts))
    }

    /// All five instructions in application order
    pub fn build_all(&self, rent: &RentRequirements) -> MintResult<Vec<(InstructionKind, Instruction)>> {
        Ok(vec![
            (InstructionKind::CreateAccount, self.create_account(rent.mint)?),
            (InstructionKind::InitializeMint, self.initialize_mint()?),
            (
                InstructionKind::CreateAssociatedAccount,
                self.create_associated_account()?,
            ),
            (InstructionKind::MintTo, self.mint_to()?),
            (InstructionKind::CustomInvoke, self.custom_invoke()?),
        ])
    }
}
