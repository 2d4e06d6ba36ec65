//! Account layout of the minter program instruction
//!
//! The minter program reads its accounts positionally, so the order and the
//! signer/writable flags below are a protocol contract. The builder emits the
//! list straight from [`MINT_ACCOUNT_TEMPLATE`] and [`verify_account_metas`]
//! rejects anything that deviates from it, including hand-edited flags.

use std::collections::HashMap;
use std::fmt;

use solana_sdk::{instruction::AccountMeta, pubkey::Pubkey, system_program, sysvar};

use crate::derive::DerivedAccounts;
use crate::errors::{MintError, MintResult};
use crate::programs::ProgramIds;

/// Logical role of each account the minter program expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountRole {
    Payer,
    SecondaryMint,
    SystemProgram,
    AssociatedToken,
    NewMint,
    Metadata,
    MetadataProgram,
    RentSysvar,
    Authority,
    TokenProgram,
    SecondaryMetadata,
    SecondaryAssociatedToken,
    UpdateAuthority,
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Payer => "payer",
            Self::SecondaryMint => "secondary_mint",
            Self::SystemProgram => "system_program",
            Self::AssociatedToken => "associated_token",
            Self::NewMint => "new_mint",
            Self::Metadata => "metadata",
            Self::MetadataProgram => "metadata_program",
            Self::RentSysvar => "rent_sysvar",
            Self::Authority => "authority",
            Self::TokenProgram => "token_program",
            Self::SecondaryMetadata => "secondary_metadata",
            Self::SecondaryAssociatedToken => "secondary_associated_token",
            Self::UpdateAuthority => "update_authority",
        };
        f.write_str(name)
    }
}

/// One slot of the account template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateEntry {
    pub role: AccountRole,
    pub is_signer: bool,
    pub is_writable: bool,
}

const fn entry(role: AccountRole, is_signer: bool, is_writable: bool) -> TemplateEntry {
    TemplateEntry {
        role,
        is_signer,
        is_writable,
    }
}

/// Accounts of the minter instruction, in program order
pub const MINT_ACCOUNT_TEMPLATE: [TemplateEntry; 13] = [
    entry(AccountRole::Payer, true, true),
    entry(AccountRole::SecondaryMint, false, true),
    entry(AccountRole::SystemProgram, false, false),
    entry(AccountRole::AssociatedToken, false, true),
    entry(AccountRole::NewMint, false, true),
    entry(AccountRole::Metadata, false, true),
    entry(AccountRole::MetadataProgram, false, false),
    entry(AccountRole::RentSysvar, false, false),
    entry(AccountRole::Authority, false, true),
    entry(AccountRole::TokenProgram, false, false),
    entry(AccountRole::SecondaryMetadata, false, true),
    entry(AccountRole::SecondaryAssociatedToken, false, true),
    entry(AccountRole::UpdateAuthority, false, true),
];

/// Resolved address per role
#[derive(Debug, Clone, Default)]
pub struct RoleAddresses {
    addresses: HashMap<AccountRole, Pubkey>,
}

impl RoleAddresses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, role: AccountRole, address: Pubkey) -> &mut Self {
        self.addresses.insert(role, address);
        self
    }

    pub fn get(&self, role: AccountRole) -> Option<Pubkey> {
        self.addresses.get(&role).copied()
    }

    /// Fill every role from the transaction participants
    pub fn for_mint(
        payer: &Pubkey,
        mint: &Pubkey,
        secondary_mint: &Pubkey,
        update_authority: &Pubkey,
        derived: &DerivedAccounts,
        programs: &ProgramIds,
    ) -> Self {
        let mut roles = Self::new();
        roles
            .set(AccountRole::Payer, *payer)
            .set(AccountRole::SecondaryMint, *secondary_mint)
            .set(AccountRole::SystemProgram, system_program::id())
            .set(AccountRole::AssociatedToken, derived.associated_token.address)
            .set(AccountRole::NewMint, *mint)
            .set(AccountRole::Metadata, derived.metadata.address)
            .set(AccountRole::MetadataProgram, programs.metadata)
            .set(AccountRole::RentSysvar, sysvar::rent::id())
            .set(AccountRole::Authority, derived.authority.address)
            .set(AccountRole::TokenProgram, spl_token::id())
            .set(AccountRole::SecondaryMetadata, derived.secondary_metadata.address)
            .set(
                AccountRole::SecondaryAssociatedToken,
                derived.secondary_associated_token.address,
            )
            .set(AccountRole::UpdateAuthority, *update_authority);
        roles
    }
}

/// Build the ordered account list from the template
pub fn build_account_metas(roles: &RoleAddresses) -> MintResult<Vec<AccountMeta>> {
    MINT_ACCOUNT_TEMPLATE
        .iter()
        .map(|slot| {
            let address = roles.get(slot.role).ok_or_else(|| {
                MintError::instruction_failed(
                    "custom_invoke",
                    format!("account for role {} is unresolved", slot.role),
                )
            })?;
            Ok(AccountMeta {
                pubkey: address,
                is_signer: slot.is_signer,
                is_writable: slot.is_writable,
            })
        })
        .collect()
}

/// Check an account list against the template
///
/// Length and every flag must match exactly. When `roles` is given, each
/// address must also match its role.
pub fn verify_account_metas(metas: &[AccountMeta], roles: Option<&RoleAddresses>) -> MintResult<()> {
    if metas.len() != MINT_ACCOUNT_TEMPLATE.len() {
        return Err(MintError::template_mismatch(
            metas.len().min(MINT_ACCOUNT_TEMPLATE.len()),
            format!(
                "expected {} accounts, got {}",
                MINT_ACCOUNT_TEMPLATE.len(),
                metas.len()
            ),
        ));
    }

    for (index, (meta, slot)) in metas.iter().zip(MINT_ACCOUNT_TEMPLATE.iter()).enumerate() {
        if meta.is_signer != slot.is_signer {
            return Err(MintError::template_mismatch(
                index,
                format!(
                    "{} must have is_signer={}, got {}",
                    slot.role, slot.is_signer, meta.is_signer
                ),
            ));
        }
        if meta.is_writable != slot.is_writable {
            return Err(MintError::template_mismatch(
                index,
                format!(
                    "{} must have is_writable={}, got {}",
                    slot.role, slot.is_writable, meta.is_writable
                ),
            ));
        }
        if let Some(expected) = roles.and_then(|r| r.get(slot.role)) {
            if meta.pubkey != expected {
                return Err(MintError::template_mismatch(
                    index,
                    format!("{} must be {}, got {}", slot.role, expected, meta.pubkey),
                ));
            }
        }
    }

    Ok(())
}
