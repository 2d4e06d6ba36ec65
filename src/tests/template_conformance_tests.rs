//! The minter instruction can only reach the network in template shape

use proptest::prelude::*;
use solana_sdk::{hash::Hash, instruction::Instruction, pubkey::Pubkey, sysvar};

use crate::derive::DerivedAccounts;
use crate::errors::MintError;
use crate::programs::{ProgramIds, DEFAULT_UPDATE_AUTHORITY};
use crate::test_utils::mock_rent_requirements;
use crate::tx_builder::{
    AccountRole, InstructionFactory, InstructionKind, TransactionAssembler, MINT_ACCOUNT_TEMPLATE,
};

fn factory() -> InstructionFactory {
    let payer = Pubkey::new_unique();
    let mint = Pubkey::new_unique();
    let secondary = Pubkey::new_unique();
    let programs = ProgramIds::new(Pubkey::new_unique());
    let derived = DerivedAccounts::resolve(&payer, &mint, &secondary, &programs).unwrap();
    InstructionFactory::new(payer, mint, secondary, DEFAULT_UPDATE_AUTHORITY, derived, programs)
}

fn assemble(
    factory: &InstructionFactory,
    steps: Vec<(InstructionKind, Instruction)>,
) -> Result<(), MintError> {
    let payer = factory.roles().get(AccountRole::Payer).unwrap();
    let mut assembler = TransactionAssembler::new(payer, factory.minter_program())
        .with_roles(factory.roles().clone());
    assembler.extend(steps)?;
    assembler.finalize(Hash::new_unique()).map(|_| ())
}

#[test]
fn test_untouched_build_conforms() {
    let factory = factory();
    let steps = factory.build_all(&mock_rent_requirements()).unwrap();
    assert!(assemble(&factory, steps).is_ok());
}

#[test]
fn test_minter_accounts_use_configured_update_authority() {
    let factory = factory();
    let ix = factory.custom_invoke().unwrap();

    assert_eq!(ix.accounts[12].pubkey, DEFAULT_UPDATE_AUTHORITY);
    assert_eq!(ix.accounts[7].pubkey, sysvar::rent::id());
}

#[test]
fn test_swapped_accounts_rejected() {
    let factory = factory();
    let mut steps = factory.build_all(&mock_rent_requirements()).unwrap();
    // metadata and secondary metadata share flags, only addresses differ
    steps[4].1.accounts.swap(5, 10);

    let result = assemble(&factory, steps);
    assert!(matches!(result, Err(MintError::TemplateMismatch { index: 5, .. })));
}

#[test]
fn test_truncated_account_list_rejected() {
    let factory = factory();
    let mut steps = factory.build_all(&mock_rent_requirements()).unwrap();
    steps[4].1.accounts.pop();

    let result = assemble(&factory, steps);
    assert!(matches!(result, Err(MintError::TemplateMismatch { .. })));
}

proptest! {
    #[test]
    fn prop_any_flipped_flag_rejected(index in 0usize..13, flip_signer in any::<bool>()) {
        let factory = factory();
        let mut steps = factory.build_all(&mock_rent_requirements()).unwrap();
        let meta = &mut steps[4].1.accounts[index];
        if flip_signer {
            meta.is_signer = !meta.is_signer;
        } else {
            meta.is_writable = !meta.is_writable;
        }

        let result = assemble(&factory, steps);
        let rejected_at_index = matches!(
            result,
            Err(MintError::TemplateMismatch { index: i, .. }) if i == index
        );
        prop_assert!(rejected_at_index);
        prop_assert_eq!(MINT_ACCOUNT_TEMPLATE.len(), 13);
    }
}
