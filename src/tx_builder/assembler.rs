//! Ordered assembly of the mint transaction
//!
//! The network executes instructions strictly in list order and later
//! instructions depend on accounts created by earlier ones, so the assembler
//! only accepts the next expected [`InstructionKind`]. The minter instruction
//! is checked against the account template when it is appended.

use solana_sdk::{
    hash::Hash, instruction::Instruction, pubkey::Pubkey, system_program,
    transaction::Transaction,
};
use tracing::debug;

use crate::errors::{MintError, MintResult};
use crate::tx_builder::accounts::{verify_account_metas, RoleAddresses};
use crate::tx_builder::instructions::InstructionKind;
use crate::tx_builder::output::AssembledTransaction;

/// Builder for the one mint transaction
#[derive(Debug, Clone)]
pub struct TransactionAssembler {
    payer: Pubkey,
    minter_program: Pubkey,
    roles: Option<RoleAddresses>,
    steps: Vec<(InstructionKind, Instruction)>,
}

impl TransactionAssembler {
    /// Start an empty transaction paid for by `payer`
    pub fn new(payer: Pubkey, minter_program: Pubkey) -> Self {
        Self {
            payer,
            minter_program,
            roles: None,
            steps: Vec::with_capacity(InstructionKind::ORDER.len()),
        }
    }

    /// Also check minter instruction addresses, not just flags
    pub fn with_roles(mut self, roles: RoleAddresses) -> Self {
        self.roles = Some(roles);
        self
    }

    /// Kind the next `append` must supply, `None` once complete
    pub fn next_expected(&self) -> Option<InstructionKind> {
        InstructionKind::ORDER.get(self.steps.len()).copied()
    }

    /// Append the next instruction
    pub fn append(&mut self, kind: InstructionKind, instruction: Instruction) -> MintResult<&mut Self> {
        let expected = self.next_expected().ok_or_else(|| {
            MintError::invalid_order(format!(
                "transaction already holds {} instructions, cannot append {}",
                InstructionKind::ORDER.len(),
                kind
            ))
        })?;

        if kind != expected {
            return Err(MintError::invalid_order(format!(
                "expected {} at position {}, got {}",
                expected,
                self.steps.len(),
                kind
            )));
        }

        if kind == InstructionKind::CustomInvoke {
            if instruction.program_id != self.minter_program {
                return Err(MintError::instruction_failed(
                    kind.as_str(),
                    format!(
                        "targets {}, expected minter program {}",
                        instruction.program_id, self.minter_program
                    ),
                ));
            }
            verify_account_metas(&instruction.accounts, self.roles.as_ref())?;
        }

        debug!(position = self.steps.len(), kind = %kind, "Appended instruction");
        self.steps.push((kind, instruction));
        Ok(self)
    }

    /// Append several instructions in the order given
    pub fn extend(
        &mut self,
        steps: impl IntoIterator<Item = (InstructionKind, Instruction)>,
    ) -> MintResult<&mut Self> {
        for (kind, instruction) in steps {
            self.append(kind, instruction)?;
        }
        Ok(self)
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.steps.iter().map(|(_, ix)| ix)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Attach `blockhash` and produce the unsigned transaction
    ///
    /// Staleness of the blockhash is only detectable by the network and is
    /// reported at submission.
    pub fn finalize(&self, blockhash: Hash) -> MintResult<AssembledTransaction> {
        if let Some(missing) = self.next_expected() {
            return Err(MintError::invalid_order(format!(
                "transaction incomplete: {} of {} instructions, next expected {}",
                self.steps.len(),
                InstructionKind::ORDER.len(),
                missing
            )));
        }

        let instructions: Vec<Instruction> = self.instructions().cloned().collect();
        sanity_check_ix_order(&instructions, &self.minter_program)?;

        let mut tx = Transaction::new_with_payer(&instructions, Some(&self.payer));
        tx.message.recent_blockhash = blockhash;

        let kinds = self.steps.iter().map(|(kind, _)| *kind).collect();
        Ok(AssembledTransaction::new(tx, kinds))
    }
}

/// Validate target programs of a complete instruction list
///
/// Expected: system, token, associated-token, token, minter.
pub fn sanity_check_ix_order(instructions: &[Instruction], minter_program: &Pubkey) -> MintResult<()> {
    let expected = [
        system_program::id(),
        spl_token::id(),
        spl_associated_token_account::id(),
        spl_token::id(),
        *minter_program,
    ];

    if instructions.len() != expected.len() {
        return Err(MintError::invalid_order(format!(
            "expected {} instructions, got {}",
            expected.len(),
            instructions.len()
        )));
    }

    for (idx, (ix, program)) in instructions.iter().zip(expected.iter()).enumerate() {
        if ix.program_id != *program {
            return Err(MintError::invalid_order(format!(
                "instruction {} targets {}, expected {}",
                idx, ix.program_id, program
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::DerivedAccounts;
    use crate::programs::{ProgramIds, DEFAULT_UPDATE_AUTHORITY};
    use crate::rent::RentRequirements;
    use crate::tx_builder::instructions::InstructionFactory;

    struct Fixture {
        payer: Pubkey,
        mint: Pubkey,
        factory: InstructionFactory,
    }

    fn fixture() -> Fixture {
        let payer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let secondary = Pubkey::new_unique();
        let programs = ProgramIds::new(Pubkey::new_unique());
        let derived = DerivedAccounts::resolve(&payer, &mint, &secondary, &programs).unwrap();
        let factory = InstructionFactory::new(
            payer,
            mint,
            secondary,
            DEFAULT_UPDATE_AUTHORITY,
            derived,
            programs,
        );
        Fixture {
            payer,
            mint,
            factory,
        }
    }

    fn rent() -> RentRequirements {
        RentRequirements {
            mint: 1_461_600,
            token_account: 2_039_280,
        }
    }

    fn assembler(f: &Fixture) -> TransactionAssembler {
        TransactionAssembler::new(f.payer, f.factory.minter_program())
            .with_roles(f.factory.roles().clone())
    }

    #[test]
    fn test_finalize_preserves_order() {
        let f = fixture();
        let built = f.factory.build_all(&rent()).unwrap();
        let originals: Vec<Instruction> = built.iter().map(|(_, ix)| ix.clone()).collect();

        let mut asm = assembler(&f);
        asm.extend(built).unwrap();
        let blockhash = Hash::new_unique();
        let output = asm.finalize(blockhash).unwrap();

        assert_eq!(output.blockhash, blockhash);
        assert_eq!(output.kinds, InstructionKind::ORDER.to_vec());
        assert_eq!(output.tx.message.instructions.len(), 5);

        // Decompile and compare with what was appended
        let keys = &output.tx.message.account_keys;
        for (compiled, original) in output.tx.message.instructions.iter().zip(originals.iter()) {
            assert_eq!(keys[compiled.program_id_index as usize], original.program_id);
            assert_eq!(compiled.data, original.data);
            let accounts: Vec<Pubkey> = compiled
                .accounts
                .iter()
                .map(|i| keys[*i as usize])
                .collect();
            let expected: Vec<Pubkey> = original.accounts.iter().map(|m| m.pubkey).collect();
            assert_eq!(accounts, expected);
        }
    }

    #[test]
    fn test_required_signers_are_payer_and_mint() {
        let f = fixture();
        let mut asm = assembler(&f);
        asm.extend(f.factory.build_all(&rent()).unwrap()).unwrap();

        let output = asm.finalize(Hash::new_unique()).unwrap();

        assert_eq!(output.required_signers(), &[f.payer, f.mint]);
        assert_eq!(output.fee_payer(), Some(&f.payer));
    }

    #[test]
    fn test_out_of_order_append_rejected() {
        let f = fixture();
        let mut asm = assembler(&f);

        let result = asm.append(InstructionKind::InitializeMint, f.factory.initialize_mint().unwrap());
        assert!(matches!(result, Err(MintError::InvalidInstructionOrder(_))));
        assert!(asm.is_empty());
    }

    #[test]
    fn test_append_after_complete_rejected() {
        let f = fixture();
        let mut asm = assembler(&f);
        asm.extend(f.factory.build_all(&rent()).unwrap()).unwrap();

        let result = asm.append(InstructionKind::CustomInvoke, f.factory.custom_invoke().unwrap());
        assert!(matches!(result, Err(MintError::InvalidInstructionOrder(_))));
    }

    #[test]
    fn test_incomplete_finalize_rejected() {
        let f = fixture();
        let mut asm = assembler(&f);
        asm.append(InstructionKind::CreateAccount, f.factory.create_account(1).unwrap())
            .unwrap();

        let result = asm.finalize(Hash::new_unique());
        match result {
            Err(MintError::InvalidInstructionOrder(msg)) => {
                assert!(msg.contains("initialize_mint"));
            }
            other => panic!("Expected InvalidInstructionOrder, got {:?}", other),
        }
    }

    #[test]
    fn test_tampered_custom_instruction_rejected() {
        let f = fixture();
        let mut built = f.factory.build_all(&rent()).unwrap();
        // rent sysvar is read-only in the program layout
        built[4].1.accounts[7].is_writable = true;

        let mut asm = assembler(&f);
        let result = asm.extend(built);

        assert!(matches!(
            result,
            Err(MintError::TemplateMismatch { index: 7, .. })
        ));
        assert_eq!(asm.len(), 4);
    }

    #[test]
    fn test_custom_instruction_wrong_program_rejected() {
        let f = fixture();
        let mut built = f.factory.build_all(&rent()).unwrap();
        built[4].1.program_id = Pubkey::new_unique();

        let result = assembler(&f).extend(built).map(|_| ());
        assert!(matches!(result, Err(MintError::InstructionBuild { .. })));
    }

    #[test]
    fn test_sanity_check_detects_swapped_programs() {
        let f = fixture();
        let mut instructions: Vec<Instruction> = f
            .factory
            .build_all(&rent())
            .unwrap()
            .into_iter()
            .map(|(_, ix)| ix)
            .collect();
        instructions.swap(1, 2);

        let result = sanity_check_ix_order(&instructions, &f.factory.minter_program());
        assert!(matches!(result, Err(MintError::InvalidInstructionOrder(_))));
    }
}
