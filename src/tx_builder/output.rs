//! Finalized, unsigned mint transaction
//!
//! Holds the transaction produced by the assembler together with the
//! signer set the message header requires. The value is single-use: once
//! submitted it is consumed, and a retry needs a fresh blockhash and a new
//! assembly.

use solana_sdk::{hash::Hash, message::Message, pubkey::Pubkey, transaction::Transaction};

use crate::tx_builder::instructions::InstructionKind;

/// Transaction build output
///
/// # Lifecycle
///
/// 1. Created by `TransactionAssembler::finalize` with a recent blockhash
/// 2. Signed and transmitted by the submitter, which takes it by value
#[derive(Debug, Clone)]
pub struct AssembledTransaction {
    /// The built transaction, signatures still empty
    pub tx: Transaction,

    /// Blockhash attached at finalize time
    pub blockhash: Hash,

    /// Accounts that must sign, taken from the message header
    pub required_signers: Vec<Pubkey>,

    /// Instruction kinds in application order
    pub kinds: Vec<InstructionKind>,
}

impl AssembledTransaction {
    /// Create the output and extract the required signers from the header
    pub fn new(tx: Transaction, kinds: Vec<InstructionKind>) -> Self {
        let blockhash = tx.message.recent_blockhash;
        let required_signers = required_signers(&tx.message).to_vec();

        Self {
            tx,
            blockhash,
            required_signers,
            kinds,
        }
    }

    pub fn message(&self) -> &Message {
        &self.tx.message
    }

    /// Consume self and extract the transaction
    pub fn into_tx(self) -> Transaction {
        self.tx
    }

    pub fn required_signers(&self) -> &[Pubkey] {
        &self.required_signers
    }

    /// Required signers not covered by `available`
    pub fn missing_signers(&self, available: &[Pubkey]) -> Vec<Pubkey> {
        self.required_signers
            .iter()
            .filter(|key| !available.contains(key))
            .copied()
            .collect()
    }

    /// Fee payer (first account key)
    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.tx.message.account_keys.first()
    }
}

/// Signer keys are the first `num_required_signatures` account keys
fn required_signers(message: &Message) -> &[Pubkey] {
    let count = usize::from(message.header.num_required_signatures).min(message.account_keys.len());
    &message.account_keys[..count]
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        signature::{Keypair, Signer},
        system_instruction,
    };

    #[test]
    fn test_required_signers_from_header() {
        let payer = Keypair::new();
        let new_account = Keypair::new();
        let ix = system_instruction::create_account(
            &payer.pubkey(),
            &new_account.pubkey(),
            1,
            82,
            &spl_token::id(),
        );
        let mut tx = Transaction::new_with_payer(&[ix], Some(&payer.pubkey()));
        tx.message.recent_blockhash = Hash::new_unique();

        let output = AssembledTransaction::new(tx, vec![InstructionKind::CreateAccount]);

        assert_eq!(output.required_signers().len(), 2);
        assert_eq!(output.fee_payer(), Some(&payer.pubkey()));
        assert_eq!(
            output.missing_signers(&[payer.pubkey()]),
            vec![new_account.pubkey()]
        );
        assert!(output
            .missing_signers(&[payer.pubkey(), new_account.pubkey()])
            .is_empty());
    }
}
