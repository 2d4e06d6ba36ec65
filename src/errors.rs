//! Error types for the mint client
//!
//! Every failure in the build → sign → submit → confirm pipeline is reported
//! through [`MintError`]. Errors are surfaced to the caller unchanged; the
//! only loop in the crate is confirmation-status polling, which never
//! resubmits.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::derive::DeriveError;

/// Result alias used across the crate
pub type MintResult<T> = std::result::Result<T, MintError>;

/// Comprehensive error type for the mint transaction lifecycle
///
/// Covers address derivation, balance queries, instruction assembly,
/// signing, submission and confirmation.
#[derive(Error, Debug)]
pub enum MintError {
    /// No program address could be derived for a seed set
    #[error("Derivation failed: {0}")]
    Derivation(#[from] DeriveError),

    /// Network unreachable or malformed response while reading a balance
    #[error("Balance query failed: {0}")]
    BalanceQueryFailure(String),

    /// Payer cannot cover fees and rent even after an airdrop attempt
    #[error("Insufficient funds: required {required} lamports, available {available}")]
    InsufficientFunds {
        /// Lamports the transaction needs
        required: u64,
        /// Lamports the payer holds
        available: u64,
    },

    /// An instruction could not be built
    ///
    /// Contains the instruction kind and detailed reason for failure
    #[error("Instruction build error ({instruction}): {reason}")]
    InstructionBuild {
        /// Which of the five instructions failed
        instruction: String,
        /// Detailed reason for the failure
        reason: String,
    },

    /// The minter instruction's account list deviates from the program layout
    #[error("Account template mismatch at index {index}: {reason}")]
    TemplateMismatch {
        /// Position of the first offending entry
        index: usize,
        /// What differs
        reason: String,
    },

    /// Instructions appended out of the fixed application order
    #[error("Invalid instruction order: {0}")]
    InvalidInstructionOrder(String),

    /// The blockhash attached to the transaction is no longer accepted
    #[error("Stale blockhash: {0}")]
    StaleBlockhash(String),

    /// Preflight simulation rejected the transaction
    #[error("Rejected by simulation: {reason}")]
    RejectedBySimulation {
        /// Simulation error as reported by the node
        reason: String,
        /// Program logs captured during simulation
        logs: Vec<String>,
    },

    /// The ledger executed the transaction and an instruction failed
    #[error("Rejected by network (instruction={instruction_index:?}, code={code:?}): {reason}")]
    RejectedByNetwork {
        /// Index of the failing instruction
        instruction_index: Option<u8>,
        /// Program-level custom error code, when the program returned one
        code: Option<u32>,
        /// Full error text from the ledger
        reason: String,
    },

    /// Status still unknown when the wait window closed; caller must re-query
    #[error("Confirmation timed out after {elapsed_ms}ms (signature={signature})")]
    ConfirmationTimeout {
        /// Signature of the transaction in flight
        signature: String,
        /// Time spent polling
        elapsed_ms: u64,
    },

    /// A required signer was missing or signing failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The target program account is absent or not executable
    #[error("Program {0} is not deployed")]
    ProgramNotDeployed(Pubkey),

    /// Any other RPC transport failure
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Invalid configuration values
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Keypair file unreadable or malformed
    #[error("Keypair error: {0}")]
    Keypair(String),
}

impl MintError {
    /// Check if this error is potentially retryable by the caller
    ///
    /// The crate never acts on this itself; it is advice for callers that
    /// implement their own resubmission policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            // Transient failures that may succeed with a fresh attempt
            Self::BalanceQueryFailure(_) => true,
            Self::StaleBlockhash(_) => true,
            Self::Rpc(_) => true,

            // Non-retryable failures
            Self::Derivation(_) => false,
            Self::InsufficientFunds { .. } => false,
            Self::InstructionBuild { .. } => false,
            Self::TemplateMismatch { .. } => false,
            Self::InvalidInstructionOrder(_) => false,
            Self::RejectedBySimulation { .. } => false,
            Self::RejectedByNetwork { .. } => false,
            // Status unknown: resubmitting could double-apply
            Self::ConfirmationTimeout { .. } => false,
            Self::Signing(_) => false,
            Self::ProgramNotDeployed(_) => false,
            Self::Configuration(_) => false,
            Self::Keypair(_) => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::Derivation(_) => "derivation",
            Self::BalanceQueryFailure(_) => "balance",
            Self::InsufficientFunds { .. } => "funds",
            Self::InstructionBuild { .. } => "instruction",
            Self::TemplateMismatch { .. } => "template",
            Self::InvalidInstructionOrder(_) => "validation",
            Self::StaleBlockhash(_) => "blockhash",
            Self::RejectedBySimulation { .. } => "simulation",
            Self::RejectedByNetwork { .. } => "network",
            Self::ConfirmationTimeout { .. } => "timeout",
            Self::Signing(_) => "signing",
            Self::ProgramNotDeployed(_) => "program",
            Self::Rpc(_) => "rpc",
            Self::Configuration(_) => "config",
            Self::Keypair(_) => "keypair",
        }
    }
}

// Convenience constructors for common error scenarios
impl MintError {
    /// Create an instruction build error for a specific instruction kind
    pub fn instruction_failed(instruction: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            instruction: instruction.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid instruction order error
    pub fn invalid_order(reason: impl Into<String>) -> Self {
        Self::InvalidInstructionOrder(reason.into())
    }

    /// Create a template mismatch error
    pub fn template_mismatch(index: usize, reason: impl Into<String>) -> Self {
        Self::TemplateMismatch {
            index,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MintError::instruction_failed("mint_to", "token program rejected args");
        assert_eq!(
            err.to_string(),
            "Instruction build error (mint_to): token program rejected args"
        );

        let err = MintError::InsufficientFunds {
            required: 5000,
            available: 0,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: required 5000 lamports, available 0"
        );
    }

    #[test]
    fn test_error_retryability() {
        assert!(MintError::StaleBlockhash("expired".to_string()).is_retryable());
        assert!(MintError::Rpc("connection reset".to_string()).is_retryable());

        assert!(!MintError::ConfirmationTimeout {
            signature: "sig".to_string(),
            elapsed_ms: 30_000,
        }
        .is_retryable());
        assert!(!MintError::template_mismatch(3, "writable").is_retryable());
        assert!(!MintError::Configuration("test".to_string()).is_retryable());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            MintError::Derivation(DeriveError::NoValidBumpFound).category(),
            "derivation"
        );
        assert_eq!(
            MintError::RejectedByNetwork {
                instruction_index: Some(4),
                code: Some(1),
                reason: "custom program error: 0x1".to_string(),
            }
            .category(),
            "network"
        );
        assert_eq!(MintError::invalid_order("x").category(), "validation");
    }
}
