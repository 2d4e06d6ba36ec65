//! Network capability consumed by the mint client
//!
//! [`LedgerClient`] is the seam between the transaction-building core and the
//! cluster. Production code talks to a JSON-RPC node through [`RpcLedger`];
//! tests substitute `MockLedger` from `test_utils`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::{
    client_error::{Error as ClientError, ErrorKind as ClientErrorKind},
    config::RpcSendTransactionConfig,
    request::{RpcError, RpcResponseErrorData},
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::InstructionError,
    message::Message,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};
use tracing::{debug, instrument};

use crate::errors::{MintError, MintResult};

/// Observed status of a submitted signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    /// Slot the transaction was processed in
    pub slot: u64,
    /// Execution error, if the ledger rejected the transaction
    pub err: Option<TransactionError>,
    /// Whether the status satisfies the client's commitment level
    pub confirmed: bool,
}

/// Async capability for everything the client needs from the cluster
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Node software version
    async fn get_version(&self) -> MintResult<String>;

    /// Most recent blockhash at the client's commitment
    async fn get_latest_blockhash(&self) -> MintResult<Hash>;

    /// Fee in lamports the network charges for `message`
    async fn get_fee_for_message(&self, message: &Message) -> MintResult<u64>;

    async fn get_balance(&self, address: &Pubkey) -> MintResult<u64>;

    /// Rent-exempt minimum for an account of `size` bytes
    async fn get_minimum_balance_for_rent_exemption(&self, size: usize) -> MintResult<u64>;

    /// `Some(executable)` when the account exists, `None` otherwise
    async fn get_account_executable(&self, address: &Pubkey) -> MintResult<Option<bool>>;

    async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> MintResult<Signature>;

    /// Single status check; `true` once the signature is confirmed
    async fn confirm_transaction(&self, signature: &Signature) -> MintResult<bool>;

    /// Transmit a signed transaction without waiting for confirmation
    async fn send_transaction(
        &self,
        transaction: &Transaction,
        skip_preflight: bool,
    ) -> MintResult<Signature>;

    async fn get_signature_status(&self, signature: &Signature)
        -> MintResult<Option<SignatureStatus>>;

    async fn is_blockhash_valid(&self, blockhash: &Hash) -> MintResult<bool>;
}

/// [`LedgerClient`] backed by the nonblocking JSON-RPC client
pub struct RpcLedger {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl RpcLedger {
    pub fn new(url: impl Into<String>, timeout: Duration, commitment: CommitmentConfig) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(url.into(), timeout, commitment);
        Self {
            client: Arc::new(client),
            commitment,
        }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    async fn get_version(&self) -> MintResult<String> {
        let version = self.client.get_version().await.map_err(rpc_error)?;
        Ok(version.solana_core)
    }

    async fn get_latest_blockhash(&self) -> MintResult<Hash> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| MintError::Rpc(format!("get_latest_blockhash: {}", e)))
    }

    async fn get_fee_for_message(&self, message: &Message) -> MintResult<u64> {
        self.client
            .get_fee_for_message(message)
            .await
            .map_err(|e| MintError::BalanceQueryFailure(format!("get_fee_for_message: {}", e)))
    }

    async fn get_balance(&self, address: &Pubkey) -> MintResult<u64> {
        self.client
            .get_balance(address)
            .await
            .map_err(|e| MintError::BalanceQueryFailure(format!("get_balance({}): {}", address, e)))
    }

    async fn get_minimum_balance_for_rent_exemption(&self, size: usize) -> MintResult<u64> {
        self.client
            .get_minimum_balance_for_rent_exemption(size)
            .await
            .map_err(|e| {
                MintError::BalanceQueryFailure(format!("rent exemption for {} bytes: {}", size, e))
            })
    }

    async fn get_account_executable(&self, address: &Pubkey) -> MintResult<Option<bool>> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(rpc_error)?;
        Ok(response.value.map(|account| account.executable))
    }

    async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> MintResult<Signature> {
        self.client
            .request_airdrop(address, lamports)
            .await
            .map_err(rpc_error)
    }

    async fn confirm_transaction(&self, signature: &Signature) -> MintResult<bool> {
        let response = self
            .client
            .confirm_transaction_with_commitment(signature, self.commitment)
            .await
            .map_err(rpc_error)?;
        Ok(response.value)
    }

    #[instrument(skip(self, transaction), fields(signature = ?transaction.signatures.first()))]
    async fn send_transaction(
        &self,
        transaction: &Transaction,
        skip_preflight: bool,
    ) -> MintResult<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight,
            preflight_commitment: Some(self.commitment.commitment),
            ..RpcSendTransactionConfig::default()
        };
        self.client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(classify_send_error)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> MintResult<Option<SignatureStatus>> {
        let response = self
            .client
            .get_signature_statuses(&[*signature])
            .await
            .map_err(rpc_error)?;

        Ok(response
            .value
            .into_iter()
            .next()
            .flatten()
            .map(|status| SignatureStatus {
                slot: status.slot,
                confirmed: status.satisfies_commitment(self.commitment),
                err: status.err,
            }))
    }

    async fn is_blockhash_valid(&self, blockhash: &Hash) -> MintResult<bool> {
        self.client
            .is_blockhash_valid(blockhash, self.commitment)
            .await
            .map_err(rpc_error)
    }
}

fn rpc_error(err: ClientError) -> MintError {
    MintError::Rpc(err.to_string())
}

/// Map a send failure onto the mint error taxonomy
///
/// Preflight failures carry a simulation result; an expired blockhash is
/// reported as stale regardless of where it was detected.
pub(crate) fn classify_send_error(err: ClientError) -> MintError {
    let tx_error = err.get_transaction_error();

    if matches!(tx_error, Some(TransactionError::BlockhashNotFound)) {
        return MintError::StaleBlockhash("blockhash not found by the node".to_string());
    }

    if let ClientErrorKind::RpcError(RpcError::RpcResponseError {
        message,
        data: RpcResponseErrorData::SendTransactionPreflightFailure(simulation),
        ..
    }) = err.kind()
    {
        let reason = tx_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| message.clone());
        debug!(reason = %reason, "Preflight simulation rejected transaction");
        return MintError::RejectedBySimulation {
            reason,
            logs: simulation.logs.clone().unwrap_or_default(),
        };
    }

    match tx_error {
        Some(tx_error) => classify_transaction_error(tx_error),
        None => rpc_error(err),
    }
}

/// Map a ledger-reported execution error onto the mint error taxonomy
pub fn classify_transaction_error(err: TransactionError) -> MintError {
    match &err {
        TransactionError::BlockhashNotFound => {
            MintError::StaleBlockhash("blockhash not found by the node".to_string())
        }
        TransactionError::InstructionError(index, instruction_error) => {
            let code = match instruction_error {
                InstructionError::Custom(code) => Some(*code),
                _ => None,
            };
            MintError::RejectedByNetwork {
                instruction_index: Some(*index),
                code,
                reason: err.to_string(),
            }
        }
        _ => MintError::RejectedByNetwork {
            instruction_index: None,
            code: None,
            reason: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_custom_instruction_error() {
        let err = classify_transaction_error(TransactionError::InstructionError(
            4,
            InstructionError::Custom(3),
        ));

        match err {
            MintError::RejectedByNetwork {
                instruction_index,
                code,
                ..
            } => {
                assert_eq!(instruction_index, Some(4));
                assert_eq!(code, Some(3));
            }
            other => panic!("Expected RejectedByNetwork, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_builtin_instruction_error() {
        let err = classify_transaction_error(TransactionError::InstructionError(
            0,
            InstructionError::InsufficientFunds,
        ));
        assert!(matches!(
            err,
            MintError::RejectedByNetwork {
                instruction_index: Some(0),
                code: None,
                ..
            }
        ));
    }

    #[test]
    fn test_classify_blockhash_not_found() {
        let err = classify_transaction_error(TransactionError::BlockhashNotFound);
        assert!(matches!(err, MintError::StaleBlockhash(_)));
    }

    #[test]
    fn test_classify_send_transaction_error() {
        let err = classify_send_error(ClientError::from(TransactionError::BlockhashNotFound));
        assert!(matches!(err, MintError::StaleBlockhash(_)));

        let err = classify_send_error(ClientError::from(TransactionError::AccountInUse));
        assert!(matches!(
            err,
            MintError::RejectedByNetwork {
                instruction_index: None,
                ..
            }
        ));
    }
}
