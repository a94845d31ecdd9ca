use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;

use crate::chain::{CallRequest, ChainError, Receipt, TransactionRequest, TxHash};

/// The minimum a node endpoint has to provide for consent records to be created, read and
/// mutated. Implementations talk to exactly one canonical endpoint, there is no fan-out or
/// consensus between several nodes.
///
/// Implementations must fail fast with [`ChainError::Connection`] when the endpoint is
/// unreachable, report [`ChainError::Interrupted`] once a request may have reached the node
/// without a usable answer, and must not retry on their own. Whether and when to retry is always
/// the caller's decision since blindly resubmitting a transaction can duplicate its effect.
#[async_trait]
pub trait ChainConnector: Send + Sync {
    /// Identities whose transactions the node is able to sign.
    async fn accounts(&self) -> Result<Vec<Address>, ChainError>;

    async fn block_number(&self) -> Result<u64, ChainError>;

    /// Execute a read against chain state. Nothing is persisted and no cost is incurred. An
    /// address without code answers with empty return data rather than an error.
    async fn call(&self, request: &CallRequest) -> Result<Bytes, ChainError>;

    /// The identifier deployment manifests are keyed by (`net_version`).
    async fn network_id(&self) -> Result<String, ChainError>;

    /// Hand a transaction to the node. Success only means the node accepted it into its pool,
    /// inclusion has to be confirmed through [`ChainConnector::transaction_receipt`].
    async fn send_transaction(&self, request: &TransactionRequest) -> Result<TxHash, ChainError>;

    /// Returns `None` while the transaction is still pending or when the node doesn't know it.
    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>, ChainError>;
}
