use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::chain::{
    revert_reason_from_error, ChainConnector, ChainError, Receipt, RevertReason,
    TransactionRequest, TxHash,
};

/// How transactions are submitted and how long we are willing to wait for them to land.
#[derive(Clone, Debug)]
pub struct SubmitPolicy {
    pub gas_limit: Option<u64>,
    pub poll_interval: Duration,
    pub receipt_timeout: Duration,
}

impl Default for SubmitPolicy {
    fn default() -> Self {
        Self {
            gas_limit: Some(6_000_000),
            poll_interval: Duration::from_millis(250),
            receipt_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The node answered the submission with an error, nothing was included.
    #[error("node refused the transaction: {source}")]
    Refused {
        reason: Option<RevertReason>,
        source: ChainError,
    },

    /// The submission never reached the node.
    #[error("transaction could not be submitted: {0}")]
    Unreachable(ChainError),

    /// The submission was handed to the node but it never confirmed accepting it. The
    /// transaction may or may not exist, look for its effect before submitting again.
    #[error("node never confirmed the transaction submission: {source}")]
    Unconfirmed { source: ChainError },

    /// The transaction was accepted but we lost the node while waiting for its receipt. Its
    /// outcome is unknown.
    #[error("lost contact with node while awaiting receipt for {tx_hash}: {source}")]
    ReceiptUnavailable { tx_hash: TxHash, source: ChainError },

    /// The transaction was accepted but no receipt showed up in time. It may still be included
    /// later, re-query before submitting again.
    #[error("no receipt for {tx_hash} after {waited:?}")]
    Timeout { tx_hash: TxHash, waited: Duration },
}

impl SubmitError {
    /// The hash of the transaction if the node accepted it.
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            SubmitError::Refused { .. }
            | SubmitError::Unreachable(_)
            | SubmitError::Unconfirmed { .. } => None,
            SubmitError::ReceiptUnavailable { tx_hash, .. }
            | SubmitError::Timeout { tx_hash, .. } => Some(*tx_hash),
        }
    }
}

/// Sends a transaction and blocks until it has been included, whatever its status. The policy's
/// `receipt_timeout` bounds the whole exchange, the submission itself included. Dropping the
/// returned future only stops waiting, a transaction that was handed to the node stays submitted.
pub async fn submit<C: ChainConnector + ?Sized>(
    connector: &C,
    request: &TransactionRequest,
    policy: &SubmitPolicy,
) -> Result<Receipt, SubmitError> {
    let deadline = Instant::now() + policy.receipt_timeout;

    let mut request = request.clone();
    if request.gas.is_none() {
        request.gas = policy.gas_limit;
    }

    let sent = tokio::time::timeout_at(deadline, connector.send_transaction(&request)).await;
    let tx_hash = match sent {
        Ok(Ok(tx_hash)) => tx_hash,
        Ok(Err(err)) if err.is_connection() => return Err(SubmitError::Unreachable(err)),
        Ok(Err(err @ ChainError::Rpc { .. })) => {
            let reason = revert_reason_from_error(&err);
            warn!(from = %request.from, ?reason, "transaction refused by node");
            return Err(SubmitError::Refused {
                reason,
                source: err,
            });
        }
        Ok(Err(source)) => {
            warn!(from = %request.from, %source, "transaction submission unconfirmed");
            return Err(SubmitError::Unconfirmed { source });
        }
        Err(_) => {
            warn!(
                from = %request.from,
                waited = ?policy.receipt_timeout,
                "node never answered submission"
            );
            let source = ChainError::Interrupted(format!(
                "no answer to the submission within {:?}",
                policy.receipt_timeout
            ));
            return Err(SubmitError::Unconfirmed { source });
        }
    };

    debug!(
        %tx_hash,
        from = %request.from,
        deployment = request.is_deployment(),
        "transaction submitted"
    );

    let waiting = await_receipt(connector, tx_hash, policy.poll_interval);
    match tokio::time::timeout_at(deadline, waiting).await {
        Ok(Ok(receipt)) => {
            debug!(
                %tx_hash,
                block = receipt.block_number,
                status = ?receipt.status,
                gas_used = receipt.gas_used,
                "transaction included"
            );

            Ok(receipt)
        }
        Ok(Err(source)) => Err(SubmitError::ReceiptUnavailable { tx_hash, source }),
        Err(_) => {
            warn!(%tx_hash, waited = ?policy.receipt_timeout, "gave up waiting for receipt");
            Err(SubmitError::Timeout {
                tx_hash,
                waited: policy.receipt_timeout,
            })
        }
    }
}

async fn await_receipt<C: ChainConnector + ?Sized>(
    connector: &C,
    tx_hash: TxHash,
    poll_interval: Duration,
) -> Result<Receipt, ChainError> {
    loop {
        if let Some(receipt) = connector.transaction_receipt(tx_hash).await? {
            return Ok(receipt);
        }

        trace!(%tx_hash, "receipt not yet available");
        tokio::time::sleep(poll_interval).await;
    }
}
