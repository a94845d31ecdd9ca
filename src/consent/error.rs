use std::time::Duration;

use alloy::primitives::Address;

use crate::chain::{ChainError, RevertReason, SubmitError, TxHash};
use crate::consent::TermsError;
use crate::contract::{InterfaceError, ProxyError};

/// How far a write got before it failed. Anything other than [`Submission::NotSubmitted`] means
/// a transaction exists on the network and retrying blindly may apply it twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    NotSubmitted,

    /// Handed to the node, which never confirmed accepting it. A transaction may or may not
    /// exist.
    Unknown,

    /// Accepted by the node, outcome unknown.
    Pending(TxHash),

    Included(TxHash),
}

#[derive(Debug, thiserror::Error)]
pub enum ConsentError {
    #[error("unable to reach the chain node: {source}")]
    Connection {
        source: ChainError,
        submission: Submission,
    },

    #[error("consent record creation {tx_hash} failed: {reason}")]
    CreationFailed { tx_hash: TxHash, reason: RevertReason },

    #[error(transparent)]
    Interface(#[from] InterfaceError),

    #[error("invalid consent terms: {0}")]
    InvalidTerms(#[from] TermsError),

    /// The node returned something that doesn't make sense for the request.
    #[error("unexpected response from the chain node: {source}")]
    Protocol {
        source: ChainError,
        tx_hash: Option<TxHash>,
    },

    #[error("consent contract refused to answer {method}: {reason}")]
    ReadRejected { method: String, reason: RevertReason },

    #[error("no consent record deployed at {0}")]
    RecordNotFound(Address),

    /// The node turned the transaction away before it was ever included.
    #[error("node refused the transaction: {source}")]
    Refused {
        reason: Option<RevertReason>,
        source: ChainError,
    },

    #[error("no receipt for {tx_hash} after {waited:?}, it may still be included")]
    Timeout { tx_hash: TxHash, waited: Duration },

    /// The node may have received the transaction but never confirmed it. Check the record
    /// before submitting again.
    #[error("submission unconfirmed, the transaction may or may not exist: {source}")]
    Unconfirmed { source: ChainError },

    #[error("transaction {tx_hash} rejected by the consent contract: {reason}")]
    TransactionRejected { tx_hash: TxHash, reason: RevertReason },
}

impl ConsentError {
    /// The revert reason reported by the contract, for failures the contract itself caused.
    pub fn revert_reason(&self) -> Option<&RevertReason> {
        match self {
            ConsentError::CreationFailed { reason, .. }
            | ConsentError::ReadRejected { reason, .. }
            | ConsentError::TransactionRejected { reason, .. } => Some(reason),
            ConsentError::Refused { reason, .. } => reason.as_ref(),
            _ => None,
        }
    }

    pub fn submission(&self) -> Submission {
        match self {
            ConsentError::Connection { submission, .. } => *submission,
            ConsentError::CreationFailed { tx_hash, .. }
            | ConsentError::TransactionRejected { tx_hash, .. } => Submission::Included(*tx_hash),
            ConsentError::Protocol {
                tx_hash: Some(tx_hash),
                ..
            } => Submission::Included(*tx_hash),
            ConsentError::Timeout { tx_hash, .. } => Submission::Pending(*tx_hash),
            ConsentError::Unconfirmed { .. } => Submission::Unknown,
            _ => Submission::NotSubmitted,
        }
    }

    pub(crate) fn from_read(err: ProxyError) -> Self {
        match err {
            ProxyError::Chain(source) => from_chain(source),
            ProxyError::Interface(err) => ConsentError::Interface(err),
            ProxyError::NoCode(address) => ConsentError::RecordNotFound(address),
            ProxyError::CallReverted { method, reason } => {
                ConsentError::ReadRejected { method, reason }
            }
            // Reads never submit anything, these only show up on the write path
            other => ConsentError::from_write(other, WriteKind::Invocation),
        }
    }

    pub(crate) fn from_write(err: ProxyError, kind: WriteKind) -> Self {
        match err {
            ProxyError::Chain(source) => from_chain(source),
            ProxyError::Interface(err) => ConsentError::Interface(err),
            ProxyError::MissingContractAddress(receipt) => ConsentError::Protocol {
                source: ChainError::InvalidResponse(
                    "deployment receipt has no contract address".into(),
                ),
                tx_hash: Some(receipt.transaction_hash),
            },
            ProxyError::NoCode(address) => ConsentError::RecordNotFound(address),
            ProxyError::Reverted { receipt, reason } => match kind {
                WriteKind::Creation => ConsentError::CreationFailed {
                    tx_hash: receipt.transaction_hash,
                    reason,
                },
                WriteKind::Invocation => ConsentError::TransactionRejected {
                    tx_hash: receipt.transaction_hash,
                    reason,
                },
            },
            ProxyError::CallReverted { method, reason } => {
                ConsentError::ReadRejected { method, reason }
            }
            ProxyError::Submit(err) => err.into(),
        }
    }
}

impl From<ChainError> for ConsentError {
    fn from(source: ChainError) -> Self {
        from_chain(source)
    }
}

impl From<SubmitError> for ConsentError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Refused { reason, source } => ConsentError::Refused { reason, source },
            SubmitError::Unreachable(source) => ConsentError::Connection {
                source,
                submission: Submission::NotSubmitted,
            },
            SubmitError::Unconfirmed { source } => ConsentError::Unconfirmed { source },
            SubmitError::ReceiptUnavailable { tx_hash, source } => ConsentError::Connection {
                source,
                submission: Submission::Pending(tx_hash),
            },
            SubmitError::Timeout { tx_hash, waited } => ConsentError::Timeout { tx_hash, waited },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WriteKind {
    Creation,
    Invocation,
}

fn from_chain(source: ChainError) -> ConsentError {
    if source.is_transport() {
        ConsentError::Connection {
            source,
            submission: Submission::NotSubmitted,
        }
    } else {
        ConsentError::Protocol {
            source,
            tx_hash: None,
        }
    }
}
