//! Connectivity to a single blockchain node. Everything that touches the network goes through
//! the [`ChainConnector`] trait, reads as side-effect free calls and writes as transactions that
//! are only considered finished once a receipt with a final status has been observed.

mod error;
mod memory_chain;
mod receipt;
mod revert;
mod submit;
mod traits;
mod transaction;

#[cfg(feature = "rpc")]
mod rpc_connector;

pub use error::ChainError;
pub use memory_chain::MemoryChain;
pub use receipt::{Receipt, ReceiptStatus};
pub use revert::RevertReason;
pub use submit::{submit, SubmitError, SubmitPolicy};
pub use traits::ChainConnector;
pub use transaction::{BlockTag, CallRequest, TransactionRequest, TxHash};

#[cfg(feature = "rpc")]
pub use rpc_connector::RpcConnector;

pub(crate) use revert::{encode_revert_data, revert_reason_from_error};
