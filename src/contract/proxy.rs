use std::sync::Arc;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::Address;
use tracing::{debug, warn};

use crate::chain::{
    revert_reason_from_error, submit, BlockTag, CallRequest, ChainConnector, ChainError, Receipt,
    RevertReason, SubmitError, SubmitPolicy, TransactionRequest,
};
use crate::contract::{ContractInterface, InterfaceError};

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Interface(#[from] InterfaceError),

    /// The node reported a successful deployment without telling us where it landed.
    #[error("deployment {} succeeded but the receipt has no contract address", .0.transaction_hash)]
    MissingContractAddress(Receipt),

    /// A read against an address that holds no contract code.
    #[error("no contract code at {0}")]
    NoCode(Address),

    /// The transaction was included in a block but its execution failed.
    #[error("transaction {} reverted: {reason}", .receipt.transaction_hash)]
    Reverted { receipt: Receipt, reason: RevertReason },

    /// A read that the contract itself refused to answer.
    #[error("call to {method} reverted: {reason}")]
    CallReverted { method: String, reason: RevertReason },

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// A deployed contract bound to the connector it lives behind.
pub struct ContractProxy<C: ?Sized> {
    address: Address,
    connector: Arc<C>,
    interface: Arc<ContractInterface>,
}

impl<C: ?Sized> Clone for ContractProxy<C> {
    fn clone(&self) -> Self {
        Self {
            address: self.address,
            connector: self.connector.clone(),
            interface: self.interface.clone(),
        }
    }
}

impl<C: ChainConnector + ?Sized> ContractProxy<C> {
    pub fn address(&self) -> Address {
        self.address
    }

    /// Evaluates a method without creating a transaction.
    pub async fn call(
        &self,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, ProxyError> {
        let data = self.interface.encode_call(method, args)?;
        let request = CallRequest::new(self.address, data);

        let output = match self.connector.call(&request).await {
            Ok(output) => output,
            Err(err) => {
                return match revert_reason_from_error(&err) {
                    Some(reason) => Err(ProxyError::CallReverted {
                        method: method.to_string(),
                        reason,
                    }),
                    None => Err(err.into()),
                }
            }
        };

        let function = self.interface.function(method)?;
        if output.is_empty() && !function.outputs.is_empty() {
            return Err(ProxyError::NoCode(self.address));
        }

        Ok(self.interface.decode_output(method, &output)?)
    }

    /// Submits a new instance of the contract signed by `from` and waits for it to be mined.
    pub async fn deploy(
        connector: Arc<C>,
        interface: Arc<ContractInterface>,
        args: &[DynSolValue],
        from: Address,
        policy: &SubmitPolicy,
    ) -> Result<(Self, Receipt), ProxyError> {
        let data = interface.encode_deployment(args)?;
        let request = TransactionRequest::deployment(from, data);

        let receipt = submit(connector.as_ref(), &request, policy).await?;
        if !receipt.succeeded() {
            let reason = replay_revert_reason(connector.as_ref(), &request, &receipt).await;
            warn!(tx_hash = %receipt.transaction_hash, %reason, "deployment reverted");
            return Err(ProxyError::Reverted { receipt, reason });
        }

        let Some(address) = receipt.contract_address else {
            return Err(ProxyError::MissingContractAddress(receipt));
        };

        debug!(contract = interface.name(), %address, "contract deployed");

        Ok((Self::new(connector, interface, address), receipt))
    }

    pub fn interface(&self) -> &Arc<ContractInterface> {
        &self.interface
    }

    pub fn new(connector: Arc<C>, interface: Arc<ContractInterface>, address: Address) -> Self {
        Self {
            address,
            connector,
            interface,
        }
    }

    /// Submits a state changing invocation signed by `from` and waits for it to be mined. Only a
    /// successful receipt is returned as `Ok`.
    pub async fn transact(
        &self,
        method: &str,
        args: &[DynSolValue],
        from: Address,
        policy: &SubmitPolicy,
    ) -> Result<Receipt, ProxyError> {
        let data = self.interface.encode_call(method, args)?;
        let request = TransactionRequest::invocation(from, self.address, data);

        let receipt = submit(self.connector.as_ref(), &request, policy).await?;
        if !receipt.succeeded() {
            let reason = replay_revert_reason(self.connector.as_ref(), &request, &receipt).await;
            warn!(tx_hash = %receipt.transaction_hash, method, %reason, "transaction reverted");
            return Err(ProxyError::Reverted { receipt, reason });
        }

        Ok(receipt)
    }
}

/// Receipts don't carry revert reasons, running the same payload as a call against the parent
/// block is the only way to learn why it failed.
async fn replay_revert_reason<C: ChainConnector + ?Sized>(
    connector: &C,
    request: &TransactionRequest,
    receipt: &Receipt,
) -> RevertReason {
    let block = BlockTag::Number(receipt.block_number.saturating_sub(1));

    match connector.call(&request.as_replay(block)).await {
        Ok(_) => RevertReason::Opaque,
        Err(err) => revert_reason_from_error(&err).unwrap_or(RevertReason::Opaque),
    }
}
