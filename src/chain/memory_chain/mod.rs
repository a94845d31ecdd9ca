//! A single node chain kept entirely in memory that hosts the collection consent contract. It
//! speaks the same [`ChainConnector`] surface as a real node so sessions can be exercised without
//! one, and exposes a few controls (clock, reachability, inclusion) real nodes don't.

mod consent_model;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use alloy::primitives::{Address, Bytes};
use async_std::sync::RwLock;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace};

use crate::chain::{
    encode_revert_data, BlockTag, CallRequest, ChainConnector, ChainError, Receipt,
    ReceiptStatus, TransactionRequest, TxHash,
};
use crate::contract::ContractInterface;

use consent_model::ConsentModel;

const ACCOUNT_COUNT: usize = 10;

const DEFAULT_NETWORK_ID: &str = "5777";

const DEPLOYMENT_GAS: u64 = 1_183_253;

const INVOCATION_GAS: u64 = 44_912;

const TRANSFER_GAS: u64 = 21_000;

const REVERT_PREFIX: &str = "VM Exception while processing transaction: revert";

pub struct MemoryChain {
    interface: Arc<ContractInterface>,
    network_id: String,
    state: RwLock<ChainState>,
}

struct ChainState {
    accounts: Vec<Address>,
    block_number: u64,
    contracts: HashMap<Address, ConsentModel>,
    history: BTreeMap<u64, BlockState>,
    nonce: u64,
    pending: Vec<(TxHash, TransactionRequest)>,
    reachable: bool,
    receipts: HashMap<TxHash, Receipt>,
    timestamp: u64,
    withhold_receipts: bool,
}

/// Contract state and clock as they were once a block was sealed.
#[derive(Clone)]
struct BlockState {
    contracts: HashMap<Address, ConsentModel>,
    timestamp: u64,
}

impl ChainState {
    fn ensure_reachable(&self) -> Result<(), ChainError> {
        if !self.reachable {
            return Err(ChainError::Connection("memory chain is offline".into()));
        }

        Ok(())
    }

    fn at(&self, block: BlockTag) -> Result<BlockState, ChainError> {
        match block {
            BlockTag::Latest => Ok(BlockState {
                contracts: self.contracts.clone(),
                timestamp: self.timestamp,
            }),
            BlockTag::Number(number) => {
                self.history
                    .get(&number)
                    .cloned()
                    .ok_or_else(|| ChainError::Rpc {
                        code: -32000,
                        message: format!("unknown block number {number}"),
                        data: None,
                    })
            }
        }
    }

    /// Opens a new block. Whatever is applied until the next call belongs to it.
    fn mine(&mut self) {
        self.block_number += 1;
        self.seal();
    }

    fn seal(&mut self) {
        let sealed = BlockState {
            contracts: self.contracts.clone(),
            timestamp: self.timestamp,
        };
        self.history.insert(self.block_number, sealed);
    }
}

impl MemoryChain {
    /// Moves the chain clock forward. A block is mined to carry the new timestamp.
    pub async fn advance_time(&self, seconds: u64) {
        let mut state = self.state.write().await;
        state.timestamp = state.timestamp.saturating_add(seconds);
        state.mine();

        trace!(timestamp = state.timestamp, block = state.block_number, "advanced chain clock");
    }

    /// The interface of the contract every deployment on this chain runs.
    pub fn interface(&self) -> Arc<ContractInterface> {
        self.interface.clone()
    }

    pub fn new(interface: Arc<ContractInterface>) -> Self {
        let accounts = (0..ACCOUNT_COUNT).map(derive_account).collect();

        let mut state = ChainState {
            accounts,
            block_number: 0,
            contracts: HashMap::new(),
            history: BTreeMap::new(),
            nonce: 0,
            pending: Vec::new(),
            reachable: true,
            receipts: HashMap::new(),
            timestamp: crate::utils::unix_timestamp(),
            withhold_receipts: false,
        };
        state.seal();

        Self {
            interface,
            network_id: DEFAULT_NETWORK_ID.to_string(),
            state: RwLock::new(state),
        }
    }

    /// Transactions accepted but held back while receipts are withheld.
    pub async fn pending_transactions(&self) -> usize {
        self.state.read().await.pending.len()
    }

    /// Include every transaction held back while receipts were withheld, in submission order.
    pub async fn release_withheld(&self) -> usize {
        let mut state = self.state.write().await;
        let pending = std::mem::take(&mut state.pending);
        let count = pending.len();

        for (tx_hash, request) in pending {
            let receipt = self.include(&mut state, tx_hash, &request);
            state.receipts.insert(tx_hash, receipt);
        }

        count
    }

    /// While unreachable every request fails with [`ChainError::Connection`].
    pub async fn set_reachable(&self, reachable: bool) {
        self.state.write().await.reachable = reachable;
    }

    pub async fn timestamp(&self) -> u64 {
        self.state.read().await.timestamp
    }

    pub fn with_network_id(mut self, network_id: impl Into<String>) -> Self {
        self.network_id = network_id.into();
        self
    }

    /// Accept transactions without including them until [`MemoryChain::release_withheld`] is
    /// called, the way a congested node would.
    pub async fn withhold_receipts(&self, withhold: bool) {
        self.state.write().await.withhold_receipts = withhold;
    }

    /// Runs a call against the state sealed at `request.block`, or the current state for
    /// [`BlockTag::Latest`].
    fn evaluate(&self, state: &ChainState, request: &CallRequest) -> Result<Bytes, ChainError> {
        let sender = request.from.unwrap_or(Address::ZERO);
        let BlockState {
            contracts,
            timestamp,
        } = state.at(request.block)?;

        let Some(address) = request.to else {
            let args = self
                .interface
                .decode_deployment(&request.data)
                .map_err(|_| revert_error(None))?;

            ConsentModel::construct(sender, &args, timestamp)
                .map_err(|reason| revert_error(Some(&reason)))?;

            return Ok(Bytes::new());
        };

        let Some(contract) = contracts.get(&address) else {
            return Ok(Bytes::new());
        };

        let (function, args) = match self.interface.decode_invocation(&request.data) {
            Some(Ok(invocation)) => invocation,
            _ => return Err(revert_error(None)),
        };

        let outputs = match self.interface.is_read_only(&function.name) {
            Ok(true) => contract.read(&function.name, &args, timestamp),
            _ => {
                // Writes run against a throwaway copy, a call never persists anything
                let mut scratch = contract.clone();
                scratch.write(&function.name, &args, sender, timestamp)
            }
        }
        .map_err(|reason| revert_error(Some(&reason)))?;

        if outputs.is_empty() {
            return Ok(Bytes::new());
        }

        self.interface
            .encode_output(&function.name, &outputs)
            .map_err(|err| ChainError::InvalidResponse(err.to_string()))
    }

    /// Executes a transaction in a new block. Failed executions leave state untouched and are
    /// reported through the receipt status.
    fn include(
        &self,
        state: &mut ChainState,
        tx_hash: TxHash,
        request: &TransactionRequest,
    ) -> Receipt {
        state.block_number += 1;
        let now = state.timestamp;

        let (outcome, contract_address, gas_used) = match request.to {
            None => {
                let constructed = self
                    .interface
                    .decode_deployment(&request.data)
                    .map_err(|err| err.to_string())
                    .and_then(|args| ConsentModel::construct(request.from, &args, now));

                match constructed {
                    Ok(model) => {
                        let address = derive_contract_address(request.from, tx_hash);
                        state.contracts.insert(address, model);
                        (Ok(()), Some(address), DEPLOYMENT_GAS)
                    }
                    Err(reason) => (Err(reason), None, DEPLOYMENT_GAS),
                }
            }
            Some(address) => match state.contracts.get_mut(&address) {
                None => (Ok(()), None, TRANSFER_GAS),
                Some(contract) => {
                    let outcome = match self.interface.decode_invocation(&request.data) {
                        Some(Ok((function, args))) => {
                            let mut next = contract.clone();
                            next.write(&function.name, &args, request.from, now)
                                .map(|_| *contract = next)
                        }
                        _ => Err("unrecognized invocation".to_string()),
                    };

                    (outcome, None, INVOCATION_GAS)
                }
            },
        };

        state.seal();

        let status = match outcome {
            Ok(()) => ReceiptStatus::Success,
            Err(reason) => {
                debug!(%tx_hash, %reason, "transaction reverted");
                ReceiptStatus::Failure
            }
        };

        Receipt {
            transaction_hash: tx_hash,
            block_number: state.block_number,
            status,
            contract_address,
            gas_used: request.gas.map_or(gas_used, |limit| limit.min(gas_used)),
        }
    }
}

#[async_trait]
impl ChainConnector for MemoryChain {
    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        let state = self.state.read().await;
        state.ensure_reachable()?;

        Ok(state.accounts.clone())
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        let state = self.state.read().await;
        state.ensure_reachable()?;

        Ok(state.block_number)
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes, ChainError> {
        let state = self.state.read().await;
        state.ensure_reachable()?;

        self.evaluate(&state, request)
    }

    async fn network_id(&self) -> Result<String, ChainError> {
        self.state.read().await.ensure_reachable()?;
        Ok(self.network_id.clone())
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> Result<TxHash, ChainError> {
        let mut state = self.state.write().await;
        state.ensure_reachable()?;

        if !state.accounts.contains(&request.from) {
            return Err(ChainError::Rpc {
                code: -32000,
                message: format!("sender account {} not recognized", request.from),
                data: None,
            });
        }

        state.nonce += 1;
        let tx_hash = derive_tx_hash(state.nonce, request);

        if state.withhold_receipts {
            trace!(%tx_hash, "holding transaction back");
            state.pending.push((tx_hash, request.clone()));
        } else {
            let receipt = self.include(&mut state, tx_hash, request);
            state.receipts.insert(tx_hash, receipt);
        }

        Ok(tx_hash)
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>, ChainError> {
        let state = self.state.read().await;
        state.ensure_reachable()?;

        Ok(state.receipts.get(&tx_hash).cloned())
    }
}

fn derive_account(index: usize) -> Address {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"chainconsent memory account");
    hasher.update(&(index as u64).to_le_bytes());

    Address::from_slice(&hasher.finalize().as_bytes()[12..])
}

fn derive_contract_address(deployer: Address, tx_hash: TxHash) -> Address {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"chainconsent memory contract");
    hasher.update(deployer.as_slice());
    hasher.update(tx_hash.as_slice());

    Address::from_slice(&hasher.finalize().as_bytes()[12..])
}

fn derive_tx_hash(nonce: u64, request: &TransactionRequest) -> TxHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"chainconsent memory transaction");
    hasher.update(&nonce.to_le_bytes());
    hasher.update(request.from.as_slice());
    if let Some(to) = request.to {
        hasher.update(to.as_slice());
    }
    hasher.update(&request.data);

    TxHash::from(*hasher.finalize().as_bytes())
}

fn revert_error(reason: Option<&str>) -> ChainError {
    match reason {
        Some(reason) => ChainError::Rpc {
            code: -32000,
            message: format!("{REVERT_PREFIX} {reason}"),
            data: Some(Value::String(crate::utils::encode_hex(encode_revert_data(reason)))),
        },
        None => ChainError::Rpc {
            code: -32000,
            message: REVERT_PREFIX.to_string(),
            data: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy::dyn_abi::DynSolValue;
    use alloy::primitives::U256;

    use super::*;
    use crate::chain::{submit, SubmitError, SubmitPolicy};
    use crate::contract::ContractArtifact;

    fn fixture_chain() -> MemoryChain {
        let json = include_str!("../../../fixtures/CollectionConsent.json");
        let (interface, _) = ContractArtifact::from_json(json).unwrap().into_parts().unwrap();
        MemoryChain::new(Arc::new(interface))
    }

    fn quick_policy() -> SubmitPolicy {
        SubmitPolicy {
            gas_limit: Some(6_000_000),
            poll_interval: Duration::from_millis(5),
            receipt_timeout: Duration::from_millis(100),
        }
    }

    async fn deploy(
        chain: &MemoryChain,
        subject: Address,
        controller: Address,
        duration: u64,
    ) -> Address {
        let args = vec![
            DynSolValue::Address(controller),
            DynSolValue::Array(vec![DynSolValue::Address(controller)]),
            DynSolValue::Uint(U256::from(11u64), 256),
            DynSolValue::Uint(U256::from(duration), 256),
            DynSolValue::Array(vec![DynSolValue::Uint(U256::from(1u64), 8)]),
        ];
        let data = chain.interface.encode_deployment(&args).unwrap();
        let request = TransactionRequest::deployment(subject, data);

        let receipt = submit(chain, &request, &quick_policy()).await.unwrap();
        assert!(receipt.succeeded());
        receipt.contract_address.unwrap()
    }

    async fn verify(chain: &MemoryChain, address: Address) -> bool {
        verify_at(chain, address, BlockTag::Latest).await
    }

    async fn verify_at(chain: &MemoryChain, address: Address, block: BlockTag) -> bool {
        let data = chain.interface.encode_call("verify", &[]).unwrap();
        let request = CallRequest {
            block,
            ..CallRequest::new(address, data)
        };
        let output = chain.call(&request).await.unwrap();
        let values = chain.interface.decode_output("verify", &output).unwrap();
        values == vec![DynSolValue::Bool(true)]
    }

    #[tokio::test]
    async fn test_accounts_are_stable() {
        let first = fixture_chain().accounts().await.unwrap();
        let second = fixture_chain().accounts().await.unwrap();

        assert_eq!(first.len(), ACCOUNT_COUNT);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_code_answers_empty() {
        let chain = fixture_chain();
        let data = chain.interface.encode_call("verify", &[]).unwrap();

        let request = CallRequest::new(Address::repeat_byte(0x42), data);
        let output = chain.call(&request).await.unwrap();
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_consent_expires_with_the_clock() {
        let chain = fixture_chain();
        let accounts = chain.accounts().await.unwrap();
        let (subject, controller) = (accounts[0], accounts[1]);
        let address = deploy(&chain, subject, controller, 60).await;

        for from in [subject, controller] {
            let data = chain.interface.encode_call("grantConsent", &[]).unwrap();
            let request = TransactionRequest::invocation(from, address, data);
            assert!(submit(&chain, &request, &quick_policy()).await.unwrap().succeeded());
        }

        assert!(verify(&chain, address).await);
        chain.advance_time(61).await;
        assert!(!verify(&chain, address).await);
    }

    #[tokio::test]
    async fn test_reads_see_the_state_of_the_requested_block() {
        let chain = fixture_chain();
        let accounts = chain.accounts().await.unwrap();
        let (subject, controller) = (accounts[0], accounts[1]);
        let address = deploy(&chain, subject, controller, 3_600).await;

        let mut included_at = Vec::new();
        for from in [subject, controller] {
            let data = chain.interface.encode_call("grantConsent", &[]).unwrap();
            let request = TransactionRequest::invocation(from, address, data);
            let receipt = submit(&chain, &request, &quick_policy()).await.unwrap();
            included_at.push(receipt.block_number);
        }

        assert!(verify(&chain, address).await);
        assert!(verify_at(&chain, address, BlockTag::Number(included_at[1])).await);
        // Only the subject had agreed so far
        assert!(!verify_at(&chain, address, BlockTag::Number(included_at[0])).await);

        // Before the deployment the address holds no code
        let data = chain.interface.encode_call("verify", &[]).unwrap();
        let before = CallRequest {
            block: BlockTag::Number(0),
            ..CallRequest::new(address, data.clone())
        };
        assert!(chain.call(&before).await.unwrap().is_empty());

        let future = CallRequest {
            block: BlockTag::Number(included_at[1] + 10),
            ..CallRequest::new(address, data)
        };
        assert!(matches!(chain.call(&future).await, Err(ChainError::Rpc { .. })));
    }

    #[tokio::test]
    async fn test_failed_transaction_replays_with_reason() {
        let chain = fixture_chain();
        let accounts = chain.accounts().await.unwrap();
        let address = deploy(&chain, accounts[0], accounts[1], 60).await;

        let data = chain.interface.encode_call("grantConsent", &[]).unwrap();
        let request = TransactionRequest::invocation(accounts[5], address, data);
        let receipt = submit(&chain, &request, &quick_policy()).await.unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Failure);

        let replay = request.as_replay(BlockTag::Number(receipt.block_number - 1));
        let err = chain.call(&replay).await.unwrap_err();
        let reason = crate::chain::revert_reason_from_error(&err).unwrap();
        assert_eq!(reason.message(), Some(consent_model::NOT_ALLOWED));
    }

    #[tokio::test]
    async fn test_unknown_sender_is_refused() {
        let chain = fixture_chain();
        let data = chain.interface.encode_call("grantConsent", &[]).unwrap();
        let request = TransactionRequest::invocation(
            Address::repeat_byte(0x99),
            Address::repeat_byte(0x42),
            data,
        );

        let err = submit(&chain, &request, &quick_policy()).await.unwrap_err();
        assert!(matches!(err, SubmitError::Refused { .. }));
        assert_eq!(err.tx_hash(), None);
    }

    #[tokio::test]
    async fn test_offline_submission_is_unreachable() {
        let chain = fixture_chain();
        let accounts = chain.accounts().await.unwrap();
        chain.set_reachable(false).await;

        let data = chain.interface.encode_call("grantConsent", &[]).unwrap();
        let request =
            TransactionRequest::invocation(accounts[0], Address::repeat_byte(0x42), data);

        let err = submit(&chain, &request, &quick_policy()).await.unwrap_err();
        assert!(matches!(err, SubmitError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_withheld_receipt_times_out_then_lands() {
        let chain = fixture_chain();
        let accounts = chain.accounts().await.unwrap();
        let address = deploy(&chain, accounts[0], accounts[1], 3_600).await;
        chain.withhold_receipts(true).await;

        let data = chain.interface.encode_call("grantConsent", &[]).unwrap();
        let request = TransactionRequest::invocation(accounts[0], address, data);

        let err = submit(&chain, &request, &quick_policy()).await.unwrap_err();
        let tx_hash = match err {
            SubmitError::Timeout { tx_hash, .. } => tx_hash,
            other => panic!("expected a timeout, got {other:?}"),
        };

        assert!(chain.transaction_receipt(tx_hash).await.unwrap().is_none());
        assert_eq!(chain.release_withheld().await, 1);

        let receipt = chain.transaction_receipt(tx_hash).await.unwrap().unwrap();
        assert!(receipt.succeeded());
    }
}
