use std::time::Duration;

use alloy::eips::BlockId;
use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, Bytes, TxKind};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::{
    TransactionInput, TransactionReceipt, TransactionRequest as RpcTransactionRequest,
};
use alloy::transports::http::Http;
use alloy::transports::{RpcError, TransportError, TransportErrorKind};
use async_trait::async_trait;
use reqwest::Client;
use tracing::trace;
use url::Url;

use crate::chain::{
    BlockTag, CallRequest, ChainConnector, ChainError, Receipt, ReceiptStatus, TransactionRequest,
    TxHash,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Ethereum JSON-RPC over HTTP. Transactions are signed by the node (`eth_sendTransaction`), as
/// is the case for development chains like ganache that hold unlocked accounts.
pub struct RpcConnector {
    endpoint: Url,
    provider: RootProvider,
}

impl RpcConnector {
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn new(endpoint: Url) -> Result<Self, ChainError> {
        Self::with_request_timeout(endpoint, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Every request, including the time spent reading the answer, is abandoned once
    /// `request_timeout` has passed.
    pub fn with_request_timeout(
        endpoint: Url,
        request_timeout: Duration,
    ) -> Result<Self, ChainError> {
        let client = default_reqwest_client(request_timeout)?;
        let transport = Http::with_client(client, endpoint.clone());
        let provider = RootProvider::new(RpcClient::new(transport, false));

        Ok(Self { endpoint, provider })
    }
}

#[async_trait]
impl ChainConnector for RpcConnector {
    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        trace!("rpc_connector::accounts");
        self.provider.get_accounts().await.map_err(chain_error)
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        self.provider.get_block_number().await.map_err(chain_error)
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes, ChainError> {
        trace!(to = ?request.to, block = ?request.block, "rpc_connector::call");

        let call = RpcTransactionRequest {
            from: request.from,
            to: request.to.map(TxKind::Call),
            input: TransactionInput::both(request.data.clone()),
            ..Default::default()
        };

        self.provider
            .call(call)
            .block(block_id(request.block))
            .await
            .map_err(chain_error)
    }

    async fn network_id(&self) -> Result<String, ChainError> {
        let network_id = self.provider.get_net_version().await.map_err(chain_error)?;
        Ok(network_id.to_string())
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> Result<TxHash, ChainError> {
        trace!(from = %request.from, to = ?request.to, "rpc_connector::send_transaction");

        let transaction = RpcTransactionRequest {
            from: Some(request.from),
            to: request.to.map(TxKind::Call),
            gas: request.gas,
            input: TransactionInput::both(request.data.clone()),
            ..Default::default()
        };

        let pending = self
            .provider
            .send_transaction(transaction)
            .await
            .map_err(chain_error)?;

        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>, ChainError> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(chain_error)?;

        Ok(receipt.and_then(into_receipt))
    }
}

fn block_id(block: BlockTag) -> BlockId {
    match block {
        BlockTag::Latest => BlockId::latest(),
        BlockTag::Number(number) => BlockId::number(number),
    }
}

/// Receipts without a block number belong to transactions that are still pending.
fn into_receipt(receipt: TransactionReceipt) -> Option<Receipt> {
    let block_number = receipt.block_number()?;

    let status = if receipt.status() {
        ReceiptStatus::Success
    } else {
        ReceiptStatus::Failure
    };

    Some(Receipt {
        transaction_hash: receipt.transaction_hash(),
        block_number,
        status,
        contract_address: receipt.contract_address(),
        gas_used: receipt.gas_used(),
    })
}

fn default_reqwest_client(request_timeout: Duration) -> Result<Client, ChainError> {
    Client::builder()
        .user_agent(crate::version::user_agent())
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
        .map_err(|err| ChainError::Connection(err.to_string()))
}

fn chain_error(err: TransportError) -> ChainError {
    match err {
        RpcError::ErrorResp(payload) => ChainError::Rpc {
            code: payload.code,
            message: payload.message.to_string(),
            data: payload
                .data
                .as_ref()
                .and_then(|raw| serde_json::from_str(raw.get()).ok()),
        },
        RpcError::Transport(kind) => transport_error(kind),
        other => ChainError::InvalidResponse(other.to_string()),
    }
}

/// Only failures to connect guarantee the node never saw the request. Everything after the
/// request was written is ambiguous.
fn transport_error(kind: TransportErrorKind) -> ChainError {
    if let TransportErrorKind::Custom(err) = &kind {
        if let Some(err) = err.downcast_ref::<reqwest::Error>() {
            if err.is_connect() || err.is_builder() {
                return ChainError::Connection(err.to_string());
            }
        }
    }

    ChainError::Interrupted(kind.to_string())
}
