use alloy::primitives::{Address, Bytes, B256};

pub type TxHash = B256;

/// Which chain state a read is evaluated against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlockTag {
    #[default]
    Latest,
    Number(u64),
}

/// A read-only invocation. `to` is `None` only when replaying contract creation code.
#[derive(Clone, Debug)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub data: Bytes,
    pub block: BlockTag,
}

impl CallRequest {
    pub fn new(to: Address, data: Bytes) -> Self {
        Self {
            from: None,
            to: Some(to),
            data,
            block: BlockTag::Latest,
        }
    }
}

/// A state changing transaction signed by the node on behalf of `from`.
#[derive(Clone, Debug)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Option<Address>,
    pub data: Bytes,
    pub gas: Option<u64>,
}

impl TransactionRequest {
    pub fn deployment(from: Address, data: Bytes) -> Self {
        Self {
            from,
            to: None,
            data,
            gas: None,
        }
    }

    pub fn invocation(from: Address, to: Address, data: Bytes) -> Self {
        Self {
            from,
            to: Some(to),
            data,
            gas: None,
        }
    }

    pub fn is_deployment(&self) -> bool {
        self.to.is_none()
    }

    /// The same payload as a read against the state at `block`, used to recover the revert
    /// reason of a mined transaction that failed.
    pub fn as_replay(&self, block: BlockTag) -> CallRequest {
        CallRequest {
            from: Some(self.from),
            to: self.to,
            data: self.data.clone(),
            block,
        }
    }
}
