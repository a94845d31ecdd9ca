use crate::chain::{Receipt, TxHash};

/// Confirmation that a grant, revoke or delegation change was included and executed successfully.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ack {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
}

impl From<&Receipt> for Ack {
    fn from(receipt: &Receipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        }
    }
}
