use std::fmt::{self, Display, Formatter};

use alloy::dyn_abi::{DynSolType, DynSolValue};
use serde_json::Value;

use crate::chain::ChainError;

/// Selector of the standard `Error(string)` revert payload.
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Why the contract refused a transaction, when the node was willing to tell us.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RevertReason {
    Message(String),
    Opaque,
}

impl RevertReason {
    pub fn message(&self) -> Option<&str> {
        match self {
            RevertReason::Message(msg) => Some(msg.as_str()),
            RevertReason::Opaque => None,
        }
    }
}

impl Display for RevertReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RevertReason::Message(msg) => f.write_str(msg),
            RevertReason::Opaque => f.write_str("no revert reason provided"),
        }
    }
}

pub(crate) fn decode_revert_data(data: &[u8]) -> Option<String> {
    let payload = data.strip_prefix(&ERROR_STRING_SELECTOR[..])?;

    match DynSolType::String.abi_decode(payload).ok()? {
        DynSolValue::String(reason) => Some(reason),
        _ => None,
    }
}

pub(crate) fn encode_revert_data(reason: &str) -> Vec<u8> {
    let mut data = ERROR_STRING_SELECTOR.to_vec();
    data.extend(DynSolValue::String(reason.to_string()).abi_encode());
    data
}

/// Inspects a node error for signs of a contract revert. Returns `None` when the error has
/// nothing to do with contract execution (bad nonce, unknown account, ...).
pub(crate) fn revert_reason_from_error(err: &ChainError) -> Option<RevertReason> {
    let ChainError::Rpc { message, data, .. } = err else {
        return None;
    };

    if let Some(reason) = data.as_ref().and_then(reason_from_data) {
        return Some(RevertReason::Message(reason));
    }

    let idx = message.find("revert")?;
    let remainder = message[idx + "revert".len()..]
        .trim_start_matches("ed")
        .trim_start_matches(':')
        .trim();

    if remainder.is_empty() {
        Some(RevertReason::Opaque)
    } else {
        Some(RevertReason::Message(remainder.to_string()))
    }
}

// Geth puts the raw revert bytes directly in `data`, ganache wraps them in an object next to an
// already decoded `reason`.
fn reason_from_data(data: &Value) -> Option<String> {
    match data {
        Value::String(encoded) => {
            let raw = crate::utils::decode_hex(encoded).ok()?;
            decode_revert_data(&raw)
        }
        Value::Object(map) => map
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| map.get("result").and_then(reason_from_data))
            .or_else(|| map.get("data").and_then(reason_from_data)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc_error(message: &str, data: Option<Value>) -> ChainError {
        ChainError::Rpc {
            code: -32000,
            message: message.to_string(),
            data,
        }
    }

    #[test]
    fn test_revert_data_round_trip() {
        let encoded = encode_revert_data("Actor not allowed");
        assert_eq!(&encoded[..4], &ERROR_STRING_SELECTOR);
        assert_eq!(
            decode_revert_data(&encoded).as_deref(),
            Some("Actor not allowed")
        );
    }

    #[test]
    fn test_foreign_selector_is_not_decoded() {
        assert_eq!(decode_revert_data(&[0xde, 0xad, 0xbe, 0xef, 0x00]), None);
        assert_eq!(decode_revert_data(&[]), None);
    }

    #[test]
    fn test_reason_from_ganache_message() {
        let err = rpc_error(
            "VM Exception while processing transaction: revert Actor not allowed",
            None,
        );

        assert_eq!(
            revert_reason_from_error(&err),
            Some(RevertReason::Message("Actor not allowed".into()))
        );
    }

    #[test]
    fn test_reason_from_geth_hex_data() {
        let hex_data = format!("0x{}", hex::encode(encode_revert_data("Only the data Subject")));
        let err = rpc_error("execution reverted", Some(Value::String(hex_data)));

        assert_eq!(
            revert_reason_from_error(&err),
            Some(RevertReason::Message("Only the data Subject".into()))
        );
    }

    #[test]
    fn test_reason_from_ganache_object() {
        let data = serde_json::json!({
            "message": "revert",
            "reason": "Duration must be positive",
        });
        let err = rpc_error("VM Exception while processing transaction: revert", Some(data));

        assert_eq!(
            revert_reason_from_error(&err).and_then(|r| r.message().map(str::to_string)),
            Some("Duration must be positive".to_string())
        );
    }

    #[test]
    fn test_bare_revert_is_opaque() {
        let err = rpc_error("execution reverted", None);
        assert_eq!(revert_reason_from_error(&err), Some(RevertReason::Opaque));
    }

    #[test]
    fn test_unrelated_errors_are_not_reverts() {
        let err = rpc_error("nonce too low", None);
        assert_eq!(revert_reason_from_error(&err), None);
        assert_eq!(
            revert_reason_from_error(&ChainError::Connection("refused".into())),
            None
        );
    }
}
