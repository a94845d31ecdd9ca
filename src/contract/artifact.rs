use std::collections::BTreeMap;
use std::str::FromStr;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, Bytes};
use serde::Deserialize;

use crate::contract::{ContractInterface, InterfaceError};

/// The build output of a contract as written by Truffle style toolchains. Only the parts needed
/// to talk to the contract are kept, everything else in the file is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    pub contract_name: String,
    pub abi: JsonAbi,

    #[serde(default)]
    pub bytecode: Option<String>,

    /// Network id to the most recent deployment on that network.
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkDeployment>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDeployment {
    pub address: String,

    #[serde(default)]
    pub transaction_hash: Option<String>,
}

impl NetworkDeployment {
    pub fn parsed_address(&self) -> Result<Address, InterfaceError> {
        Address::from_str(&self.address).map_err(|err| {
            InterfaceError::Malformed(format!("bad deployment address {}: {err}", self.address))
        })
    }
}

impl ContractArtifact {
    pub fn from_json(raw: &str) -> Result<Self, InterfaceError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Splits the artifact into the callable interface and its deployment records.
    pub fn into_parts(
        self,
    ) -> Result<(ContractInterface, BTreeMap<String, NetworkDeployment>), InterfaceError> {
        // Abstract contracts and interfaces are emitted with an empty "0x" bytecode
        let bytecode = match self.bytecode.as_deref() {
            None | Some("") | Some("0x") => None,
            Some(encoded) => {
                let raw = crate::utils::decode_hex(encoded)
                    .map_err(|err| InterfaceError::Malformed(format!("bytecode: {err}")))?;
                Some(Bytes::from(raw))
            }
        };

        let interface = ContractInterface::new(self.contract_name, self.abi, bytecode);
        Ok((interface, self.networks))
    }
}
