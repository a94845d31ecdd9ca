use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy::primitives::Address;
use tracing::{debug, info};

use crate::contract::{ContractArtifact, ContractInterface, InterfaceError};

/// Where a contract stands on the network we're connected to.
///
/// Missing deployments are an expected state rather than an error, a front end will typically
/// respond to it by offering to create a new record.
#[derive(Clone, Debug)]
pub enum Deployment {
    Deployed {
        address: Address,
        interface: Arc<ContractInterface>,
        network_id: String,
    },
    NotDeployed {
        interface: Arc<ContractInterface>,
        network_id: String,
    },
}

impl Deployment {
    pub fn address(&self) -> Option<Address> {
        match self {
            Deployment::Deployed { address, .. } => Some(*address),
            Deployment::NotDeployed { .. } => None,
        }
    }

    pub fn interface(&self) -> &Arc<ContractInterface> {
        match self {
            Deployment::Deployed { interface, .. } | Deployment::NotDeployed { interface, .. } => {
                interface
            }
        }
    }

    pub fn is_deployed(&self) -> bool {
        matches!(self, Deployment::Deployed { .. })
    }
}

/// Reads contract artifacts named `<ContractName>.json` out of a build directory.
#[derive(Clone, Debug)]
pub struct InterfaceLoader {
    artifacts_dir: PathBuf,
}

impl InterfaceLoader {
    pub fn artifact_path(&self, contract_name: &str) -> PathBuf {
        self.artifacts_dir.join(format!("{contract_name}.json"))
    }

    pub async fn load_artifact(
        &self,
        contract_name: &str,
    ) -> Result<ContractArtifact, InterfaceError> {
        let path = self.artifact_path(contract_name);
        debug!(path = %path.display(), "loading contract artifact");

        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| InterfaceError::Io {
                path: path.clone(),
                source,
            })?;

        ContractArtifact::from_json(&raw)
    }

    pub fn new(artifacts_dir: impl AsRef<Path>) -> Self {
        Self {
            artifacts_dir: artifacts_dir.as_ref().to_path_buf(),
        }
    }

    /// Loads the named contract and looks up its deployment for `network_id`.
    pub async fn resolve(
        &self,
        contract_name: &str,
        network_id: &str,
    ) -> Result<Deployment, InterfaceError> {
        let artifact = self.load_artifact(contract_name).await?;
        resolve_deployment(artifact, network_id)
    }
}

pub fn resolve_deployment(
    artifact: ContractArtifact,
    network_id: &str,
) -> Result<Deployment, InterfaceError> {
    let (interface, networks) = artifact.into_parts()?;
    let interface = Arc::new(interface);
    let network_id = network_id.to_string();

    match networks.get(&network_id) {
        Some(deployment) => {
            let address = deployment.parsed_address()?;
            info!(contract = interface.name(), %network_id, %address, "found deployed contract");

            Ok(Deployment::Deployed {
                address,
                interface,
                network_id,
            })
        }
        None => {
            info!(contract = interface.name(), %network_id, "contract not deployed on network");
            Ok(Deployment::NotDeployed {
                interface,
                network_id,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../../fixtures/CollectionConsent.json");

    #[test]
    fn test_deployment_for_known_network() {
        let artifact = ContractArtifact::from_json(FIXTURE).unwrap();
        let deployment = resolve_deployment(artifact, "1337").unwrap();

        assert!(deployment.is_deployed());
        assert!(deployment.address().is_some());
        assert_eq!(deployment.interface().name(), "CollectionConsent");
    }

    #[test]
    fn test_unknown_network_is_not_deployed() {
        let artifact = ContractArtifact::from_json(FIXTURE).unwrap();
        let deployment = resolve_deployment(artifact, "5777").unwrap();

        assert!(!deployment.is_deployed());
        assert_eq!(deployment.address(), None);
    }

    #[test]
    fn test_bad_deployment_address() {
        let raw = r#"{
            "contractName": "CollectionConsent",
            "abi": [],
            "networks": { "5777": { "address": "0xnothex" } }
        }"#;

        let artifact = ContractArtifact::from_json(raw).unwrap();
        assert!(matches!(
            resolve_deployment(artifact, "5777"),
            Err(InterfaceError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_artifact_file() {
        let loader = InterfaceLoader::new("/nonexistent/build/contracts");
        let err = loader.resolve("CollectionConsent", "5777").await.unwrap_err();

        match err {
            InterfaceError::Io { path, .. } => {
                assert!(path.ends_with("CollectionConsent.json"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_loading_from_fixture_directory() {
        let loader = InterfaceLoader::new(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"));
        let deployment = loader.resolve("CollectionConsent", "1337").await.unwrap();
        assert!(deployment.is_deployed());
    }
}
