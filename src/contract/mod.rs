//! Resolution of a contract's interface description and deployed address, and a typed proxy that
//! turns method names and values into calls and transactions against a [`ChainConnector`].
//!
//! [`ChainConnector`]: crate::chain::ChainConnector

mod artifact;
mod error;
mod interface;
mod loader;
mod proxy;

pub use artifact::{ContractArtifact, NetworkDeployment};
pub use error::InterfaceError;
pub use interface::ContractInterface;
pub use loader::{resolve_deployment, Deployment, InterfaceLoader};
pub use proxy::{ContractProxy, ProxyError};

pub use alloy::dyn_abi::DynSolValue;
