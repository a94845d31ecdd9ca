//! Client for consent records kept by an on-chain GDPR consent contract. A [`ConsentSession`]
//! creates records, takes snapshots of them and moves the consent flags, talking to a node
//! through any [`ChainConnector`].
//!
//! [`ConsentSession`]: consent::ConsentSession
//! [`ChainConnector`]: chain::ChainConnector

pub mod chain;
pub mod config;
pub mod consent;
pub mod contract;
pub mod error;
pub mod utils;
pub mod version;

// Re-export some of our dependencies for QoL
pub use alloy::primitives::Address;
pub use async_trait;

pub mod prelude {
    pub use crate::chain::{ChainConnector, MemoryChain, Receipt, SubmitPolicy, TxHash};
    #[cfg(feature = "rpc")]
    pub use crate::chain::RpcConnector;

    pub use crate::config::SessionConfig;
    pub use crate::consent::*;
    pub use crate::contract::{Deployment, InterfaceLoader};
    pub use crate::error::*;
    pub use crate::version::*;
}
