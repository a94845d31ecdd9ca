use std::time::Duration;

use alloy::primitives::Address;

use crate::consent::{DataFlags, Identity};

/// Everything a consent record reports about itself at one point in time.
///
/// The fields are gathered with separate reads. A grant or revoke landing between them can
/// leave the view torn, `consent_from_ds` already showing a new grant while `valid` still
/// reflects the state before it. Take a fresh snapshot once pending writes have completed when
/// that matters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsentView {
    pub address: Address,

    /// The contract's own verdict, never derived locally.
    pub valid: bool,

    pub consent_from_ds: bool,
    pub consent_from_dc: bool,

    pub data_subject: Identity,
    pub controller: Identity,
    pub data: DataFlags,
    pub duration: Duration,
}

impl ConsentView {
    pub fn fully_granted(&self) -> bool {
        self.consent_from_ds && self.consent_from_dc
    }
}

/// The connected network as a front end would show it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkStatus {
    pub network_id: String,
    pub block_number: u64,
}
