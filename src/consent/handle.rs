use std::fmt::{self, Display, Formatter};

use alloy::primitives::Address;

/// Refers to one consent record by the address it was deployed at. Holding a handle doesn't
/// guarantee the record exists, that is only known once it has been read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConsentHandle(Address);

impl ConsentHandle {
    pub const fn address(&self) -> Address {
        self.0
    }

    pub const fn new(address: Address) -> Self {
        Self(address)
    }
}

impl Display for ConsentHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<Address> for ConsentHandle {
    fn from(address: Address) -> Self {
        Self(address)
    }
}
