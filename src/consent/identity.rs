use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use alloy::primitives::Address;

/// An account able to take part in a consent record, as the data subject, the controller, a
/// recipient or a delegate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(Address);

impl Identity {
    pub const fn address(&self) -> Address {
        self.0
    }

    pub const fn new(address: Address) -> Self {
        Self(address)
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<Address> for Identity {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl FromStr for Identity {
    type Err = alloy::primitives::hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_str(s).map(Self)
    }
}
