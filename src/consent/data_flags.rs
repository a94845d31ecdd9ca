use std::fmt::{self, Display, Formatter};
use std::ops::{BitOr, BitOrAssign};

use alloy::primitives::U256;

const NAME_BIT: u32 = 0b0000_0001;

const EMAIL_BIT: u32 = 0b0000_0010;

const ADDRESS_BIT: u32 = 0b0000_0100;

const PHONE_BIT: u32 = 0b0000_1000;

const NAMED_BITS: [(u32, &str); 4] = [
    (NAME_BIT, "name"),
    (EMAIL_BIT, "email"),
    (ADDRESS_BIT, "address"),
    (PHONE_BIT, "phone"),
];

/// The categories of personal data a consent record covers.
///
/// Bits outside of the named categories are carried as-is, the contract stores whatever it was
/// created with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DataFlags(u32);

impl DataFlags {
    pub const NONE: Self = Self(0);

    pub const NAME: Self = Self(NAME_BIT);

    pub const EMAIL: Self = Self(EMAIL_BIT);

    pub const ADDRESS: Self = Self(ADDRESS_BIT);

    pub const PHONE: Self = Self(PHONE_BIT);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn to_u256(self) -> U256 {
        U256::from(self.0)
    }
}

impl BitOr for DataFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DataFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Display for DataFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }

        let mut remaining = self.0;
        let mut names = Vec::new();

        for (bit, name) in NAMED_BITS {
            if remaining & bit != 0 {
                names.push(name.to_string());
                remaining &= !bit;
            }
        }

        if remaining != 0 {
            names.push(format!("{remaining:#x}"));
        }

        f.write_str(&names.join("|"))
    }
}

impl TryFrom<U256> for DataFlags {
    type Error = U256;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        u32::try_from(value).map(Self).map_err(|_| value)
    }
}
