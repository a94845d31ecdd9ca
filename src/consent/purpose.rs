use std::fmt::{self, Display, Formatter};

/// Why the data is being collected. The set of codes is open ended, the contract only stores the
/// numbers it was created with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Purpose(u8);

impl Purpose {
    pub const MARKETING: Self = Self(0);

    pub const ANALYTICS: Self = Self(1);

    pub const RESEARCH: Self = Self(2);

    pub const fn code(self) -> u8 {
        self.0
    }

    pub const fn from_code(code: u8) -> Self {
        Self(code)
    }
}

impl Display for Purpose {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Purpose::MARKETING => f.write_str("marketing"),
            Purpose::ANALYTICS => f.write_str("analytics"),
            Purpose::RESEARCH => f.write_str("research"),
            Purpose(other) => write!(f, "purpose-{other}"),
        }
    }
}

impl From<u8> for Purpose {
    fn from(code: u8) -> Self {
        Self(code)
    }
}
