use std::fmt::{self, Display, Formatter};

/// Catch-all error for application level plumbing (startup, configuration, command handling).
/// Library operations return their own typed errors.
#[derive(Debug)]
pub struct ChainConsentError(String);

impl From<&'static str> for ChainConsentError {
    fn from(val: &'static str) -> Self {
        Self(val.to_string())
    }
}

impl From<String> for ChainConsentError {
    fn from(val: String) -> Self {
        Self(val)
    }
}

impl Display for ChainConsentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ChainConsentError {}

impl From<crate::config::ConfigError> for ChainConsentError {
    fn from(error: crate::config::ConfigError) -> Self {
        Self(error.to_string())
    }
}

impl From<crate::consent::ConsentError> for ChainConsentError {
    fn from(error: crate::consent::ConsentError) -> Self {
        Self(error.to_string())
    }
}

impl From<crate::chain::ChainError> for ChainConsentError {
    fn from(error: crate::chain::ChainError) -> Self {
        Self(error.to_string())
    }
}

impl From<crate::contract::InterfaceError> for ChainConsentError {
    fn from(error: crate::contract::InterfaceError) -> Self {
        Self(error.to_string())
    }
}

impl From<serde_json::Error> for ChainConsentError {
    fn from(error: serde_json::Error) -> Self {
        Self(error.to_string())
    }
}

pub type ChainConsentResult<T> = Result<T, ChainConsentError>;
