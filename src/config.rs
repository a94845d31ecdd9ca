use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::chain::SubmitPolicy;
use crate::contract::InterfaceLoader;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8545";

const DEFAULT_ARTIFACTS_DIR: &str = "build/contracts";

const DEFAULT_CONTRACT_NAME: &str = "CollectionConsent";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not valid: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything needed to open a session against a node.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub endpoint: Url,
    pub artifacts_dir: PathBuf,
    pub contract_name: String,
    pub receipt_timeout: Duration,
    /// Upper bound for a single request to the node, answer included.
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub gas_limit: u64,
}

impl SessionConfig {
    /// Defaults overridden by any `CONSENT_*` variables present in the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(endpoint) = parsed(&lookup, "CONSENT_RPC_URL")? {
            config.endpoint = endpoint;
        }

        if let Some(dir) = lookup("CONSENT_ARTIFACTS_DIR") {
            config.artifacts_dir = PathBuf::from(dir);
        }

        if let Some(name) = lookup("CONSENT_CONTRACT") {
            if name.trim().is_empty() {
                return Err(invalid("CONSENT_CONTRACT", name, "contract name is empty"));
            }

            config.contract_name = name;
        }

        if let Some(secs) = parsed::<u64>(&lookup, "CONSENT_RECEIPT_TIMEOUT_SECS")? {
            config.receipt_timeout = Duration::from_secs(secs);
        }

        if let Some(secs) = parsed::<u64>(&lookup, "CONSENT_REQUEST_TIMEOUT_SECS")? {
            if secs == 0 {
                return Err(invalid(
                    "CONSENT_REQUEST_TIMEOUT_SECS",
                    secs.to_string(),
                    "must be positive",
                ));
            }

            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(millis) = parsed::<u64>(&lookup, "CONSENT_POLL_INTERVAL_MS")? {
            if millis == 0 {
                return Err(invalid(
                    "CONSENT_POLL_INTERVAL_MS",
                    millis.to_string(),
                    "must be positive",
                ));
            }

            config.poll_interval = Duration::from_millis(millis);
        }

        if let Some(gas_limit) = parsed(&lookup, "CONSENT_GAS_LIMIT")? {
            config.gas_limit = gas_limit;
        }

        Ok(config)
    }

    pub fn loader(&self) -> InterfaceLoader {
        InterfaceLoader::new(&self.artifacts_dir)
    }

    pub fn submit_policy(&self) -> SubmitPolicy {
        SubmitPolicy {
            gas_limit: Some(self.gas_limit),
            poll_interval: self.poll_interval,
            receipt_timeout: self.receipt_timeout,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let policy = SubmitPolicy::default();

        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).unwrap_or_else(|_| unreachable!()),
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            contract_name: DEFAULT_CONTRACT_NAME.to_string(),
            receipt_timeout: policy.receipt_timeout,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: policy.poll_interval,
            gas_limit: policy.gas_limit.unwrap_or(6_000_000),
        }
    }
}

fn invalid(var: &'static str, value: String, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        value,
        reason: reason.to_string(),
    }
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse() {
            Ok(value) => Ok(Some(value)),
            Err(err) => Err(invalid(var, raw, err)),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config.endpoint.as_str(), "http://127.0.0.1:8545/");
        assert_eq!(config.artifacts_dir, PathBuf::from("build/contracts"));
        assert_eq!(config.contract_name, "CollectionConsent");
        assert_eq!(config.receipt_timeout, Duration::from_secs(120));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.gas_limit, 6_000_000);
    }

    #[test]
    fn test_overrides() {
        let config = SessionConfig::from_lookup(lookup_from(&[
            ("CONSENT_RPC_URL", "http://ganache:7545"),
            ("CONSENT_CONTRACT", "DelegatedCollectionConsent"),
            ("CONSENT_RECEIPT_TIMEOUT_SECS", "30"),
            ("CONSENT_REQUEST_TIMEOUT_SECS", "5"),
            ("CONSENT_POLL_INTERVAL_MS", "50"),
            ("CONSENT_GAS_LIMIT", "3000000"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint.host_str(), Some("ganache"));
        assert_eq!(config.contract_name, "DelegatedCollectionConsent");
        assert_eq!(config.request_timeout, Duration::from_secs(5));

        let policy = config.submit_policy();
        assert_eq!(policy.receipt_timeout, Duration::from_secs(30));
        assert_eq!(policy.poll_interval, Duration::from_millis(50));
        assert_eq!(policy.gas_limit, Some(3_000_000));
    }

    #[test]
    fn test_malformed_values_are_errors() {
        let err = SessionConfig::from_lookup(lookup_from(&[("CONSENT_GAS_LIMIT", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("CONSENT_GAS_LIMIT"));

        for (var, value) in [
            ("CONSENT_RPC_URL", "not a url"),
            ("CONSENT_POLL_INTERVAL_MS", "0"),
            ("CONSENT_REQUEST_TIMEOUT_SECS", "0"),
        ] {
            assert!(SessionConfig::from_lookup(lookup_from(&[(var, value)])).is_err());
        }
    }
}
