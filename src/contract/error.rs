use std::path::PathBuf;

/// Problems with a contract's interface description. These are never transient, retrying the
/// same operation against the same artifact will fail the same way.
#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    #[error("{method} expects {expected} arguments but {given} were provided")]
    ArgumentCount {
        method: String,
        expected: usize,
        given: usize,
    },

    #[error("argument {index} of {method} does not fit the declared type {expected}")]
    ArgumentType {
        method: String,
        index: usize,
        expected: String,
    },

    #[error("ABI encoding failure: {0}")]
    Codec(#[from] alloy::dyn_abi::Error),

    #[error("unable to read contract artifact {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("contract artifact is malformed: {0}")]
    Malformed(String),

    #[error("contract artifact carries no deployable bytecode")]
    MissingBytecode,

    #[error("{method} returned {detail}")]
    UnexpectedReturn { method: String, detail: String },

    #[error("contract interface has no method named {0}")]
    UnknownMethod(String),
}

impl From<serde_json::Error> for InterfaceError {
    fn from(err: serde_json::Error) -> Self {
        InterfaceError::Malformed(err.to_string())
    }
}
