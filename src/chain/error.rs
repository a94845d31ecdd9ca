#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The endpoint could not be reached at all, the request never left this process. Never
    /// retried internally, the caller owns the retry policy.
    #[error("unable to reach chain endpoint: {0}")]
    Connection(String),

    /// The request was handed to the endpoint but no usable answer came back: the connection
    /// dropped, the request timed out or the endpoint answered with an HTTP error. The node may
    /// or may not have acted on it.
    #[error("request to chain endpoint interrupted: {0}")]
    Interrupted(String),

    /// The node understood the request and answered with a JSON-RPC error object.
    #[error("node returned error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("node response could not be interpreted: {0}")]
    InvalidResponse(String),
}

impl ChainError {
    pub fn is_connection(&self) -> bool {
        matches!(self, ChainError::Connection(_))
    }

    /// Connection trouble of any kind, whether or not the request made it to the node.
    pub fn is_transport(&self) -> bool {
        matches!(self, ChainError::Connection(_) | ChainError::Interrupted(_))
    }
}
