//! Error types for document store operations

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Longest response body kept in a status error
const MAX_ERROR_BODY: usize = 512;

/// Errors raised while talking to the document store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The HTTP client could not be constructed
    #[error("Failed to build store client: {0}")]
    ClientBuild(String),

    /// Connection refused, DNS failure, reset and similar
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request exceeded the environment's timeout
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// Store answered with a non-success status
    #[error("Store returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("Failed to decode store response: {0}")]
    Decode(String),

    /// The handle was released at shutdown
    #[error("Connection handle has been closed")]
    Closed,
}

impl StoreError {
    /// Build a status error, truncating oversized bodies
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            body.push_str("...");
        }
        if body.is_empty() {
            body.push_str("No response body");
        }
        StoreError::Status { status, body }
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Transport(_) | StoreError::Timeout(_) => true,
            StoreError::Status { status, .. } => *status == 429 || *status >= 500,
            StoreError::ClientBuild(_) | StoreError::Decode(_) | StoreError::Closed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(StoreError::Transport("reset".to_string()).is_retryable());
        assert!(StoreError::Timeout(1000).is_retryable());
        assert!(StoreError::status(503, "unavailable").is_retryable());
        assert!(StoreError::status(429, "slow down").is_retryable());
        assert!(!StoreError::status(400, "bad query").is_retryable());
        assert!(!StoreError::status(401, "").is_retryable());
        assert!(!StoreError::Closed.is_retryable());
    }

    #[test]
    fn test_status_body_truncated() {
        let err = StoreError::status(500, "x".repeat(2000));
        match err {
            StoreError::Status { body, .. } => assert!(body.len() <= MAX_ERROR_BODY + 3),
            _ => unreachable!(),
        }

        match StoreError::status(502, "") {
            StoreError::Status { body, .. } => assert_eq!(body, "No response body"),
            _ => unreachable!(),
        }
    }
}
