//! Error types for load-generation operations

use thiserror::Error;

/// Result type alias for load-generation operations
pub type Result<T> = std::result::Result<T, LoadError>;

/// Errors that can occur while generating load
///
/// Per-connection failures are counted and folded into the throughput
/// calculation; they never abort a batch or an iteration. Configuration
/// errors are fatal before the first iteration begins.
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    // === Per-connection failures (counted, never fatal) ===
    /// Dial/connect failed; the connection is not retried within the iteration
    #[error("connect failed for connection {index}: {detail}")]
    Connect { index: u64, detail: String },

    /// Write or request failed after a successful connect
    #[error("send failed for connection {index}: {detail}")]
    Send { index: u64, detail: String },

    // === Configuration (fatal at startup) ===
    /// Invalid configuration value or combination
    #[error("invalid configuration: {0}")]
    Config(String),

    // === Statistics ===
    /// Statistics buffer used outside its fill contract
    #[error("statistics buffer has {recorded} of {capacity} samples")]
    Statistics { recorded: usize, capacity: usize },
}

impl LoadError {
    /// Connect failure for a logical connection
    pub fn connect(index: u64, detail: impl Into<String>) -> Self {
        Self::Connect {
            index,
            detail: detail.into(),
        }
    }

    /// Send failure for a logical connection
    pub fn send(index: u64, detail: impl Into<String>) -> Self {
        Self::Send {
            index,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_error_names_connection() {
        let err = LoadError::connect(42, "connection refused");
        let msg = err.to_string();
        assert!(msg.contains("42"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_send_error_names_connection() {
        let err = LoadError::send(7, "broken pipe");
        assert!(err.to_string().contains("connection 7"));
    }
}
