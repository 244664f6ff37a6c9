//! Error types for fallback generation.

use std::time::Duration;
use thiserror::Error;

/// Why the fallback generator produced no citation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FallbackError {
    /// No credential was supplied at startup.
    #[error("fallback generator is not configured: no API credential")]
    NotConfigured,

    #[error("fallback generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("generative service unreachable: {0}")]
    Network(String),

    #[error("generative service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("generative service returned an empty citation")]
    EmptyResponse,

    #[error("generative service returned an unreadable response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, FallbackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = FallbackError::Timeout(Duration::from_secs(20));
        assert_eq!(err.to_string(), "fallback generation timed out after 20s");
    }

    #[test]
    fn test_api_display() {
        let err = FallbackError::Api {
            status: 429,
            message: "quota exceeded".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("429"), "Got: {}", display);
        assert!(display.contains("quota exceeded"), "Got: {}", display);
    }
}
