//! Error types for Tricast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TricastError>;

#[derive(Error, Debug)]
pub enum TricastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TricastError {
    /// True when the underlying failure is a platform rate limit, the only
    /// error kind the retry executor is allowed to retry.
    pub fn is_rate_limit(&self) -> bool {
        matches!(
            self,
            TricastError::Platform(PlatformError::RateLimit(_))
        )
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Per-platform failure taxonomy.
///
/// Only `RateLimit` is retryable. Everything else propagates straight to the
/// fan-out coordinator, which records the platform as failed without touching
/// the other platforms.
#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Posting failed: {0}")]
    Posting(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_the_only_retryable_kind() {
        let rate_limited =
            TricastError::Platform(PlatformError::RateLimit("429".to_string()));
        assert!(rate_limited.is_rate_limit());

        let auth = TricastError::Platform(PlatformError::Auth("401".to_string()));
        assert!(!auth.is_rate_limit());

        let network =
            TricastError::Platform(PlatformError::Network("connection refused".to_string()));
        assert!(!network.is_rate_limit());

        let invalid = TricastError::InvalidInput("empty".to_string());
        assert!(!invalid.is_rate_limit());
    }

    #[test]
    fn error_message_formatting() {
        let err = TricastError::Platform(PlatformError::Auth(
            "invalid Bluesky credentials".to_string(),
        ));
        assert_eq!(
            format!("{}", err),
            "Platform error: Authentication failed: invalid Bluesky credentials"
        );

        let err = TricastError::Platform(PlatformError::PayloadTooLarge(
            "image is 1000001 bytes".to_string(),
        ));
        assert_eq!(
            format!("{}", err),
            "Platform error: Payload too large: image is 1000001 bytes"
        );
    }

    #[test]
    fn platform_error_converts_into_top_level() {
        let err: TricastError = PlatformError::Posting("relay refused".to_string()).into();
        match err {
            TricastError::Platform(PlatformError::Posting(msg)) => {
                assert_eq!(msg, "relay refused");
            }
            other => panic!("unexpected conversion: {other:?}"),
        }
    }

    #[test]
    fn config_error_converts_into_top_level() {
        let err: TricastError = ConfigError::MissingField("telegram.bot_token".to_string()).into();
        assert!(format!("{}", err).contains("telegram.bot_token"));
    }

    #[test]
    fn platform_error_is_cloneable_for_mocks() {
        let original = PlatformError::Network("timeout".to_string());
        let cloned = original.clone();
        assert_eq!(format!("{}", original), format!("{}", cloned));
    }
}
