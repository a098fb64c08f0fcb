//! Mock publisher for testing
//!
//! Configurable stand-in for a real platform: canned failures, a
//! rate-limit-then-succeed mode for retry tests, call counting, and capture
//! of published payloads. Available outside `cfg(test)` so the integration
//! suites can use it.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{PlatformError, Result};
use crate::platforms::{PlatformRef, Publisher};

pub struct MockPublisher {
    name: String,
    display_name: String,
    /// Fail with `RateLimit` this many times before succeeding.
    rate_limit_first: usize,
    /// Permanent failure returned on every call.
    fail_with: Option<PlatformError>,
    calls: Arc<Mutex<usize>>,
    published: Arc<Mutex<Vec<(String, bool)>>>,
}

impl MockPublisher {
    /// A publisher that always succeeds.
    pub fn success(name: &str, display_name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            rate_limit_first: 0,
            fail_with: None,
            calls: Arc::new(Mutex::new(0)),
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A publisher that fails every call with the given error.
    pub fn failing(name: &str, display_name: &str, error: PlatformError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::success(name, display_name)
        }
    }

    /// A publisher that reports a rate limit `times` times, then succeeds.
    pub fn rate_limited(name: &str, display_name: &str, times: usize) -> Self {
        Self {
            rate_limit_first: times,
            ..Self::success(name, display_name)
        }
    }

    /// Number of publish calls made so far.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    /// Payloads published successfully, as `(text, had_image)`.
    pub fn published(&self) -> Vec<(String, bool)> {
        self.published.lock().unwrap().clone()
    }

    /// Shared handles for asserting after the publisher has been moved into
    /// a fan-out.
    pub fn counters(&self) -> (Arc<Mutex<usize>>, Arc<Mutex<Vec<(String, bool)>>>) {
        (self.calls.clone(), self.published.clone())
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn publish(&self, text: &str, image: Option<&[u8]>) -> Result<PlatformRef> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };

        if call <= self.rate_limit_first {
            return Err(PlatformError::RateLimit(format!(
                "mock rate limit ({}/{})",
                call, self.rate_limit_first
            ))
            .into());
        }

        if let Some(error) = &self.fail_with {
            return Err(error.clone().into());
        }

        self.published
            .lock()
            .unwrap()
            .push((text.to_string(), image.is_some()));

        Ok(PlatformRef::Uri(format!("mock://{}/{}", self.name, call)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_mock_records_payloads() {
        let publisher = MockPublisher::success("mock", "Mock");

        let reference = publisher.publish("hello", None).await.unwrap();
        assert_eq!(reference, PlatformRef::Uri("mock://mock/1".to_string()));

        publisher.publish("with image", Some(b"img")).await.unwrap();
        assert_eq!(publisher.call_count(), 2);
        assert_eq!(
            publisher.published(),
            vec![
                ("hello".to_string(), false),
                ("with image".to_string(), true)
            ]
        );
    }

    #[tokio::test]
    async fn failing_mock_returns_configured_error() {
        let publisher = MockPublisher::failing(
            "mock",
            "Mock",
            PlatformError::Auth("denied".to_string()),
        );

        let err = publisher.publish("hello", None).await.unwrap_err();
        assert!(err.to_string().contains("denied"));
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn rate_limited_mock_recovers() {
        let publisher = MockPublisher::rate_limited("mock", "Mock", 2);

        assert!(publisher.publish("a", None).await.unwrap_err().is_rate_limit());
        assert!(publisher.publish("a", None).await.unwrap_err().is_rate_limit());
        assert!(publisher.publish("a", None).await.is_ok());
        assert_eq!(publisher.call_count(), 3);
    }
}
