//! Multi-platform fan-out
//!
//! Publishes one post to every configured platform independently: each
//! publisher call runs through the retry executor inside its own failure
//! boundary, so one platform's error can neither block nor fail the others.
//! The aggregate is reduced to a single human-readable status line.

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{info, warn};

use crate::error::Result;
use crate::platforms::{PlatformRef, Publisher};
use crate::retry::publish_with_retry;

/// Outcome of publishing to a single platform.
#[derive(Debug, Clone)]
pub struct PublishResult {
    /// Platform identifier (e.g. "bluesky")
    pub platform: String,
    /// Label used in the status line (e.g. "Bluesky")
    pub display_name: String,
    /// Whether the post went through
    pub success: bool,
    /// Platform-native reference (if successful)
    pub reference: Option<PlatformRef>,
    /// Error message (if failed)
    pub error: Option<String>,
}

/// Aggregate of all per-platform outcomes for one logical post.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub results: Vec<PublishResult>,
}

impl PublishOutcome {
    /// The user-facing summary: `"Posted: <successes>"`, `"Failed:
    /// <failures>"`, or both joined by `" / "`. Each list is sorted
    /// alphabetically by display name; empty segments are omitted.
    pub fn status_line(&self) -> String {
        let mut posted: Vec<&str> = self
            .results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.display_name.as_str())
            .collect();
        posted.sort_unstable();

        let mut failed: Vec<&str> = self
            .results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.display_name.as_str())
            .collect();
        failed.sort_unstable();

        let mut parts = Vec::new();
        if !posted.is_empty() {
            parts.push(format!("Posted: {}", posted.join(", ")));
        }
        if !failed.is_empty() {
            parts.push(format!("Failed: {}", failed.join(", ")));
        }
        parts.join(" / ")
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }
}

/// The seam between the debounce manager and the fan-out, so the manager can
/// be tested against a counting stub.
#[async_trait]
pub trait Crossposter: Send + Sync {
    async fn crosspost(&self, text: &str, image: Option<&[u8]>) -> Result<PublishOutcome>;
}

/// Fans one post out to all configured publishers.
pub struct SocialFanout {
    publishers: Vec<Box<dyn Publisher>>,
    max_attempts: u32,
}

impl SocialFanout {
    pub fn new(publishers: Vec<Box<dyn Publisher>>, max_attempts: u32) -> Self {
        Self {
            publishers,
            max_attempts,
        }
    }

    /// Publish to every platform and collect the per-platform outcomes.
    /// Never fails as a whole: a platform error becomes that platform's
    /// failed result.
    pub async fn post_to_social(&self, text: &str, image: Option<&[u8]>) -> PublishOutcome {
        let attempts = self.max_attempts;
        let futures = self.publishers.iter().map(|publisher| async move {
            info!(platform = publisher.name(), "publishing");

            match publish_with_retry(|| publisher.publish(text, image), attempts).await {
                Ok(reference) => {
                    info!(
                        platform = publisher.name(),
                        reference = %reference,
                        "published"
                    );
                    PublishResult {
                        platform: publisher.name().to_string(),
                        display_name: publisher.display_name().to_string(),
                        success: true,
                        reference: Some(reference),
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(platform = publisher.name(), error = %e, "publish failed");
                    PublishResult {
                        platform: publisher.name().to_string(),
                        display_name: publisher.display_name().to_string(),
                        success: false,
                        reference: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        });

        PublishOutcome {
            results: join_all(futures).await,
        }
    }
}

#[async_trait]
impl Crossposter for SocialFanout {
    async fn crosspost(&self, text: &str, image: Option<&[u8]>) -> Result<PublishOutcome> {
        Ok(self.post_to_social(text, image).await)
    }
}
