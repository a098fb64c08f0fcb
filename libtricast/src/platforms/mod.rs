//! Platform publishers
//!
//! One implementation per outbound platform behind a shared [`Publisher`]
//! trait. Publishers are single-shot: they never retry. The fan-out
//! coordinator wraps each call in the retry executor and isolates failures.

use async_trait::async_trait;

use crate::error::Result;

pub mod bluesky;
pub mod farcaster;
pub mod twitter;

// Mock publisher is available for all builds to support integration tests
pub mod mock;

/// Where a successful publish landed, in whatever shape the platform
/// exposes: a canonical status URL, an AT record URI, or a bare HTTP status
/// code for platforms without a structured post id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformRef {
    Url(String),
    Uri(String),
    Status(u16),
}

impl std::fmt::Display for PlatformRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformRef::Url(url) => write!(f, "{}", url),
            PlatformRef::Uri(uri) => write!(f, "{}", uri),
            PlatformRef::Status(code) => write!(f, "HTTP {}", code),
        }
    }
}

/// A single outbound platform.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Lowercase platform identifier (e.g. "bluesky").
    fn name(&self) -> &str;

    /// Label used in the user-facing status line (e.g. "Bluesky").
    fn display_name(&self) -> &str;

    /// Publish one post, optionally with an attached image.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::PlatformError`] wrapped in [`crate::TricastError`]
    /// on any unrecoverable condition; `RateLimit` signals the caller to
    /// back off and try again.
    async fn publish(&self, text: &str, image: Option<&[u8]>) -> Result<PlatformRef>;
}
