//! Tricast - debounced cross-posting relay
//!
//! This library implements the core of the relay: a short per-user waiting
//! window that merges a text message with an optional trailing image, then a
//! fan-out publish to X, Farcaster, and Bluesky with per-platform retry and
//! aggregated status reporting.

pub mod config;
pub mod error;
pub mod logging;
pub mod pending;
pub mod platforms;
pub mod poster;
pub mod retry;
pub mod text;

// Re-export commonly used types
pub use config::Config;
pub use error::{PlatformError, Result, TricastError};
pub use pending::{PendingPosts, ReplySink};
pub use platforms::{PlatformRef, Publisher};
pub use poster::{Crossposter, PublishOutcome, PublishResult, SocialFanout};
