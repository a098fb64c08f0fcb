//! Per-user debounce of text-then-image posts
//!
//! A text message opens a bounded window during which a photo may still
//! arrive for the same logical post. The table holds at most one pending
//! entry per user; a newer text supersedes the old entry wholesale, a photo
//! consumes it immediately, and the window elapsing publishes text-only.
//! Every path removes the entry and sends exactly one reply.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::poster::Crossposter;

/// Reply sent when the fan-out itself errors (programming-error backstop).
pub const FAILURE_REPLY: &str = "Failed posting to social platforms";

/// Reply sent when a photo arrives with no pending text.
pub const SEND_TEXT_FIRST_REPLY: &str = "Please send text first.";

/// Sends a plain-text reply back on the originating channel.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send_reply(&self, chat_id: i64, text: &str) -> Result<()>;
}

struct PendingPost {
    text: String,
    chat_id: i64,
    received_at: Instant,
    /// Distinguishes this entry from any successor under the same user key,
    /// so a timer racing its own cancellation can never publish a stale or
    /// duplicate post.
    generation: u64,
    timer: JoinHandle<()>,
}

struct Inner {
    table: Mutex<HashMap<i64, PendingPost>>,
    next_generation: AtomicU64,
    crossposter: Arc<dyn Crossposter>,
    replies: Arc<dyn ReplySink>,
}

impl Inner {
    /// Timer body: claim the entry if it is still ours, then publish.
    async fn fire_window(self: Arc<Self>, user_id: i64, generation: u64) {
        let entry = {
            let mut table = self.table.lock().unwrap();
            match table.get(&user_id) {
                Some(e) if e.generation == generation => table.remove(&user_id),
                // Superseded or already consumed; the race is benign.
                _ => None,
            }
        };

        let Some(entry) = entry else { return };

        info!(
            user_id,
            waited_secs = entry.received_at.elapsed().as_secs(),
            "debounce window elapsed, publishing text-only post"
        );
        self.publish_and_reply(entry.chat_id, &entry.text, None).await;
    }

    async fn publish_and_reply(&self, chat_id: i64, text: &str, image: Option<&[u8]>) {
        let reply = match self.crossposter.crosspost(text, image).await {
            Ok(outcome) => outcome.status_line(),
            Err(e) => {
                error!(error = %e, "crosspost failed unexpectedly");
                FAILURE_REPLY.to_string()
            }
        };

        if let Err(e) = self.replies.send_reply(chat_id, &reply).await {
            warn!(chat_id, error = %e, "failed to deliver status reply");
        }
    }
}

/// The per-user pending-post table. Cheap to clone into handlers.
#[derive(Clone)]
pub struct PendingPosts {
    inner: Arc<Inner>,
    window: Duration,
}

impl PendingPosts {
    pub fn new(
        crossposter: Arc<dyn Crossposter>,
        replies: Arc<dyn ReplySink>,
        window: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                table: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                crossposter,
                replies,
            }),
            window,
        }
    }

    /// A text message opens (or restarts) the user's debounce window. Any
    /// prior pending text from the same user is discarded, not merged.
    pub async fn handle_text(&self, user_id: i64, chat_id: i64, text: String) {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);

        let mut table = self.inner.table.lock().unwrap();
        if let Some(prior) = table.remove(&user_id) {
            info!(user_id, "superseding pending post");
            prior.timer.abort();
        }

        let timer = tokio::spawn({
            let inner = self.inner.clone();
            let window = self.window;
            async move {
                tokio::time::sleep(window).await;
                inner.fire_window(user_id, generation).await;
            }
        });

        table.insert(
            user_id,
            PendingPost {
                text,
                chat_id,
                received_at: Instant::now(),
                generation,
                timer,
            },
        );
        drop(table);

        info!(user_id, "text received, waiting for a possible image");
    }

    /// A photo closes the window immediately: publish the stored text with
    /// the image. Without a pending text there is nothing to attach to.
    pub async fn handle_photo(&self, user_id: i64, chat_id: i64, image: Vec<u8>) {
        let entry = self.inner.table.lock().unwrap().remove(&user_id);

        let Some(entry) = entry else {
            if let Err(e) = self
                .inner
                .replies
                .send_reply(chat_id, SEND_TEXT_FIRST_REPLY)
                .await
            {
                warn!(chat_id, error = %e, "failed to deliver prompt");
            }
            return;
        };

        entry.timer.abort();
        info!(user_id, bytes = image.len(), "image received, publishing");
        self.inner
            .publish_and_reply(entry.chat_id, &entry.text, Some(&image))
            .await;
    }

    /// Drop a user's pending entry without publishing. Used by the
    /// transport when it cannot materialize the image it was handed.
    pub fn discard(&self, user_id: i64) -> bool {
        match self.inner.table.lock().unwrap().remove(&user_id) {
            Some(entry) => {
                entry.timer.abort();
                true
            }
            None => false,
        }
    }

    /// Number of users currently inside a debounce window.
    pub fn pending_users(&self) -> usize {
        self.inner.table.lock().unwrap().len()
    }
}
