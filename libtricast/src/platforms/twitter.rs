//! X (Twitter-like) platform implementation
//!
//! The media-upload endpoint takes a file path, not a byte stream, so an
//! attached image is spilled to a transient file first. [`MediaFile`] owns
//! that file and removes it when dropped, on every exit path.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::TwitterConfig;
use crate::error::{PlatformError, Result};
use crate::platforms::{PlatformRef, Publisher};

/// Map an X API response status to the error taxonomy.
fn map_twitter_status(status: StatusCode, body: &str, context: &str) -> PlatformError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return PlatformError::RateLimit(format!("X rate limit hit during {}: {}", context, body));
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return PlatformError::Auth(format!(
            "X rejected credentials during {}: {}",
            context, body
        ));
    }
    PlatformError::Posting(format!("X returned {} during {}: {}", status, context, body))
}

/// A transient on-disk copy of the image for the media-upload call.
///
/// The file name is derived from the current timestamp; the file is removed
/// unconditionally when the guard drops, whether or not the upload worked.
struct MediaFile {
    path: PathBuf,
}

impl MediaFile {
    fn create(bytes: &[u8]) -> Result<Self> {
        let path = std::env::temp_dir().join(format!(
            "tricast_media_{}.jpg",
            chrono::Utc::now().timestamp_micros()
        ));
        std::fs::write(&path, bytes).map_err(|e| {
            PlatformError::Posting(format!(
                "failed to stage media file {}: {}",
                path.display(),
                e
            ))
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "staged media file");
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MediaFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed media file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove media file"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MediaUploadResponse {
    media_id_string: String,
}

#[derive(Debug, Deserialize)]
struct CreateTweetResponse {
    data: CreatedTweet,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
}

pub struct TwitterPublisher {
    http: reqwest::Client,
    bearer_token: String,
    api_base: String,
}

impl TwitterPublisher {
    pub fn new(config: &TwitterConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            bearer_token: config.bearer_token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    async fn upload_media(&self, media: &MediaFile) -> Result<String> {
        let bytes = tokio::fs::read(media.path()).await.map_err(|e| {
            PlatformError::Posting(format!(
                "failed to read media file {}: {}",
                media.path().display(),
                e
            ))
        })?;

        let form = Form::new().part(
            "media",
            Part::bytes(bytes)
                .file_name("media.jpg")
                .mime_str("image/jpeg")
                .map_err(|e| PlatformError::Posting(format!("invalid media mime type: {}", e)))?,
        );

        let resp = self
            .http
            .post(format!("{}/1.1/media/upload.json", self.api_base))
            .bearer_auth(&self.bearer_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PlatformError::Network(format!("X media upload failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_twitter_status(status, &body, "media upload").into());
        }

        let upload: MediaUploadResponse = resp.json().await.map_err(|e| {
            PlatformError::Protocol(format!("unexpected X media upload response: {}", e))
        })?;

        debug!(media_id = %upload.media_id_string, "uploaded media to X");
        Ok(upload.media_id_string)
    }

    async fn create_post(&self, text: &str, media_id: Option<String>) -> Result<String> {
        let mut body = serde_json::json!({ "text": text });
        if let Some(id) = media_id {
            body["media"] = serde_json::json!({ "media_ids": [id] });
        }

        let resp = self
            .http
            .post(format!("{}/2/tweets", self.api_base))
            .bearer_auth(&self.bearer_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlatformError::Network(format!("X create post failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_twitter_status(status, &body, "create post").into());
        }

        let created: CreateTweetResponse = resp.json().await.map_err(|e| {
            PlatformError::Protocol(format!("unexpected X create post response: {}", e))
        })?;

        Ok(created.data.id)
    }
}

#[async_trait]
impl Publisher for TwitterPublisher {
    fn name(&self) -> &str {
        "twitter"
    }

    fn display_name(&self) -> &str {
        "X"
    }

    async fn publish(&self, text: &str, image: Option<&[u8]>) -> Result<PlatformRef> {
        let media_id = match image {
            Some(bytes) => {
                let media = MediaFile::create(bytes)?;
                // Guard drops (and removes the file) whether this succeeds
                // or bails out through `?`.
                Some(self.upload_media(&media).await?)
            }
            None => None,
        };

        let post_id = self.create_post(text, media_id).await?;
        Ok(PlatformRef::Url(format!(
            "https://twitter.com/user/status/{}",
            post_id
        )))
    }
}
