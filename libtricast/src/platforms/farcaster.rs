//! Farcaster platform implementation
//!
//! Casts carry the line-break-preserving text plus up to two embed slots.
//! An attached image is hosted on the Imgur-like service first and takes the
//! first slot; the rest are filled from URLs retained out of the raw text.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{FarcasterConfig, ImgurConfig};
use crate::error::{PlatformError, Result};
use crate::platforms::{PlatformRef, Publisher};
use crate::text::{clean_text, CleanedText, Whitespace};

/// Total embed slots per cast.
const EMBED_SLOTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct CastRequest {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    embeds: Option<Vec<String>>,
}

/// Fill the cast body: a hosted image takes the first embed slot (with a
/// trailing newline separating attachment from body), retained URLs fill
/// whatever slots remain.
fn build_cast(cleaned: CleanedText, image_url: Option<String>) -> CastRequest {
    let mut text = cleaned.text;
    let mut embeds: Vec<String> = Vec::new();

    if let Some(url) = image_url {
        embeds.push(url);
        text.push('\n');
    }

    let remaining = EMBED_SLOTS - embeds.len();
    embeds.extend(cleaned.urls.into_iter().take(remaining));

    CastRequest {
        text,
        embeds: if embeds.is_empty() { None } else { Some(embeds) },
    }
}

#[derive(Debug, Deserialize)]
struct ImgurResponse {
    data: ImgurImage,
}

#[derive(Debug, Deserialize)]
struct ImgurImage {
    link: String,
}

pub struct FarcasterPublisher {
    http: reqwest::Client,
    auth_header: String,
    api_base: String,
    imgur_client_id: String,
    imgur_api_base: String,
}

impl FarcasterPublisher {
    pub fn new(config: &FarcasterConfig, imgur: &ImgurConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth_header: config.auth_header.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            imgur_client_id: imgur.client_id.clone(),
            imgur_api_base: imgur.api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Upload the image as a base64 form post and return the hosted URL.
    async fn upload_image(&self, bytes: &[u8]) -> Result<String> {
        let encoded = BASE64.encode(bytes);
        let form = [("image", encoded.as_str()), ("type", "base64")];

        let resp = self
            .http
            .post(format!("{}/3/image", self.imgur_api_base))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Client-ID {}", self.imgur_client_id),
            )
            .form(&form)
            .send()
            .await
            .map_err(|e| PlatformError::Network(format!("image host upload failed: {}", e)))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(
                PlatformError::RateLimit(format!("image host rate limit: {}", status)).into(),
            );
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PlatformError::Posting(format!(
                "image host returned {}: {}",
                status, body
            ))
            .into());
        }

        let parsed: ImgurResponse = resp.json().await.map_err(|e| {
            PlatformError::Protocol(format!("unexpected image host response: {}", e))
        })?;

        info!(url = %parsed.data.link, "uploaded image to host");
        Ok(parsed.data.link)
    }
}

#[async_trait]
impl Publisher for FarcasterPublisher {
    fn name(&self) -> &str {
        "farcaster"
    }

    fn display_name(&self) -> &str {
        "Farcaster"
    }

    async fn publish(&self, text: &str, image: Option<&[u8]>) -> Result<PlatformRef> {
        let cleaned = clean_text(text, Whitespace::PreserveLines);

        let image_url = match image {
            Some(bytes) => Some(self.upload_image(bytes).await?),
            None => None,
        };

        let cast = build_cast(cleaned, image_url);
        if let Some(embeds) = &cast.embeds {
            debug!(?embeds, "cast embeds prepared");
        }

        let resp = self
            .http
            .post(format!("{}/v2/casts", self.api_base))
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
            .json(&cast)
            .send()
            .await
            .map_err(|e| PlatformError::Network(format!("Farcaster post failed: {}", e)))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(
                PlatformError::RateLimit(format!("Farcaster rate limit: {}", status)).into(),
            );
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            return Err(PlatformError::Auth(format!(
                "Farcaster rejected credentials: {} {}",
                status, body
            ))
            .into());
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PlatformError::Posting(format!(
                "Farcaster returned {}: {}",
                status, body
            ))
            .into());
        }

        // The cast endpoint exposes no structured post id; the status code
        // is the only reference available.
        Ok(PlatformRef::Status(status.as_u16()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaned(text: &str, urls: &[&str]) -> CleanedText {
        CleanedText {
            text: text.to_string(),
            urls: urls.iter().map(|u| u.to_string()).collect(),
        }
    }

    #[test]
    fn text_only_cast_has_no_embeds() {
        let cast = build_cast(cleaned("hello", &[]), None);
        assert_eq!(cast.text, "hello");
        assert_eq!(cast.embeds, None);
    }

    #[test]
    fn image_takes_first_slot_and_appends_newline() {
        let cast = build_cast(
            cleaned("hello", &["https://a.example", "https://b.example"]),
            Some("https://host.example/img.jpg".to_string()),
        );
        assert_eq!(cast.text, "hello\n");
        assert_eq!(
            cast.embeds,
            Some(vec![
                "https://host.example/img.jpg".to_string(),
                "https://a.example".to_string(),
            ])
        );
    }

    #[test]
    fn urls_fill_both_slots_without_image() {
        let cast = build_cast(
            cleaned("hello", &["https://a.example", "https://b.example"]),
            None,
        );
        assert_eq!(cast.text, "hello");
        assert_eq!(
            cast.embeds,
            Some(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string(),
            ])
        );
    }

    #[test]
    fn cast_serializes_without_null_embeds() {
        let json = serde_json::to_string(&build_cast(cleaned("hi", &[]), None)).unwrap();
        assert_eq!(json, r#"{"text":"hi"}"#);

        let json = serde_json::to_string(&build_cast(
            cleaned("hi", &["https://a.example"]),
            None,
        ))
        .unwrap();
        assert_eq!(json, r#"{"text":"hi","embeds":["https://a.example"]}"#);
    }

    #[test]
    fn publisher_uses_line_preserving_cleanup() {
        let cleaned = clean_text("one\r\ntwo https://a.example", Whitespace::PreserveLines);
        let cast = build_cast(cleaned, None);
        assert_eq!(cast.text, "one\ntwo");
        assert_eq!(cast.embeds, Some(vec!["https://a.example".to_string()]));
    }
}
