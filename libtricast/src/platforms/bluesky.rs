//! Bluesky platform implementation
//!
//! Talks XRPC directly: session creation, blob upload, record creation.
//! The session (access token + DID) is created lazily on first publish and
//! reused for the life of the process; there is no refresh on expiry.

use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::BlueskyConfig;
use crate::error::{PlatformError, Result};
use crate::platforms::{PlatformRef, Publisher};
use crate::text::bluesky_format;

/// Hard upper bound on an image blob, enforced before any upload.
pub const MAX_BLOB_BYTES: usize = 1_000_000;

const ALT_TEXT: &str = "Attached image";
const POST_COLLECTION: &str = "app.bsky.feed.post";

/// Facet spans are byte offsets into the UTF-8 text, so the scan runs over
/// bytes, not characters.
static LINK_RE: LazyLock<regex::bytes::Regex> =
    LazyLock::new(|| regex::bytes::Regex::new(r"https?://\S+").expect("valid link pattern"));

fn map_bluesky_status(status: StatusCode, body: &str, context: &str) -> PlatformError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return PlatformError::RateLimit(format!(
            "Bluesky rate limit hit during {}: {}",
            context, body
        ));
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return PlatformError::Auth(format!(
            "Bluesky rejected the session during {}: {}",
            context, body
        ));
    }
    PlatformError::Posting(format!(
        "Bluesky returned {} during {}: {}",
        status, context, body
    ))
}

/// Compute link facets: one `(byteStart, byteEnd, uri)` span per URL in the
/// UTF-8 encoding of `text`.
fn link_facets(text: &str) -> Vec<serde_json::Value> {
    LINK_RE
        .find_iter(text.as_bytes())
        .map(|m| {
            let uri = String::from_utf8_lossy(m.as_bytes()).into_owned();
            json!({
                "index": {
                    "byteStart": m.start(),
                    "byteEnd": m.end(),
                },
                "features": [{
                    "$type": "app.bsky.richtext.facet#link",
                    "uri": uri,
                }],
            })
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
struct Session {
    #[serde(rename = "accessJwt")]
    access_jwt: String,
    did: String,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    blob: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CreateRecordResponse {
    uri: String,
}

pub struct BlueskyPublisher {
    http: reqwest::Client,
    service: String,
    handle: String,
    app_password: String,
    session: tokio::sync::Mutex<Option<Session>>,
}

impl BlueskyPublisher {
    pub fn new(config: &BlueskyConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            service: config.service.trim_end_matches('/').to_string(),
            handle: config.handle.clone(),
            app_password: config.app_password.clone(),
            session: tokio::sync::Mutex::new(None),
        }
    }

    fn xrpc(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.service, method)
    }

    /// Return the cached session, creating one on first use. The lock is
    /// held across the login call so concurrent publishes cannot race two
    /// logins.
    async fn session(&self) -> Result<Session> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        debug!(handle = %self.handle, "creating Bluesky session");
        let resp = self
            .http
            .post(self.xrpc("com.atproto.server.createSession"))
            .json(&json!({
                "identifier": self.handle,
                "password": self.app_password,
            }))
            .send()
            .await
            .map_err(|e| PlatformError::Network(format!("Bluesky session request failed: {}", e)))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(PlatformError::Auth(
                "invalid Bluesky credentials; make sure to use an app password".to_string(),
            )
            .into());
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_bluesky_status(status, &body, "session creation").into());
        }

        let session: Session = resp.json().await.map_err(|e| {
            PlatformError::Protocol(format!("unexpected Bluesky session response: {}", e))
        })?;

        info!(did = %session.did, "Bluesky session created");
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn upload_blob(&self, session: &Session, bytes: &[u8]) -> Result<serde_json::Value> {
        if bytes.len() > MAX_BLOB_BYTES {
            return Err(PlatformError::PayloadTooLarge(format!(
                "image is {} bytes, Bluesky limit is {}",
                bytes.len(),
                MAX_BLOB_BYTES
            ))
            .into());
        }

        let resp = self
            .http
            .post(self.xrpc("com.atproto.repo.uploadBlob"))
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .bearer_auth(&session.access_jwt)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| PlatformError::Network(format!("Bluesky blob upload failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_bluesky_status(status, &body, "blob upload").into());
        }

        let parsed: BlobResponse = resp.json().await.map_err(|e| {
            PlatformError::Protocol(format!("unexpected Bluesky blob response: {}", e))
        })?;
        Ok(parsed.blob)
    }
}

#[async_trait]
impl Publisher for BlueskyPublisher {
    fn name(&self) -> &str {
        "bluesky"
    }

    fn display_name(&self) -> &str {
        "Bluesky"
    }

    async fn publish(&self, text: &str, image: Option<&[u8]>) -> Result<PlatformRef> {
        let session = self.session().await?;
        let formatted = bluesky_format(text);

        let mut record = json!({
            "$type": POST_COLLECTION,
            "text": formatted,
            "createdAt": chrono::Utc::now()
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        });

        let facets = link_facets(&formatted);
        if !facets.is_empty() {
            debug!(count = facets.len(), "adding link facets");
            record["facets"] = json!(facets);
        }

        if let Some(bytes) = image {
            let blob = self.upload_blob(&session, bytes).await?;
            record["embed"] = json!({
                "$type": "app.bsky.embed.images",
                "images": [{
                    "alt": ALT_TEXT,
                    "image": blob,
                }],
            });
        }

        let resp = self
            .http
            .post(self.xrpc("com.atproto.repo.createRecord"))
            .bearer_auth(&session.access_jwt)
            .json(&json!({
                "repo": session.did,
                "collection": POST_COLLECTION,
                "record": record,
            }))
            .send()
            .await
            .map_err(|e| PlatformError::Network(format!("Bluesky record creation failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_bluesky_status(status, &body, "record creation").into());
        }

        let created: CreateRecordResponse = resp.json().await.map_err(|e| {
            PlatformError::Protocol(format!("unexpected Bluesky record response: {}", e))
        })?;

        Ok(PlatformRef::Uri(created.uri))
    }
}
