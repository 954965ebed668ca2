//! Source clients and shared HTTP utilities for the openFDA label API.

use std::borrow::Cow;
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::MedLookupError;

pub(crate) mod openfda;
pub(crate) mod request_log;

const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

static HTTP_CLIENT: OnceLock<ClientWithMiddleware> = OnceLock::new();

pub(crate) fn env_base(default: &'static str, env_var: &str) -> Cow<'static, str> {
    std::env::var(env_var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(Cow::Owned)
        .unwrap_or_else(|| Cow::Borrowed(default))
}

/// Process-wide client with request logging. Each query is sent once, uncached.
pub(crate) fn shared_client() -> Result<ClientWithMiddleware, MedLookupError> {
    if let Some(client) = HTTP_CLIENT.get() {
        return Ok(client.clone());
    }

    let base_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("medlookup/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(MedLookupError::HttpClientInit)?;

    let client = ClientBuilder::new(base_client)
        .with(request_log::RequestLogMiddleware)
        .build();

    match HTTP_CLIENT.set(client.clone()) {
        Ok(()) => Ok(client),
        Err(_) => HTTP_CLIENT.get().cloned().ok_or_else(|| MedLookupError::Api {
            api: "http-client".into(),
            message: "Shared HTTP client initialization race".into(),
        }),
    }
}

const EXCERPT_MAX_CHARS: usize = 512;

/// Collapses whitespace and caps an error body for log lines and messages.
pub(crate) fn body_excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(EXCERPT_MAX_CHARS) {
        Some((cut, _)) => format!("{} …", &flat[..cut]),
        None => flat,
    }
}

fn media_type(content_type: &HeaderValue) -> Option<String> {
    let raw = content_type.to_str().ok()?;
    let media = raw.split(';').next()?.trim().to_ascii_lowercase();
    (!media.is_empty()).then_some(media)
}

/// A fully read response body with the status and content type it came with.
#[derive(Debug)]
pub(crate) struct ResponseBody {
    pub status: StatusCode,
    content_type: Option<HeaderValue>,
    bytes: Vec<u8>,
}

impl ResponseBody {
    /// Reads the body, failing once it grows past [`MAX_BODY_BYTES`].
    pub(crate) async fn read(
        mut resp: reqwest::Response,
        api: &str,
    ) -> Result<Self, MedLookupError> {
        let status = resp.status();
        let content_type = resp.headers().get(CONTENT_TYPE).cloned();
        let mut bytes: Vec<u8> = Vec::new();

        while let Some(chunk) = resp.chunk().await? {
            if bytes.len().saturating_add(chunk.len()) > MAX_BODY_BYTES {
                return Err(MedLookupError::Api {
                    api: api.to_string(),
                    message: format!("Response body exceeded {MAX_BODY_BYTES} bytes"),
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(Self {
            status,
            content_type,
            bytes,
        })
    }

    pub(crate) fn excerpt(&self) -> String {
        body_excerpt(&self.bytes)
    }

    /// Decodes the body as JSON. HTML pages (maintenance, gateway errors) are
    /// rejected before parsing; other non-JSON types are parsed anyway.
    pub(crate) fn json<T: DeserializeOwned>(&self, api: &str) -> Result<T, MedLookupError> {
        if let Some(media) = self.content_type.as_ref().and_then(media_type) {
            if matches!(media.as_str(), "text/html" | "application/xhtml+xml") {
                return Err(MedLookupError::Api {
                    api: api.to_string(),
                    message: format!("Unexpected HTML response ({media}): {}", self.excerpt()),
                });
            }
            if media != "application/json" && !media.ends_with("+json") {
                warn!(source = api, content_type = %media, "Non-JSON content type, parsing anyway");
            }
        }

        serde_json::from_slice(&self.bytes).map_err(|source| MedLookupError::ApiJson {
            api: api.to_string(),
            source,
        })
    }
}
