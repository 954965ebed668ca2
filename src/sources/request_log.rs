use std::time::Instant;

use http::Extensions;
use reqwest::Url;
use reqwest_middleware::{Middleware, Next};
use tracing::debug;

const REDACTED_PARAMS: &[&str] = &["api_key"];

/// Logs every outgoing request with its status and latency at `debug`.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RequestLogMiddleware;

/// Renders a URL for logs with credentials in the query string masked.
pub(crate) fn redacted_url(url: &Url) -> String {
    let mut out = url.clone();
    let has_secret = url
        .query_pairs()
        .any(|(k, _)| REDACTED_PARAMS.contains(&k.as_ref()));
    if !has_secret {
        return out.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if REDACTED_PARAMS.contains(&k.as_ref()) {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    out.query_pairs_mut().clear().extend_pairs(pairs);
    out.to_string()
}

#[async_trait::async_trait]
impl Middleware for RequestLogMiddleware {
    async fn handle(
        &self,
        req: reqwest::Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        let method = req.method().clone();
        let url = redacted_url(req.url());
        let start = Instant::now();

        let result = next.run(req, extensions).await;
        let elapsed_ms = start.elapsed().as_millis();
        match &result {
            Ok(resp) => debug!(
                %method,
                %url,
                status = resp.status().as_u16(),
                elapsed_ms,
                "HTTP request completed"
            ),
            Err(err) => debug!(%method, %url, elapsed_ms, "HTTP request failed: {err}"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_url_masks_api_key() {
        let url =
            Url::parse("https://api.fda.gov/drug/label.json?search=x&api_key=secret&limit=1")
                .unwrap();
        let shown = redacted_url(&url);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("api_key=***") || shown.contains("api_key=%2A%2A%2A"));
        assert!(shown.contains("limit=1"));
    }

    #[test]
    fn redacted_url_leaves_plain_urls_alone() {
        let url = Url::parse("https://api.fda.gov/drug/label.json?limit=1").unwrap();
        assert_eq!(redacted_url(&url), "https://api.fda.gov/drug/label.json?limit=1");
    }
}
