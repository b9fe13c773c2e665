//! Firecrawl scrape API client.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use aven_memory::{ContentSource, Document, SourceError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev";

/// Fetches a page as markdown through `POST {base_url}/v1/scrape`.
#[derive(Clone)]
pub struct FirecrawlSource {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for FirecrawlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirecrawlSource")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl FirecrawlSource {
    #[must_use]
    pub fn new(api_key: String, mut base_url: String) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: aven_llm::http::default_client(),
            api_key,
            base_url,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn scrape(&self, url: &str) -> Result<Document, SourceError> {
        tracing::info!(%url, "scraping with Firecrawl");
        let response = self
            .client
            .post(format!("{}/v1/scrape", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&ScrapeRequest {
                url,
                formats: &["markdown"],
            })
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                source_name: "firecrawl".into(),
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        let body: ScrapeResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        let content = body
            .data
            .and_then(|d| d.markdown)
            .or(body.markdown)
            .unwrap_or_default();
        if content.is_empty() {
            tracing::warn!(%url, "no markdown content in Firecrawl response");
        } else {
            tracing::info!(%url, chars = content.len(), "scraped");
        }
        Ok(Document::new(url, content))
    }
}

impl ContentSource for FirecrawlSource {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "firecrawl"
    }

    fn fetch(
        &self,
        url: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Document, SourceError>> + Send + '_>> {
        let url = url.to_owned();
        Box::pin(async move { self.scrape(&url).await })
    }
}

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: &'a [&'a str],
}

#[derive(Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    markdown: Option<String>,
}

#[derive(Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn debug_redacts_key() {
        let s = FirecrawlSource::new("fc-secret".into(), DEFAULT_BASE_URL.into());
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("fc-secret"));
    }

    #[tokio::test]
    async fn reads_nested_markdown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/scrape"))
            .and(header("Authorization", "Bearer fc-key"))
            .and(body_json(serde_json::json!({
                "url": "https://www.aven.com/about",
                "formats": ["markdown"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": {"markdown": "# About Aven", "metadata": {"title": "About"}}
            })))
            .mount(&server)
            .await;

        let source = FirecrawlSource::new("fc-key".into(), format!("{}/", server.uri()));
        let doc = source.fetch("https://www.aven.com/about").await.unwrap();
        assert_eq!(doc.source, "https://www.aven.com/about");
        assert_eq!(doc.content, "# About Aven");
    }

    #[tokio::test]
    async fn reads_top_level_markdown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"markdown": "plain page"})),
            )
            .mount(&server)
            .await;

        let source = FirecrawlSource::new("k".into(), server.uri());
        let doc = source.fetch("https://x.test").await.unwrap();
        assert_eq!(doc.content, "plain page");
    }

    #[tokio::test]
    async fn missing_markdown_is_empty_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})),
            )
            .mount(&server)
            .await;

        let source = FirecrawlSource::new("k".into(), server.uri());
        let doc = source.fetch("https://x.test").await.unwrap();
        assert!(doc.content.is_empty());
    }

    #[tokio::test]
    async fn error_status_is_source_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(402))
            .mount(&server)
            .await;

        let source = FirecrawlSource::new("k".into(), server.uri());
        let err = source.fetch("https://x.test").await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 402, .. }));
    }

    #[tokio::test]
    async fn unreachable_is_http_error() {
        let source = FirecrawlSource::new("k".into(), "http://127.0.0.1:1".into());
        let err = source.fetch("https://x.test").await.unwrap_err();
        assert!(matches!(err, SourceError::Http(_)));
    }
}
