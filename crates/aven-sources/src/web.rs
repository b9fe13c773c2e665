//! Direct HTTPS fetch with HTML-to-text extraction.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use aven_memory::{ContentSource, Document, SourceError};
use url::Url;

const TEXT_SELECTOR: &str = "h1, h2, h3, h4, p, li";

/// Fetches public HTTPS pages and keeps the readable text.
#[derive(Debug, Clone)]
pub struct WebSource {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl Default for WebSource {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), 5 * 1024 * 1024)
    }
}

impl WebSource {
    #[must_use]
    pub fn new(timeout: Duration, max_body_bytes: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("aven/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()
            .unwrap_or_default();

        Self {
            client,
            max_body_bytes,
        }
    }

    async fn fetch_html(&self, url: &str) -> Result<String, SourceError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SourceError::Status {
                source_name: "web".into(),
                url: url.to_owned(),
                status: resp.status().as_u16(),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        if bytes.len() > self.max_body_bytes {
            return Err(SourceError::TooLarge(bytes.len()));
        }

        String::from_utf8(bytes.to_vec()).map_err(|e| SourceError::Malformed(e.to_string()))
    }

    async fn load(&self, url: &str) -> Result<Document, SourceError> {
        validate_url(url)?;
        let html = self.fetch_html(url).await?;
        let text = tokio::task::spawn_blocking(move || extract_text(&html))
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;
        tracing::info!(%url, chars = text.len(), "fetched page");
        Ok(Document::new(url, text))
    }
}

impl ContentSource for WebSource {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "web"
    }

    fn fetch(
        &self,
        url: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Document, SourceError>> + Send + '_>> {
        let url = url.to_owned();
        Box::pin(async move { self.load(&url).await })
    }
}

fn validate_url(raw: &str) -> Result<(), SourceError> {
    let parsed = Url::parse(raw).map_err(|_| SourceError::InvalidUrl(raw.to_owned()))?;

    if parsed.scheme() != "https" {
        return Err(SourceError::Blocked(format!(
            "scheme not allowed: {}",
            parsed.scheme()
        )));
    }

    if let Some(host) = parsed.host()
        && is_private_host(&host)
    {
        return Err(SourceError::Blocked(format!(
            "private/local host: {}",
            parsed.host_str().unwrap_or("")
        )));
    }

    Ok(())
}

fn is_private_v4(v4: std::net::Ipv4Addr) -> bool {
    v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified() || v4.is_broadcast()
}

fn is_private_host(host: &url::Host<&str>) -> bool {
    match host {
        url::Host::Domain(d) => *d == "localhost",
        url::Host::Ipv4(v4) => is_private_v4(*v4),
        url::Host::Ipv6(v6) => {
            if v6.is_loopback() || v6.is_unspecified() {
                return true;
            }
            let seg = v6.segments();
            // fe80::/10 link-local, fc00::/7 unique local
            if seg[0] & 0xffc0 == 0xfe80 || seg[0] & 0xfe00 == 0xfc00 {
                return true;
            }
            v6.to_ipv4_mapped().is_some_and(is_private_v4)
        }
    }
}

/// Readable text of a page: headings, paragraphs and list items in document
/// order, or the whole body when none are present.
fn extract_text(html: &str) -> String {
    let soup = scrape_core::Soup::parse(html);

    let blocks: Vec<String> = soup
        .find_all(TEXT_SELECTOR)
        .map(|tags| {
            tags.into_iter()
                .map(|tag| tag.text().trim().to_owned())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if !blocks.is_empty() {
        return blocks.join("\n\n");
    }

    soup.find_all("body")
        .ok()
        .and_then(|tags| tags.into_iter().next())
        .map(|body| body.text().trim().to_owned())
        .unwrap_or_default()
}
