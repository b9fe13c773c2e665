use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use aven_memory::{ContentSource, Document, SourceError};

/// In-memory URL to text map.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pages: HashMap<String, String>,
}

impl StaticSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.pages.insert(url.into(), text.into());
        self
    }
}

impl ContentSource for StaticSource {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(
        &self,
        url: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Document, SourceError>> + Send + '_>> {
        let result = self
            .pages
            .get(url)
            .map(|text| Document::new(url, text.as_str()))
            .ok_or_else(|| SourceError::NotFound(url.to_owned()));
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_configured_page() {
        let source = StaticSource::new().with_page("https://example.com/a", "hello");
        let doc = source.fetch("https://example.com/a").await.unwrap();
        assert_eq!(doc.content, "hello");
        assert_eq!(doc.source, "https://example.com/a");
    }

    #[tokio::test]
    async fn unknown_url_is_not_found() {
        let source = StaticSource::new().with_page("https://a", "x");
        let err = source.fetch("https://b").await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }
}
