//! Grounded answer assembly over retrieved chunks.

use std::sync::Arc;
use std::time::Duration;

use aven_llm::{GenerationProvider, Message};
use aven_memory::SearchResult;

use crate::config::AnswerConfig;

/// Builds a grounded prompt from search results and asks the generator.
///
/// Always resolves to text: when there is nothing to ground on, or the
/// generator fails, one of the configured fallback messages is returned.
pub struct AnswerComposer<G> {
    generator: Arc<G>,
    config: AnswerConfig,
    timeout: Duration,
}

impl<G> std::fmt::Debug for AnswerComposer<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerComposer")
            .field("max_context_chunks", &self.config.max_context_chunks)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<G: GenerationProvider> AnswerComposer<G> {
    #[must_use]
    pub fn new(generator: Arc<G>, config: AnswerConfig, timeout: Duration) -> Self {
        Self {
            generator,
            config,
            timeout,
        }
    }

    pub async fn compose(&self, query: &str, results: &[SearchResult]) -> String {
        if results.is_empty() {
            tracing::info!("no search results, answering with the no-information message");
            return self.config.no_results_message.clone();
        }

        let Some(context) = self.build_context(results) else {
            tracing::warn!(
                results = results.len(),
                "no chunk text in search results metadata"
            );
            return self.config.no_content_message.clone();
        };

        let messages = [
            Message::system(self.config.system_prompt.as_str()),
            Message::user(render_prompt(&self.config.prompt_template, &context, query)),
        ];

        match tokio::time::timeout(self.timeout, self.generator.generate(&messages)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_owned(),
            Ok(Ok(_)) => {
                tracing::warn!(provider = self.generator.name(), "blank generation output");
                self.fallback(&context)
            }
            Ok(Err(e)) => {
                tracing::warn!(provider = self.generator.name(), "generation failed: {e}");
                self.fallback(&context)
            }
            Err(_) => {
                tracing::warn!(
                    provider = self.generator.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "generation timed out"
                );
                self.fallback(&context)
            }
        }
    }

    /// Chunk texts of the first results joined by blank lines, or `None` when
    /// no result carries any.
    fn build_context(&self, results: &[SearchResult]) -> Option<String> {
        let chunks: Vec<&str> = results
            .iter()
            .filter_map(SearchResult::chunk_text)
            .take(self.config.max_context_chunks)
            .collect();
        if chunks.is_empty() {
            None
        } else {
            Some(chunks.join("\n\n"))
        }
    }

    fn fallback(&self, context: &str) -> String {
        let excerpt: String = context
            .chars()
            .take(self.config.fallback_context_chars)
            .collect();
        format!(
            "{}{excerpt}{}",
            self.config.fallback_prefix, self.config.fallback_suffix
        )
    }
}

/// Substitutes `{context}` and `{query}` in one pass, so placeholder-like text
/// inside either value is left alone.
fn render_prompt(template: &str, context: &str, query: &str) -> String {
    let mut out = String::with_capacity(template.len() + context.len() + query.len());
    let mut rest = template;
    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("{context}") {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{query}") {
            out.push_str(query);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
