use std::sync::Arc;

use super::DocumentError;
use super::codec::{TokenCodec, WordCodec, decode};
use super::types::{Chunk, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterConfig {
    pub max_tokens: usize,
    pub overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            overlap: 50,
        }
    }
}

impl SplitterConfig {
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidConfiguration`] unless `0 <= overlap < max_tokens`.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.max_tokens == 0 {
            return Err(DocumentError::InvalidConfiguration(
                "max_tokens must be greater than zero".into(),
            ));
        }
        if self.overlap >= self.max_tokens {
            return Err(DocumentError::InvalidConfiguration(format!(
                "overlap ({}) must be smaller than max_tokens ({})",
                self.overlap, self.max_tokens
            )));
        }
        Ok(())
    }

    fn step(&self) -> usize {
        self.max_tokens - self.overlap
    }
}

/// Sliding-window splitter over a token sequence.
#[derive(Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
    codec: Arc<dyn TokenCodec>,
}

impl std::fmt::Debug for TextSplitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextSplitter")
            .field("config", &self.config)
            .field("codec", &self.codec.name())
            .finish()
    }
}

impl TextSplitter {
    /// Splitter using the built-in [`WordCodec`].
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidConfiguration`] if the config is invalid.
    pub fn new(config: SplitterConfig) -> Result<Self, DocumentError> {
        Self::with_codec(config, Arc::new(WordCodec))
    }

    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidConfiguration`] if the config is invalid.
    pub fn with_codec(
        config: SplitterConfig,
        codec: Arc<dyn TokenCodec>,
    ) -> Result<Self, DocumentError> {
        config.validate()?;
        Ok(Self { config, codec })
    }

    #[must_use]
    pub fn config(&self) -> SplitterConfig {
        self.config
    }

    /// Split a document into overlapping token windows.
    ///
    /// Windows start at 0 and advance by `max_tokens - overlap` until the start
    /// reaches the end of the token sequence. Windows that decode to blank text
    /// are dropped; chunk indexes stay dense.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Tokenizer`] if the codec fails.
    pub fn split(&self, document: &Document) -> Result<Vec<Chunk>, DocumentError> {
        let text = document.content.as_str();
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let spans = self.codec.spans(text)?;
        let step = self.config.step();
        let mut chunks = Vec::new();

        for start in (0..spans.len()).step_by(step) {
            let end = start.saturating_add(self.config.max_tokens).min(spans.len());
            let window = decode(text, &spans, start..end).trim();
            if window.is_empty() {
                continue;
            }
            chunks.push(Chunk {
                source: document.source.clone(),
                text: window.to_owned(),
                chunk_index: chunks.len(),
                token_start: start,
                token_end: end,
            });
        }

        Ok(chunks)
    }

    /// Chunk raw text, returning only the window texts.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Tokenizer`] if the codec fails.
    pub fn chunk(&self, text: &str) -> Result<Vec<String>, DocumentError> {
        let doc = Document::new(String::new(), text);
        Ok(self.split(&doc)?.into_iter().map(|c| c.text).collect())
    }
}

/// Chunk `text` with the built-in codec.
///
/// # Errors
///
/// Returns [`DocumentError::InvalidConfiguration`] unless `overlap < max_tokens`.
pub fn chunk(text: &str, max_tokens: usize, overlap: usize) -> Result<Vec<String>, DocumentError> {
    TextSplitter::new(SplitterConfig {
        max_tokens,
        overlap,
    })?
    .chunk(text)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn make_doc(content: &str) -> Document {
        Document::new("https://example.com/a", content)
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn empty_and_blank_text() {
        assert!(chunk("", 500, 50).unwrap().is_empty());
        assert!(chunk("   ", 500, 50).unwrap().is_empty());
        assert!(chunk("\n\t", 10, 0).unwrap().is_empty());
    }

    #[test]
    fn short_text_is_one_trimmed_chunk() {
        let chunks = chunk("  Aven offers 24/7 support.  ", 500, 50).unwrap();
        assert_eq!(chunks, vec!["Aven offers 24/7 support."]);
    }

    #[test]
    fn extreme_window_sizes_terminate() {
        let chunks = chunk("a b c", usize::MAX, usize::MAX - 1).unwrap();
        assert_eq!(chunks, vec!["a b c", "b c", "c"]);
    }

    #[test]
    fn rejects_zero_max_tokens() {
        let err = chunk("text", 0, 0).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidConfiguration(_)));
    }

    #[test]
    fn rejects_overlap_not_below_max() {
        assert!(chunk("text", 10, 10).is_err());
        assert!(chunk("text", 10, 11).is_err());
        assert!(chunk("text", 10, 9).is_ok());
    }

    #[test]
    fn windows_advance_by_step() {
        let splitter = TextSplitter::new(SplitterConfig {
            max_tokens: 4,
            overlap: 1,
        })
        .unwrap();
        let chunks = splitter.split(&make_doc(&words(10))).unwrap();
        let spans: Vec<_> = chunks.iter().map(|c| (c.token_start, c.token_end)).collect();
        assert_eq!(spans, vec![(0, 4), (3, 7), (6, 10), (9, 10)]);
        assert_eq!(chunks[0].text, "w0 w1 w2 w3");
        assert_eq!(chunks[1].text, "w3 w4 w5 w6");
        assert_eq!(chunks[3].text, "w9");
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert_eq!(c.source, "https://example.com/a");
        }
    }

    #[test]
    fn zero_overlap_partitions_tokens() {
        let chunks = chunk(&words(6), 3, 0).unwrap();
        assert_eq!(chunks, vec!["w0 w1 w2", "w3 w4 w5"]);
    }

    #[test]
    fn debug_shows_codec_name() {
        let splitter = TextSplitter::new(SplitterConfig::default()).unwrap();
        assert!(format!("{splitter:?}").contains("word"));
    }

    proptest! {
        #[test]
        fn chunks_are_non_empty_after_trim(
            text in "[a-z .,!\n]{0,400}",
            max in 1usize..40,
            overlap_seed in 0usize..40,
        ) {
            let overlap = overlap_seed % max;
            let chunks = chunk(&text, max, overlap).unwrap();
            for c in &chunks {
                prop_assert!(!c.trim().is_empty());
                prop_assert_eq!(c.trim(), c.as_str());
            }
            if text.trim().is_empty() {
                prop_assert!(chunks.is_empty());
            }
        }

        #[test]
        fn consecutive_chunks_share_overlap_tokens(
            n in 1usize..200,
            max in 1usize..30,
            overlap_seed in 0usize..30,
        ) {
            let overlap = overlap_seed % max;
            let splitter = TextSplitter::new(SplitterConfig { max_tokens: max, overlap }).unwrap();
            let chunks = splitter.split(&make_doc(&words(n))).unwrap();
            prop_assert!(!chunks.is_empty());
            prop_assert_eq!(chunks[0].token_start, 0);
            for pair in chunks.windows(2) {
                let shared = pair[0].token_end.saturating_sub(pair[1].token_start);
                let next_len = pair[1].token_end - pair[1].token_start;
                prop_assert!(shared >= overlap.min(next_len));
                prop_assert!(pair[1].token_start > pair[0].token_start);
            }
            prop_assert_eq!(chunks.last().unwrap().token_end, n);
        }
    }
}
