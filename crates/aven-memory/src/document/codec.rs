//! Tokenization schemes used by the splitter.
//!
//! A codec maps text to a sequence of byte spans, one per token. Spans are
//! contiguous and ordered, so decoding a window of tokens is slicing the input
//! from the first span's start to the last span's end.

use std::ops::Range;

use super::DocumentError;

pub trait TokenCodec: Send + Sync {
    fn name(&self) -> &str;

    /// Byte span of every token in `text`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Tokenizer`] if the underlying tokenizer fails.
    fn spans(&self, text: &str) -> Result<Vec<Range<usize>>, DocumentError>;
}

/// Decode tokens `window` of `text` back to a string.
#[must_use]
pub fn decode<'a>(text: &'a str, spans: &[Range<usize>], window: Range<usize>) -> &'a str {
    match (spans.get(window.start), window.end.checked_sub(1).and_then(|i| spans.get(i))) {
        (Some(first), Some(last)) if window.start < window.end => &text[first.start..last.end],
        _ => "",
    }
}

/// Built-in lossless codec.
///
/// A token is a maximal run of alphanumeric characters, or a single other
/// non-whitespace character, together with the whitespace preceding it.
/// Trailing whitespace belongs to no token.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCodec;

impl TokenCodec for WordCodec {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "word"
    }

    fn spans(&self, text: &str) -> Result<Vec<Range<usize>>, DocumentError> {
        let mut spans = Vec::new();
        let mut chars = text.char_indices().peekable();
        let mut token_start = 0;

        loop {
            while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
            let Some((pos, c)) = chars.next() else {
                break;
            };
            let mut end = pos + c.len_utf8();
            if c.is_alphanumeric() {
                while let Some((p, n)) = chars.next_if(|(_, n)| n.is_alphanumeric()) {
                    end = p + n.len_utf8();
                }
            }
            spans.push(token_start..end);
            token_start = end;
        }

        Ok(spans)
    }
}

/// Codec backed by a Hugging Face `tokenizer.json`.
#[cfg(feature = "hf-tokenizer")]
pub struct HfCodec {
    tokenizer: tokenizers::Tokenizer,
}

#[cfg(feature = "hf-tokenizer")]
impl HfCodec {
    /// Load a tokenizer definition from disk.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Tokenizer`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, DocumentError> {
        let tokenizer = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| DocumentError::Tokenizer(e.to_string()))?;
        Ok(Self { tokenizer })
    }
}

#[cfg(feature = "hf-tokenizer")]
impl std::fmt::Debug for HfCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HfCodec").finish_non_exhaustive()
    }
}

#[cfg(feature = "hf-tokenizer")]
impl TokenCodec for HfCodec {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "hf"
    }

    fn spans(&self, text: &str) -> Result<Vec<Range<usize>>, DocumentError> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| DocumentError::Tokenizer(e.to_string()))?;

        // make spans contiguous so windows decode losslessly
        let mut spans = Vec::with_capacity(encoding.len());
        let mut cursor = 0;
        for &(_, end) in encoding.get_offsets() {
            if end > cursor && text.is_char_boundary(end) {
                spans.push(cursor..end);
                cursor = end;
            }
        }
        Ok(spans)
    }
}
