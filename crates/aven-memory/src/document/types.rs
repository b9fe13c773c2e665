/// Raw text fetched from one source identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: String,
    pub content: String,
}

impl Document {
    #[must_use]
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }
}

/// A token window of one [`Document`].
///
/// `token_start..token_end` indexes the document's token sequence; `text` is the
/// decoded, trimmed window and is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub source: String,
    pub text: String,
    pub chunk_index: usize,
    pub token_start: usize,
    pub token_end: usize,
}

/// Fixed record indexed when no source yields any content.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlaceholderRecord {
    pub url: String,
    pub text: String,
}

impl PlaceholderRecord {
    /// The three records indexed by default when scraping produced nothing.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                url: "https://aven.com/about".into(),
                text: "Aven is a healthcare technology company that provides innovative \
                       solutions for patient care and medical management."
                    .into(),
            },
            Self {
                url: "https://aven.com/support".into(),
                text: "Aven offers 24/7 customer support through phone, email, and chat. \
                       Our support team helps with technical issues and account management."
                    .into(),
            },
            Self {
                url: "https://aven.com/education".into(),
                text: "Aven provides educational resources including training materials, \
                       webinars, and certification programs for healthcare professionals."
                    .into(),
            },
        ]
    }
}
