//! Value types passed between the stages of the annotation pipeline.
//!
//! A [`Doc`] is owned by whoever drives the pipeline and is handed to each
//! stage by `&mut` reference: a tagger fills [`Doc::tokens`] (when the document
//! arrives untokenised) and [`Doc::chains`], the candidate generator fills
//! [`Chain::candidates`].
//!
//! All offsets are character offsets into [`Doc::text`], not byte offsets.
//! Use [`byte_to_char_map`] to translate byte offsets reported by external
//! tools, and [`SpanSet`] to keep a tagging pass free of overlapping spans.
//!
//! ```rust
//! use nel_types::{Doc, Mention, SpanSet};
//!
//! let doc = Doc::new("d1", "Barack Obama visited Paris.");
//! assert_eq!(doc.slice(0, 12), Some("Barack Obama"));
//!
//! let m = Mention::new(21, "Paris", None);
//! assert_eq!(m.end(), 26);
//!
//! let mut spans = SpanSet::new();
//! assert!(spans.insert(m.begin, m.end()));
//! assert!(!spans.insert(24, 30));
//! ```

mod spans;

pub use spans::{
    ByteCharMap, CharByteMap, SpanSet, byte_to_char_map, char_to_byte_map, spanset_insert,
};

use serde::{Deserialize, Serialize};

/// A document moving through the pipeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Doc {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub chains: Vec<Chain>,
}

impl Doc {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            tokens: Vec::new(),
            chains: Vec::new(),
        }
    }

    /// Mentions currently attached to the document, chain by chain.
    pub fn mentions(&self) -> impl Iterator<Item = &Mention> + '_ {
        self.chains.iter().flat_map(|c| c.mentions.iter())
    }

    /// Length of the text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Substring of the text between two character offsets.
    pub fn slice(&self, begin: usize, end: usize) -> Option<&str> {
        char_slice(&self.text, begin, end)
    }
}

/// A token with its character span `[begin, end)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub begin: usize,
    pub end: usize,
    pub text: String,
}

impl Token {
    pub fn new(begin: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            begin,
            end,
            text: text.into(),
        }
    }
}

/// A span of text believed to name an entity.
///
/// The end offset is implied by the length of `text` in characters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub begin: usize,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
}

impl Mention {
    pub fn new(begin: usize, text: impl Into<String>, tag: Option<String>) -> Self {
        Self {
            begin,
            text: text.into(),
            tag,
            candidates: Vec::new(),
        }
    }

    pub fn end(&self) -> usize {
        self.begin + self.text.chars().count()
    }
}

/// Mentions believed to co-refer, plus the candidates found for them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub mentions: Vec<Mention>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl Chain {
    pub fn new(mentions: Vec<Mention>) -> Self {
        Self {
            mentions,
            candidates: Vec::new(),
        }
    }
}

/// A possible identity for a chain or mention, as returned by a candidate store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, score: Option<f64>) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

/// Slice `text` between character offsets `begin` and `end`.
///
/// Returns `None` when the range is inverted or runs past the end of the text.
pub fn char_slice(text: &str, begin: usize, end: usize) -> Option<&str> {
    if begin > end {
        return None;
    }
    let mut bounds = text
        .char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(text.len()));
    let start = bounds.nth(begin)?;
    let stop = if end == begin {
        start
    } else {
        bounds.nth(end - begin - 1)?
    };
    Some(&text[start..stop])
}
