//! Record schema spoken by the tokenizer and tagger subprocesses.
//!
//! Token spans are byte offsets into the UTF-8 text handed to the tokenizer;
//! entity spans are token indices.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocRecord {
    #[serde(default)]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub tokens: Vec<TokenRecord>,
    #[serde(default)]
    pub named_entities: Vec<NamedEntity>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub raw: String,
    #[serde(default)]
    pub norm: Option<String>,
    #[serde(default)]
    pub pos: Option<String>,
    #[serde(default)]
    pub lemma: Option<String>,
    pub span: Slice,
    #[serde(default)]
    pub tidx: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub span: Slice,
    pub label: String,
}

/// Half-open `[start, stop)` range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub start: usize,
    pub stop: usize,
}
