//! Dictionary-driven tagging of noun-initial n-grams.
//!
//! Scanning left to right, each noun-tagged token starts windows of up to
//! `max_len` tokens, longest first. The first window the candidate store
//! knows and whose span is still free becomes a mention, and scanning
//! resumes after it. Mentions already on the document are kept and reserve
//! their spans first.

use std::sync::Arc;

use nel_pos::PosTagger;
use nel_store::CandidateStore;
use nel_types::{Doc, Mention, SpanSet};
use tracing::debug;

use crate::candidates::to_candidates;
use crate::error::{Result, TagError};
use crate::tagger::{MentionSpans, Tagger};
use crate::tokenize::tokenize;

pub const DEFAULT_MAX_LEN: usize = 4;

#[derive(Clone, Debug)]
pub struct LookupConfig {
    /// Longest window tried, in tokens.
    pub max_len: usize,
    /// POS tags starting with this prefix count as nouns.
    pub noun_prefix: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_LEN,
            noun_prefix: "N".to_string(),
        }
    }
}

pub struct LookupTagger {
    store: Arc<dyn CandidateStore + Send + Sync>,
    pos: Arc<dyn PosTagger + Send + Sync>,
    config: LookupConfig,
}

impl LookupTagger {
    pub fn new(
        store: Arc<dyn CandidateStore + Send + Sync>,
        pos: Arc<dyn PosTagger + Send + Sync>,
        config: LookupConfig,
    ) -> Self {
        Self { store, pos, config }
    }
}

impl Tagger for LookupTagger {
    fn produce_mentions(&mut self, doc: &mut Doc) -> Result<Vec<Mention>> {
        let mut tagged = SpanSet::new();
        let mut mentions: Vec<Mention> = doc.mentions().cloned().collect();
        for m in &mentions {
            tagged.insert(m.begin, m.end());
        }
        let existing = mentions.len();

        if doc.tokens.is_empty() {
            doc.tokens = tokenize(&doc.text);
        }
        let words: Vec<&str> = doc.tokens.iter().map(|t| t.text.as_str()).collect();
        let tags = self.pos.tag(&words);
        if tags.len() != words.len() {
            return Err(TagError::TokenMismatch {
                tags: tags.len(),
                tokens: words.len(),
            });
        }

        let spans = MentionSpans::new(doc);
        let n = words.len();
        let mut i = 0;
        while i < n {
            let mut next = i + 1;
            if tags[i].starts_with(&self.config.noun_prefix) {
                let widest = (i + self.config.max_len).min(n);
                for j in (i + 1..=widest).rev() {
                    let mut mention = spans.mention(i, j, None)?;
                    let hits = self.store.search(&mention.text);
                    if !hits.is_empty() && tagged.insert(mention.begin, mention.end()) {
                        mention.candidates = to_candidates(hits);
                        mentions.push(mention);
                        next = j;
                        break;
                    }
                }
            }
            i = next;
        }

        debug!(
            "lookup tagged doc ({}): {} existing, {} new mentions",
            doc.id,
            existing,
            mentions.len() - existing
        );
        Ok(mentions)
    }
}
