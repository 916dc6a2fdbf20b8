use nel_types::{CharByteMap, Doc, Mention, char_to_byte_map};

use crate::coref::cluster_mentions;
use crate::error::{Result, TagError};

/// Produces mention spans over a tokenised document.
///
/// Implementors only supply [`Tagger::produce_mentions`]; [`Tagger::tag`]
/// clusters whatever they return into `doc.chains`.
pub trait Tagger {
    /// Mentions found in `doc`. May set `doc.tokens` as a side effect.
    fn produce_mentions(&mut self, doc: &mut Doc) -> Result<Vec<Mention>>;

    /// Tag `doc` and replace its chains with clusters of the new mentions.
    fn tag(&mut self, doc: &mut Doc) -> Result<()> {
        let mentions = self.produce_mentions(doc)?;
        doc.chains = cluster_mentions(mentions);
        Ok(())
    }
}

impl<T: Tagger + ?Sized> Tagger for Box<T> {
    fn produce_mentions(&mut self, doc: &mut Doc) -> Result<Vec<Mention>> {
        (**self).produce_mentions(doc)
    }
}

/// Build a mention covering tokens `[i, j)` of `doc`.
///
/// Builds a fresh offset table each call; taggers cutting many spans out of
/// one document should hold a [`MentionSpans`] instead.
pub fn mention_over_tokens(doc: &Doc, i: usize, j: usize, tag: Option<String>) -> Result<Mention> {
    MentionSpans::new(doc).mention(i, j, tag)
}

/// Mentions over token ranges of one document, sliced through a character
/// to byte table built once.
pub struct MentionSpans<'a> {
    doc: &'a Doc,
    offsets: CharByteMap,
}

impl<'a> MentionSpans<'a> {
    pub fn new(doc: &'a Doc) -> Self {
        Self {
            doc,
            offsets: char_to_byte_map(&doc.text),
        }
    }

    /// Mention covering tokens `[i, j)`.
    pub fn mention(&self, i: usize, j: usize, tag: Option<String>) -> Result<Mention> {
        let tokens = &self.doc.tokens;
        let range_err = || TagError::TokenRange {
            begin: i,
            end: j,
            len: tokens.len(),
        };
        if i >= j || j > tokens.len() {
            return Err(range_err());
        }
        let begin = tokens[i].begin;
        let end = tokens[j - 1].end;
        let text = self
            .offsets
            .slice(&self.doc.text, begin, end)
            .ok_or_else(range_err)?;
        Ok(Mention::new(begin, text, tag))
    }
}
