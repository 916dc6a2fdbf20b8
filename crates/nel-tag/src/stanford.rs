//! Tagger backed by a line-oriented NER socket service.
//!
//! The service takes space-joined tokens terminated by a newline and answers
//! with `word/TAG` pairs, one sentence per line. It returns no offsets, so the
//! tags sent back must stay aligned one-to-one with the tokens sent out.
//!
//! Two quirks of the service shape this module:
//! - it stops tagging when a request grows too large, so documents are sent
//!   in chunks cut at sentence terminators and kept under a byte budget;
//! - reusing a connection across requests corrupts its state, so every chunk
//!   gets a fresh connection.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::ops::Range;
use std::time::Instant;

use nel_types::{Doc, Mention};
use tracing::debug;

use crate::error::{Result, TagError};
use crate::tagger::{MentionSpans, Tagger};
use crate::tokenize::tokenize;

pub const DEFAULT_CHUNK_BYTES: usize = 1024;
const RESPONSE_LIMIT_FACTOR: usize = 10;
const SENTENCE_END: &str = ".";
const OUTSIDE: &str = "O";

#[derive(Clone, Debug)]
pub struct StanfordConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on the bytes of one request, newline included.
    pub chunk_bytes: usize,
}

impl Default for StanfordConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9199,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }
}

pub struct StanfordTagger {
    config: StanfordConfig,
}

impl StanfordTagger {
    pub fn new(config: StanfordConfig) -> Self {
        Self { config }
    }

    /// Send one chunk over a fresh connection and return its tags.
    fn tag_chunk(&self, text: &str) -> Result<Vec<String>> {
        let mut stream = TcpStream::connect((self.config.host.as_str(), self.config.port))?;
        let mut request = Vec::with_capacity(text.len() + 1);
        request.extend_from_slice(text.as_bytes());
        request.push(b'\n');
        stream.write_all(&request)?;

        let limit = RESPONSE_LIMIT_FACTOR * request.len();
        let mut reply = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf)?;
            if n == 0 {
                return Err(TagError::Protocol(
                    "connection closed before the reply was terminated".to_string(),
                ));
            }
            reply.extend_from_slice(&buf[..n]);
            if reply.last() == Some(&b'\n') {
                break;
            }
            if reply.len() > limit {
                return Err(TagError::ResponseOverflow { limit });
            }
        }

        let reply = String::from_utf8(reply)
            .map_err(|e| TagError::Protocol(format!("reply is not utf8: {e}")))?;
        Ok(parse_reply(&reply))
    }
}

impl Tagger for StanfordTagger {
    fn produce_mentions(&mut self, doc: &mut Doc) -> Result<Vec<Mention>> {
        let start = Instant::now();
        if doc.tokens.is_empty() {
            doc.tokens = tokenize(&doc.text);
        }
        let tokens: Vec<String> = doc
            .tokens
            .iter()
            .map(|t| t.text.replace(['\n', '\r'], " "))
            .collect();

        let chunks = plan_chunks(&tokens, self.config.chunk_bytes);
        let mut tags = Vec::with_capacity(tokens.len());
        for chunk in &chunks {
            let text = tokens[chunk.clone()].join(" ");
            tags.extend(self.tag_chunk(&text)?);
        }
        if tags.len() != tokens.len() {
            return Err(TagError::TokenMismatch {
                tags: tags.len(),
                tokens: tokens.len(),
            });
        }

        let mentions = mentions_from_tags(doc, &tags)?;
        debug!(
            "tagged doc ({}) with {} tokens in {} chunks in {:.2}s",
            doc.id,
            tokens.len(),
            chunks.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(mentions)
    }
}

/// Cut a token sequence into request-sized token ranges.
///
/// Cuts fall only after a `.` token or at the end of the input. A chunk
/// extends to the furthest cut that keeps `join(" ") + "\n"` under
/// `max_bytes`; a sentence that alone exceeds the budget becomes its own
/// oversized chunk.
pub fn plan_chunks<S: AsRef<str>>(tokens: &[S], max_bytes: usize) -> Vec<Range<usize>> {
    // (token index the cut falls before, bytes sent up to the cut)
    let mut cuts = vec![(0usize, 0usize)];
    let mut acc = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        acc += token.as_ref().len() + 1;
        if token.as_ref() == SENTENCE_END {
            cuts.push((i + 1, acc));
        }
    }
    if cuts.last().map(|c| c.0) != Some(tokens.len()) {
        cuts.push((tokens.len(), acc));
    }

    let mut chunks = Vec::new();
    let mut si = 0;
    while si + 1 < cuts.len() {
        let limit = cuts[si].1 + max_bytes;
        let furthest = cuts.partition_point(|c| c.1 < limit).saturating_sub(1);
        let ei = if furthest <= si { si + 1 } else { furthest };
        chunks.push(cuts[si].0..cuts[ei].0);
        si = ei;
    }
    chunks
}

/// Tags from a service reply, sentence by sentence, dropping each line's
/// trailing end marker.
pub fn parse_reply(reply: &str) -> Vec<String> {
    let mut tags = Vec::new();
    for sentence in reply.split('\n') {
        let mut pairs: Vec<&str> = sentence.split(' ').collect();
        pairs.pop();
        tags.extend(
            pairs
                .into_iter()
                .map(|pair| pair.rsplit_once('/').map_or(pair, |(_, tag)| tag).to_string()),
        );
    }
    tags
}

/// Turn runs of equal non-`O` tags into mentions.
fn mentions_from_tags(doc: &Doc, tags: &[String]) -> Result<Vec<Mention>> {
    let spans = MentionSpans::new(doc);
    let mut mentions = Vec::new();
    let mut start = 0;
    let mut last = OUTSIDE;
    for (i, tag) in tags.iter().enumerate() {
        if tag.as_str() != last {
            if last != OUTSIDE {
                mentions.push(spans.mention(start, i, Some(last.to_lowercase()))?);
            }
            last = tag.as_str();
            start = i;
        }
    }
    if last != OUTSIDE {
        mentions.push(spans.mention(start, tags.len(), Some(last.to_lowercase()))?);
    }
    Ok(mentions)
}
