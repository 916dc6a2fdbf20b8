use thiserror::Error;

/// Failures while tagging a single document.
///
/// None of these leave state behind that affects the next document: the
/// socket tagger opens a connection per chunk and the subprocess tagger
/// resynchronises its record stream before returning an error.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("tokenisation error: {tags} tags for {tokens} tokens")]
    TokenMismatch { tags: usize, tokens: usize },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("response exceeded {limit} bytes without a terminating newline")]
    ResponseOverflow { limit: usize },
    #[error("token range {begin}..{end} is invalid for a document with {len} tokens")]
    TokenRange { begin: usize, end: usize, len: usize },
    #[error("byte offset {0} does not start a character")]
    ByteOffset(usize),
    #[error("malformed record: {0}")]
    Record(#[from] serde_json::Error),
    #[error("tagger output stream closed")]
    StreamClosed,
    #[error("no tagger output within {0:?}")]
    Timeout(std::time::Duration),
    #[error("{program} exited with {status}")]
    Subprocess { program: String, status: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TagError>;
