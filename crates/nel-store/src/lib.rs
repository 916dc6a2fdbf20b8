//! Candidate lookup by surface form.
//!
//! [`CandidateStore`] is the seam the taggers and the candidate generator
//! search through: a point lookup from a surface form to an ordered list of
//! entity records, where an empty list means "no known entities".
//!
//! [`AliasIndex`] is the bundled implementation. It reads a tab-separated
//! alias dictionary, one `surface<TAB>entity[<TAB>score]` entry per line, and
//! keeps surface forms and entity identifiers as references into the
//! original bytes. Callers
//! choose between a memory-mapped file or an owned buffer via [`LoadMode`].
//!
//! # Example
//! ```no_run
//! use nel_store::{AliasIndex, CandidateStore, LoadMode};
//!
//! # fn main() -> anyhow::Result<()> {
//! let index = AliasIndex::load_with_mode("/path/to/aliases.tsv", LoadMode::Mmap)?;
//! for record in index.search("George Washington") {
//!     println!("{} {:?}", record.id, record.score);
//! }
//! # Ok(()) }
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;
use tracing::info;

/// An entity returned by a surface-form search.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityRecord {
    pub id: String,
    pub score: Option<f64>,
}

impl EntityRecord {
    pub fn new(id: impl Into<String>, score: Option<f64>) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

/// Point lookup from surface form to candidate entities.
pub trait CandidateStore {
    /// Entities known under `surface_form`, best first. Empty when unknown.
    fn search(&self, surface_form: &str) -> Vec<EntityRecord>;
}

impl CandidateStore for HashMap<String, Vec<EntityRecord>> {
    fn search(&self, surface_form: &str) -> Vec<EntityRecord> {
        self.get(surface_form).cloned().unwrap_or_default()
    }
}

/// Strategy for loading the alias dictionary.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map the dictionary file.
    Mmap,
    /// Read the dictionary into an owned buffer.
    Owned,
}

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

#[derive(Clone, Copy)]
struct TextRef {
    start: usize,
    len: usize,
}

/// Where a surface form's normalised text lives.
enum SurfaceKey {
    /// The file already holds it normalised.
    Buffer(TextRef),
    /// Whitespace had to be collapsed.
    Owned(String),
}

struct AliasEntry {
    entity: TextRef,
    score: Option<f64>,
}

struct AliasGroup {
    surface: SurfaceKey,
    entries: Vec<AliasEntry>,
}

/// In-memory alias dictionary backed by mmap or an owned buffer.
///
/// Groups are sorted by surface form and searched by binary search.
pub struct AliasIndex {
    buffer: Buffer,
    aliases: Vec<AliasGroup>,
    entries: usize,
}

impl AliasIndex {
    /// Load an alias dictionary, memory-mapping the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_mode(path, LoadMode::Mmap)
    }

    /// Load an alias dictionary choosing between mmap and owned buffers.
    pub fn load_with_mode(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let path = path.as_ref();
        let buffer = match mode {
            LoadMode::Mmap => {
                let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
                unsafe { Mmap::map(&file) }
                    .map(Buffer::Mmap)
                    .with_context(|| format!("mmap {}", path.display()))?
            }
            LoadMode::Owned => {
                let mut file =
                    File::open(path).with_context(|| format!("open {}", path.display()))?;
                let mut buf = Vec::new();
                file.read_to_end(&mut buf)
                    .with_context(|| format!("read {}", path.display()))?;
                Buffer::Owned(buf)
            }
        };
        let index = Self::from_buffer(buffer).with_context(|| format!("parse {}", path.display()))?;
        info!(
            "loaded {} aliases ({} entries) from {}",
            index.alias_count(),
            index.entry_count(),
            path.display()
        );
        Ok(index)
    }

    /// Build an index from dictionary text already in memory.
    pub fn from_tsv(text: impl Into<String>) -> Result<Self> {
        Self::from_buffer(Buffer::Owned(text.into().into_bytes()))
    }

    fn from_buffer(buffer: Buffer) -> Result<Self> {
        let (aliases, entries) = parse_aliases(buffer.as_slice())?;
        Ok(Self {
            buffer,
            aliases,
            entries,
        })
    }

    /// Number of distinct surface forms.
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    /// Number of surface form / entity pairs.
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    fn surface<'a>(&'a self, key: &'a SurfaceKey) -> &'a str {
        key_text(self.buffer.as_slice(), key)
    }
}

impl CandidateStore for AliasIndex {
    fn search(&self, surface_form: &str) -> Vec<EntityRecord> {
        let query = normalize_alias(surface_form);
        let Ok(idx) = self
            .aliases
            .binary_search_by(|group| self.surface(&group.surface).cmp(&*query))
        else {
            return Vec::new();
        };
        let bytes = self.buffer.as_slice();
        self.aliases[idx]
            .entries
            .iter()
            .map(|e| EntityRecord::new(ref_text(bytes, e.entity), e.score))
            .collect()
    }
}

fn parse_aliases(bytes: &[u8]) -> Result<(Vec<AliasGroup>, usize)> {
    let mut rows: Vec<(SurfaceKey, AliasEntry)> = Vec::new();
    let mut line_start = 0usize;
    for (lineno, raw_line) in bytes.split(|b| *b == b'\n').enumerate() {
        let offset = line_start;
        line_start += raw_line.len() + 1;

        let line = strip_cr(raw_line);
        if line.is_empty() || line.first() == Some(&b'#') {
            continue;
        }
        let line_str = std::str::from_utf8(line)
            .with_context(|| format!("line {} is not valid utf8", lineno + 1))?;
        let text_ref = |field: &str| TextRef {
            start: offset + (field.as_ptr() as usize - line_str.as_ptr() as usize),
            len: field.len(),
        };

        let mut fields = line_str.split('\t');
        let surface = fields.next().unwrap_or_default();
        let entity = fields
            .next()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| anyhow::anyhow!("line {} missing entity column", lineno + 1))?;
        let score = match fields.next().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(
                raw.parse::<f64>()
                    .with_context(|| format!("line {} score", lineno + 1))?,
            ),
            _ => None,
        };

        let normalized = normalize_alias(surface);
        if normalized.is_empty() {
            anyhow::bail!("line {} has an empty surface form", lineno + 1);
        }
        let key = match normalized {
            Cow::Borrowed(s) => SurfaceKey::Buffer(text_ref(s)),
            Cow::Owned(s) => SurfaceKey::Owned(s),
        };
        rows.push((
            key,
            AliasEntry {
                entity: text_ref(entity),
                score,
            },
        ));
    }
    let entries = rows.len();

    // Stable: rows of one surface form keep file order.
    rows.sort_by(|a, b| key_text(bytes, &a.0).cmp(key_text(bytes, &b.0)));
    let mut groups: Vec<AliasGroup> = Vec::new();
    for (key, entry) in rows {
        let same = groups
            .last()
            .is_some_and(|g| key_text(bytes, &g.surface) == key_text(bytes, &key));
        if same && let Some(group) = groups.last_mut() {
            group.entries.push(entry);
        } else {
            groups.push(AliasGroup {
                surface: key,
                entries: vec![entry],
            });
        }
    }

    for group in &mut groups {
        // Stable: equal scores keep file order.
        group.entries.sort_by(|a, b| {
            let a = a.score.unwrap_or(f64::NEG_INFINITY);
            let b = b.score.unwrap_or(f64::NEG_INFINITY);
            b.total_cmp(&a)
        });
    }

    Ok((groups, entries))
}

fn ref_text(bytes: &[u8], r: TextRef) -> &str {
    // Every TextRef was cut from a line already validated as UTF-8.
    std::str::from_utf8(&bytes[r.start..r.start + r.len]).unwrap_or_default()
}

fn key_text<'a>(bytes: &'a [u8], key: &'a SurfaceKey) -> &'a str {
    match key {
        SurfaceKey::Buffer(r) => ref_text(bytes, *r),
        SurfaceKey::Owned(s) => s,
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    if line.ends_with(b"\r") {
        &line[..line.len() - 1]
    } else {
        line
    }
}

/// Collapse whitespace runs to single spaces and trim, borrowing when the
/// text is already in that form.
fn normalize_alias(text: &str) -> Cow<'_, str> {
    if text.split_whitespace().eq(text.split(' ')) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}
