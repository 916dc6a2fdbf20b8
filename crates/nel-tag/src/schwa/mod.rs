//! Tagger driving the schwa tokenizer and NER tagger as subprocesses.
//!
//! The tokenizer runs once per document. The NER tagger is spawned once per
//! [`SchwaTagger`] and stays alive, reading tokenised records on stdin and
//! writing tagged records on stdout. A pump thread drains its stdout into a
//! channel so records can be decoded while further input is being written.

mod record;
mod stream;

pub use record::{DocRecord, NamedEntity, Slice, TokenRecord};
pub use stream::{QueueReader, RecordReader, spawn_pump};

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use nel_types::{Doc, Mention, Token, byte_to_char_map};
use tracing::{debug, info, warn};

use crate::error::{Result, TagError};
use crate::tagger::{MentionSpans, Tagger};

/// Entity classes that are tokenised but never become mentions by default.
pub const DEFAULT_FILTERED_TAGS: &[&str] = &[
    "date", "cardinal", "time", "percent", "ordinal", "language", "money",
];

/// A program and its arguments, run from the package directory.
#[derive(Clone, Debug)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn command(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped());
        cmd
    }
}

#[derive(Clone, Debug)]
pub struct SchwaConfig {
    pub package_dir: PathBuf,
    pub tokenizer: CommandSpec,
    pub tagger: CommandSpec,
    /// Lower-case entity labels to drop.
    pub filtered_tags: Vec<String>,
    /// Give up waiting for tagger output after this long. `None` waits forever.
    pub read_timeout: Option<Duration>,
}

impl SchwaConfig {
    /// The stock `schwa-tokenizer` / `schwa-ner-tagger` pair from a package dir.
    pub fn new(package_dir: impl Into<PathBuf>, model: &str) -> Self {
        Self {
            package_dir: package_dir.into(),
            tokenizer: CommandSpec::new("./schwa-tokenizer", &["-p", "docrep"]),
            tagger: CommandSpec::new(
                "./schwa-ner-tagger",
                &["--crf1-only", "true", "--model", model],
            ),
            filtered_tags: DEFAULT_FILTERED_TAGS.iter().map(|t| t.to_string()).collect(),
            read_timeout: None,
        }
    }
}

pub struct SchwaTagger {
    config: SchwaConfig,
    process: TaggerProcess,
}

/// One running tagger with its stdin and decoded stdout.
struct TaggerProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    reader: RecordReader<DocRecord>,
    pump: Option<JoinHandle<()>>,
}

impl TaggerProcess {
    fn start(config: &SchwaConfig) -> Result<Self> {
        let mut child = config.tagger.command(&config.package_dir).spawn()?;
        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TagError::Protocol("tagger stdout is not piped".to_string()))?;

        let (tx, rx) = crossbeam_channel::unbounded();
        let pump = spawn_pump(stdout, tx)?;
        let reader = RecordReader::new(rx, config.read_timeout);
        info!(
            "started tagger {} (pid {}) in {}",
            config.tagger.program,
            child.id(),
            config.package_dir.display()
        );

        Ok(Self {
            child,
            stdin,
            reader,
            pump: Some(pump),
        })
    }
}

impl Drop for TaggerProcess {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Err(e) = self.child.kill() {
            debug!("tagger already exited: {e}");
        }
        let _ = self.child.wait();
        // A grandchild may still hold stdout open. An unfinished pump is left
        // to stop at EOF or when its channel receiver is dropped.
        if let Some(pump) = self.pump.take()
            && pump.is_finished()
        {
            let _ = pump.join();
        }
    }
}

impl SchwaTagger {
    /// Start the long-lived tagger process and its stdout pump.
    pub fn spawn(config: SchwaConfig) -> Result<Self> {
        let process = TaggerProcess::start(&config)?;
        Ok(Self { config, process })
    }

    /// Run the tokenizer over `text` and return its raw output record.
    fn tokenize(&self, text: &str) -> Result<Vec<u8>> {
        let spec = &self.config.tokenizer;
        let mut tokenizer = spec.command(&self.config.package_dir).spawn()?;
        let mut stdin = tokenizer
            .stdin
            .take()
            .ok_or_else(|| TagError::Protocol("tokenizer stdin is not piped".to_string()))?;

        let input = text.as_bytes().to_vec();
        let writer = thread::spawn(move || stdin.write_all(&input));
        let output = tokenizer.wait_with_output()?;
        match writer.join() {
            Ok(Ok(())) => {}
            // The tokenizer may exit without consuming all of its input.
            Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(TagError::Protocol(
                    "tokenizer input writer panicked".to_string(),
                ));
            }
        }

        if !output.status.success() {
            return Err(TagError::Subprocess {
                program: spec.program.clone(),
                status: output.status.to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// Tokenise and tag `text`.
    ///
    /// A malformed record resynchronises the output stream. A timeout, a
    /// failed write or a closed stream restarts the tagger, since a late reply from the old
    /// process would otherwise be read as the next document's record.
    fn text_to_record(&mut self, text: &str) -> Result<DocRecord> {
        let tokenized = self.tokenize(text)?;
        let stdin = self.process.stdin.as_mut().ok_or(TagError::StreamClosed)?;
        if let Err(err) = stdin.write_all(&tokenized).and_then(|()| stdin.flush()) {
            warn!("restarting tagger after write error ({err})");
            self.process = TaggerProcess::start(&self.config)?;
            return Err(err.into());
        }

        match self.process.reader.read() {
            Ok(record) => Ok(record),
            Err(err @ (TagError::Timeout(_) | TagError::StreamClosed)) => {
                warn!("restarting tagger after error ({err})");
                self.process = TaggerProcess::start(&self.config)?;
                Err(err)
            }
            Err(err) => {
                let dropped = self.process.reader.resync();
                warn!("resynchronised tagger output after error ({err}), dropped {dropped} bytes");
                Err(err)
            }
        }
    }
}

impl Tagger for SchwaTagger {
    fn produce_mentions(&mut self, doc: &mut Doc) -> Result<Vec<Mention>> {
        let start = Instant::now();
        let raw = doc.text.replace(['\u{2018}', '\u{2019}'], "'");

        // The tagger reports byte offsets; tokens need character offsets.
        let offsets = byte_to_char_map(&raw);
        let record = self.text_to_record(&raw)?;

        doc.tokens = record
            .tokens
            .iter()
            .map(|t| {
                let begin = offsets
                    .get(t.span.start)
                    .ok_or(TagError::ByteOffset(t.span.start))?;
                let end = offsets
                    .get(t.span.stop)
                    .ok_or(TagError::ByteOffset(t.span.stop))?;
                Ok(Token::new(begin, end, t.raw.clone()))
            })
            .collect::<Result<_>>()?;

        let spans = MentionSpans::new(doc);
        let mut mentions = Vec::new();
        for entity in &record.named_entities {
            let tag = entity.label.to_lowercase();
            if self.config.filtered_tags.contains(&tag) {
                continue;
            }
            mentions.push(spans.mention(entity.span.start, entity.span.stop, Some(tag))?);
        }

        debug!(
            "tagged doc ({}) with {} tokens, {} mentions in {:.2}s",
            doc.id,
            doc.tokens.len(),
            mentions.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(mentions)
    }
}
