use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use nel_pos::{LexiconTagger, PosTagger};
use nel_store::{AliasIndex, CandidateStore, LoadMode};
use nel_tag::lookup::DEFAULT_MAX_LEN;
use nel_tag::schwa::DEFAULT_FILTERED_TAGS;
use nel_tag::stanford::DEFAULT_CHUNK_BYTES;
use nel_tag::{
    AppState, LookupConfig, Pipeline, SchwaConfig, StanfordConfig, TaggerSpec, router,
};
use nel_types::Doc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";

#[derive(Parser)]
#[command(name = "nel-tag", about = "Tag entity mentions, cluster them and attach candidates")]
struct Cli {
    #[command(flatten)]
    pipeline: PipelineArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate JSON-lines documents from a file or stdin, writing JSON lines to stdout.
    Annotate {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Serve the pipeline over HTTP.
    Serve {
        #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
        host: String,
        #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TaggerKind {
    Stanford,
    Schwa,
    Lookup,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreMode {
    Mmap,
    Owned,
}

#[derive(Args)]
struct PipelineArgs {
    #[arg(long, value_enum, env = "NEL_TAGGER", default_value_t = TaggerKind::Lookup)]
    tagger: TaggerKind,
    /// Alias dictionary (`surface<TAB>entity[<TAB>score]`).
    #[arg(long, env = "NEL_CANDIDATES")]
    candidates: Option<PathBuf>,
    #[arg(long, value_enum, env = "NEL_LOAD_MODE", default_value_t = StoreMode::Mmap)]
    load_mode: StoreMode,
    #[arg(long, env = "NEL_STANFORD_HOST", default_value = "127.0.0.1")]
    stanford_host: String,
    #[arg(long, env = "NEL_STANFORD_PORT", default_value_t = 9199)]
    stanford_port: u16,
    #[arg(long, env = "NEL_CHUNK_BYTES", default_value_t = DEFAULT_CHUNK_BYTES)]
    chunk_bytes: usize,
    #[arg(long, env = "NEL_SCHWA_DIR")]
    schwa_dir: Option<PathBuf>,
    #[arg(long, env = "NEL_SCHWA_MODEL")]
    schwa_model: Option<String>,
    /// Seconds to wait for schwa output before failing the document.
    #[arg(long, env = "NEL_SCHWA_TIMEOUT")]
    schwa_timeout: Option<u64>,
    /// Comma separated entity labels to drop (schwa only).
    #[arg(long, env = "NEL_FILTER_TAGS", value_delimiter = ',')]
    filter_tags: Option<Vec<String>>,
    /// Extra `word TAG` lexicon for the lookup tagger.
    #[arg(long, env = "NEL_LEXICON")]
    lexicon: Option<PathBuf>,
    #[arg(long, env = "NEL_MAX_LEN", default_value_t = DEFAULT_MAX_LEN)]
    max_len: usize,
    #[arg(long, env = "NEL_NOUN_PREFIX", default_value = "N")]
    noun_prefix: String,
}

impl PipelineArgs {
    fn tagger_spec(&self) -> anyhow::Result<TaggerSpec> {
        Ok(match self.tagger {
            TaggerKind::Stanford => TaggerSpec::Stanford(StanfordConfig {
                host: self.stanford_host.clone(),
                port: self.stanford_port,
                chunk_bytes: self.chunk_bytes,
            }),
            TaggerKind::Schwa => {
                let (Some(dir), Some(model)) = (&self.schwa_dir, &self.schwa_model) else {
                    bail!("--schwa-dir and --schwa-model are required for the schwa tagger");
                };
                let mut config = SchwaConfig::new(dir, model);
                config.filtered_tags = match &self.filter_tags {
                    Some(tags) => tags.iter().map(|t| t.trim().to_lowercase()).collect(),
                    None => DEFAULT_FILTERED_TAGS.iter().map(|t| t.to_string()).collect(),
                };
                config.read_timeout = self.schwa_timeout.map(Duration::from_secs);
                TaggerSpec::Schwa(config)
            }
            TaggerKind::Lookup => {
                if self.candidates.is_none() {
                    bail!("--candidates is required for the lookup tagger");
                }
                TaggerSpec::Lookup(LookupConfig {
                    max_len: self.max_len,
                    noun_prefix: self.noun_prefix.clone(),
                })
            }
        })
    }

    fn build(&self) -> anyhow::Result<Pipeline> {
        let spec = self.tagger_spec()?;

        let store: Arc<dyn CandidateStore + Send + Sync> = match &self.candidates {
            Some(path) => {
                let mode = match self.load_mode {
                    StoreMode::Mmap => LoadMode::Mmap,
                    StoreMode::Owned => LoadMode::Owned,
                };
                let start = Instant::now();
                let index = AliasIndex::load_with_mode(path, mode)?;
                info!("alias index loaded in {} ms", start.elapsed().as_millis());
                Arc::new(index)
            }
            None => Arc::new(HashMap::new()),
        };
        let pos: Arc<dyn PosTagger + Send + Sync> = match &self.lexicon {
            Some(path) => Arc::new(LexiconTagger::load(path)?),
            None => Arc::new(LexiconTagger::builtin()),
        };

        Pipeline::build(spec, store, pos, self.candidates.is_some())
            .context("start tagger")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let pipeline = cli.pipeline.build()?;

    match cli.command {
        Commands::Annotate { input } => {
            tokio::task::spawn_blocking(move || annotate_stream(pipeline, input)).await??;
        }
        Commands::Serve { host, port } => {
            let addr: SocketAddr = format!("{}:{}", host, port)
                .parse()
                .with_context(|| format!("invalid listen address {host}:{port}"))?;
            info!("binding to {}", addr);
            let app = router(AppState::new(pipeline)).layer(TraceLayer::new_for_http());
            let listener = TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}

fn annotate_stream(mut pipeline: Pipeline, input: Option<PathBuf>) -> anyhow::Result<()> {
    let reader: Box<dyn BufRead> = match &input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let mut out = BufWriter::new(io::stdout().lock());

    let start = Instant::now();
    let (mut total, mut failed) = (0usize, 0usize);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read line {}", lineno + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        total += 1;
        let mut doc: Doc = match serde_json::from_str(&line) {
            Ok(doc) => doc,
            Err(err) => {
                warn!("skipping line {}: {err}", lineno + 1);
                failed += 1;
                continue;
            }
        };
        if let Err(err) = pipeline.annotate(&mut doc) {
            warn!("doc ({}) failed: {err}", doc.id);
            failed += 1;
            continue;
        }
        serde_json::to_writer(&mut out, &doc)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    info!(
        "annotated {} docs in {} ms",
        total - failed,
        start.elapsed().as_millis()
    );
    if failed > 0 {
        bail!("{failed} of {total} documents failed");
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    log_subscriber(env_filter).init();
}

fn log_subscriber(env_filter: EnvFilter) -> impl tracing::Subscriber + Send + Sync + 'static {
    // stdout carries annotated documents.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_writer(io::stderr)
        .finish()
}
