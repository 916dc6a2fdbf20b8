use std::sync::Arc;
use std::time::Instant;

use nel_pos::PosTagger;
use nel_store::CandidateStore;
use nel_types::Doc;
use tracing::{debug, info};

use crate::candidates::CandidateGenerator;
use crate::error::Result;
use crate::lookup::{LookupConfig, LookupTagger};
use crate::schwa::{SchwaConfig, SchwaTagger};
use crate::stanford::{StanfordConfig, StanfordTagger};
use crate::tagger::Tagger;

/// Which tagger backs a pipeline, with its settings.
#[derive(Clone, Debug)]
pub enum TaggerSpec {
    Stanford(StanfordConfig),
    Schwa(SchwaConfig),
    Lookup(LookupConfig),
}

/// Tag, cluster and (optionally) attach candidates, one document at a time.
pub struct Pipeline {
    tagger: Box<dyn Tagger + Send>,
    candidates: Option<CandidateGenerator>,
}

impl Pipeline {
    pub fn new(tagger: Box<dyn Tagger + Send>, candidates: Option<CandidateGenerator>) -> Self {
        Self { tagger, candidates }
    }

    /// Build the tagger named by `spec`. The lookup tagger searches `store`
    /// with `pos` tags; the other taggers ignore both.
    pub fn build(
        spec: TaggerSpec,
        store: Arc<dyn CandidateStore + Send + Sync>,
        pos: Arc<dyn PosTagger + Send + Sync>,
        with_candidates: bool,
    ) -> Result<Self> {
        let tagger: Box<dyn Tagger + Send> = match spec {
            TaggerSpec::Stanford(config) => {
                info!("using stanford tagger at {}:{}", config.host, config.port);
                Box::new(StanfordTagger::new(config))
            }
            TaggerSpec::Schwa(config) => Box::new(SchwaTagger::spawn(config)?),
            TaggerSpec::Lookup(config) => {
                info!("using lookup tagger (max_len {})", config.max_len);
                Box::new(LookupTagger::new(Arc::clone(&store), pos, config))
            }
        };
        let candidates = with_candidates.then(|| CandidateGenerator::new(store));
        Ok(Self::new(tagger, candidates))
    }

    pub fn annotate(&mut self, doc: &mut Doc) -> Result<()> {
        let start = Instant::now();
        self.tagger.tag(doc)?;
        if let Some(generator) = &self.candidates {
            generator.generate(doc);
        }
        debug!(
            "annotated doc ({}) with {} chains in {} ms",
            doc.id,
            doc.chains.len(),
            start.elapsed().as_millis()
        );
        Ok(())
    }
}
