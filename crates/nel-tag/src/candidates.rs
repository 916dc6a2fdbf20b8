use std::cmp::Reverse;
use std::sync::Arc;

use nel_store::{CandidateStore, EntityRecord};
use nel_types::{Candidate, Chain, Doc};
use tracing::debug;

/// Attaches candidate entities to every chain of a document.
///
/// Each chain is searched by its distinct surface forms, longest first, and
/// takes the results of the first form the store knows.
pub struct CandidateGenerator {
    store: Arc<dyn CandidateStore + Send + Sync>,
}

impl CandidateGenerator {
    pub fn new(store: Arc<dyn CandidateStore + Send + Sync>) -> Self {
        Self { store }
    }

    pub fn generate(&self, doc: &mut Doc) {
        for chain in &mut doc.chains {
            chain.candidates = self.candidates_for(chain);
        }
        debug!(
            "generated candidates for doc ({}): {} of {} chains matched",
            doc.id,
            doc.chains.iter().filter(|c| !c.candidates.is_empty()).count(),
            doc.chains.len()
        );
    }

    fn candidates_for(&self, chain: &Chain) -> Vec<Candidate> {
        let mut forms: Vec<&str> = Vec::new();
        for mention in &chain.mentions {
            if !forms.contains(&mention.text.as_str()) {
                forms.push(&mention.text);
            }
        }
        // Stable: equal lengths keep chain order.
        forms.sort_by_key(|f| Reverse(f.chars().count()));

        for form in forms {
            let hits = self.store.search(form);
            if !hits.is_empty() {
                return to_candidates(hits);
            }
        }
        Vec::new()
    }
}

pub fn to_candidates(records: Vec<EntityRecord>) -> Vec<Candidate> {
    records
        .into_iter()
        .map(|r| Candidate::new(r.id, r.score))
        .collect()
}
