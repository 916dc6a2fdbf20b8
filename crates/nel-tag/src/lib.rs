//! Mention tagging for entity linking.
//!
//! A [`Tagger`] finds mentions in a [`Doc`](nel_types::Doc), [`cluster_mentions`]
//! groups them into coreference chains and a [`CandidateGenerator`] attaches
//! candidate entities to each chain. [`Pipeline`] runs the three in order and
//! [`handlers::router`] serves it over HTTP.

pub mod candidates;
pub mod coref;
pub mod error;
pub mod handlers;
pub mod lookup;
pub mod pipeline;
pub mod schwa;
pub mod stanford;
pub mod tagger;
pub mod tokenize;

pub use candidates::CandidateGenerator;
pub use coref::cluster_mentions;
pub use error::{Result, TagError};
pub use handlers::{AppState, router};
pub use lookup::{LookupConfig, LookupTagger};
pub use pipeline::{Pipeline, TaggerSpec};
pub use schwa::{SchwaConfig, SchwaTagger};
pub use stanford::{StanfordConfig, StanfordTagger};
pub use tagger::{MentionSpans, Tagger, mention_over_tokens};
pub use tokenize::tokenize;
