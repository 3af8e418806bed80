//! Interfaces to the storage layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    options::{FeatureOpt, SelectorOptions},
    stats::{Candidate, SentenceId, Stats},
};

/// Supplies the sentences a selection run starts from.
pub trait CandidateSource {
    type Error;

    /// Candidates of `batch`, minus sentences in `excluded_scripts` and blocked sentences.
    ///
    /// Candidate stats are restricted to `features`.
    fn load_batch(
        &self,
        batch: &str,
        excluded_scripts: &[String],
        features: &[FeatureOpt],
    ) -> Result<Vec<Candidate>, Self::Error>;

    /// Summed stats of the sentences in `scripts` and the number of sentences summed.
    fn load_accumulated_stats(
        &self,
        scripts: &[String],
        features: &[FeatureOpt],
    ) -> Result<(Stats, usize), Self::Error>;
}

/// Receives the finished selection.
pub trait ScriptSink {
    type Error;

    /// Stores `ids` in order as the script named in `metadata`; returns the number stored.
    fn persist_selection(
        &mut self,
        metadata: &ScriptMetadata,
        ids: &[SentenceId],
    ) -> Result<usize, Self::Error>;
}

/// What produced a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptMetadata {
    pub options: SelectorOptions,
    pub input_size: usize,
    pub output_size: usize,
    pub timestamp: DateTime<Utc>,
}
