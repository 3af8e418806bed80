//! Selection options and their validation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Search strategy used to pick the next sentences.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
    derive_more::IsVariant,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Sample random subsets of `target_size` sentences and keep the best one.
    #[display("rand")]
    Rand,
    /// Greedily pick the best chunk of the whole corpus, one chunk per step.
    #[display("exhaustive")]
    Exhaustive,
}

/// A feature to select for, with its diminishing-returns threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureOpt {
    pub name: String,
    /// Below this many accumulated occurrences a value scores as fully novel.
    #[serde(default)]
    pub target_amount: u32,
}

impl FeatureOpt {
    #[must_use]
    pub fn new(name: impl Into<String>, target_amount: u32) -> Self {
        Self {
            name: name.into(),
            target_amount,
        }
    }
}

/// The feature priority list used when a config does not name one.
#[must_use]
pub fn default_feature_opts() -> Vec<FeatureOpt> {
    vec![
        FeatureOpt::new("bigram_transition", 0),
        FeatureOpt::new("bigram_top800", 3),
        FeatureOpt::new("final_trigram", 0),
        FeatureOpt::new("initial_bigram", 0),
        FeatureOpt::new("word", 0),
        FeatureOpt::new("bigram", 0),
    ]
}

const fn default_chunk_size() -> usize {
    1
}

const fn default_partition_size() -> usize {
    2000
}

const fn default_min_iterations() -> usize {
    1000
}

const fn default_cutoff() -> usize {
    200
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorOptions {
    pub mode: Mode,
    /// Ordered by priority; earlier features break ties first.
    #[serde(default = "default_feature_opts")]
    pub feature_opts: Vec<FeatureOpt>,
    #[serde(default)]
    pub adjust_score_for_sentence_length: bool,
    pub target_size: usize,
    #[serde(default)]
    pub from_batch: String,
    #[serde(default)]
    pub script_name: String,
    #[serde(default)]
    pub accumulated_scripts: Vec<String>,

    // exhaustive search
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub chunk_decrease: usize,
    /// Number of candidates handed to one scoring task.
    #[serde(default = "default_partition_size")]
    pub partition_size: usize,
    /// Upper bound on scoring threads; defaults to the available parallelism.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    // random search
    #[serde(default = "default_min_iterations")]
    pub min_iterations: usize,
    #[serde(default = "default_cutoff")]
    pub cutoff: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub debug: bool,
}

impl SelectorOptions {
    /// Options with defaults for everything but the required fields.
    #[must_use]
    pub fn new(
        mode: Mode,
        target_size: usize,
        from_batch: impl Into<String>,
        script_name: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            feature_opts: default_feature_opts(),
            adjust_score_for_sentence_length: false,
            target_size,
            from_batch: from_batch.into(),
            script_name: script_name.into(),
            accumulated_scripts: vec![],
            chunk_size: default_chunk_size(),
            chunk_decrease: 0,
            partition_size: default_partition_size(),
            workers: None,
            min_iterations: default_min_iterations(),
            cutoff: default_cutoff(),
            seed: None,
            debug: false,
        }
    }

    /// Names of the configured features, in priority order.
    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.feature_opts.iter().map(|opt| opt.name.as_str())
    }

    /// Checks the options before any selection work is done.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.target_size < 1 {
            return Err(OptionsError::ZeroTargetSize);
        }
        if self.script_name.trim().is_empty() {
            return Err(OptionsError::MissingScriptName);
        }
        if self.from_batch.trim().is_empty() {
            return Err(OptionsError::MissingBatchName);
        }
        if self.feature_opts.is_empty() {
            return Err(OptionsError::NoFeatures);
        }
        let mut seen = BTreeSet::new();
        for opt in &self.feature_opts {
            if opt.name.trim().is_empty() {
                return Err(OptionsError::EmptyFeatureName);
            }
            if !seen.insert(opt.name.as_str()) {
                return Err(OptionsError::DuplicateFeature {
                    name: opt.name.clone(),
                });
            }
        }
        if self.mode.is_exhaustive() {
            if self.chunk_size < 1 {
                return Err(OptionsError::ZeroChunkSize);
            }
            if self.partition_size < 1 {
                return Err(OptionsError::ZeroPartitionSize);
            }
            if self.workers == Some(0) {
                return Err(OptionsError::ZeroWorkers);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum OptionsError {
    #[display("target size must be more than zero")]
    ZeroTargetSize,
    #[display("script name not provided")]
    MissingScriptName,
    #[display("input batch not provided")]
    MissingBatchName,
    #[display("no selection features configured")]
    NoFeatures,
    #[display("empty feature name")]
    EmptyFeatureName,
    #[display("feature {name} configured more than once")]
    DuplicateFeature { name: String },
    #[display("chunk size must be more than zero")]
    ZeroChunkSize,
    #[display("partition size must be more than zero")]
    ZeroPartitionSize,
    #[display("worker count must be more than zero")]
    ZeroWorkers,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SelectorOptions {
        SelectorOptions::new(Mode::Exhaustive, 10, "batch1", "script1")
    }

    #[test]
    fn test_valid_options() {
        assert_eq!(valid().validate(), Ok(()));
    }

    #[test]
    fn test_missing_fields() {
        let mut opts = valid();
        opts.target_size = 0;
        assert_eq!(opts.validate(), Err(OptionsError::ZeroTargetSize));

        let mut opts = valid();
        opts.script_name = String::new();
        assert_eq!(opts.validate(), Err(OptionsError::MissingScriptName));

        let mut opts = valid();
        opts.from_batch = " ".to_owned();
        assert_eq!(opts.validate(), Err(OptionsError::MissingBatchName));
    }

    #[test]
    fn test_duplicate_feature() {
        let mut opts = valid();
        opts.feature_opts = vec![FeatureOpt::new("word", 0), FeatureOpt::new("word", 2)];
        assert_eq!(
            opts.validate(),
            Err(OptionsError::DuplicateFeature {
                name: "word".to_owned()
            })
        );
    }

    #[test]
    fn test_chunk_size_only_checked_in_exhaustive_mode() {
        let mut opts = valid();
        opts.chunk_size = 0;
        assert_eq!(opts.validate(), Err(OptionsError::ZeroChunkSize));
        opts.mode = Mode::Rand;
        assert_eq!(opts.validate(), Ok(()));
    }

    #[test]
    fn test_unknown_mode_rejected_on_parse() {
        let json = r#"{"mode": "greedy", "target_size": 3, "from_batch": "b", "script_name": "s"}"#;
        assert!(serde_json::from_str::<SelectorOptions>(json).is_err());
        assert!("greedy".parse::<Mode>().is_err());
        assert_eq!("exhaustive".parse::<Mode>().ok(), Some(Mode::Exhaustive));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "mode": "rand",
            "target_size": 5,
            "from_batch": "b",
            "script_name": "s",
            "feature_opts": [{"name": "bigram", "target_amount": 2}],
            "min_iterations": 50,
            "cutoff": 10
        }"#;
        let opts: SelectorOptions = serde_json::from_str(json).unwrap();
        assert_eq!(opts.mode, Mode::Rand);
        assert_eq!(opts.feature_opts, vec![FeatureOpt::new("bigram", 2)]);
        assert_eq!(opts.chunk_size, 1);
        assert_eq!(opts.partition_size, 2000);
        assert_eq!(opts.min_iterations, 50);
        assert_eq!(opts.seed, None);
        assert!(!opts.debug);
    }
}
