//! Feature frequency statistics for candidates and selections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::options::FeatureOpt;

/// Feature value → frequency.
pub type FreqMap = BTreeMap<String, u32>;

/// Opaque identity of a sentence in the database.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
    derive_more::FromStr,
)]
#[serde(transparent)]
pub struct SentenceId(pub u64);

/// Per-feature frequency maps.
///
/// A `Stats` built for a selection run always holds exactly one entry per
/// configured feature, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stats(BTreeMap<String, FreqMap>);

impl Stats {
    /// Creates empty maps for every configured feature.
    #[must_use]
    pub fn new(features: &[FeatureOpt]) -> Self {
        Self(
            features
                .iter()
                .map(|opt| (opt.name.clone(), FreqMap::new()))
                .collect(),
        )
    }

    /// Keeps the configured features of `feats`, adding empty maps for missing ones.
    #[must_use]
    pub fn from_features(features: &[FeatureOpt], feats: &BTreeMap<String, FreqMap>) -> Self {
        Self(
            features
                .iter()
                .map(|opt| {
                    let m = feats.get(&opt.name).cloned().unwrap_or_default();
                    (opt.name.clone(), m)
                })
                .collect(),
        )
    }

    /// Increments the receiver's counts by `that`'s, for the receiver's features only.
    pub fn add(&mut self, that: &Stats) {
        for (name, this_m) in &mut self.0 {
            let Some(that_m) = that.0.get(name) else {
                continue;
            };
            for (value, freq) in that_m {
                *this_m.entry(value.clone()).or_default() += freq;
            }
        }
    }

    /// Returns the entries of `that` whose values are unknown to the receiver.
    ///
    /// Counts are copied from `that` as they are, not subtracted.
    #[must_use]
    pub fn set_diff(&self, that: &Stats) -> Stats {
        Self(
            self.0
                .iter()
                .map(|(name, this_m)| {
                    let diff = that
                        .0
                        .get(name)
                        .into_iter()
                        .flatten()
                        .filter(|(value, _)| !this_m.contains_key(*value))
                        .map(|(value, freq)| (value.clone(), *freq))
                        .collect();
                    (name.clone(), diff)
                })
                .collect(),
        )
    }

    /// Copies of `candidates` keeping only the values unknown to the receiver.
    #[must_use]
    pub fn strip_known(&self, candidates: &[Candidate]) -> Vec<Candidate> {
        candidates.iter().map(|c| c.without_known(self)).collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FreqMap> {
        self.0.get(name)
    }

    /// Accumulated count of `value` for feature `name` (0 when absent).
    #[must_use]
    pub fn count(&self, name: &str, value: &str) -> u32 {
        self.0
            .get(name)
            .and_then(|m| m.get(value))
            .copied()
            .unwrap_or(0)
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FreqMap)> {
        self.0.iter().map(|(name, m)| (name.as_str(), m))
    }

    /// True when no feature has any value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }
}

/// A selectable sentence with its feature statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    id: SentenceId,
    text: String,
    stats: Stats,
    char_len: usize,
}

impl Candidate {
    #[must_use]
    pub fn new(id: SentenceId, text: impl Into<String>, stats: Stats) -> Self {
        let text = text.into();
        let char_len = text.chars().count();
        Self {
            id,
            text,
            stats,
            char_len,
        }
    }

    #[must_use]
    pub fn id(&self) -> SentenceId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Number of characters in the text.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// Returns the candidate with its stats narrowed to the configured features.
    #[must_use]
    pub fn conform(self, features: &[FeatureOpt]) -> Self {
        let stats = Stats::from_features(features, &self.stats.0);
        Self { stats, ..self }
    }

    /// Returns a copy whose stats only hold values absent from `known`.
    #[must_use]
    pub fn without_known(&self, known: &Stats) -> Self {
        Self {
            stats: known.set_diff(&self.stats),
            ..self.clone()
        }
    }
}

/// Sums the stats of `candidates` over the configured features.
pub fn sum_of_stats<'a, I>(features: &[FeatureOpt], candidates: I) -> Stats
where
    I: IntoIterator<Item = &'a Candidate>,
{
    let mut res = Stats::new(features);
    for c in candidates {
        res.add(&c.stats);
    }
    res
}
