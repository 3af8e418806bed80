//! Novelty scoring of candidate groups.
//!
//! A group of candidates is scored per feature against the statistics
//! accumulated so far. Every distinct value in the group contributes:
//!
//! - `1.0` while the value has been seen fewer than the feature's target amount, or
//! - `1 / (n + 1)` where `n` is the accumulated count of the value.
//!
//! New values therefore score highest and frequent values fade out, giving
//! diminishing returns without having to solve the coverage problem exactly.
//!
//! Score sets are ordered by the configured feature priority list, see
//! [`Scorer::compare`].

use std::{cmp::Ordering, collections::BTreeMap, fmt};

use crate::{
    options::FeatureOpt,
    stats::{Candidate, Stats},
};

/// Scores are compared after rounding to this unit.
pub const ROUND_UNIT: f64 = 0.0001;

#[must_use]
pub fn round_score(score: f64) -> f64 {
    (score / ROUND_UNIT).round() * ROUND_UNIT
}

/// Per-feature novelty scores of a candidate or group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreSet(BTreeMap<String, f64>);

impl ScoreSet {
    /// A zero score for every configured feature.
    #[must_use]
    pub fn zero(features: &[FeatureOpt]) -> Self {
        Self(
            features
                .iter()
                .map(|opt| (opt.name.clone(), 0.0))
                .collect(),
        )
    }

    #[must_use]
    pub fn get(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, name: &str, score: f64) {
        self.0.insert(name.to_owned(), score);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, score)| (name.as_str(), *score))
    }

    /// True when no feature contributes anything.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.values().sum::<f64>() == 0.0
    }
}

impl fmt::Display for ScoreSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, score)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}:{score:.3}")?;
        }
        Ok(())
    }
}

/// Scores candidate groups and orders score sets by feature priority.
#[derive(Debug, Clone)]
pub struct Scorer {
    features: Vec<FeatureOpt>,
    adjust_for_length: bool,
    debug: bool,
}

impl Scorer {
    #[must_use]
    pub fn new(features: Vec<FeatureOpt>, adjust_for_length: bool) -> Self {
        Self {
            features,
            adjust_for_length,
            debug: false,
        }
    }

    /// Emits a debug event for every feature score computed.
    #[must_use]
    pub fn with_debug(self, debug: bool) -> Self {
        Self { debug, ..self }
    }

    #[must_use]
    pub fn features(&self) -> &[FeatureOpt] {
        &self.features
    }

    /// Scores `candidates` as one group against the accumulated stats `acc`.
    ///
    /// When length adjustment is on, every feature score is divided by a tenth
    /// of the group's total character length (skipped for empty text).
    pub fn score<'a, I>(&self, acc: &Stats, candidates: I) -> ScoreSet
    where
        I: IntoIterator<Item = &'a Candidate>,
    {
        let mut group = Stats::new(&self.features);
        let mut total_len = 0;
        for c in candidates {
            group.add(c.stats());
            total_len += c.char_len();
        }

        let mut res = ScoreSet::default();
        for opt in &self.features {
            let mut score = 0.0;
            for value in group.get(&opt.name).into_iter().flat_map(|m| m.keys()) {
                let seen = acc.count(&opt.name, value);
                if opt.target_amount > 0 && seen < opt.target_amount {
                    score += 1.0;
                } else {
                    score += 1.0 / f64::from(seen + 1);
                }
            }
            if self.adjust_for_length && total_len > 0 {
                #[expect(clippy::cast_precision_loss)]
                let div_by = total_len as f64 / 10.0;
                score /= div_by;
            }
            if self.debug {
                tracing::debug!(
                    feature = %opt.name,
                    values = group.get(&opt.name).map_or(0, |m| m.len()),
                    score,
                    "scored group"
                );
            }
            res.set(&opt.name, score);
        }
        res
    }

    /// Compares two score sets feature by feature in priority order.
    ///
    /// Scores are rounded with [`round_score`] first. The first feature whose
    /// rounded scores differ decides the result and is returned alongside it;
    /// `(Ordering::Equal, None)` means every feature tied.
    #[must_use]
    pub fn compare<'s>(&'s self, this: &ScoreSet, that: &ScoreSet) -> (Ordering, Option<&'s str>) {
        for opt in &self.features {
            let s1 = round_score(this.get(&opt.name));
            let s2 = round_score(that.get(&opt.name));
            let ord = s1.total_cmp(&s2);
            if ord.is_ne() {
                return (ord, Some(opt.name.as_str()));
            }
        }
        (Ordering::Equal, None)
    }

    /// Returns the deciding feature if `this` ranks strictly above `that`.
    #[must_use]
    pub fn is_higher_than<'s>(&'s self, this: &ScoreSet, that: &ScoreSet) -> Option<&'s str> {
        match self.compare(this, that) {
            (Ordering::Greater, feature) => feature,
            _ => None,
        }
    }

    /// Formats a score set in priority order with rounded scores.
    #[must_use]
    pub fn describe(&self, scores: &ScoreSet) -> String {
        self.features
            .iter()
            .map(|opt| format!("{}: {:.4}", opt.name, round_score(scores.get(&opt.name))))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
