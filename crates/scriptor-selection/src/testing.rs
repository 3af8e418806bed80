use std::collections::BTreeMap;

use crate::{
    options::FeatureOpt,
    stats::{Candidate, FreqMap, SentenceId, Stats},
};

/// Feature `a` without a target amount, feature `b` with target amount 2.
pub(crate) fn features() -> Vec<FeatureOpt> {
    vec![FeatureOpt::new("a", 0), FeatureOpt::new("b", 2)]
}

pub(crate) fn candidate(id: u64, text: &str, a: &[&str], b: &[&str]) -> Candidate {
    let to_map = |values: &[&str]| {
        let mut m = FreqMap::new();
        for v in values {
            *m.entry((*v).to_owned()).or_default() += 1;
        }
        m
    };
    let feats = BTreeMap::from([("a".to_owned(), to_map(a)), ("b".to_owned(), to_map(b))]);
    Candidate::new(SentenceId(id), text, Stats::from_features(&features(), &feats))
}
