use std::collections::BTreeSet;

use rand::seq::SliceRandom as _;

use crate::{
    SelectError,
    score::ScoreSet,
    selector::{Selector, Step, StopReason},
};

struct Trial {
    positions: Vec<usize>,
    score: ScoreSet,
    feature: Option<String>,
}

impl Selector {
    /// Samples random subsets of the sentences still missing from the target
    /// size and commits the best.
    ///
    /// Sampling continues for at least `min_iterations` trials, and then until
    /// `cutoff` consecutive trials fail to beat the best one. The best trial is
    /// committed even when it scores zero.
    pub(crate) fn select_next_rand(&mut self) -> Result<Step, SelectError> {
        let target = self.remaining_target();
        if target == 0 {
            return Ok(Step::Stopped(StopReason::TargetReached));
        }
        let available = self.corpus.len();
        if available < target {
            return Err(SelectError::CorpusTooSmall {
                requested: target,
                available,
            });
        }
        let min_iterations = self.options().min_iterations;
        let cutoff = self.options().cutoff;
        let log_interval = (min_iterations / 20).max(1);
        let zero = ScoreSet::zero(self.scorer().features());

        let mut order = (0..available).collect::<Vec<_>>();
        let mut best: Option<Trial> = None;
        let mut iterations = 0;
        let mut without_gain = 0;
        loop {
            iterations += 1;
            let (sample, _) = order.partial_shuffle(self.rng(), target);
            let score = self
                .scorer()
                .score(&self.selection_stats, sample.iter().map(|&i| &self.corpus[i]));

            let best_score = best.as_ref().map_or(&zero, |t| &t.score);
            match self.scorer().is_higher_than(&score, best_score) {
                Some(feature) => {
                    tracing::debug!(
                        iteration = iterations,
                        feature,
                        scores = %self.scorer().describe(&score),
                        "new best sample"
                    );
                    best = Some(Trial {
                        positions: sample.to_vec(),
                        score,
                        feature: Some(feature.to_owned()),
                    });
                    without_gain = 0;
                }
                None => {
                    if best.is_none() {
                        best = Some(Trial {
                            positions: sample.to_vec(),
                            score,
                            feature: None,
                        });
                    }
                    without_gain += 1;
                }
            }

            if iterations % log_interval == 0 {
                tracing::debug!(iterations, without_gain, "sampling");
            }
            if iterations >= min_iterations && without_gain >= cutoff {
                break;
            }
        }

        let best = best.expect("at least one sample should have been scored");
        tracing::info!(
            iterations,
            feature = best.feature.as_deref().unwrap_or("-"),
            scores = %self.scorer().describe(&best.score),
            "selected sample"
        );
        let mut report = self.commit(&best.positions, &BTreeSet::new(), best.score, best.feature);
        report.iterations = iterations;
        Ok(Step::Selected(report))
    }
}
