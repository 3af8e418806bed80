use std::collections::BTreeSet;

use rand::seq::SliceRandom as _;

use crate::{
    pool::{self, PoolParams},
    score::ScoreSet,
    selector::{Selector, Step, StopReason},
};

impl Selector {
    /// Scores every chunk of the shuffled corpus and commits the best one.
    ///
    /// Chunks that score zero are dropped from the corpus on the way, whether
    /// or not a chunk gets selected. Ties keep the chunk found first. Chunks
    /// never hold more candidates than the target size still allows.
    pub(crate) fn select_next_exhaustive(&mut self) -> Step {
        let remaining = self.remaining_target();
        if remaining == 0 {
            return Step::Stopped(StopReason::TargetReached);
        }
        if self.corpus.is_empty() {
            return Step::Stopped(StopReason::EndOfCorpus);
        }

        let mut corpus = std::mem::take(&mut self.corpus);
        corpus.shuffle(self.rng());
        self.corpus = corpus;

        let params = PoolParams {
            partition_size: self.options().partition_size,
            chunk_size: self.current_chunk_size().min(remaining),
            workers: self.workers(),
        };
        let groups = pool::score_groups(self.scorer(), &self.selection_stats, &self.corpus, params);
        let zero = ScoreSet::zero(self.scorer().features());

        let mut removable = BTreeSet::new();
        let mut best = None;
        for group in &groups {
            if group.score.is_zero() {
                removable.extend(group.range.clone());
                continue;
            }
            let best_score = best.map_or(&zero, |(g, _): (&pool::ScoredGroup, &str)| &g.score);
            if let Some(feature) = self.scorer().is_higher_than(&group.score, best_score) {
                best = Some((group, feature));
            }
        }

        let Some((group, feature)) = best else {
            let reason = if removable.len() == self.corpus.len() {
                StopReason::NoNewInfo
            } else {
                StopReason::NoSelection
            };
            let removed = removable.len();
            self.take_positions(&BTreeSet::new(), &removable);
            tracing::info!(%reason, removed, corpus_left = self.corpus.len(), "no chunk selected");
            return Step::Stopped(reason);
        };

        let positions = group.range.clone().collect::<Vec<_>>();
        let score = group.score.clone();
        let feature = feature.to_owned();
        tracing::debug!(
            chunk_size = positions.len(),
            feature = %feature,
            scores = %self.scorer().describe(&score),
            "selected chunk"
        );
        let report = self.commit(&positions, &removable, score, Some(feature));
        if report.removed > 0 {
            tracing::debug!(removed = report.removed, "removed zero scoring sentences");
        }
        self.shrink_chunk_size();
        Step::Selected(report)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        options::{Mode, SelectorOptions},
        selector::{Selector, Step, StopReason},
        testing::{candidate, features},
    };

    fn options(chunk_size: usize, chunk_decrease: usize) -> SelectorOptions {
        let mut options = SelectorOptions::new(Mode::Exhaustive, 10, "batch", "script");
        options.feature_opts = features();
        options.chunk_size = chunk_size;
        options.chunk_decrease = chunk_decrease;
        options.partition_size = 3;
        options.workers = Some(2);
        options.seed = Some(7);
        options
    }

    fn selector(chunk_size: usize, chunk_decrease: usize) -> Selector {
        Selector::new(options(chunk_size, chunk_decrease)).unwrap()
    }

    fn length_adjusted(chunk_size: usize, chunk_decrease: usize) -> Selector {
        let mut options = options(chunk_size, chunk_decrease);
        options.adjust_score_for_sentence_length = true;
        Selector::new(options).unwrap()
    }

    #[test]
    fn test_picks_most_novel_sentence() {
        let mut s = selector(1, 0);
        s.load_corpus(vec![
            candidate(1, "a", &["x"], &[]),
            candidate(2, "ab", &["x", "y", "z"], &[]),
            candidate(3, "c", &["x", "y"], &[]),
        ]);
        let Step::Selected(report) = s.select_next().unwrap() else {
            panic!("expected a selection");
        };
        assert_eq!(report.chunk.candidates[0].id().0, 2);
        assert_eq!(report.chunk.selected_feature.as_deref(), Some("a"));
        assert_eq!(s.corpus().len(), 2);
        assert_eq!(s.selection_stats().count("a", "y"), 1);
    }

    #[test]
    fn test_zero_scoring_sentences_are_removed() {
        let mut s = selector(1, 0);
        s.load_corpus(vec![
            candidate(1, "a", &["x"], &[]),
            candidate(2, "...", &[], &[]),
            candidate(3, "!!!", &[], &[]),
        ]);
        let Step::Selected(report) = s.select_next().unwrap() else {
            panic!("expected a selection");
        };
        assert_eq!(report.removed, 2);
        assert!(s.corpus().is_empty());
        assert_eq!(s.selection().len(), 1);

        assert!(matches!(
            s.select_next().unwrap(),
            Step::Stopped(StopReason::EndOfCorpus)
        ));
    }

    #[test]
    fn test_all_zero_corpus_has_no_new_info() {
        let mut s = selector(1, 0);
        s.load_corpus(vec![
            candidate(1, "...", &[], &[]),
            candidate(2, "!!!", &[], &[]),
        ]);
        assert!(matches!(
            s.select_next().unwrap(),
            Step::Stopped(StopReason::NoNewInfo)
        ));
        assert!(s.corpus().is_empty());
        assert!(s.selection().is_empty());
    }

    #[test]
    fn test_chunk_size_decays_to_one() {
        let mut s = selector(3, 2);
        s.load_corpus((0..12).map(|i| candidate(i, "w", &[format!("v{i}").as_str()], &[])).collect());
        assert_eq!(s.current_chunk_size(), 3);

        let Step::Selected(report) = s.select_next().unwrap() else {
            panic!("expected a selection");
        };
        assert_eq!(report.chunk.len(), 3);
        assert_eq!(s.current_chunk_size(), 1);

        let Step::Selected(report) = s.select_next().unwrap() else {
            panic!("expected a selection");
        };
        assert_eq!(report.chunk.len(), 1);
        assert_eq!(s.current_chunk_size(), 1);
        assert_eq!(s.selection().len(), 4);
        assert_eq!(s.corpus().len(), 8);
    }

    #[test]
    fn test_rounded_to_zero_makes_no_selection() {
        // one new value over 300000 characters scores below the rounding unit
        let long = "w".repeat(300_000);
        let mut s = length_adjusted(1, 0);
        s.load_corpus(vec![
            candidate(1, &long, &["x"], &[]),
            candidate(2, "...", &[], &[]),
        ]);
        assert!(matches!(
            s.select_next().unwrap(),
            Step::Stopped(StopReason::NoSelection)
        ));
        assert_eq!(s.corpus().len(), 1);
        assert_eq!(s.corpus()[0].id().0, 1);
        assert!(s.selection().is_empty());
    }

    #[test]
    fn test_no_selection_keeps_chunk_size() {
        let long = "w".repeat(300_000);
        let mut s = length_adjusted(3, 2);
        s.load_corpus(vec![
            candidate(1, &long, &["x"], &[]),
            candidate(2, &long, &["y"], &[]),
            candidate(3, &long, &["z"], &[]),
        ]);
        assert!(matches!(
            s.select_next().unwrap(),
            Step::Stopped(StopReason::NoSelection)
        ));
        assert_eq!(s.corpus().len(), 3);
        assert_eq!(s.current_chunk_size(), 3);
    }

    #[test]
    fn test_chunk_is_capped_by_target() {
        let mut options = options(3, 0);
        options.target_size = 4;
        let mut s = Selector::new(options).unwrap();
        s.load_corpus((0..12).map(|i| candidate(i, "w", &[format!("v{i}").as_str()], &[])).collect());

        let mut chunks = vec![];
        let summary = s.run(|_, report| chunks.push(report.chunk.len())).unwrap();
        assert_eq!(summary.reason, StopReason::TargetReached);
        assert_eq!(chunks, vec![3, 1]);
        assert_eq!(summary.selected, 4);
        assert_eq!(s.current_chunk_size(), 3);

        assert!(matches!(
            s.select_next().unwrap(),
            Step::Stopped(StopReason::TargetReached)
        ));
        assert_eq!(s.selection().len(), 4);
        assert_eq!(s.corpus().len(), 8);
    }

    #[test]
    fn test_same_seed_same_selection() {
        let run = || {
            let mut s = selector(2, 0);
            s.load_corpus(
                (0..20)
                    .map(|i| candidate(i, "w", &[format!("v{}", i % 4).as_str()], &[format!("b{}", i % 7).as_str()]))
                    .collect(),
            );
            let summary = s.run(|_, _| {}).unwrap();
            (summary, s.selected_ids().collect::<Vec<_>>())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_run_stops_at_target() {
        let mut s = selector(1, 0);
        s.load_corpus((0..30).map(|i| candidate(i, "w", &[format!("v{i}").as_str()], &[])).collect());
        let mut steps = 0;
        let summary = s.run(|_, _| steps += 1).unwrap();
        assert_eq!(summary.reason, StopReason::TargetReached);
        assert_eq!(summary.selected, 10);
        assert_eq!(summary.corpus_left, 20);
        assert_eq!(steps, 10);
    }
}
