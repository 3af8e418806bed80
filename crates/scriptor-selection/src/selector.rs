use std::{
    collections::{BTreeMap, BTreeSet},
    mem,
};

use chrono::{DateTime, Utc};
use rand::SeedableRng as _;
use rand_pcg::Pcg32;

use crate::{
    SelectError,
    chunk::Chunk,
    options::{Mode, OptionsError, SelectorOptions},
    pool,
    score::{ScoreSet, Scorer},
    source::{CandidateSource, ScriptMetadata, ScriptSink},
    stats::{Candidate, SentenceId, Stats, sum_of_stats},
};

/// Why a selection run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::IsVariant)]
pub enum StopReason {
    #[display("target reached")]
    TargetReached,
    #[display("end of corpus")]
    EndOfCorpus,
    /// Every remaining candidate scored zero.
    #[display("no new info in corpus")]
    NoNewInfo,
    /// Some candidates scored, but none above zero once rounded.
    #[display("unable to make a selection")]
    NoSelection,
}

/// What one successful step committed.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub chunk: Chunk,
    /// Candidates dropped from the corpus without being selected.
    pub removed: usize,
    /// Trials scored by the random search (1 for exhaustive steps).
    pub iterations: usize,
}

#[derive(Debug, Clone)]
pub enum Step {
    Selected(StepReport),
    Stopped(StopReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub reason: StopReason,
    pub steps: usize,
    pub selected: usize,
    pub corpus_left: usize,
}

/// Selection state: the remaining corpus, the selection so far and its statistics.
///
/// The state is only mutated by the selection steps, on the calling thread.
/// Exhaustive steps fan scoring out over worker threads but commit the result
/// after all of them are done.
#[derive(Debug, Clone)]
pub struct Selector {
    options: SelectorOptions,
    scorer: Scorer,
    rng: Pcg32,
    workers: usize,
    pub(crate) corpus: Vec<Candidate>,
    selection: Vec<Candidate>,
    pub(crate) selection_stats: Stats,
    input_batch_stats: Stats,
    input_batch_size: usize,
    accumulated_scripts_stats: Stats,
    accumulated_scripts_size: usize,
    current_chunk_size: usize,
}

impl Selector {
    /// Validates `options` and creates an empty selector.
    ///
    /// The random generator is seeded from `options.seed` when given, which
    /// makes runs over the same corpus reproducible.
    pub fn new(options: SelectorOptions) -> Result<Self, OptionsError> {
        options.validate()?;
        let features = options.feature_opts.clone();
        let scorer = Scorer::new(features.clone(), options.adjust_score_for_sentence_length)
            .with_debug(options.debug);
        let rng = match options.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_rng(&mut rand::rng()),
        };
        Ok(Self {
            scorer,
            rng,
            workers: options.workers.unwrap_or_else(pool::default_workers),
            corpus: vec![],
            selection: vec![],
            selection_stats: Stats::new(&features),
            input_batch_stats: Stats::new(&features),
            input_batch_size: 0,
            accumulated_scripts_stats: Stats::new(&features),
            accumulated_scripts_size: 0,
            current_chunk_size: options.chunk_size,
            options,
        })
    }

    /// Loads the input batch and the accumulated script statistics from `source`.
    pub fn init<S>(&mut self, source: &S) -> Result<(), S::Error>
    where
        S: CandidateSource + ?Sized,
    {
        let batch = source.load_batch(
            &self.options.from_batch,
            &self.options.accumulated_scripts,
            &self.options.feature_opts,
        )?;
        tracing::info!(
            batch = %self.options.from_batch,
            sentences = batch.len(),
            "loaded input batch"
        );
        self.load_corpus(batch);

        if self.options.accumulated_scripts.is_empty() {
            tracing::info!("no accumulated scripts");
        } else {
            let (stats, size) = source.load_accumulated_stats(
                &self.options.accumulated_scripts,
                &self.options.feature_opts,
            )?;
            tracing::info!(
                scripts = ?self.options.accumulated_scripts,
                sentences = size,
                "loaded accumulated scripts"
            );
            self.load_accumulated(stats, size);
        }
        Ok(())
    }

    /// Replaces the corpus with `candidates`.
    pub fn load_corpus(&mut self, candidates: Vec<Candidate>) {
        let features = self.scorer.features();
        self.corpus = candidates
            .into_iter()
            .map(|c| c.conform(features))
            .collect();
        self.input_batch_stats = sum_of_stats(features, &self.corpus);
        self.input_batch_size = self.corpus.len();
    }

    /// Credits the statistics of earlier scripts against novelty.
    pub fn load_accumulated(&mut self, stats: Stats, size: usize) {
        let mut conformed = Stats::new(self.scorer.features());
        conformed.add(&stats);
        self.selection_stats.add(&conformed);
        self.accumulated_scripts_stats = conformed;
        self.accumulated_scripts_size = size;
    }

    #[must_use]
    pub fn options(&self) -> &SelectorOptions {
        &self.options
    }

    #[must_use]
    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    #[must_use]
    pub fn corpus(&self) -> &[Candidate] {
        &self.corpus
    }

    #[must_use]
    pub fn selection(&self) -> &[Candidate] {
        &self.selection
    }

    /// Stats of the selection, including accumulated scripts.
    #[must_use]
    pub fn selection_stats(&self) -> &Stats {
        &self.selection_stats
    }

    #[must_use]
    pub fn input_batch_stats(&self) -> &Stats {
        &self.input_batch_stats
    }

    #[must_use]
    pub fn input_batch_size(&self) -> usize {
        self.input_batch_size
    }

    #[must_use]
    pub fn accumulated_scripts_stats(&self) -> &Stats {
        &self.accumulated_scripts_stats
    }

    #[must_use]
    pub fn accumulated_scripts_size(&self) -> usize {
        self.accumulated_scripts_size
    }

    #[must_use]
    pub fn current_chunk_size(&self) -> usize {
        self.current_chunk_size
    }

    #[must_use]
    pub fn target_reached(&self) -> bool {
        self.selection.len() >= self.options.target_size
    }

    /// Number of candidates the selection may still take.
    pub(crate) fn remaining_target(&self) -> usize {
        self.options.target_size.saturating_sub(self.selection.len())
    }

    /// Runs one step of the configured search.
    pub fn select_next(&mut self) -> Result<Step, SelectError> {
        match self.options.mode {
            Mode::Rand => self.select_next_rand(),
            Mode::Exhaustive => Ok(self.select_next_exhaustive()),
        }
    }

    /// Selects until the target is reached or a step stops.
    ///
    /// `on_step` is called after every committed step. Ending below the target
    /// size is a normal outcome, reported through [`RunSummary::reason`].
    pub fn run<F>(&mut self, mut on_step: F) -> Result<RunSummary, SelectError>
    where
        F: FnMut(&Self, &StepReport),
    {
        let mut steps = 0;
        let reason = loop {
            match self.select_next()? {
                Step::Selected(report) => {
                    steps += 1;
                    on_step(self, &report);
                    if self.target_reached() {
                        break StopReason::TargetReached;
                    }
                }
                Step::Stopped(reason) => break reason,
            }
        };
        tracing::info!(
            %reason,
            steps,
            selected = self.selection.len(),
            corpus_left = self.corpus.len(),
            "selection completed"
        );
        Ok(RunSummary {
            reason,
            steps,
            selected: self.selection.len(),
            corpus_left: self.corpus.len(),
        })
    }

    pub fn selected_ids(&self) -> impl Iterator<Item = SentenceId> + '_ {
        self.selection.iter().map(Candidate::id)
    }

    #[must_use]
    pub fn script_metadata(&self, timestamp: DateTime<Utc>) -> ScriptMetadata {
        ScriptMetadata {
            options: self.options.clone(),
            input_size: self.input_batch_size,
            output_size: self.selection.len(),
            timestamp,
        }
    }

    /// Hands the selection to `sink` as the script named in the options.
    pub fn persist<K>(&self, sink: &mut K, timestamp: DateTime<Utc>) -> Result<ScriptMetadata, K::Error>
    where
        K: ScriptSink + ?Sized,
    {
        let mut metadata = self.script_metadata(timestamp);
        let ids = self.selected_ids().collect::<Vec<_>>();
        metadata.output_size = sink.persist_selection(&metadata, &ids)?;
        Ok(metadata)
    }

    pub(crate) fn rng(&mut self) -> &mut Pcg32 {
        &mut self.rng
    }

    pub(crate) fn workers(&self) -> usize {
        self.workers
    }

    pub(crate) fn shrink_chunk_size(&mut self) {
        if self.current_chunk_size > 1 {
            self.current_chunk_size = self
                .current_chunk_size
                .saturating_sub(self.options.chunk_decrease)
                .max(1);
        }
    }

    /// Drops `selected` and `removable` positions from the corpus.
    ///
    /// Returns the selected candidates keyed by their former position.
    pub(crate) fn take_positions(
        &mut self,
        selected: &BTreeSet<usize>,
        removable: &BTreeSet<usize>,
    ) -> BTreeMap<usize, Candidate> {
        let before = self.corpus.len();
        let removal = selected.union(removable).count();
        let mut taken = BTreeMap::new();
        let mut kept = Vec::with_capacity(before.saturating_sub(removal));
        for (i, c) in mem::take(&mut self.corpus).into_iter().enumerate() {
            if selected.contains(&i) {
                taken.insert(i, c);
            } else if !removable.contains(&i) {
                kept.push(c);
            }
        }
        self.corpus = kept;
        assert_eq!(
            self.corpus.len() + removal,
            before,
            "corpus should have been reduced by {removal} sentences"
        );
        taken
    }

    /// Moves the candidates at `positions` into the selection, in that order.
    pub(crate) fn commit(
        &mut self,
        positions: &[usize],
        removable: &BTreeSet<usize>,
        score: ScoreSet,
        selected_feature: Option<String>,
    ) -> StepReport {
        let selected = positions.iter().copied().collect::<BTreeSet<_>>();
        let mut taken = self.take_positions(&selected, removable);
        let candidates = positions
            .iter()
            .filter_map(|i| taken.remove(i))
            .collect::<Vec<_>>();
        assert_eq!(candidates.len(), selected.len());

        self.selection_stats
            .add(&sum_of_stats(self.scorer.features(), &candidates));
        self.selection.extend(candidates.iter().cloned());

        StepReport {
            removed: removable.difference(&selected).count(),
            chunk: Chunk {
                candidates,
                score,
                selected_feature,
            },
            iterations: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use chrono::TimeZone as _;

    use super::*;
    use crate::{
        options::FeatureOpt,
        testing::{candidate, features},
    };

    struct MemorySource {
        batch: Vec<Candidate>,
        accumulated: Vec<Candidate>,
    }

    impl CandidateSource for MemorySource {
        type Error = Infallible;

        fn load_batch(
            &self,
            _batch: &str,
            _excluded_scripts: &[String],
            features: &[FeatureOpt],
        ) -> Result<Vec<Candidate>, Self::Error> {
            Ok(self.batch.iter().cloned().map(|c| c.conform(features)).collect())
        }

        fn load_accumulated_stats(
            &self,
            _scripts: &[String],
            features: &[FeatureOpt],
        ) -> Result<(Stats, usize), Self::Error> {
            Ok((sum_of_stats(features, &self.accumulated), self.accumulated.len()))
        }
    }

    #[derive(Default)]
    struct MemorySink {
        scripts: Vec<(String, Vec<SentenceId>)>,
    }

    impl ScriptSink for MemorySink {
        type Error = Infallible;

        fn persist_selection(
            &mut self,
            metadata: &ScriptMetadata,
            ids: &[SentenceId],
        ) -> Result<usize, Self::Error> {
            self.scripts
                .push((metadata.options.script_name.clone(), ids.to_vec()));
            Ok(ids.len())
        }
    }

    fn options(mode: Mode, target_size: usize) -> SelectorOptions {
        let mut options = SelectorOptions::new(mode, target_size, "batch", "script");
        options.feature_opts = features();
        options.accumulated_scripts = vec!["old".to_owned()];
        options.seed = Some(3);
        options
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let mut options = options(Mode::Exhaustive, 0);
        assert_eq!(
            Selector::new(options.clone()).unwrap_err(),
            OptionsError::ZeroTargetSize
        );
        options.target_size = 1;
        options.script_name.clear();
        assert_eq!(
            Selector::new(options).unwrap_err(),
            OptionsError::MissingScriptName
        );
    }

    #[test]
    fn test_accumulated_scripts_reduce_novelty() {
        let source = MemorySource {
            batch: vec![
                candidate(1, "w", &["x", "y"], &[]),
                candidate(2, "w", &["z"], &[]),
            ],
            accumulated: vec![
                candidate(8, "w", &["x", "y"], &[]),
                candidate(9, "w", &["x"], &["y"]),
            ],
        };
        let mut s = Selector::new(options(Mode::Exhaustive, 1)).unwrap();
        s.init(&source).unwrap();
        assert_eq!(s.input_batch_size(), 2);
        assert_eq!(s.accumulated_scripts_size(), 2);
        assert_eq!(s.selection_stats().count("a", "x"), 2);

        // x scores 1/3 and y 1/2, z scores 1
        let Step::Selected(report) = s.select_next().unwrap() else {
            panic!("expected a selection");
        };
        assert_eq!(report.chunk.candidates[0].id(), SentenceId(2));
        assert_eq!(s.selection_stats().count("a", "z"), 1);
        assert_eq!(s.accumulated_scripts_stats().count("a", "z"), 0);
    }

    #[test]
    fn test_persist_hands_over_selection_in_order() {
        let source = MemorySource {
            batch: (0..5)
                .map(|i| candidate(i, "w", &[format!("v{i}").as_str()], &[]))
                .collect(),
            accumulated: vec![],
        };
        let mut s = Selector::new(options(Mode::Exhaustive, 3)).unwrap();
        s.init(&source).unwrap();
        let summary = s.run(|_, _| {}).unwrap();
        assert_eq!(summary.reason, StopReason::TargetReached);

        let mut sink = MemorySink::default();
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let metadata = s.persist(&mut sink, timestamp).unwrap();
        assert_eq!(metadata.input_size, 5);
        assert_eq!(metadata.output_size, 3);
        assert_eq!(metadata.timestamp, timestamp);
        assert_eq!(sink.scripts.len(), 1);
        assert_eq!(sink.scripts[0].0, "script");
        assert_eq!(sink.scripts[0].1, s.selected_ids().collect::<Vec<_>>());
    }

    #[test]
    fn test_run_ends_below_target_at_end_of_corpus() {
        let mut s = Selector::new(options(Mode::Exhaustive, 10)).unwrap();
        s.load_corpus((0..4).map(|i| candidate(i, "w", &["x"], &[])).collect());
        let summary = s.run(|_, _| {}).unwrap();
        assert_eq!(summary.reason, StopReason::EndOfCorpus);
        assert_eq!(summary.selected, 4);
        assert!(!s.target_reached());
    }

    #[test]
    #[should_panic(expected = "corpus should have been reduced")]
    fn test_out_of_range_position_panics() {
        let mut s = Selector::new(options(Mode::Exhaustive, 1)).unwrap();
        s.load_corpus(vec![candidate(1, "w", &["x"], &[])]);
        s.take_positions(&BTreeSet::new(), &BTreeSet::from([5]));
    }
}
