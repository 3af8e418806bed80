use std::collections::BTreeSet;

use scriptor_selection::{
    Candidate, CandidateSource, FeatureOpt, ScriptMetadata, ScriptSink, SentenceId, Stats,
    sum_of_stats,
};

use crate::{
    StoreError,
    database::{Database, Script},
};

impl Database {
    fn excluded_ids(&self, scripts: &[String]) -> Result<BTreeSet<SentenceId>, StoreError> {
        let mut res = self.blocked_ids().clone();
        for name in scripts {
            res.extend(self.script(name)?.ids.iter().copied());
        }
        Ok(res)
    }
}

impl Database {
    /// Batch candidates reduced to the feature values that `scripts` do not cover.
    ///
    /// Sentences of `scripts` and blocked sentences are left out, as when the
    /// batch is loaded for selection.
    pub fn novel_batch_candidates(
        &self,
        batch: &str,
        scripts: &[String],
        features: &[FeatureOpt],
    ) -> Result<Vec<Candidate>, StoreError> {
        let candidates = self.load_batch(batch, scripts, features)?;
        let (known, _) = self.load_accumulated_stats(scripts, features)?;
        Ok(known.strip_known(&candidates))
    }
}

impl CandidateSource for Database {
    type Error = StoreError;

    fn load_batch(
        &self,
        batch: &str,
        excluded_scripts: &[String],
        features: &[FeatureOpt],
    ) -> Result<Vec<Candidate>, Self::Error> {
        let excluded = self.excluded_ids(excluded_scripts)?;
        let batch = self.batch(batch)?;
        let res = batch
            .ids
            .iter()
            .filter(|id| !excluded.contains(*id))
            .filter_map(|id| self.sentence(*id))
            .map(|s| self.candidate(s, features))
            .collect::<Vec<_>>();
        tracing::debug!(
            batch = %batch.metadata.name,
            size = batch.ids.len(),
            excluded = batch.ids.len() - res.len(),
            "loaded batch candidates"
        );
        Ok(res)
    }

    fn load_accumulated_stats(
        &self,
        scripts: &[String],
        features: &[FeatureOpt],
    ) -> Result<(Stats, usize), Self::Error> {
        let mut ids = BTreeSet::new();
        for name in scripts {
            ids.extend(self.script(name)?.ids.iter().copied());
        }
        let candidates = ids
            .iter()
            .filter(|id| !self.is_blocked(**id))
            .filter_map(|id| self.sentence(*id))
            .map(|s| self.candidate(s, features))
            .collect::<Vec<_>>();
        Ok((sum_of_stats(features, &candidates), candidates.len()))
    }
}

impl ScriptSink for Database {
    type Error = StoreError;

    fn persist_selection(
        &mut self,
        metadata: &ScriptMetadata,
        ids: &[SentenceId],
    ) -> Result<usize, Self::Error> {
        let mut metadata = metadata.clone();
        metadata.output_size = ids.len();
        self.insert_script(Script {
            metadata,
            ids: ids.to_vec(),
        })?;
        Ok(ids.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;
    use scriptor_selection::{Mode, SelectorOptions, StopReason};
    use scriptor_text::{FEAT_FINAL_TRIGRAM, FEAT_INITIAL_BIGRAM, Sentence};

    use super::*;

    const TEXTS: [&str; 5] = [
        "Jag är en apa",
        "Vintern kommer snart, erkände Thomas.",
        "Soporna behöver tömmas.",
        "Solen skiner.",
        "sommaren slutar, nu!",
    ];

    fn db_with_batch() -> Database {
        let mut db = Database::default();
        for text in TEXTS {
            db.insert_sentence(&Sentence::compute(text));
        }
        let mut rng = Pcg32::seed_from_u64(5);
        db.sample_batch("b", TEXTS.len(), None, &mut rng);
        db
    }

    fn features() -> Vec<FeatureOpt> {
        vec![
            FeatureOpt::new(FEAT_INITIAL_BIGRAM, 0),
            FeatureOpt::new(FEAT_FINAL_TRIGRAM, 0),
        ]
    }

    fn metadata(name: &str) -> ScriptMetadata {
        ScriptMetadata {
            options: SelectorOptions::new(Mode::Exhaustive, 2, "b", name),
            input_size: 5,
            output_size: 0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_novel_batch_candidates() {
        let mut db = db_with_batch();
        db.persist_selection(&metadata("s"), &[SentenceId(4)]).unwrap();
        let novel = db
            .novel_batch_candidates("b", &["s".to_owned()], &features())
            .unwrap();
        assert_eq!(novel.len(), 4);
        let find = |id| novel.iter().find(|c| c.id() == SentenceId(id)).unwrap();
        // "Solen skiner." covers the initial bigram "so"
        assert_eq!(find(3).stats().count(FEAT_INITIAL_BIGRAM, "so"), 0);
        assert_eq!(find(3).stats().count(FEAT_FINAL_TRIGRAM, "mas"), 1);
        assert!(find(5).stats().get(FEAT_INITIAL_BIGRAM).unwrap().is_empty());
        assert_eq!(find(1).stats().count(FEAT_INITIAL_BIGRAM, "ja"), 1);
    }

    #[test]
    fn test_batch_stats_match_sentence_features() {
        let db = db_with_batch();
        let candidates = db.load_batch("b", &[], &features()).unwrap();
        assert_eq!(candidates.len(), 5);
        let stats = sum_of_stats(&features(), &candidates);
        assert_eq!(stats.count(FEAT_INITIAL_BIGRAM, "so"), 3);
        assert_eq!(stats.count(FEAT_FINAL_TRIGRAM, "mas"), 2);
        assert_eq!(stats.feature_names().collect::<Vec<_>>(), vec![FEAT_FINAL_TRIGRAM, FEAT_INITIAL_BIGRAM]);
    }

    #[test]
    fn test_load_batch_excludes_scripts_and_blocked() {
        let mut db = db_with_batch();
        db.persist_selection(&metadata("s1"), &[SentenceId(1), SentenceId(2)])
            .unwrap();
        db.block_sentences(&[SentenceId(3)]).unwrap();

        let ids = db
            .load_batch("b", &["s1".to_owned()], &features())
            .unwrap()
            .iter()
            .map(Candidate::id)
            .collect::<BTreeSet<_>>();
        assert_eq!(ids, BTreeSet::from([SentenceId(4), SentenceId(5)]));

        assert!(matches!(
            db.load_batch("b", &["nope".to_owned()], &features()),
            Err(StoreError::UnknownScript { .. })
        ));
        assert!(matches!(
            db.load_batch("nope", &[], &features()),
            Err(StoreError::UnknownBatch { .. })
        ));
    }

    #[test]
    fn test_accumulated_stats_skip_blocked() {
        let mut db = db_with_batch();
        db.persist_selection(&metadata("s1"), &[SentenceId(3), SentenceId(4)])
            .unwrap();
        db.persist_selection(&metadata("s2"), &[SentenceId(4), SentenceId(5)])
            .unwrap();
        db.block_sentences(&[SentenceId(5)]).unwrap();

        let (stats, size) = db
            .load_accumulated_stats(&["s1".to_owned(), "s2".to_owned()], &features())
            .unwrap();
        assert_eq!(size, 2);
        assert_eq!(stats.count(FEAT_INITIAL_BIGRAM, "so"), 2);
        assert_eq!(stats.count(FEAT_FINAL_TRIGRAM, "rnu"), 0);
    }

    #[test]
    fn test_duplicate_script_is_rejected() {
        let mut db = db_with_batch();
        assert_eq!(
            db.persist_selection(&metadata("s1"), &[SentenceId(1)]).unwrap(),
            1
        );
        assert!(matches!(
            db.persist_selection(&metadata("s1"), &[SentenceId(2)]),
            Err(StoreError::DuplicateScript { .. })
        ));
        assert_eq!(db.list_scripts().next().map(|m| m.output_size), Some(1));
    }

    #[test]
    fn test_selection_end_to_end() {
        let mut db = db_with_batch();
        let mut options = SelectorOptions::new(Mode::Exhaustive, 3, "b", "script");
        options.feature_opts = features();
        options.seed = Some(11);
        let mut selector = scriptor_selection::Selector::new(options).unwrap();
        selector.init(&db).unwrap();
        let summary = selector.run(|_, _| {}).unwrap();
        assert_eq!(summary.reason, StopReason::TargetReached);

        let metadata = selector.persist(&mut db, Utc::now()).unwrap();
        assert_eq!(metadata.output_size, 3);
        let script = db.script_sentences("script").unwrap();
        assert_eq!(
            script.iter().map(|s| s.id).collect::<Vec<_>>(),
            selector.selected_ids().collect::<Vec<_>>()
        );
    }
}
