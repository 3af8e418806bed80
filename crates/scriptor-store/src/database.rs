use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs::File,
    io::{self, BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use rand::{Rng, seq::IndexedRandom as _};
use scriptor_selection::{Candidate, FeatureOpt, FreqMap, ScriptMetadata, SentenceId, Stats};
use scriptor_text::{FEAT_WORD, Sentence};
use serde::{Deserialize, Serialize};

use crate::{
    StoreError,
    cache::{FeatureCache, FeatureId},
    category::Category,
};

/// A sentence as stored, with interned feature frequencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSentence {
    pub id: SentenceId,
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
    pub feats: BTreeMap<FeatureId, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub name: String,
    pub size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub metadata: BatchMetadata,
    pub ids: Vec<SentenceId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub metadata: ScriptMetadata,
    pub ids: Vec<SentenceId>,
}

/// Summary counts of a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbStats {
    pub sentences: usize,
    pub sources: usize,
    pub features: usize,
    pub word_forms: usize,
    pub blocked: usize,
    pub batches: BTreeMap<String, usize>,
    pub scripts: BTreeMap<String, usize>,
    pub categories: BTreeMap<String, usize>,
}

/// Sentence database kept in a single JSON file.
///
/// Changes are made in memory and written back with [`Database::save`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(skip)]
    path: PathBuf,
    #[serde(skip)]
    by_text: HashMap<String, SentenceId>,
    #[serde(default)]
    features: FeatureCache,
    #[serde(default)]
    sentences: BTreeMap<SentenceId, StoredSentence>,
    #[serde(default)]
    batches: BTreeMap<String, Batch>,
    #[serde(default)]
    scripts: BTreeMap<String, Script>,
    #[serde(default)]
    blocked: BTreeSet<SentenceId>,
    #[serde(default)]
    categories: BTreeMap<String, Category>,
}

impl Database {
    /// Opens the database at `path`, or an empty one when the file does not exist.
    pub fn open<P>(path: P) -> Result<Self, StoreError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref().to_owned();
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "creating new database");
                return Ok(Self {
                    path,
                    ..Self::default()
                });
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let mut db: Self = match serde_json::from_reader(BufReader::new(file)) {
            Ok(db) => db,
            Err(source) => return Err(StoreError::Json { path, source }),
        };
        db.by_text = db
            .sentences
            .values()
            .map(|s| (s.text.clone(), s.id))
            .collect();
        tracing::debug!(
            path = %path.display(),
            sentences = db.sentences.len(),
            "opened database"
        );
        db.path = path;
        Ok(db)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the database to a temporary file next to its path, then renames it into place.
    pub fn save(&self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, self).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?;
            writeln!(writer).map_err(io_err)?;
            writer.flush().map_err(io_err)?;
        }
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        tracing::debug!(path = %self.path.display(), "saved database");
        Ok(())
    }

    #[must_use]
    pub fn features(&self) -> &FeatureCache {
        &self.features
    }

    /// Inserts `sentence` unless a sentence with the same text exists.
    ///
    /// Returns the sentence id and whether it was newly inserted.
    pub fn insert_sentence(&mut self, sentence: &Sentence) -> (SentenceId, bool) {
        if let Some(id) = self.by_text.get(&sentence.text) {
            return (*id, false);
        }
        let id = SentenceId(
            self.sentences
                .last_key_value()
                .map_or(1, |(id, _)| id.0 + 1),
        );
        let feats = self.features.intern_all(&sentence.feats);
        self.sentences.insert(
            id,
            StoredSentence {
                id,
                text: sentence.text.clone(),
                source: sentence.source.clone(),
                feats,
            },
        );
        self.by_text.insert(sentence.text.clone(), id);
        (id, true)
    }

    #[must_use]
    pub fn sentence(&self, id: SentenceId) -> Option<&StoredSentence> {
        self.sentences.get(&id)
    }

    pub fn sentences(&self) -> impl Iterator<Item = &StoredSentence> {
        self.sentences.values()
    }

    #[must_use]
    pub fn is_blocked(&self, id: SentenceId) -> bool {
        self.blocked.contains(&id)
    }

    /// Decodes the features of `sentence`, including derived categories.
    #[must_use]
    pub fn sentence_feats(&self, sentence: &StoredSentence) -> BTreeMap<String, FreqMap> {
        let mut res = BTreeMap::<String, FreqMap>::new();
        for (id, freq) in &sentence.feats {
            let Some(key) = self.features.get(*id) else {
                tracing::warn!(sentence = %sentence.id, feature = id, "unknown feature id");
                continue;
            };
            res.entry(key.name.clone())
                .or_default()
                .insert(key.value.clone(), *freq);
        }
        for (name, category) in &self.categories {
            let derived = category.derive(res.get(&category.source));
            if !derived.is_empty() {
                res.insert(name.clone(), derived);
            }
        }
        res
    }

    /// `sentence` as a selection candidate with stats over `features`.
    #[must_use]
    pub fn candidate(&self, sentence: &StoredSentence, features: &[FeatureOpt]) -> Candidate {
        let feats = self.sentence_feats(sentence);
        Candidate::new(
            sentence.id,
            sentence.text.clone(),
            Stats::from_features(features, &feats),
        )
    }

    /// Adds up to `size` random sentences to the batch `name`.
    ///
    /// Blocked sentences and sentences already in the batch are not sampled.
    /// Returns the number of sentences added.
    pub fn sample_batch<R>(&mut self, name: &str, size: usize, seed: Option<u64>, rng: &mut R) -> usize
    where
        R: Rng + ?Sized,
    {
        let existing = self
            .batches
            .get(name)
            .map(|b| b.ids.iter().copied().collect::<BTreeSet<_>>())
            .unwrap_or_default();
        let pool = self
            .sentences
            .keys()
            .copied()
            .filter(|id| !self.blocked.contains(id) && !existing.contains(id))
            .collect::<Vec<_>>();
        let sampled = pool.choose_multiple(rng, size).copied().collect::<Vec<_>>();
        let added = sampled.len();

        let timestamp = Utc::now();
        let batch = self.batches.entry(name.to_owned()).or_insert_with(|| Batch {
            metadata: BatchMetadata {
                name: name.to_owned(),
                size: 0,
                seed,
                timestamp,
            },
            ids: vec![],
        });
        batch.ids.extend(sampled);
        batch.metadata.size = batch.ids.len();
        batch.metadata.timestamp = timestamp;
        tracing::info!(batch = name, added, size = batch.ids.len(), "sampled batch");
        added
    }

    /// Blocks `ids` from all future batches and accumulated stats.
    ///
    /// Returns the number of sentences that were not blocked before.
    pub fn block_sentences(&mut self, ids: &[SentenceId]) -> Result<usize, StoreError> {
        if let Some(id) = ids.iter().find(|id| !self.sentences.contains_key(*id)) {
            return Err(StoreError::UnknownSentence { id: *id });
        }
        Ok(ids.iter().filter(|id| self.blocked.insert(**id)).count())
    }

    #[must_use]
    pub fn blocked_ids(&self) -> &BTreeSet<SentenceId> {
        &self.blocked
    }

    pub fn blocked_sentences(&self) -> impl Iterator<Item = &StoredSentence> {
        self.blocked.iter().filter_map(|id| self.sentences.get(id))
    }

    pub fn list_batches(&self) -> impl Iterator<Item = &BatchMetadata> {
        self.batches.values().map(|b| &b.metadata)
    }

    pub fn list_scripts(&self) -> impl Iterator<Item = &ScriptMetadata> {
        self.scripts.values().map(|s| &s.metadata)
    }

    pub(crate) fn batch(&self, name: &str) -> Result<&Batch, StoreError> {
        self.batches.get(name).ok_or_else(|| StoreError::UnknownBatch {
            name: name.to_owned(),
        })
    }

    pub(crate) fn script(&self, name: &str) -> Result<&Script, StoreError> {
        self.scripts.get(name).ok_or_else(|| StoreError::UnknownScript {
            name: name.to_owned(),
        })
    }

    pub(crate) fn insert_script(&mut self, script: Script) -> Result<(), StoreError> {
        let name = &script.metadata.options.script_name;
        if self.scripts.contains_key(name) {
            return Err(StoreError::DuplicateScript { name: name.clone() });
        }
        if let Some(id) = script.ids.iter().find(|id| !self.sentences.contains_key(*id)) {
            return Err(StoreError::UnknownSentence { id: *id });
        }
        self.scripts.insert(name.clone(), script);
        Ok(())
    }

    pub fn delete_batch(&mut self, name: &str) -> Result<Batch, StoreError> {
        self.batches.remove(name).ok_or_else(|| StoreError::UnknownBatch {
            name: name.to_owned(),
        })
    }

    pub fn delete_script(&mut self, name: &str) -> Result<Script, StoreError> {
        self.scripts.remove(name).ok_or_else(|| StoreError::UnknownScript {
            name: name.to_owned(),
        })
    }

    /// Sentences of the script `name`, in selection order.
    pub fn script_sentences(&self, name: &str) -> Result<Vec<&StoredSentence>, StoreError> {
        let script = self.script(name)?;
        Ok(script
            .ids
            .iter()
            .filter_map(|id| self.sentences.get(id))
            .collect())
    }

    pub fn batch_sentences(&self, name: &str) -> Result<Vec<&StoredSentence>, StoreError> {
        let batch = self.batch(name)?;
        Ok(batch
            .ids
            .iter()
            .filter_map(|id| self.sentences.get(id))
            .collect())
    }

    #[must_use]
    pub fn stats(&self) -> DbStats {
        DbStats {
            sentences: self.sentences.len(),
            sources: self
                .sentences
                .values()
                .map(|s| s.source.as_str())
                .filter(|s| !s.is_empty())
                .collect::<BTreeSet<_>>()
                .len(),
            features: self.features.len(),
            word_forms: self.features.count_values(FEAT_WORD),
            blocked: self.blocked.len(),
            batches: self
                .batches
                .iter()
                .map(|(name, b)| (name.clone(), b.ids.len()))
                .collect(),
            scripts: self
                .scripts
                .iter()
                .map(|(name, s)| (name.clone(), s.ids.len()))
                .collect(),
            categories: self
                .categories
                .iter()
                .map(|(name, c)| (name.clone(), c.values.len()))
                .collect(),
        }
    }

    pub(crate) fn categories_mut(&mut self) -> &mut BTreeMap<String, Category> {
        &mut self.categories
    }

    #[must_use]
    pub fn categories(&self) -> &BTreeMap<String, Category> {
        &self.categories
    }
}
