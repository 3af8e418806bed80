//! Derived feature categories.
//!
//! A category names a subset of the values of a source feature, for example
//! the 800 most frequent bigrams. Each sentence then gets an extra feature,
//! named after the category, holding its source values that are in the subset.
//!
//! Categories are read from tab-separated files with one
//! `source-feature<TAB>category<TAB>value` entry per line. Empty lines and
//! lines starting with `#` are ignored.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

use scriptor_selection::FreqMap;
use serde::{Deserialize, Serialize};

use crate::{StoreError, database::Database};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub source: String,
    pub values: BTreeSet<String>,
}

impl Category {
    /// The entries of `source_feats` whose value belongs to the category.
    #[must_use]
    pub fn derive(&self, source_feats: Option<&FreqMap>) -> FreqMap {
        source_feats
            .into_iter()
            .flatten()
            .filter(|(value, _)| self.values.contains(*value))
            .map(|(value, freq)| (value.clone(), *freq))
            .collect()
    }
}

/// Parsed contents of a category file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryFile {
    pub source: String,
    /// Category name to values.
    pub categories: BTreeMap<String, BTreeSet<String>>,
}

impl CategoryFile {
    pub fn read<P>(path: P) -> Result<Self, StoreError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text).map_err(|(first, second)| StoreError::MixedSourceFeatures {
            path: path.to_owned(),
            first,
            second,
        })
    }

    /// Parses category lines; fails with both names if source features are mixed.
    pub fn parse(text: &str) -> Result<Self, (String, String)> {
        let mut res = Self::default();
        for line in text.lines() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let fields = line
                .split('\t')
                .map(|f| f.trim().to_lowercase())
                .collect::<Vec<_>>();
            let [source, category, value] = fields.as_slice() else {
                tracing::warn!(line, "skipping malformed category line");
                continue;
            };
            if category.is_empty() || value.is_empty() {
                tracing::warn!(line, "skipping malformed category line");
                continue;
            }
            if res.source.is_empty() {
                res.source.clone_from(source);
            } else if res.source != *source {
                return Err((res.source, source.clone()));
            }
            res.categories
                .entry(category.clone())
                .or_default()
                .insert(value.clone());
        }
        Ok(res)
    }
}

impl Database {
    /// Adds `values` to the category `name` derived from feature `source`.
    ///
    /// Returns the number of values that were not in the category before.
    pub fn add_feature_category<I>(
        &mut self,
        source: &str,
        name: &str,
        values: I,
    ) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = String>,
    {
        let category = self
            .categories_mut()
            .entry(name.to_owned())
            .or_insert_with(|| Category {
                source: source.to_owned(),
                values: BTreeSet::new(),
            });
        if category.source != source {
            return Err(StoreError::CategorySourceMismatch {
                category: name.to_owned(),
                existing: category.source.clone(),
                requested: source.to_owned(),
            });
        }
        let added = values
            .into_iter()
            .filter(|v| category.values.insert(v.clone()))
            .count();
        tracing::info!(category = name, source, added, "added feature category values");
        Ok(added)
    }

    /// Adds every category of `file`; returns the number of new values per category.
    pub fn add_category_file(
        &mut self,
        file: CategoryFile,
    ) -> Result<BTreeMap<String, usize>, StoreError> {
        file.categories
            .into_iter()
            .map(|(name, values)| {
                let added = self.add_feature_category(&file.source, &name, values)?;
                Ok((name, added))
            })
            .collect()
    }

    /// The `n` values of `feature` with the highest total frequency, most frequent first.
    ///
    /// Ties are ordered by value.
    #[must_use]
    pub fn most_frequent_values(&self, feature: &str, n: usize) -> Vec<(String, u64)> {
        let mut totals = BTreeMap::<&str, u64>::new();
        for sentence in self.sentences() {
            for (id, freq) in &sentence.feats {
                let Some(key) = self.features().get(*id) else {
                    continue;
                };
                if key.name == feature {
                    *totals.entry(key.value.as_str()).or_default() += u64::from(*freq);
                }
            }
        }
        let mut totals = totals.into_iter().collect::<Vec<_>>();
        totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        totals
            .into_iter()
            .take(n)
            .map(|(value, freq)| (value.to_owned(), freq))
            .collect()
    }
}
