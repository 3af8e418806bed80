//! Interning of `(feature, value)` pairs.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

pub type FeatureId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureKey {
    pub name: String,
    pub value: String,
}

/// Maps feature values to compact ids.
///
/// Ids are dense and assigned in insertion order. The cache is serialized as
/// the list of interned keys; the reverse index is rebuilt on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<FeatureKey>", into = "Vec<FeatureKey>")]
pub struct FeatureCache {
    keys: Vec<FeatureKey>,
    index: HashMap<FeatureKey, FeatureId>,
}

impl From<Vec<FeatureKey>> for FeatureCache {
    fn from(keys: Vec<FeatureKey>) -> Self {
        let index = keys
            .iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), to_id(i)))
            .collect();
        Self { keys, index }
    }
}

impl From<FeatureCache> for Vec<FeatureKey> {
    fn from(cache: FeatureCache) -> Self {
        cache.keys
    }
}

fn to_id(i: usize) -> FeatureId {
    FeatureId::try_from(i).expect("feature id space exhausted")
}

impl FeatureCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str, value: &str) -> FeatureId {
        let key = FeatureKey {
            name: name.to_owned(),
            value: value.to_owned(),
        };
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let id = to_id(self.keys.len());
        self.keys.push(key.clone());
        self.index.insert(key, id);
        id
    }

    /// Interns every value of `feats`, keeping the frequencies.
    pub fn intern_all(
        &mut self,
        feats: &BTreeMap<String, BTreeMap<String, u32>>,
    ) -> BTreeMap<FeatureId, u32> {
        feats
            .iter()
            .flat_map(|(name, m)| m.iter().map(move |(value, freq)| (name, value, *freq)))
            .map(|(name, value, freq)| (self.intern(name, value), freq))
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: FeatureId) -> Option<&FeatureKey> {
        self.keys.get(usize::try_from(id).ok()?)
    }

    #[must_use]
    pub fn lookup(&self, name: &str, value: &str) -> Option<FeatureId> {
        let key = FeatureKey {
            name: name.to_owned(),
            value: value.to_owned(),
        };
        self.index.get(&key).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of distinct values interned for feature `name`.
    #[must_use]
    pub fn count_values(&self, name: &str) -> usize {
        self.keys.iter().filter(|key| key.name == name).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let mut cache = FeatureCache::new();
        let a = cache.intern("word", "apa");
        let b = cache.intern("bigram", "ap");
        assert_eq!(cache.intern("word", "apa"), a);
        assert_ne!(a, b);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup("bigram", "ap"), Some(b));
        assert_eq!(cache.lookup("bigram", "pa"), None);
        assert_eq!(cache.get(b).map(|k| k.value.as_str()), Some("ap"));
        assert_eq!(cache.count_values("word"), 1);
    }

    #[test]
    fn test_index_survives_serialization() {
        let mut cache = FeatureCache::new();
        cache.intern("word", "apa");
        let id = cache.intern("word", "bil");
        let json = serde_json::to_string(&cache).unwrap();
        assert_eq!(
            json,
            r#"[{"name":"word","value":"apa"},{"name":"word","value":"bil"}]"#
        );
        let mut restored: FeatureCache = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.lookup("word", "bil"), Some(id));
        assert_eq!(restored.intern("word", "bil"), id);
        assert_eq!(restored.len(), 2);
    }
}
