//! Tokenization and feature extraction for candidate sentences.
//!
//! Every sentence loaded into the database is tokenized once and its feature
//! frequencies (letter n-grams, word transitions, word forms, ...) are stored
//! alongside the text. The selection engine only ever sees these frequencies.
//!
//! ```
//! use scriptor_text::{FEAT_INITIAL_BIGRAM, Sentence};
//!
//! let s = Sentence::compute("Solen skiner.");
//! assert_eq!(s.feats[FEAT_INITIAL_BIGRAM]["so"], 1);
//! ```

use serde::Serialize;

pub use self::sentence::{FeatureMap, Sentence};

pub mod sentence;
pub mod token;

pub const FEAT_BIGRAM: &str = "bigram";
pub const FEAT_TRIGRAM: &str = "trigram";
pub const FEAT_BIGRAM_TRANSITION: &str = "bigram_transition";
pub const FEAT_FINAL_TRIGRAM: &str = "final_trigram";
pub const FEAT_INITIAL_BIGRAM: &str = "initial_bigram";
pub const FEAT_WORD: &str = "word";
pub const FEAT_PUNCT: &str = "punct";

pub const FEAT_COUNT: &str = "count";
pub const FEAT_VAL_WORD_COUNT: &str = "word_count";
pub const FEAT_VAL_DIGIT_COUNT: &str = "digit_count";

/// A feature that can be used for script selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureInfo {
    pub name: String,
    pub desc: String,
}

/// Features produced by [`Sentence::compute`] that make sense as selection criteria.
///
/// Derived categories such as `bigram_top800` are not listed here; they are
/// defined in the database.
#[must_use]
pub fn available_features() -> Vec<FeatureInfo> {
    [
        (FEAT_BIGRAM, "Two-letter combinations"),
        (FEAT_TRIGRAM, "Three-letter combinations"),
        (FEAT_BIGRAM_TRANSITION, "Bigrams in transitions between words"),
        (FEAT_INITIAL_BIGRAM, "Sentence initial bigrams"),
        (FEAT_FINAL_TRIGRAM, "Sentence final trigrams"),
        (FEAT_WORD, "Words"),
    ]
    .into_iter()
    .map(|(name, desc)| FeatureInfo {
        name: name.to_owned(),
        desc: desc.to_owned(),
    })
    .collect()
}
