use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    FEAT_BIGRAM, FEAT_BIGRAM_TRANSITION, FEAT_COUNT, FEAT_FINAL_TRIGRAM, FEAT_INITIAL_BIGRAM,
    FEAT_TRIGRAM, FEAT_VAL_DIGIT_COUNT, FEAT_VAL_WORD_COUNT, FEAT_WORD,
    token::{CharClass, Token, tokenize},
};

/// Feature name → feature value → frequency.
pub type FeatureMap = BTreeMap<String, BTreeMap<String, u32>>;

/// A sentence together with the feature frequencies extracted from its text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub feats: FeatureMap,
}

impl Sentence {
    /// Tokenizes `text` and computes all features for it.
    #[must_use]
    pub fn compute(text: &str) -> Self {
        let mut res = Self {
            text: text.to_owned(),
            ..Self::default()
        };
        let tokens = tokenize(text);

        for t in &tokens {
            match t.class {
                CharClass::Space => {}
                CharClass::Letter => res.add_feat(FEAT_WORD, &t.lowercase()),
                class => res.add_feat(&class.to_string(), &t.lowercase()),
            }
        }
        for transition in bigram_transitions(&tokens) {
            res.add_feat(FEAT_BIGRAM_TRANSITION, &transition);
        }
        for bigram in ngrams(&tokens, 2) {
            res.add_feat(FEAT_BIGRAM, &bigram);
        }
        for trigram in ngrams(&tokens, 3) {
            res.add_feat(FEAT_TRIGRAM, &trigram);
        }
        if let Some(bigram) = initial_ngram(&tokens, 2) {
            res.add_feat(FEAT_INITIAL_BIGRAM, &bigram);
        }
        if let Some(trigram) = final_ngram(&tokens, 3) {
            res.add_feat(FEAT_FINAL_TRIGRAM, &trigram);
        }

        let n_words = res.total(FEAT_WORD);
        res.set_feat(FEAT_COUNT, FEAT_VAL_WORD_COUNT, n_words);
        let n_digits = res.total(&CharClass::Digit.to_string());
        res.set_feat(FEAT_COUNT, FEAT_VAL_DIGIT_COUNT, n_digits);

        res
    }

    /// Increments the frequency of `value` under feature `name`.
    pub fn add_feat(&mut self, name: &str, value: &str) {
        *self
            .feats
            .entry(name.trim().to_owned())
            .or_default()
            .entry(value.trim().to_owned())
            .or_default() += 1;
    }

    /// Sets the frequency of `value` under feature `name`.
    pub fn set_feat(&mut self, name: &str, value: &str, freq: u32) {
        self.feats
            .entry(name.trim().to_owned())
            .or_default()
            .insert(value.trim().to_owned(), freq);
    }

    /// Sum of all frequencies recorded for feature `name`.
    #[must_use]
    pub fn total(&self, name: &str) -> u32 {
        self.feats.get(name).map_or(0, |m| m.values().sum())
    }
}

fn lowercase_letters(tokens: &[Token]) -> Vec<char> {
    tokens
        .iter()
        .filter(|t| t.class.is_letter())
        .flat_map(|t| t.lowercase().chars().collect::<Vec<_>>())
        .collect()
}

/// Last letter of a word followed by the first letter of the next word, e.g. `"n e"`.
#[must_use]
pub fn bigram_transitions(tokens: &[Token]) -> Vec<String> {
    let mut res = vec![];
    let mut prev: Option<&Token> = None;
    for t in tokens.iter().filter(|t| !t.class.is_space()) {
        let pair = prev
            .filter(|p| p.class.is_letter() && t.class.is_letter())
            .and_then(|p| p.text.chars().last().zip(t.text.chars().next()));
        if let Some((last, first)) = pair {
            res.push(format!("{last} {first}").to_lowercase());
        }
        prev = Some(t);
    }
    res
}

fn char_ngrams(chars: &[char], n: usize) -> impl Iterator<Item = String> + '_ {
    chars.windows(n).map(|w| w.iter().collect())
}

/// Character n-grams over runs of letters.
///
/// Consecutive words are joined; a run ends at any token that is neither a
/// letter nor a space, and at the end of the sentence.
#[must_use]
pub fn ngrams(tokens: &[Token], n: usize) -> Vec<String> {
    let mut res = vec![];
    let mut run: Vec<char> = vec![];
    for t in tokens {
        match t.class {
            CharClass::Space => {}
            CharClass::Letter => run.extend(t.lowercase().chars()),
            _ => {
                res.extend(char_ngrams(&run, n));
                run.clear();
            }
        }
    }
    res.extend(char_ngrams(&run, n));
    res
}

/// The first `n` letters of the sentence, ignoring everything but letters.
#[must_use]
pub fn initial_ngram(tokens: &[Token], n: usize) -> Option<String> {
    let letters = lowercase_letters(tokens);
    (letters.len() >= n).then(|| letters[..n].iter().collect())
}

/// The last `n` letters of the sentence, ignoring everything but letters.
#[must_use]
pub fn final_ngram(tokens: &[Token], n: usize) -> Option<String> {
    let letters = lowercase_letters(tokens);
    (letters.len() >= n).then(|| letters[letters.len() - n..].iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FEAT_PUNCT;

    #[test]
    fn test_words_and_punct() {
        let s = Sentence::compute("Four tokens?");
        assert_eq!(s.feats[FEAT_PUNCT].len(), 1);
        assert_eq!(s.feats[FEAT_WORD].len(), 2);
        assert_eq!(s.feats[FEAT_WORD]["four"], 1);

        let s = Sentence::compute("Six six tokens!");
        assert_eq!(s.feats[FEAT_WORD].len(), 2);
        assert_eq!(s.feats[FEAT_WORD]["six"], 2);

        let s = Sentence::compute("Seven seven tokens!!");
        assert_eq!(s.feats[FEAT_PUNCT]["!"], 2);
        assert_eq!(s.feats[FEAT_WORD]["seven"], 2);
    }

    #[test]
    fn test_counts() {
        let s = Sentence::compute("Det var 12 katter och 3 hundar.");
        assert_eq!(s.feats[FEAT_COUNT][FEAT_VAL_WORD_COUNT], 5);
        assert_eq!(s.feats[FEAT_COUNT][FEAT_VAL_DIGIT_COUNT], 2);
    }

    #[test]
    fn test_initial_and_final() {
        let s = Sentence::compute("Vintern kommer snart, erkände Thomas.");
        assert_eq!(s.feats[FEAT_INITIAL_BIGRAM]["vi"], 1);
        assert_eq!(s.feats[FEAT_FINAL_TRIGRAM]["mas"], 1);

        let s = Sentence::compute("sommaren slutar, nu!");
        assert_eq!(s.feats[FEAT_FINAL_TRIGRAM]["rnu"], 1);
    }

    #[test]
    fn test_too_short_for_ngrams() {
        let s = Sentence::compute("I.");
        assert!(!s.feats.contains_key(FEAT_INITIAL_BIGRAM));
        assert!(!s.feats.contains_key(FEAT_FINAL_TRIGRAM));
        assert!(!s.feats.contains_key(FEAT_BIGRAM));
    }

    #[test]
    fn test_bigram_transitions() {
        let tokens = tokenize("Solen skiner, Anna.");
        assert_eq!(bigram_transitions(&tokens), vec!["n s".to_owned()]);
    }

    #[test]
    fn test_ngrams_join_words_and_break_on_punct() {
        let tokens = tokenize("ab cd, ef");
        assert_eq!(ngrams(&tokens, 2), vec!["ab", "bc", "cd", "ef"]);
        assert_eq!(ngrams(&tokens, 3), vec!["abc", "bcd"]);
    }

    #[test]
    fn test_serde_omits_empty_fields() {
        let s = Sentence {
            text: "Hej.".to_owned(),
            ..Sentence::default()
        };
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"{"text":"Hej."}"#);
    }
}
