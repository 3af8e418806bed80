use crate::{score::ScoreSet, stats::Candidate};

/// Candidates committed together in one selection step.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub candidates: Vec<Candidate>,
    pub score: ScoreSet,
    /// The feature that decided the winning comparison, if any did.
    pub selected_feature: Option<String>,
}

impl Chunk {
    /// Score set, deciding feature and size on one tab-separated line.
    #[must_use]
    pub fn metadata(&self) -> String {
        format!(
            "{}\t{}\t{}",
            self.score,
            self.selected_feature.as_deref().unwrap_or("-"),
            self.candidates.len()
        )
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(Candidate::text)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
