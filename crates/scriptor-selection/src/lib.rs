//! Greedy selection of sentences that maximize feature coverage.
//!
//! A [`Selector`] holds a corpus of [`Candidate`] sentences and moves them one
//! step at a time into a selection, picking whatever adds the most novel
//! feature values relative to what has already been selected. Two search
//! strategies are available, see [`Mode`].

pub use self::{chunk::*, coverage::*, options::*, score::*, selector::*, source::*, stats::*};

pub mod chunk;
pub mod coverage;
mod exhaustive;
pub mod options;
mod pool;
mod random;
pub mod score;
pub mod selector;
pub mod source;
pub mod stats;

#[cfg(test)]
mod testing;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum SelectError {
    #[display("cannot select {requested} sentences from a corpus of {available}")]
    CorpusTooSmall { requested: usize, available: usize },
}
