//! JSON-file storage for sentences, batches and scripts.

use std::{io, path::PathBuf};

use scriptor_selection::SentenceId;

pub use self::{cache::*, category::*, database::*};

pub mod cache;
pub mod category;
pub mod database;
mod source;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum StoreError {
    #[display("failed to access {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to parse {}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("mixed source features {first} and {second} in {}", path.display())]
    MixedSourceFeatures {
        path: PathBuf,
        first: String,
        second: String,
    },
    #[display("category {category} is derived from {existing}, not {requested}")]
    CategorySourceMismatch {
        category: String,
        existing: String,
        requested: String,
    },
    #[display("unknown batch: {name}")]
    UnknownBatch { name: String },
    #[display("unknown script: {name}")]
    UnknownScript { name: String },
    #[display("script already exists: {name}")]
    DuplicateScript { name: String },
    #[display("unknown sentence id: {id}")]
    UnknownSentence { id: SentenceId },
}
