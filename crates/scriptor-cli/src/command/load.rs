use std::{
    fs::File,
    io::{BufRead as _, BufReader},
    path::{Path, PathBuf},
};

use anyhow::Context;
use scriptor_text::Sentence;

use crate::util;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct LoadArg {
    /// Text files with one sentence per line
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Source label stored with each sentence (defaults to the file path)
    #[arg(long)]
    source: Option<String>,
}

pub(crate) fn run(db_path: &Path, arg: &LoadArg) -> anyhow::Result<()> {
    let mut db = util::open_db(db_path)?;
    let mut inserted = 0;
    let mut duplicates = 0;
    for path in &arg.files {
        let file = File::open(path)
            .with_context(|| format!("Failed to open text file: {}", path.display()))?;
        let source = arg
            .source
            .clone()
            .unwrap_or_else(|| path.display().to_string());
        for line in BufReader::new(file).lines() {
            let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            let mut sentence = Sentence::compute(text);
            sentence.source.clone_from(&source);
            if db.insert_sentence(&sentence).1 {
                inserted += 1;
            } else {
                duplicates += 1;
            }
        }
        tracing::info!(path = %path.display(), inserted, "loaded text file");
    }
    util::save_db(&db)?;
    eprintln!("Loaded {inserted} sentences ({duplicates} duplicates skipped)");
    Ok(())
}
