use std::{collections::BTreeMap, path::{Path, PathBuf}};

use anyhow::Context;
use chrono::{DateTime, Utc};
use rand::SeedableRng as _;
use rand_pcg::Pcg32;
use scriptor_selection::default_feature_opts;
use scriptor_store::BatchMetadata;
use serde::Serialize;

use crate::util::{self, ExportedSentence, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SampleBatchArg {
    /// Batch name
    #[arg(long)]
    name: String,
    /// Number of sentences to add
    #[arg(long)]
    size: usize,
    /// Random seed
    #[arg(long)]
    seed: Option<u64>,
}

pub(crate) fn run_sample(db_path: &Path, arg: &SampleBatchArg) -> anyhow::Result<()> {
    let mut db = util::open_db(db_path)?;
    let mut rng = match arg.seed {
        Some(seed) => Pcg32::seed_from_u64(seed),
        None => Pcg32::from_rng(&mut rand::rng()),
    };
    let added = db.sample_batch(&arg.name, arg.size, arg.seed, &mut rng);
    util::save_db(&db)?;
    if added < arg.size {
        eprintln!(
            "Added {added} sentences to batch {} ({} requested, no more available)",
            arg.name, arg.size
        );
    } else {
        eprintln!("Added {added} sentences to batch {}", arg.name);
    }
    Ok(())
}

pub(crate) fn run_list(db_path: &Path) -> anyhow::Result<()> {
    let db = util::open_db(db_path)?;
    let batches = db.list_batches().collect::<Vec<_>>();
    if batches.is_empty() {
        eprintln!("No batches in db");
        return Ok(());
    }
    Output::save_json(&batches, None)
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ExportBatchArg {
    /// Batches to export (all when omitted)
    names: Vec<String>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
    /// Attach to each sentence the default selection features not covered by
    /// these scripts; their sentences are left out
    #[arg(long = "novel-against", value_name = "SCRIPT")]
    novel_against: Vec<String>,
}

#[derive(Debug, Serialize)]
struct BatchSet<'a> {
    printed: DateTime<Utc>,
    db_name: String,
    stats: BTreeMap<&'static str, usize>,
    batches: Vec<ExportedBatch<'a>>,
}

#[derive(Debug, Serialize)]
struct ExportedBatch<'a> {
    metadata: &'a BatchMetadata,
    sentences: Vec<ExportedSentence>,
}

pub(crate) fn run_export(db_path: &Path, arg: &ExportBatchArg) -> anyhow::Result<()> {
    let db = util::open_db(db_path)?;
    let names = if arg.names.is_empty() {
        db.list_batches().map(|m| m.name.clone()).collect()
    } else {
        arg.names.clone()
    };

    let mut batches = vec![];
    let mut size = 0;
    for name in &names {
        let metadata = db
            .list_batches()
            .find(|m| m.name == *name)
            .with_context(|| format!("No such batch: {name}"))?;
        let sentences = if arg.novel_against.is_empty() {
            db.batch_sentences(name)?
                .into_iter()
                .map(ExportedSentence::from)
                .collect::<Vec<_>>()
        } else {
            db.novel_batch_candidates(name, &arg.novel_against, &default_feature_opts())?
                .into_iter()
                .filter_map(|c| {
                    let sentence = db.sentence(c.id())?;
                    Some(ExportedSentence::from(sentence).with_novel(c.stats().clone()))
                })
                .collect::<Vec<_>>()
        };
        size += sentences.len();
        batches.push(ExportedBatch {
            metadata,
            sentences,
        });
    }

    let set = BatchSet {
        printed: Utc::now(),
        db_name: util::db_name(&db),
        stats: BTreeMap::from([("size", size), ("batches", batches.len())]),
        batches,
    };
    Output::save_json(&set, arg.output.clone())
}
