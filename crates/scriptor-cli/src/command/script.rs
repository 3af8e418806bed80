use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use scriptor_selection::ScriptMetadata;
use scriptor_store::BatchMetadata;
use serde::Serialize;

use crate::util::{self, ExportedSentence, Output};

pub(crate) fn run_list(db_path: &Path) -> anyhow::Result<()> {
    let db = util::open_db(db_path)?;
    let scripts = db.list_scripts().collect::<Vec<_>>();
    if scripts.is_empty() {
        eprintln!("No scripts in db");
        return Ok(());
    }
    Output::save_json(&scripts, None)
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ExportScriptArg {
    /// Scripts to export (all when omitted)
    names: Vec<String>,
    /// Leave out script and batch metadata
    #[arg(long)]
    no_metadata: bool,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ScriptSet<'a> {
    printed: DateTime<Utc>,
    db_name: String,
    stats: BTreeMap<&'static str, usize>,
    scripts: Vec<ExportedScript<'a>>,
}

#[derive(Debug, Serialize)]
struct ExportedScript<'a> {
    name: &'a str,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    script_metadata: Option<ScriptMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_metadata: Option<&'a BatchMetadata>,
    sentences: Vec<ExportedSentence>,
}

pub(crate) fn run_export(db_path: &Path, arg: &ExportScriptArg) -> anyhow::Result<()> {
    let db = util::open_db(db_path)?;
    let names = if arg.names.is_empty() {
        db.list_scripts()
            .map(|m| m.options.script_name.clone())
            .collect()
    } else {
        arg.names.clone()
    };

    let mut scripts = vec![];
    let mut size = 0;
    for name in &names {
        let sentences = db
            .script_sentences(name)?
            .into_iter()
            .map(ExportedSentence::from)
            .collect::<Vec<_>>();
        size += sentences.len();

        let (script_metadata, batch_metadata) = if arg.no_metadata {
            (None, None)
        } else {
            let metadata = db
                .list_scripts()
                .find(|m| m.options.script_name == *name)
                .cloned()
                .map(|mut m| {
                    m.options.debug = false;
                    m
                });
            let from_batch = metadata.as_ref().map(|m| m.options.from_batch.as_str());
            let batch = db.list_batches().find(|b| Some(b.name.as_str()) == from_batch);
            (metadata, batch)
        };
        scripts.push(ExportedScript {
            name: name.as_str(),
            size: sentences.len(),
            script_metadata,
            batch_metadata,
            sentences,
        });
    }

    let set = ScriptSet {
        printed: Utc::now(),
        db_name: util::db_name(&db),
        stats: BTreeMap::from([("size", size), ("scripts", scripts.len())]),
        scripts,
    };
    Output::save_json(&set, arg.output.clone())
}
