use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use scriptor_selection::{Selector, SelectorOptions};
use scriptor_store::StoreError;
use serde::{Deserialize, Serialize};

use crate::util;

/// Script generation config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) description: String,
    /// Delete an existing script of the same name first
    #[serde(default)]
    pub(crate) clear_scripts: bool,
    pub(crate) selector: SelectorOptions,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ScriptgenArg {
    /// JSON config file
    config: PathBuf,
    /// Random seed, overriding the one in the config
    #[arg(long)]
    seed: Option<u64>,
    /// Print each selected sentence to stdout
    #[arg(long)]
    print: bool,
}

pub(crate) fn run(db_path: &Path, arg: &ScriptgenArg) -> anyhow::Result<()> {
    let mut config: Config = util::read_json_file("config", &arg.config)?;
    if arg.seed.is_some() {
        config.selector.seed = arg.seed;
    }
    let opts = &config.selector;
    let mut db = util::open_db(db_path)?;

    if config.clear_scripts {
        match db.delete_script(&opts.script_name) {
            Ok(_) => eprintln!("Cleared script {}", opts.script_name),
            Err(StoreError::UnknownScript { .. }) => {}
            Err(e) => return Err(e.into()),
        }
    } else if db
        .list_scripts()
        .any(|m| m.options.script_name == opts.script_name)
    {
        anyhow::bail!(
            "Script {} already exists (set clear_scripts to replace it)",
            opts.script_name
        );
    }

    let mut selector = Selector::new(opts.clone()).context("Invalid selector options")?;
    selector
        .init(&db)
        .with_context(|| format!("Failed to load batch {}", opts.from_batch))?;
    if selector.corpus().is_empty() {
        anyhow::bail!("Cannot run selection on an empty corpus");
    }

    eprintln!(
        "Selecting up to {} sentences from batch {} into script {}",
        opts.target_size, opts.from_batch, opts.script_name
    );
    let summary = selector.run(|s, report| {
        tracing::info!(
            selected = s.selection().len(),
            target = s.options().target_size,
            corpus_left = s.corpus().len(),
            chunk = %report.chunk.metadata(),
            "selected"
        );
        if arg.print {
            for text in report.chunk.texts() {
                println!("{text}");
            }
        }
    })?;
    eprintln!(
        "Selection completed at {} sentences ({})",
        summary.selected, summary.reason
    );

    let metadata = selector
        .persist(&mut db, Utc::now())
        .with_context(|| format!("Failed to save script {}", opts.script_name))?;
    util::save_db(&db)?;

    eprintln!();
    eprintln!("=== SCRIPT COMPLETED ===");
    if !config.description.is_empty() {
        eprintln!("Description: {}", config.description);
    }
    eprintln!("Name: {}", opts.script_name);
    eprintln!("Target size: {}", opts.target_size);
    eprintln!("Input size: {}", metadata.input_size);
    eprintln!("Output size: {}", metadata.output_size);
    eprintln!("Timestamp: {}", metadata.timestamp.format("%Y-%m-%d %H:%M:%S"));
    eprintln!();
    eprintln!("=== COVERAGE ===");
    eprint!("{}", selector.coverage());
    Ok(())
}
