use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use self::{
    batch::{ExportBatchArg, SampleBatchArg},
    block::BlockSentsArg,
    feature::{AddFeatureCatsArg, GenerateFeatureCatArg},
    load::LoadArg,
    script::ExportScriptArg,
    scriptgen::ScriptgenArg,
};

mod batch;
mod block;
mod feature;
mod load;
mod script;
mod scriptgen;
mod stats;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Database file
    #[arg(long, global = true, default_value = "scriptor.json")]
    db: PathBuf,
    /// Log more detail (repeat for trace output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// What to do
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Load sentences from text files, one sentence per line
    Load(#[clap(flatten)] LoadArg),
    /// Add randomly sampled sentences to a batch
    SampleBatch(#[clap(flatten)] SampleBatchArg),
    /// Generate a script from a JSON config file
    Scriptgen(#[clap(flatten)] ScriptgenArg),
    /// List features available for selection
    ListSelectorFeats,
    /// List batches
    ListBatches,
    /// List scripts
    ListScripts,
    /// Block sentences from future batches and scripts
    BlockSents(#[clap(flatten)] BlockSentsArg),
    /// List blocked sentences
    ListBlocked,
    /// Export scripts as JSON
    ExportScript(#[clap(flatten)] ExportScriptArg),
    /// Export batches as JSON
    ExportBatch(#[clap(flatten)] ExportBatchArg),
    /// Add feature categories from tab-separated files
    AddFeatureCats(#[clap(flatten)] AddFeatureCatsArg),
    /// Create a feature category from the most frequent values of a feature
    GenerateFeatureCat(#[clap(flatten)] GenerateFeatureCatArg),
    /// Print database statistics
    Stats,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_logging(args.verbose);
    let db = args.db.as_path();
    match &args.mode {
        Mode::Load(arg) => load::run(db, arg)?,
        Mode::SampleBatch(arg) => batch::run_sample(db, arg)?,
        Mode::Scriptgen(arg) => scriptgen::run(db, arg)?,
        Mode::ListSelectorFeats => feature::run_list(db)?,
        Mode::ListBatches => batch::run_list(db)?,
        Mode::ListScripts => script::run_list(db)?,
        Mode::BlockSents(arg) => block::run_block(db, arg)?,
        Mode::ListBlocked => block::run_list(db)?,
        Mode::ExportScript(arg) => script::run_export(db, arg)?,
        Mode::ExportBatch(arg) => batch::run_export(db, arg)?,
        Mode::AddFeatureCats(arg) => feature::run_add(db, arg)?,
        Mode::GenerateFeatureCat(arg) => feature::run_generate(db, arg)?,
        Mode::Stats => stats::run(db)?,
    }
    Ok(())
}
