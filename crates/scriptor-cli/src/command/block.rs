use std::path::Path;

use scriptor_selection::SentenceId;

use crate::util::{self, ExportedSentence, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct BlockSentsArg {
    /// Ids of the sentences to block
    #[arg(required = true)]
    ids: Vec<SentenceId>,
}

pub(crate) fn run_block(db_path: &Path, arg: &BlockSentsArg) -> anyhow::Result<()> {
    let mut db = util::open_db(db_path)?;
    let n = db.block_sentences(&arg.ids)?;
    util::save_db(&db)?;
    eprintln!("Blocked {n} sentences");
    Ok(())
}

pub(crate) fn run_list(db_path: &Path) -> anyhow::Result<()> {
    let db = util::open_db(db_path)?;
    let sentences = db
        .blocked_sentences()
        .map(ExportedSentence::from)
        .collect::<Vec<_>>();
    Output::save_json(&sentences, None)
}
