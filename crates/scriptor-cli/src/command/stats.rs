use std::path::Path;

use crate::util::{self, Output};

pub(crate) fn run(db_path: &Path) -> anyhow::Result<()> {
    let db = util::open_db(db_path)?;
    Output::save_json(&db.stats(), None)
}
