use std::{
    io::Write as _,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use scriptor_store::CategoryFile;
use scriptor_text::{FeatureInfo, available_features};

use crate::util::{self, Output};

pub(crate) fn run_list(db_path: &Path) -> anyhow::Result<()> {
    let db = util::open_db(db_path)?;
    let mut features = available_features();
    features.extend(db.categories().iter().map(|(name, category)| FeatureInfo {
        name: name.clone(),
        desc: format!(
            "{} values of {} in the category",
            category.values.len(),
            category.source
        ),
    }));
    Output::save_json(&features, None)
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AddFeatureCatsArg {
    /// Tab-separated files of `source-feature category value` lines
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

pub(crate) fn run_add(db_path: &Path, arg: &AddFeatureCatsArg) -> anyhow::Result<()> {
    let mut db = util::open_db(db_path)?;
    for path in &arg.files {
        let file = CategoryFile::read(path)?;
        let source = file.source.clone();
        for (name, added) in db.add_category_file(file)? {
            eprintln!("Added {added} values of {source} to category {name}");
        }
    }
    util::save_db(&db)
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GenerateFeatureCatArg {
    /// Source feature, e.g. `bigram`
    #[arg(long)]
    feature: String,
    /// Number of most frequent values to include
    #[arg(long)]
    top: usize,
    /// Category name (defaults to `<feature>_top<top>`)
    #[arg(long)]
    name: Option<String>,
    /// Also write the category as a tab-separated file
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run_generate(db_path: &Path, arg: &GenerateFeatureCatArg) -> anyhow::Result<()> {
    let mut db = util::open_db(db_path)?;
    let name = arg
        .name
        .clone()
        .unwrap_or_else(|| format!("{}_top{}", arg.feature, arg.top));
    let values = db.most_frequent_values(&arg.feature, arg.top);
    if values.is_empty() {
        anyhow::bail!("No values for feature {} in db", arg.feature);
    }
    if values.len() < arg.top {
        tracing::warn!(
            feature = %arg.feature,
            requested = arg.top,
            found = values.len(),
            "fewer values than requested"
        );
    }

    if let Some(path) = &arg.output {
        let mut output = Output::create(Some(path.clone()))?;
        for (value, _) in &values {
            writeln!(output, "{}\t{name}\t{value}", arg.feature)
                .with_context(|| format!("Failed to write to {}", output.target()))?;
        }
        output.finish()?;
    }

    let added =
        db.add_feature_category(&arg.feature, &name, values.into_iter().map(|(value, _)| value))?;
    util::save_db(&db)?;
    eprintln!("Added {added} values of {} to category {name}", arg.feature);
    Ok(())
}
