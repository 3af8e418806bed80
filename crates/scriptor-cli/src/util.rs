use std::{
    fs::File,
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use scriptor_selection::{SentenceId, Stats};
use scriptor_store::{Database, StoredSentence};
use serde::Serialize;

/// Where command output goes: stdout, or a file when a path is given.
#[derive(Debug)]
pub enum Output {
    Stdout(StdoutLock<'static>),
    File { writer: BufWriter<File>, path: PathBuf },
}

impl Output {
    pub fn save_json<T>(value: &T, path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: Serialize + ?Sized,
    {
        let mut output = Output::create(path)?;
        serde_json::to_writer_pretty(&mut output, value)
            .with_context(|| format!("Failed to write JSON to {}", output.target()))?;
        writeln!(output).with_context(|| format!("Failed to write to {}", output.target()))?;
        output.finish()
    }

    pub fn create(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Output::Stdout(io::stdout().lock()));
        };
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn target(&self) -> String {
        match self {
            Output::Stdout(_) => "stdout".to_owned(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn finish(&mut self) -> anyhow::Result<()> {
        self.flush()
            .with_context(|| format!("Failed to flush output to {}", self.target()))
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(writer) => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(writer) => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;
    Ok(value)
}

pub fn open_db(path: &Path) -> anyhow::Result<Database> {
    Database::open(path).with_context(|| format!("Failed to open database: {}", path.display()))
}

pub fn save_db(db: &Database) -> anyhow::Result<()> {
    db.save()
        .with_context(|| format!("Failed to save database: {}", db.path().display()))
}

/// A sentence as exported, without its features.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedSentence {
    pub id: SentenceId,
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    /// Feature values not covered by earlier scripts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub novel: Option<Stats>,
}

impl ExportedSentence {
    #[must_use]
    pub fn with_novel(self, novel: Stats) -> Self {
        Self {
            novel: Some(novel),
            ..self
        }
    }
}

impl From<&StoredSentence> for ExportedSentence {
    fn from(s: &StoredSentence) -> Self {
        Self {
            id: s.id,
            text: s.text.clone(),
            source: s.source.clone(),
            novel: None,
        }
    }
}

/// Database file name as shown in exports.
pub fn db_name(db: &Database) -> String {
    db.path()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, fs};

    use scriptor_selection::{FeatureOpt, FreqMap};

    use super::*;

    #[test]
    fn test_save_json_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        Output::save_json(&[1, 2, 3], Some(path.clone())).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("]\n"));
        let values: Vec<u32> = read_json_file("output", &path).unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_exported_sentence_novel_field() {
        let plain = ExportedSentence {
            id: SentenceId(3),
            text: "Solen skiner.".to_owned(),
            source: String::new(),
            novel: None,
        };
        let json = serde_json::to_value(&plain).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 3, "text": "Solen skiner." }));

        let features = [FeatureOpt::new("word", 0)];
        let feats = BTreeMap::from([("word".to_owned(), FreqMap::from([("solen".to_owned(), 1)]))]);
        let json = serde_json::to_value(plain.with_novel(Stats::from_features(&features, &feats)))
            .unwrap();
        assert_eq!(json["novel"], serde_json::json!({ "word": { "solen": 1 } }));
    }
}
