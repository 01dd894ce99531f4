//! Fine-tuning training data built from source files

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::index::SourceFile;

/// System message used when asking a fine-tuned model
pub const FINE_TUNED_PREAMBLE: &str =
    "You are a programming teacher. The user will ask questions about code; answer them.";

/// One prompt/completion pair of the JSONL training file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub prompt: String,
    pub completion: String,
}

impl TrainingRecord {
    pub fn for_file(file: &SourceFile) -> Self {
        Self {
            prompt: format!("What is in the file {}?", file.path.display()),
            completion: file.body.clone(),
        }
    }
}

pub fn build_training_records(files: &[SourceFile]) -> Vec<TrainingRecord> {
    files.iter().map(TrainingRecord::for_file).collect()
}

/// Render records as JSON lines.
pub fn to_jsonl(records: &[TrainingRecord]) -> Result<String> {
    let lines = records
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to serialize training record")?;
    Ok(lines.join("\n"))
}

/// Write the training file for `files` to `path`.
pub fn write_training_file(path: &Path, files: &[SourceFile]) -> Result<usize> {
    let records = build_training_records(files);
    let content = to_jsonl(&records)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write training file {:?}", path))?;

    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_record_escapes_body() {
        let file = SourceFile::new(
            PathBuf::from("src/lib.rs"),
            "fn main() {\n\tprintln!(\"hi \\ there\");\n}\n",
        );
        let jsonl = to_jsonl(&[TrainingRecord::for_file(&file)]).unwrap();

        assert!(!jsonl.contains('\n'));
        let parsed: TrainingRecord = serde_json::from_str(&jsonl).unwrap();
        assert_eq!(parsed.prompt, "What is in the file src/lib.rs?");
        assert_eq!(parsed.completion, file.body);
    }

    #[test]
    fn test_write_training_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("train.jsonl");
        let files = vec![
            SourceFile::new(PathBuf::from("a.rs"), "a"),
            SourceFile::new(PathBuf::from("b.rs"), "b"),
        ];

        let written = write_training_file(&path, &files).unwrap();
        assert_eq!(written, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
