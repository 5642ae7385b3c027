//! Per-bill filesystem layout and JSON artifact persistence.
//!
//! Every pipeline stage hands its output off to the next purely through
//! files under `bills/{id}/` (spec.md §3 "Lifecycle", §6 "Filesystem"). This
//! crate is the only place that knows the directory layout.

use std::path::{Path, PathBuf};

use billtrace_models::BillId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode JSON from {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode JSON for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Resolves every artifact path under a bill's directory, per spec.md §6.
#[derive(Debug, Clone)]
pub struct BillPaths {
    root: PathBuf,
}

impl BillPaths {
    pub fn new(bills_root: impl AsRef<Path>, bill: &BillId) -> Self {
        Self {
            root: bills_root.as_ref().join(bill.canonical()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stage1_output(&self, bill: &BillId) -> PathBuf {
        self.root.join(format!("{}.json", bill.canonical()))
    }

    pub fn chronology_output(&self, bill: &BillId) -> PathBuf {
        self.root
            .join(format!("{}_chronological.json", bill.canonical()))
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.root.join("documents")
    }

    pub fn document_text(&self, document_name: &str) -> PathBuf {
        self.documents_dir().join(format!("{document_name}.txt"))
    }

    pub fn numbers(&self) -> PathBuf {
        self.root.join("numbers.json")
    }

    pub fn notes_dir(&self) -> PathBuf {
        self.root.join("notes")
    }

    pub fn note_body(&self, checkpoint_document: &str) -> PathBuf {
        self.notes_dir().join(format!("{checkpoint_document}.json"))
    }

    pub fn note_metadata(&self, checkpoint_document: &str) -> PathBuf {
        self.notes_dir()
            .join(format!("{checkpoint_document}_metadata.json"))
    }

    pub fn document_mapping(&self) -> PathBuf {
        self.root.join("document_mapping.json")
    }

    pub fn changes(&self) -> PathBuf {
        self.root.join("changes.json")
    }

    pub fn retrieval_log(&self) -> PathBuf {
        self.root.join("retrieval_log.json")
    }
}

/// Creates the bill's root and `documents`/`notes` subdirectories if absent.
pub async fn ensure_bill_dirs(paths: &BillPaths) -> Result<(), Error> {
    for dir in [paths.root(), &paths.documents_dir(), &paths.notes_dir()] {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| Error::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}

/// Reads and decodes a JSON artifact. Returns `Ok(None)` if the file does
/// not exist yet, so stages can detect "prior stage hasn't run" without a
/// separate existence check.
pub async fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, Error> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes).map_err(|source| Error::Decode {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Some(value))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes a JSON artifact atomically: serialize to a temp file in the
/// target's parent directory, then rename over the destination, so a
/// concurrent reader never observes a partially written file.
pub async fn write_json_atomic<T: serde::Serialize>(
    path: &Path,
    value: &T,
) -> Result<(), Error> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|source| Error::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;

    let encoded = serde_json::to_vec_pretty(value).map_err(|source| Error::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("artifact")
    ));
    tokio::fs::write(&tmp_path, &encoded)
        .await
        .map_err(|source| Error::Write {
            path: tmp_path.clone(),
            source,
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(())
}

/// Writes plain text (a document's extracted body), UTF-8, LF-terminated,
/// per spec.md §4.4.
pub async fn write_text(path: &Path, text: &str) -> Result<(), Error> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|source| Error::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    let normalized = text.replace("\r\n", "\n");
    tokio::fs::write(path, normalized.as_bytes())
        .await
        .map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use billtrace_models::Chamber;

    #[tokio::test]
    async fn write_then_read_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let bill = BillId::new(Chamber::House, 999, 2025);
        let paths = BillPaths::new(dir.path(), &bill);
        ensure_bill_dirs(&paths).await.unwrap();

        let value = vec!["a".to_string(), "b".to_string()];
        write_json_atomic(&paths.numbers(), &value).await.unwrap();

        let read_back: Option<Vec<String>> = read_json(&paths.numbers()).await.unwrap();
        assert_eq!(read_back, Some(value));
    }

    #[tokio::test]
    async fn read_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let value: Option<serde_json::Value> = read_json(&missing).await.unwrap();
        assert!(value.is_none());
    }
}
