use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Produces the pending transaction records, in the order they should be
/// considered for the block.
pub trait TransactionSource {
    fn pending(&self) -> Result<Vec<Value>>;
}

impl TransactionSource for Vec<Value> {
    fn pending(&self) -> Result<Vec<Value>> {
        Ok(self.clone())
    }
}

/// A directory holding one JSON record per `*.json` file.
///
/// Files are read in file-name order; other entries are ignored.
#[derive(Debug, Clone)]
pub struct MempoolDir {
    path: PathBuf,
}

impl MempoolDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record_files(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.path).map_err(|e| Error::io(&self.path, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::io(&self.path, e))?.path();
            if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl TransactionSource for MempoolDir {
    fn pending(&self) -> Result<Vec<Value>> {
        let files = self.record_files()?;
        let mut records = Vec::with_capacity(files.len());
        for path in files {
            let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
            let record = serde_json::from_slice(&bytes).map_err(|source| Error::Decode {
                path: path.clone(),
                source,
            })?;
            records.push(record);
        }
        tracing::info!(dir = %self.path.display(), records = records.len(), "loaded mempool");
        Ok(records)
    }
}
