use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::blockchain::{BlockHeader, MinedBlock};
use crate::canonical;
use crate::error::{Error, Result};
use crate::tx::Transaction;

/// Rendered as the header line, the coinbase record, then one txid per line,
/// coinbase first.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub header: BlockHeader,
    pub coinbase: Transaction,
    pub txids: Vec<String>,
}

impl Report {
    pub fn from_block(block: &MinedBlock) -> Self {
        Self {
            header: block.header(),
            coinbase: block.template.coinbase().clone(),
            txids: block.template.txids(),
        }
    }

    pub fn render(&self) -> Result<String> {
        let mut out = canonical::to_string(&self.header)?;
        out.push('\n');
        out.push_str(&canonical::to_string(&self.coinbase)?);
        out.push('\n');
        for txid in &self.txids {
            out.push_str(txid);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Persists a finished report.
pub trait ReportSink {
    fn write_report(&mut self, report: &Report) -> Result<()>;
}

impl ReportSink for Vec<u8> {
    fn write_report(&mut self, report: &Report) -> Result<()> {
        let text = report.render()?;
        self.write_all(text.as_bytes())
            .map_err(|e| Error::io("<memory>", e))
    }
}

/// Writes the report to a file.
///
/// The text goes to a sibling `.tmp` file first and is renamed into place,
/// so the target path never holds a partial report.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ReportSink for FileSink {
    fn write_report(&mut self, report: &Report) -> Result<()> {
        let text = report.render()?;
        let staging = self.staging_path();
        {
            let mut file = fs::File::create(&staging).map_err(|e| Error::io(&staging, e))?;
            file.write_all(text.as_bytes()).map_err(|e| Error::io(&staging, e))?;
            file.sync_all().map_err(|e| Error::io(&staging, e))?;
        }
        if let Err(e) = fs::rename(&staging, &self.path) {
            let _ = fs::remove_file(&staging);
            return Err(Error::io(&self.path, e));
        }
        tracing::info!(path = %self.path.display(), txs = report.txids.len(), "wrote report");
        Ok(())
    }
}
