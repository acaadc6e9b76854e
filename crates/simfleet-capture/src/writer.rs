//! Record writer for capture output files.
//!
//! Each `write` awaits the destination before returning, so a slow disk
//! slows the stream reader instead of growing an in-memory queue. JSON
//! output tracks bracket and comma placement so the file is a valid array
//! once closed, including the zero-record case.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use simfleet_core::CaptureFormat;

use crate::error::{CaptureError, CaptureResult};

pub struct RecordWriter {
    path: PathBuf,
    format: CaptureFormat,
    out: BufWriter<File>,
    records: u64,
    /// Flush after every record so readers tailing the file see it.
    flush_each: bool,
}

impl RecordWriter {
    /// Create (or truncate) `path`, creating parent directories.
    pub async fn create(path: &Path, format: CaptureFormat, flush_each: bool) -> CaptureResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| CaptureError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let file = File::create(path).await.map_err(|source| CaptureError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            format,
            out: BufWriter::new(file),
            records: 0,
            flush_each,
        })
    }

    #[cfg(test)]
    pub(crate) fn records(&self) -> u64 {
        self.records
    }

    pub async fn write(&mut self, record: &Value) -> CaptureResult<()> {
        let payload = record.to_string();
        let chunk = match self.format {
            CaptureFormat::Jsonl => format!("{payload}\n"),
            CaptureFormat::Json if self.records == 0 => format!("[\n  {payload}"),
            CaptureFormat::Json => format!(",\n  {payload}"),
        };
        self.put(chunk.as_bytes()).await?;
        self.records += 1;
        if self.flush_each {
            self.out.flush().await.map_err(|source| self.write_error(source))?;
        }
        Ok(())
    }

    /// Finish the file and flush it to disk.
    pub async fn close(mut self) -> CaptureResult<()> {
        if self.format == CaptureFormat::Json {
            let tail: &[u8] = if self.records == 0 { b"[]\n" } else { b"\n]\n" };
            self.put(tail).await?;
        }
        self.out.flush().await.map_err(|source| self.write_error(source))?;
        self.out
            .shutdown()
            .await
            .map_err(|source| self.write_error(source))
    }

    async fn put(&mut self, bytes: &[u8]) -> CaptureResult<()> {
        self.out
            .write_all(bytes)
            .await
            .map_err(|source| self.write_error(source))
    }

    fn write_error(&self, source: std::io::Error) -> CaptureError {
        CaptureError::Write {
            path: self.path.clone(),
            source,
        }
    }
}
