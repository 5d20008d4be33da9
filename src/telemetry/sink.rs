use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use csv::{Writer, WriterBuilder};
use log::debug;

use super::TelemetryRecord;

/// Destination for accepted telemetry records.
pub trait TelemetrySink: Send {
    /// Appends one record.
    fn record(&mut self, entry: &TelemetryRecord) -> io::Result<()>;

    /// Discards everything recorded so far.
    fn clear(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Appends records as CSV rows to a file.
///
/// No header row is written, so a file may accumulate records across runs.
/// Columns follow [COLUMNS](super::COLUMNS). A status containing a comma or quote
/// is quoted.
pub struct CsvTelemetrySink {
    path: PathBuf,
    writer: Writer<File>,
}

impl CsvTelemetrySink {
    /// Opens `path` for appending, creating it if needed. With `truncate` the file
    /// is emptied first.
    pub fn create(path: impl AsRef<Path>, truncate: bool) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open(&path, truncate)?;
        debug!("telemetry log opened at {}", path.display());

        Ok(CsvTelemetrySink {
            path,
            writer: csv_writer(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn csv_writer(file: File) -> Writer<File> {
    WriterBuilder::new().has_headers(false).from_writer(file)
}

fn open(path: &Path, truncate: bool) -> io::Result<File> {
    if truncate {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
    } else {
        OpenOptions::new().append(true).create(true).open(path)
    }
}

impl TelemetrySink for CsvTelemetrySink {
    fn record(&mut self, entry: &TelemetryRecord) -> io::Result<()> {
        self.writer.serialize(entry)?;
        // Flushed per record so a consumer tailing the file sees every cycle.
        self.writer.flush()
    }

    fn clear(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer = csv_writer(open(&self.path, true)?);
        Ok(())
    }
}

/// Keeps records in memory. Clones share the same storage.
#[derive(Clone, Debug, Default)]
pub struct MemoryTelemetrySink {
    records: Arc<Mutex<Vec<TelemetryRecord>>>,
}

impl MemoryTelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn records(&self) -> Vec<TelemetryRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TelemetrySink for MemoryTelemetrySink {
    fn record(&mut self, entry: &TelemetryRecord) -> io::Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| io::Error::other("telemetry buffer poisoned"))?;
        records.push(entry.clone());
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| io::Error::other("telemetry buffer poisoned"))?;
        records.clear();
        Ok(())
    }
}
