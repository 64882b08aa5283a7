/*!
# Diagnostic Store

Key-value persistence of sample buffers for replay and debugging. Nothing in
the decision path reads from a store.
*/

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::sample::Sample;
use crate::{Error, Result};

/// Persistence seam for sample buffers.
pub trait DiagnosticStore: Send + Sync {
    /// Replaces whatever is stored under `key` with `samples`.
    fn save(&self, key: &str, samples: &[Sample]) -> Result<()>;
    /// Removes `key`; removing a missing key is not an error.
    fn clear(&self, key: &str) -> Result<()>;
    /// Reads back the buffer stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<Vec<Sample>>>;
}

/// On-disk serialization of a stored buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreFormat {
    /// A JSON array of `{x, y, t, trusted}` objects.
    #[default]
    Json,
    /// A CSV table with an `x,y,t,trusted` header.
    Csv,
}

impl StoreFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            StoreFormat::Json => "json",
            StoreFormat::Csv => "csv",
        }
    }

    /// Guesses the format from a file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => StoreFormat::Csv,
            _ => StoreFormat::Json,
        }
    }
}

/// Process-local store, used by tests and embedders without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<Sample>>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<Sample>>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Store("memory store lock poisoned".to_string()))
    }
}

impl DiagnosticStore for MemoryStore {
    fn save(&self, key: &str, samples: &[Sample]) -> Result<()> {
        self.entries()?.insert(key.to_string(), samples.to_vec());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<Sample>>> {
        Ok(self.entries()?.get(key).cloned())
    }
}

/// Directory-backed store: one file per key, `<dir>/<key>.<json|csv>`.
///
/// Every save rewrites the whole file.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    format: StoreFormat,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>, format: StoreFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn format(&self) -> StoreFormat {
        self.format
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{}", self.format.extension()))
    }

    /// Build a key that does not collide with an existing file in the store:
    /// `{prefix}_{datetime}`, with `_{n}` appended if needed.
    pub fn unique_key(&self, prefix: &str) -> String {
        let now: DateTime<Local> = Local::now();
        let dt = now.format("%Y%m%d_%H%M%S").to_string();
        let mut key = format!("{prefix}_{dt}");
        let mut counter: usize = 1;
        while self.path_for(&key).exists() {
            key = format!("{prefix}_{dt}_{counter}");
            counter += 1;
        }
        key
    }

    /// Writes `samples` to an arbitrary file in the given format.
    pub fn write_file(path: &Path, format: StoreFormat, samples: &[Sample]) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file: File = File::create(path)?;
        match format {
            StoreFormat::Json => {
                let mut writer: BufWriter<File> = BufWriter::new(file);
                serde_json::to_writer(&mut writer, samples)?;
                writer.flush()?;
            }
            StoreFormat::Csv => {
                let mut writer: csv::Writer<File> = csv::Writer::from_writer(file);
                for sample in samples {
                    writer.serialize(sample)?;
                }
                writer.flush()?;
            }
        }
        Ok(())
    }

    /// Reads samples from an arbitrary file in the given format.
    pub fn read_file(path: &Path, format: StoreFormat) -> Result<Vec<Sample>> {
        let file: File = File::open(path)?;
        match format {
            StoreFormat::Json => Ok(serde_json::from_reader(BufReader::new(file))?),
            StoreFormat::Csv => {
                let mut reader: csv::Reader<File> = csv::Reader::from_reader(file);
                let mut samples: Vec<Sample> = Vec::new();
                for record in reader.deserialize() {
                    samples.push(record?);
                }
                Ok(samples)
            }
        }
    }
}

impl DiagnosticStore for FileStore {
    fn save(&self, key: &str, samples: &[Sample]) -> Result<()> {
        Self::write_file(&self.path_for(key), self.format, samples)
    }

    fn clear(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn load(&self, key: &str) -> Result<Option<Vec<Sample>>> {
        let path: PathBuf = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_file(&path, self.format).map(Some)
    }
}
