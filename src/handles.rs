//! Best-effort opening of sensor files.
//!
//! Every sensor class goes through the same two entry points: [`open_many`]
//! for a directory scan filtered by file name, [`open_each`] for an explicit
//! path list. Neither fails. Whatever opens ends up in the returned
//! [`OpenBatch`]; everything else is counted and logged at debug level.

use regex::Regex;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse value from {path}: {detail}")]
    Parse { path: String, detail: String },
}

/// An open, read-only sensor file together with the path it came from.
#[derive(Debug)]
pub struct SensorHandle {
    path: PathBuf,
    file: File,
}

impl SensorHandle {
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file from the start and trims surrounding whitespace.
    pub fn read_trimmed(&mut self) -> Result<String, ReadError> {
        let mut buf = String::new();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_string(&mut buf))
            .map_err(|source| ReadError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        Ok(buf.trim().to_string())
    }

    pub fn read_i64(&mut self) -> Result<i64, ReadError> {
        let content = self.read_trimmed()?;
        content.parse::<i64>().map_err(|_| ReadError::Parse {
            path: self.path.display().to_string(),
            detail: format!("expected integer, got '{content}'"),
        })
    }

    pub fn read_u64(&mut self) -> Result<u64, ReadError> {
        let content = self.read_trimmed()?;
        content.parse::<u64>().map_err(|_| ReadError::Parse {
            path: self.path.display().to_string(),
            detail: format!("expected unsigned integer, got '{content}'"),
        })
    }
}

/// The subset of a batch that opened, plus how many entries did not.
#[derive(Debug, Default)]
pub struct OpenBatch {
    pub handles: Vec<SensorHandle>,
    pub failures: usize,
}

impl OpenBatch {
    pub fn append(&mut self, mut other: OpenBatch) {
        self.handles.append(&mut other.handles);
        self.failures += other.failures;
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    fn push_open(&mut self, path: PathBuf) {
        match SensorHandle::open(&path) {
            Ok(handle) => self.handles.push(handle),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping unopenable sensor file");
                self.failures += 1;
            }
        }
    }
}

/// Opens every entry of `dir` whose file name matches `pattern`, in name order.
pub fn open_many(dir: &Path, pattern: &Regex) -> OpenBatch {
    let mut batch = OpenBatch::default();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %dir.display(), error = %err, "cannot list sensor directory");
            batch.failures += 1;
            return batch;
        }
    };

    let mut names: Vec<String> = entries
        .flatten()
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .filter(|name| pattern.is_match(name))
        .collect();
    names.sort();

    for name in names {
        batch.push_open(dir.join(name));
    }

    batch
}

pub fn open_each<I, P>(paths: I) -> OpenBatch
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut batch = OpenBatch::default();
    for path in paths {
        batch.push_open(path.as_ref().to_path_buf());
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_regex() -> Regex {
        Regex::new(r"^temp\d+_input$").unwrap()
    }

    #[test]
    fn open_many_keeps_matching_names_in_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("temp2_input"), "2000\n").unwrap();
        fs::write(dir.path().join("temp1_input"), "1000\n").unwrap();
        fs::write(dir.path().join("temp1_label"), "Package id 0\n").unwrap();
        fs::write(dir.path().join("name"), "coretemp\n").unwrap();

        let batch = open_many(dir.path(), &temp_regex());
        assert_eq!(batch.failures, 0);
        let names: Vec<_> = batch
            .handles
            .iter()
            .map(|h| h.path().file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["temp1_input", "temp2_input"]);
    }

    #[test]
    fn open_many_on_missing_directory_is_empty() {
        let batch = open_many(Path::new("/nonexistent/hwmon/hwmon9"), &temp_regex());
        assert!(batch.is_empty());
        assert_eq!(batch.failures, 1);
    }

    #[test]
    fn open_many_skips_entries_that_fail_to_open() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("temp1_input"), "1000").unwrap();
        // A dangling symlink matches the pattern but cannot be opened.
        #[cfg(unix)]
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("temp2_input"))
            .unwrap();

        let batch = open_many(dir.path(), &temp_regex());
        assert_eq!(batch.len(), 1);
        #[cfg(unix)]
        assert_eq!(batch.failures, 1);
    }

    #[test]
    fn open_each_returns_the_subset_that_opened() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("temp1_input");
        fs::write(&good, "41000").unwrap();
        let missing = dir.path().join("temp9_input");

        let batch = open_each([&good, &missing]);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.failures, 1);
        assert_eq!(batch.handles[0].path(), good.as_path());
    }

    #[test]
    fn append_merges_handles_and_failures() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        fs::write(&a, "1").unwrap();

        let mut first = open_each([&a]);
        first.append(open_each([dir.path().join("missing")]));
        assert_eq!(first.len(), 1);
        assert_eq!(first.failures, 1);
    }

    #[test]
    fn read_i64_parses_trimmed_content() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("temp1_input");
        fs::write(&p, "45000\n").unwrap();
        let mut handle = SensorHandle::open(&p).unwrap();
        assert_eq!(handle.read_i64().unwrap(), 45000);
    }

    #[test]
    fn read_i64_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("temp1_input");
        fs::write(&p, "not_a_number").unwrap();
        let mut handle = SensorHandle::open(&p).unwrap();
        assert!(matches!(handle.read_i64(), Err(ReadError::Parse { .. })));
    }
}
