//! Sidecar progress file for interrupted enrichment runs.
//!
//! One JSON object per line, appended after every batch:
//! `{"row":0,"name":"Widget","stock_status":"あり"}`.
//! A torn last line (crash mid-write) is ignored on load.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::EnrichError;

const SUFFIX: &str = ".stock_status.partial";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub row: usize,
    pub name: String,
    pub stock_status: String,
}

#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    /// Checkpoint living next to `catalog` (`<catalog>.stock_status.partial`).
    pub fn for_catalog(catalog: &Path) -> Self {
        let mut os = catalog.as_os_str().to_owned();
        os.push(SUFFIX);
        Self {
            path: PathBuf::from(os),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Completed entries keyed by row. A missing file is an empty checkpoint.
    pub fn load(&self) -> Result<HashMap<usize, CheckpointEntry>, EnrichError> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        let mut out = HashMap::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CheckpointEntry>(&line) {
                Ok(entry) => {
                    out.insert(entry.row, entry);
                }
                Err(e) => {
                    warn!(line = lineno + 1, error = %e, "ignoring unreadable checkpoint line");
                }
            }
        }
        debug!(entries = out.len(), path = %self.path.display(), "checkpoint loaded");
        Ok(out)
    }

    /// Appends `entries` and syncs them to disk.
    pub fn append(&self, entries: &[CheckpointEntry]) -> Result<(), EnrichError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&self.path)?;
        let mut buf = Vec::new();
        // Terminate a torn tail so it cannot swallow the first new entry.
        if !ends_with_newline(&mut file)? {
            buf.push(b'\n');
        }
        for entry in entries {
            serde_json::to_writer(&mut buf, entry)?;
            buf.push(b'\n');
        }
        file.write_all(&buf)?;
        file.sync_data()?;
        Ok(())
    }

    pub fn remove(&self) -> Result<(), EnrichError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// `true` for an empty file or one whose last byte is `\n`.
fn ends_with_newline(file: &mut fs::File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(row: usize, name: &str, status: &str) -> CheckpointEntry {
        CheckpointEntry {
            row,
            name: name.into(),
            stock_status: status.into(),
        }
    }

    #[test]
    fn path_sits_next_to_catalog() {
        let cp = Checkpoint::for_catalog(Path::new("data/products.csv"));
        assert_eq!(cp.path(), Path::new("data/products.csv.stock_status.partial"));
    }

    #[test]
    fn append_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cp = Checkpoint::for_catalog(&dir.path().join("p.csv"));
        assert!(cp.load().unwrap().is_empty());

        cp.append(&[entry(0, "Widget", "あり")]).unwrap();
        cp.append(&[entry(1, "Gadget", "なし")]).unwrap();

        let loaded = cp.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[&1], entry(1, "Gadget", "なし"));

        cp.remove().unwrap();
        assert!(!cp.exists());
        cp.remove().unwrap();
    }

    #[test]
    fn torn_tail_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let cp = Checkpoint::for_catalog(&dir.path().join("p.csv"));
        cp.append(&[entry(0, "Widget", "あり")]).unwrap();
        let mut f = OpenOptions::new().append(true).open(cp.path()).unwrap();
        f.write_all(br#"{"row":1,"name":"Gad"#).unwrap();

        let loaded = cp.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key(&0));

        cp.append(&[entry(2, "Gizmo", "なし")]).unwrap();
        let loaded = cp.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[&2], entry(2, "Gizmo", "なし"));
    }
}
