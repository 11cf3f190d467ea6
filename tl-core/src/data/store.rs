//! JSON-lines persistence for interval means
//!
//! Every emitted `(timestamp, value)` pair is appended to the store file as one
//! JSON object per line. On open the file is streamed into an in-memory index
//! keyed by timestamp (millisecond resolution), where a later line for the same
//! timestamp wins. The file only grows, so it is never read whole; each line
//! is capped at `MAX_RECORD_BYTES` instead. Rewriting happens only in [`ReadingStore::compact`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::constants::storage;
use crate::error::{Result, ThermologError};

/// Destination for interval means. Same timestamp means overwrite.
#[cfg_attr(test, mockall::automock)]
pub trait PersistenceSink {
    fn record(&mut self, timestamp: f64, value: f64) -> Result<()>;
}

/// One persisted interval mean
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    pub timestamp: f64,
    pub value: f64,
}

impl StoredReading {
    /// Index key, milliseconds since the epoch
    pub fn key(&self) -> i64 {
        timestamp_key(self.timestamp)
    }
}

fn timestamp_key(timestamp: f64) -> i64 {
    (timestamp * 1000.0).round() as i64
}

#[derive(Debug)]
pub struct ReadingStore {
    path: PathBuf,
    index: BTreeMap<i64, StoredReading>,
    /// Lines currently in the file, superseded ones included
    lines: usize,
}

impl ReadingStore {
    /// Open the store at `path`, replaying an existing file into the index.
    /// A missing file is an empty store; it is created on the first record.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut store = Self {
            path,
            index: BTreeMap::new(),
            lines: 0,
        };

        if !store.path.exists() {
            debug!("No store file at {:?}, starting empty", store.path);
            return Ok(store);
        }

        let file = fs::File::open(&store.path).map_err(|e| ThermologError::FileRead {
            path: store.path.clone(),
            source: e,
        })?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut line_no = 0;

        loop {
            let (consumed, truncated) =
                read_line_bounded(&mut reader, &mut buf, storage::MAX_RECORD_BYTES).map_err(|e| {
                    ThermologError::FileRead {
                        path: store.path.clone(),
                        source: e,
                    }
                })?;
            if consumed == 0 {
                break;
            }
            line_no += 1;

            let text = String::from_utf8_lossy(&buf);
            let line = text.trim();
            if line.is_empty() {
                continue;
            }
            store.lines += 1;

            let parsed = if truncated {
                Err(format!("record longer than {} bytes", storage::MAX_RECORD_BYTES))
            } else {
                serde_json::from_str::<StoredReading>(line).map_err(|e| e.to_string())
            };
            match parsed {
                Ok(reading) => {
                    store.index.insert(reading.key(), reading);
                }
                Err(reason) => {
                    // A torn last line after a crash is expected; anything else is still
                    // better skipped than fatal
                    let err = ThermologError::CorruptRecord {
                        path: store.path.clone(),
                        line: line_no,
                        reason,
                    };
                    warn!("{}, skipping", err);
                }
            }
        }

        info!("Loaded {} readings from {:?}", store.index.len(), store.path);
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Most recent reading by timestamp
    pub fn latest(&self) -> Option<StoredReading> {
        self.index.values().next_back().copied()
    }

    /// Readings with `from <= timestamp <= to`, oldest first
    pub fn readings_between(&self, from: f64, to: f64) -> Vec<StoredReading> {
        let (from, to) = (timestamp_key(from), timestamp_key(to));
        if from > to {
            return Vec::new();
        }
        self.index.range(from..=to).map(|(_, r)| *r).collect()
    }

    /// Rewrite the file with one line per timestamp. Returns whether anything
    /// was dropped.
    pub fn compact(&mut self) -> Result<bool> {
        if self.lines == self.index.len() {
            return Ok(false);
        }

        let mut body = String::new();
        for reading in self.index.values() {
            body.push_str(&serde_json::to_string(reading)?);
            body.push('\n');
        }

        // Atomic write - write to temp file then rename
        let temp_path = self.path.with_extension("jsonl.tmp");
        let mut file = fs::File::create(&temp_path)
            .map_err(|e| ThermologError::FileWrite { path: temp_path.clone(), source: e })?;
        file.write_all(body.as_bytes())
            .map_err(|e| ThermologError::FileWrite { path: temp_path.clone(), source: e })?;
        file.sync_all()
            .map_err(|e| ThermologError::FileWrite { path: temp_path.clone(), source: e })?;
        drop(file);

        fs::rename(&temp_path, &self.path)
            .map_err(|e| ThermologError::FileWrite { path: self.path.clone(), source: e })?;

        info!(
            "Compacted {:?}: {} lines down to {}",
            self.path,
            self.lines,
            self.index.len()
        );
        self.lines = self.index.len();
        Ok(true)
    }

    fn append_line(&self, reading: &StoredReading) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut line = serde_json::to_string(reading)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ThermologError::FileWrite { path: self.path.clone(), source: e })?;
        file.write_all(line.as_bytes())
            .map_err(|e| ThermologError::FileWrite { path: self.path.clone(), source: e })?;
        file.sync_data()
            .map_err(|e| ThermologError::FileWrite { path: self.path.clone(), source: e })?;
        Ok(())
    }
}

/// Read one line into `buf`, keeping at most `limit` bytes of it. The rest of
/// an overlong line is consumed and dropped. Returns the bytes consumed and
/// whether the line was cut.
fn read_line_bounded<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    limit: usize,
) -> io::Result<(usize, bool)> {
    buf.clear();
    let mut consumed = 0;
    let mut truncated = false;

    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            break;
        }
        let (chunk, done) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (&available[..=i], true),
            None => (available, false),
        };
        let room = limit.saturating_sub(buf.len());
        if chunk.len() > room {
            truncated = true;
        }
        buf.extend_from_slice(&chunk[..chunk.len().min(room)]);

        let used = chunk.len();
        reader.consume(used);
        consumed += used;
        if done {
            break;
        }
    }

    Ok((consumed, truncated))
}

impl PersistenceSink for ReadingStore {
    fn record(&mut self, timestamp: f64, value: f64) -> Result<()> {
        let reading = StoredReading { timestamp, value };
        self.append_line(&reading)?;
        self.index.insert(reading.key(), reading);
        self.lines += 1;
        debug!(timestamp, value, "Recorded interval mean");
        Ok(())
    }
}
