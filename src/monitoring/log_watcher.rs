//! Auth log tailer
//!
//! Follows a growing log file by byte offset:
//! - Skips history on startup (`start_at_end`)
//! - Reports only complete, newly appended lines
//! - Starts over when the file shrinks or is replaced (rotation)

use std::fs::{self, File, Metadata};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::monitoring::auth_log::{extract_from_reader, LoginEvent};
use crate::utils::AppError;

/// A trailing line longer than this without a newline is discarded
const MAX_PENDING_BYTES: usize = 64 * 1024;

/// Log watcher result type
pub type LogWatcherResult<T> = Result<T, AppError>;

pub struct AuthLogWatcher {
    path: PathBuf,
    /// Bytes of the current file already consumed
    offset: u64,
    /// Identity of the file the offset belongs to
    file_id: Option<u64>,
    /// Incomplete trailing line carried to the next poll
    pending: Vec<u8>,
}

impl AuthLogWatcher {
    /// Watch `path` from its beginning
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            file_id: None,
            pending: Vec::new(),
        }
    }

    /// Skip everything already in the file
    ///
    /// A missing file is not an error; it will be read from the start once
    /// it appears.
    pub fn start_at_end(&mut self) -> LogWatcherResult<()> {
        self.pending.clear();
        match fs::metadata(&self.path) {
            Ok(meta) => {
                self.offset = meta.len();
                self.file_id = file_id(&meta);
                info!(
                    path = %self.path.display(),
                    offset = self.offset,
                    "Auth log watcher positioned at end of file"
                );
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "Auth log does not exist yet");
                self.offset = 0;
                self.file_id = None;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read what was appended since the last poll and extract logins
    pub fn poll(&mut self) -> LogWatcherResult<Vec<LoginEvent>> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Auth log does not exist");
                return Ok(vec![]);
            }
            Err(e) => return Err(e.into()),
        };

        let meta = file.metadata()?;
        let len = meta.len();
        let id = file_id(&meta);

        let replaced = self.file_id.is_some() && id != self.file_id;
        if replaced || len < self.offset {
            info!(
                previous_offset = self.offset,
                current_len = len,
                replaced = replaced,
                "Auth log rotated or truncated, reading from the beginning"
            );
            self.offset = 0;
            self.pending.clear();
        }
        self.file_id = id;

        if len == self.offset {
            return Ok(vec![]);
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let mut chunk = Vec::new();
        let read = file.take(len - self.offset).read_to_end(&mut chunk)?;
        self.offset += read as u64;
        self.pending.extend_from_slice(&chunk);

        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            if self.pending.len() > MAX_PENDING_BYTES {
                warn!(bytes = self.pending.len(), "Discarding overlong unterminated log line");
                self.pending.clear();
            }
            return Ok(vec![]);
        };

        let complete: Vec<u8> = self.pending.drain(..=last_newline).collect();
        let events = extract_from_reader(complete.as_slice())?;

        debug!(
            bytes = complete.len(),
            events = events.len(),
            offset = self.offset,
            "Read new auth log lines"
        );
        if !events.is_empty() {
            info!(count = events.len(), "Detected successful SSH logins");
        }

        Ok(events)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

#[cfg(unix)]
fn file_id(meta: &Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.ino())
}

#[cfg(not(unix))]
fn file_id(_meta: &Metadata) -> Option<u64> {
    None
}
