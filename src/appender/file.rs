use super::{payload, Appender};
use crate::record::Record;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const RETRY_BACKOFF: Duration = Duration::from_millis(100);

struct FileState {
    handle: Option<File>,
    retry_deadline: Option<Instant>,
}

/// A single-file appender with the retry discipline every file-backed
/// appender in this crate shares: on any open/write failure, close the
/// handle and arm a 100ms retry deadline. Until the deadline elapses,
/// records are dropped silently — producers are never blocked on
/// filesystem errors.
pub struct FileAppender {
    path: PathBuf,
    auto_flush: bool,
    state: Mutex<FileState>,
    started: AtomicBool,
}

impl FileAppender {
    pub fn new(path: impl Into<PathBuf>, auto_flush: bool) -> FileAppender {
        FileAppender {
            path: path.into(),
            auto_flush,
            state: Mutex::new(FileState { handle: None, retry_deadline: None }),
            started: AtomicBool::new(true),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn try_open(&self) -> std::io::Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        OpenOptions::new().create(true).append(true).open(&self.path)
    }
}

impl Appender for FileAppender {
    fn append(&self, record: &Record) {
        if !self.started.load(Ordering::Acquire) || record.raw_is_empty() {
            return;
        }

        let mut state = self.state.lock();

        if state.handle.is_none() {
            if let Some(deadline) = state.retry_deadline {
                if Instant::now() < deadline {
                    return;
                }
            }
            match self.try_open() {
                Ok(file) => {
                    state.handle = Some(file);
                    state.retry_deadline = None;
                }
                Err(_) => {
                    state.retry_deadline = Some(Instant::now() + RETRY_BACKOFF);
                    return;
                }
            }
        }

        let bytes = payload(record.raw());
        let result = {
            let handle = state.handle.as_mut().unwrap();
            handle
                .write_all(bytes)
                .and_then(|_| if self.auto_flush { handle.flush() } else { Ok(()) })
        };

        if result.is_err() {
            state.handle = None;
            state.retry_deadline = Some(Instant::now() + RETRY_BACKOFF);
        }
    }

    fn flush(&self) -> bool {
        let mut state = self.state.lock();
        match state.handle.as_mut() {
            Some(h) => h.flush().is_ok(),
            None => true,
        }
    }

    fn start(&self) -> bool {
        !self.started.swap(true, Ordering::AcqRel)
    }

    fn stop(&self) -> bool {
        let was_started = self.started.swap(false, Ordering::AcqRel);
        if was_started {
            self.state.lock().handle = None;
        }
        was_started
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    #[test]
    fn creates_parent_directories_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("app.log");
        let appender = FileAppender::new(&path, true);

        let mut record = Record::new(Level::Info);
        record.set_raw(b"hello\0");
        appender.append(&record);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "hello");
    }

    #[test]
    fn stop_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let appender = FileAppender::new(dir.path().join("app.log"), false);
        assert!(appender.stop());
        assert!(!appender.stop());
    }

    #[test]
    fn skips_records_with_empty_raw() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let appender = FileAppender::new(&path, true);
        let record = Record::new(Level::Info);
        appender.append(&record);
        assert!(!path.exists());
    }
}
