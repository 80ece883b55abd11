//! The rolling file appender: size- and time-triggered rotation sharing one
//! I/O and retry state machine.
//!
//! Grounded in `rolling_file_appender.cpp` (original_source): both policies
//! differ only in *when* they trigger a roll, never in how the active file
//! handle is opened, written, or retried after a failure.

mod archiver;
mod size;
mod time;

pub use archiver::Archiver;
pub use size::SizePolicyConfig;
pub use time::{RollInterval, TimePolicyConfig};

use super::{payload, Appender};
use crate::error::Result;
use crate::record::Record;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Which rollover trigger a [`RollingFileAppender`] uses.
pub enum RollingPolicy {
    Size(SizePolicyConfig),
    Time(TimePolicyConfig),
}

impl RollingPolicy {
    fn validate(&self) -> Result<()> {
        match self {
            RollingPolicy::Size(cfg) => cfg.validate(),
            RollingPolicy::Time(_) => Ok(()),
        }
    }

    fn archive(&self) -> bool {
        match self {
            RollingPolicy::Size(cfg) => cfg.archive,
            RollingPolicy::Time(cfg) => cfg.archive,
        }
    }

    fn truncate(&self) -> bool {
        match self {
            RollingPolicy::Size(cfg) => cfg.truncate,
            RollingPolicy::Time(cfg) => cfg.truncate,
        }
    }

    fn auto_flush(&self) -> bool {
        match self {
            RollingPolicy::Size(cfg) => cfg.auto_flush,
            RollingPolicy::Time(cfg) => cfg.auto_flush,
        }
    }
}

struct RollingState {
    handle: Option<File>,
    current_path: Option<PathBuf>,
    written_bytes: u64,
    rollover_stamp: Option<i64>,
    retry_deadline: Option<Instant>,
}

/// A file appender that rotates on a size limit or a time-period boundary,
/// optionally zip-archiving each rotated file in the background.
pub struct RollingFileAppender {
    policy: RollingPolicy,
    state: Mutex<RollingState>,
    archiver: Mutex<Option<Archiver>>,
    started: AtomicBool,
}

impl RollingFileAppender {
    pub fn new(policy: RollingPolicy) -> Result<RollingFileAppender> {
        policy.validate()?;
        let archiver = if policy.archive() { Some(Archiver::start()) } else { None };
        Ok(RollingFileAppender {
            policy,
            state: Mutex::new(RollingState {
                handle: None,
                current_path: None,
                written_bytes: 0,
                rollover_stamp: None,
                retry_deadline: None,
            }),
            archiver: Mutex::new(archiver),
            started: AtomicBool::new(true),
        })
    }

    fn target_path(&self, state: &RollingState, record: &Record) -> PathBuf {
        match &self.policy {
            RollingPolicy::Size(cfg) => cfg.backup_path(0),
            RollingPolicy::Time(cfg) => {
                // The first file after start uses the record's own
                // timestamp, not a period boundary, per spec.
                let stamp_ns = match state.rollover_stamp {
                    Some(boundary_secs) => (boundary_secs as u64) * 1_000_000_000,
                    None => record.timestamp,
                };
                let filename = time::render_filename(&cfg.filename_pattern, stamp_ns);
                cfg.directory.join(filename)
            }
        }
    }

    fn open_at(&self, path: &PathBuf) -> std::io::Result<(File, u64)> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let truncate = self.policy.truncate();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(!truncate)
            .truncate(truncate)
            .open(path)?;
        let existing_len = if truncate { 0 } else { file.metadata()?.len() };
        Ok((file, existing_len))
    }

    fn should_roll(&self, state: &RollingState, record: &Record, next_write_len: u64) -> bool {
        match &self.policy {
            RollingPolicy::Size(cfg) => state.written_bytes + next_write_len > cfg.max_bytes,
            RollingPolicy::Time(cfg) => {
                let new_boundary = time::truncate_to_period(record.timestamp, cfg.interval);
                state.rollover_stamp.is_some_and(|s| s != new_boundary)
            }
        }
    }

    /// Closes the current file and either renames it into the backup chain
    /// (size policy, non-archive), queues it to the archiver, or (time
    /// policy, non-archive) simply leaves it as-is on disk.
    fn roll(&self, state: &mut RollingState, record: &Record) -> std::io::Result<()> {
        state.handle = None;

        if let Some(old_path) = state.current_path.take() {
            match &self.policy {
                RollingPolicy::Size(cfg) => {
                    if cfg.archive {
                        let unique = cfg.unique_archive_name(record.timestamp);
                        fs::rename(&old_path, &unique)?;
                        if let Some(archiver) = self.archiver.lock().as_ref() {
                            archiver.queue(unique);
                        }
                    } else {
                        cfg.roll_backup_chain()?;
                    }
                }
                RollingPolicy::Time(cfg) => {
                    if cfg.archive {
                        if let Some(archiver) = self.archiver.lock().as_ref() {
                            archiver.queue(old_path);
                        }
                    }
                    // Non-archived time-rotated files are simply left in
                    // place under their period-stamped name.
                }
            }
        }

        // For the time policy, advance the rollover stamp to the new
        // boundary *before* computing the new path, since `target_path`
        // derives the filename from `state.rollover_stamp` once it's set.
        if let RollingPolicy::Time(cfg) = &self.policy {
            state.rollover_stamp = Some(time::truncate_to_period(record.timestamp, cfg.interval));
        }

        let new_path = self.target_path(state, record);
        let (file, existing_len) = self.open_at(&new_path)?;
        state.handle = Some(file);
        state.current_path = Some(new_path);
        state.written_bytes = existing_len;
        Ok(())
    }
}

impl Appender for RollingFileAppender {
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
            let path = self.target_path(&state, record);
            match self.open_at(&path) {
                Ok((file, existing_len)) => {
                    state.handle = Some(file);
                    state.current_path = Some(path);
                    state.written_bytes = existing_len;
                    state.retry_deadline = None;
                    if let RollingPolicy::Time(cfg) = &self.policy {
                        state.rollover_stamp =
                            Some(time::truncate_to_period(record.timestamp, cfg.interval));
                    }
                }
                Err(_) => {
                    state.retry_deadline = Some(Instant::now() + RETRY_BACKOFF);
                    return;
                }
            }
        }

        let bytes = payload(record.raw());
        let write_len = bytes.len() as u64;

        if self.should_roll(&state, record, write_len) {
            if let Err(_e) = self.roll(&mut state, record) {
                state.handle = None;
                state.retry_deadline = Some(Instant::now() + RETRY_BACKOFF);
                return;
            }
        }

        let auto_flush = self.policy.auto_flush();
        let result = {
            let handle = state.handle.as_mut().unwrap();
            handle
                .write_all(bytes)
                .and_then(|_| if auto_flush { handle.flush() } else { Ok(()) })
        };

        match result {
            Ok(()) => state.written_bytes += write_len,
            Err(_) => {
                state.handle = None;
                state.retry_deadline = Some(Instant::now() + RETRY_BACKOFF);
            }
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
            if let Some(mut archiver) = self.archiver.lock().take() {
                archiver.shutdown();
            }
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

    fn record_with_payload(timestamp: u64, payload: &[u8]) -> Record {
        let mut r = Record::new(Level::Info);
        r.set_timestamp(timestamp);
        let mut raw = payload.to_vec();
        raw.push(0);
        r.set_raw(&raw);
        r
    }

    #[test]
    fn size_policy_caps_backup_count_and_active_size() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = SizePolicyConfig {
            directory: dir.path().to_path_buf(),
            basename: "app".into(),
            extension: "log".into(),
            max_bytes: 10,
            max_backups: 3,
            archive: false,
            truncate: false,
            auto_flush: true,
        };
        let appender = RollingFileAppender::new(RollingPolicy::Size(cfg.clone())).unwrap();

        for i in 0..10u64 {
            let record = record_with_payload(1_000_000_000 + i, b"0123456789"); // 10-byte payload
            appender.append(&record);
        }

        assert!(fs::metadata(cfg.backup_path(0)).unwrap().len() <= 10);
        assert!(cfg.backup_path(1).exists());
        assert!(cfg.backup_path(2).exists());
        assert!(cfg.backup_path(3).exists());
        assert!(!cfg.backup_path(4).exists());
    }

    #[test]
    fn time_policy_produces_distinct_files_across_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TimePolicyConfig {
            directory: dir.path().to_path_buf(),
            filename_pattern: "{UtcDateTime}.log".into(),
            interval: RollInterval::Second,
            archive: false,
            truncate: false,
            auto_flush: true,
        };
        let appender = RollingFileAppender::new(RollingPolicy::Time(cfg)).unwrap();

        appender.append(&record_with_payload(1_000_000_000_000_000_000, b"first"));
        appender.append(&record_with_payload(1_000_000_002_000_000_000, b"second"));

        let mut log_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|ext| ext == "log").unwrap_or(false))
            .collect();
        log_files.sort_by_key(|e| e.file_name());
        assert_eq!(log_files.len(), 2);
    }

    #[test]
    fn stop_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = SizePolicyConfig {
            directory: dir.path().to_path_buf(),
            basename: "app".into(),
            extension: "log".into(),
            max_bytes: 100,
            max_backups: 1,
            archive: false,
            truncate: false,
            auto_flush: true,
        };
        let appender = RollingFileAppender::new(RollingPolicy::Size(cfg)).unwrap();
        assert!(appender.stop());
        assert!(!appender.stop());
    }
}
