//! Size-triggered rollover and its backup chain.
//!
//! Grounded in `rolling_file_appender.cpp`'s `SizePolicyImpl::RollBackup`
//! (original_source): `basename.ext -> basename.1.ext -> basename.2.ext ->
//! ... -> basename.N.ext`, oldest dropped.

use crate::error::{LogError, Result};
use byte_unit::Byte;
use std::fs;
use std::path::PathBuf;

#[derive(Clone)]
pub struct SizePolicyConfig {
    pub directory: PathBuf,
    pub basename: String,
    pub extension: String,
    pub max_bytes: u64,
    pub max_backups: usize,
    pub archive: bool,
    pub truncate: bool,
    pub auto_flush: bool,
}

impl SizePolicyConfig {
    /// Parses a human-readable limit ("10MB", "512 KiB", ...) instead of a
    /// raw byte count, for callers configuring rotation from a config file
    /// or environment variable rather than a literal.
    pub fn parse_max_bytes(text: &str) -> Result<u64> {
        Byte::parse_str(text, true)
            .map(|b| b.as_u64())
            .map_err(|_| LogError::InvalidSizeLimit(text.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_bytes == 0 {
            return Err(LogError::InvalidSizeLimit("max_bytes must be greater than zero".into()));
        }
        if self.max_backups == 0 {
            return Err(LogError::InvalidBackupCount(self.max_backups));
        }
        Ok(())
    }

    /// The active file's path (`n == 0`) or a backup slot's path.
    pub fn backup_path(&self, n: usize) -> PathBuf {
        if n == 0 {
            self.directory.join(format!("{}.{}", self.basename, self.extension))
        } else {
            self.directory.join(format!("{}.{}.{}", self.basename, n, self.extension))
        }
    }

    /// A unique filename for a file being handed to the archiver, distinct
    /// from the backup chain slots so the active file can reopen cleanly at
    /// slot 0 immediately after.
    pub fn unique_archive_name(&self, timestamp_ns: u64) -> PathBuf {
        self.directory
            .join(format!("{}.{}.{}", self.basename, timestamp_ns, self.extension))
    }

    /// Shifts every backup slot up by one, dropping the oldest, and moves
    /// the active file into slot 1. Stale `.zip` siblings left over from a
    /// previous archive-mode session are removed before a rename would
    /// shadow them.
    pub fn roll_backup_chain(&self) -> std::io::Result<()> {
        let oldest = self.backup_path(self.max_backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        remove_stale_zip(&oldest);

        for i in (1..self.max_backups).rev() {
            let src = self.backup_path(i);
            let dst = self.backup_path(i + 1);
            remove_stale_zip(&dst);
            if src.exists() {
                fs::rename(&src, &dst)?;
            }
        }

        let active = self.backup_path(0);
        let first_backup = self.backup_path(1);
        remove_stale_zip(&first_backup);
        if active.exists() {
            fs::rename(&active, &first_backup)?;
        }
        Ok(())
    }
}

fn remove_stale_zip(path: &std::path::Path) {
    let mut zip_path = path.as_os_str().to_owned();
    zip_path.push(".zip");
    let _ = fs::remove_file(PathBuf::from(zip_path));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path, max_backups: usize) -> SizePolicyConfig {
        SizePolicyConfig {
            directory: dir.to_path_buf(),
            basename: "app".into(),
            extension: "log".into(),
            max_bytes: 10,
            max_backups,
            archive: false,
            truncate: false,
            auto_flush: true,
        }
    }

    #[test]
    fn parses_human_readable_limits() {
        assert_eq!(SizePolicyConfig::parse_max_bytes("10MB").unwrap(), 10_000_000);
        assert!(SizePolicyConfig::parse_max_bytes("not a size").is_err());
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let mut cfg = config(std::path::Path::new("."), 3);
        cfg.max_bytes = 0;
        assert!(matches!(cfg.validate(), Err(LogError::InvalidSizeLimit(_))));

        let mut cfg = config(std::path::Path::new("."), 0);
        cfg.max_bytes = 10;
        assert!(matches!(cfg.validate(), Err(LogError::InvalidBackupCount(_))));
    }

    #[test]
    fn backup_chain_shifts_and_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 2);

        fs::write(cfg.backup_path(0), b"active").unwrap();
        fs::write(cfg.backup_path(1), b"backup-1").unwrap();

        cfg.roll_backup_chain().unwrap();

        assert!(!cfg.backup_path(0).exists());
        assert_eq!(fs::read(cfg.backup_path(1)).unwrap(), b"active");
        assert_eq!(fs::read(cfg.backup_path(2)).unwrap(), b"backup-1");
    }

    #[test]
    fn chain_never_exceeds_max_backups_plus_one() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 2);

        for i in 0..6 {
            fs::write(cfg.backup_path(0), format!("gen-{i}")).unwrap();
            cfg.roll_backup_chain().unwrap();
        }

        assert!(cfg.backup_path(1).exists());
        assert!(cfg.backup_path(2).exists());
        assert!(!cfg.backup_path(3).exists());
    }
}
