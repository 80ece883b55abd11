//! Background zip archiver for rotated rolling-file backups.
//!
//! Grounded in `rolling_file_appender.cpp`'s `Impl` archive queue/thread
//! (original_source), which feeds a FIFO of closed file paths to a
//! dedicated thread producing zip archives. The pack has no dedicated `zip`
//! crate, so the container (local file header, central directory, EOCD) is
//! produced by hand; `flate2::write::DeflateEncoder` supplies the
//! compressed stream.

use crate::fatal;
use crossbeam_channel::{unbounded, Sender};
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

/// A background thread that zips and removes files pushed onto its queue.
/// Any archiving failure reports to the fatality hook and ends the thread;
/// entries already queued past that point are lost, matching the "archiver
/// fatal" error kind.
pub struct Archiver {
    sender: Sender<PathBuf>,
    handle: Option<JoinHandle<()>>,
}

impl Archiver {
    pub fn start() -> Archiver {
        let (sender, receiver) = unbounded::<PathBuf>();
        let handle = std::thread::Builder::new()
            .name("corelog-archiver".into())
            .spawn(move || {
                while let Ok(path) = receiver.recv() {
                    if let Err(e) = zip_and_remove(&path) {
                        fatal::report(&format!(
                            "archiver failed on {}: {e}",
                            path.display()
                        ));
                        break;
                    }
                }
            })
            .expect("spawning the archiver thread");
        Archiver { sender, handle: Some(handle) }
    }

    /// Queues `path` (already closed) for zipping. Never blocks.
    pub fn queue(&self, path: PathBuf) {
        let _ = self.sender.send(path);
    }

    /// Drains the queue and joins the archiver thread.
    pub fn shutdown(&mut self) {
        // Dropping the sender's last clone would close the channel; since
        // the struct only ever holds one sender, replacing it is enough.
        let (dummy_sender, dummy_receiver) = unbounded();
        drop(dummy_receiver);
        self.sender = dummy_sender;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Archiver {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}

fn zip_and_remove(source: &Path) -> io::Result<()> {
    let zip_path = {
        let mut s = source.as_os_str().to_owned();
        s.push(".zip");
        PathBuf::from(s)
    };
    if zip_path.exists() {
        fs::remove_file(&zip_path)?;
    }
    write_zip(source, &zip_path)?;
    fs::remove_file(source)?;
    Ok(())
}

fn write_zip(source: &Path, zip_path: &Path) -> io::Result<()> {
    let mut contents = Vec::new();
    fs::File::open(source)?.read_to_end(&mut contents)?;

    let entry_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "entry".to_string());

    let crc = crc32(&contents);
    let mut compressed = Vec::new();
    {
        let mut encoder = DeflateEncoder::new(&mut compressed, Compression::default());
        encoder.write_all(&contents)?;
        encoder.finish()?;
    }

    let mut out = Vec::new();
    let local_header_offset = 0u32;

    // Local file header.
    out.extend_from_slice(&0x04034b50u32.to_le_bytes());
    out.extend_from_slice(&20u16.to_le_bytes()); // version needed
    out.extend_from_slice(&0u16.to_le_bytes()); // flags
    out.extend_from_slice(&8u16.to_le_bytes()); // method: deflate
    out.extend_from_slice(&0u16.to_le_bytes()); // mod time
    out.extend_from_slice(&0u16.to_le_bytes()); // mod date
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    out.extend_from_slice(&(contents.len() as u32).to_le_bytes());
    out.extend_from_slice(&(entry_name.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // extra length
    out.extend_from_slice(entry_name.as_bytes());
    out.extend_from_slice(&compressed);

    let central_dir_offset = out.len() as u32;

    // Central directory file header.
    out.extend_from_slice(&0x02014b50u32.to_le_bytes());
    out.extend_from_slice(&20u16.to_le_bytes()); // version made by
    out.extend_from_slice(&20u16.to_le_bytes()); // version needed
    out.extend_from_slice(&0u16.to_le_bytes()); // flags
    out.extend_from_slice(&8u16.to_le_bytes()); // method
    out.extend_from_slice(&0u16.to_le_bytes()); // mod time
    out.extend_from_slice(&0u16.to_le_bytes()); // mod date
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    out.extend_from_slice(&(contents.len() as u32).to_le_bytes());
    out.extend_from_slice(&(entry_name.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // extra length
    out.extend_from_slice(&0u16.to_le_bytes()); // comment length
    out.extend_from_slice(&0u16.to_le_bytes()); // disk number start
    out.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
    out.extend_from_slice(&0u32.to_le_bytes()); // external attrs
    out.extend_from_slice(&local_header_offset.to_le_bytes());
    out.extend_from_slice(entry_name.as_bytes());

    let central_dir_size = out.len() as u32 - central_dir_offset;

    // End of central directory record.
    out.extend_from_slice(&0x06054b50u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // disk number
    out.extend_from_slice(&0u16.to_le_bytes()); // disk with cd
    out.extend_from_slice(&1u16.to_le_bytes()); // entries this disk
    out.extend_from_slice(&1u16.to_le_bytes()); // entries total
    out.extend_from_slice(&central_dir_size.to_le_bytes());
    out.extend_from_slice(&central_dir_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // comment length

    fs::write(zip_path, out)
}

/// Standard CRC-32 (ISO 3309 / IEEE 802.3 polynomial), computed
/// table-free since it only ever runs on the archiver thread.
fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_matches_known_vector() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn archives_and_removes_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("app.log.1");
        fs::write(&source, b"rolled log contents").unwrap();

        let archiver = Archiver::start();
        archiver.queue(source.clone());
        drop(archiver); // joins via Drop, draining the single queued entry

        let zip_path = dir.path().join("app.log.1.zip");
        assert!(zip_path.exists());
        assert!(!source.exists());
    }
}
