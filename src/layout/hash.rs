//! Hash layout: same framing as [`super::binary`], but `logger` and
//! `message` are replaced by their 32-bit FNV-1a hash, with an out-of-band
//! dictionary recovering the original templates.
//!
//! Grounded in `source/logging/layouts/hash_layout.cpp` (original_source);
//! FNV-1a constants (offset basis `2166136261`, prime `16777619`) are the
//! canonical ones, XOR-before-multiply.

use super::Layout;
use crate::level::Level;
use crate::record::Record;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{self, Read, Write};

const FNV_OFFSET_BASIS: u32 = 2166136261;
const FNV_PRIME: u32 = 16777619;

/// Computes the 32-bit FNV-1a hash of `bytes`.
pub fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// A hash → original-template dictionary, built up as records pass through
/// a [`HashLayout`] and later written to a `.hashlog` sidecar file so a
/// replay tool can recover human-readable text.
#[derive(Default)]
pub struct HashDictionary {
    entries: Mutex<HashMap<u32, String>>,
}

impl HashDictionary {
    pub fn new() -> HashDictionary {
        HashDictionary {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Records `template`'s hash, if not already present. Idempotent and
    /// cheap to call on every record.
    pub fn record(&self, template: &str) -> u32 {
        let hash = fnv1a(template.as_bytes());
        let mut entries = self.entries.lock();
        entries.entry(hash).or_insert_with(|| template.to_string());
        hash
    }

    pub fn lookup(&self, hash: u32) -> Option<String> {
        self.entries.lock().get(&hash).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializes the dictionary to the `.hashlog` sidecar wire format.
    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        let entries = self.entries.lock();
        out.write_all(&(entries.len() as u32).to_le_bytes())?;
        for (hash, template) in entries.iter() {
            out.write_all(&hash.to_le_bytes())?;
            let bytes = template.as_bytes();
            out.write_all(&(bytes.len() as u32).to_le_bytes())?;
            out.write_all(bytes)?;
        }
        Ok(())
    }

    /// Parses a `.hashlog` sidecar file's contents into a dictionary.
    pub fn read_from<R: Read>(mut input: R) -> io::Result<HashDictionary> {
        let mut count_buf = [0u8; 4];
        input.read_exact(&mut count_buf)?;
        let count = u32::from_le_bytes(count_buf);

        let mut entries = HashMap::with_capacity(count as usize);
        for _ in 0..count {
            let mut hash_buf = [0u8; 4];
            input.read_exact(&mut hash_buf)?;
            let hash = u32::from_le_bytes(hash_buf);

            let mut len_buf = [0u8; 4];
            input.read_exact(&mut len_buf)?;
            let len = u32::from_le_bytes(len_buf) as usize;

            let mut text = vec![0u8; len];
            input.read_exact(&mut text)?;
            entries.insert(hash, String::from_utf8_lossy(&text).into_owned());
        }
        Ok(HashDictionary {
            entries: Mutex::new(entries),
        })
    }
}

/// A layout producing hash-framed output and recording template hashes into
/// a shared dictionary for later replay.
pub struct HashLayout {
    dictionary: std::sync::Arc<HashDictionary>,
}

impl HashLayout {
    pub fn new(dictionary: std::sync::Arc<HashDictionary>) -> HashLayout {
        HashLayout { dictionary }
    }

    pub fn dictionary(&self) -> &std::sync::Arc<HashDictionary> {
        &self.dictionary
    }
}

impl Layout for HashLayout {
    fn layout(&self, record: &mut Record) {
        // The dictionary recovers both halves of the pair the hash framing
        // drops; it is keyed on the hash itself, so logger names and
        // message templates share one table without needing two files.
        let logger_hash = self.dictionary.record(&record.logger_str());
        let message_str = record.message_str();
        let message_hash = self.dictionary.record(&message_str);
        let buffer = record.argument_buffer();

        let body_len = 8 + 8 + 1 + 4 + 4 + 4 + buffer.len();
        let mut out = Vec::with_capacity(4 + body_len + 1);
        out.extend_from_slice(&(body_len as u32).to_le_bytes());
        out.extend_from_slice(&record.timestamp.to_le_bytes());
        out.extend_from_slice(&record.thread_id.to_le_bytes());
        out.push(record.level as u8);
        out.extend_from_slice(&logger_hash.to_le_bytes());
        out.extend_from_slice(&message_hash.to_le_bytes());
        out.extend_from_slice(&(buffer.len() as u32).to_le_bytes());
        out.extend_from_slice(buffer);
        out.push(0x00);

        record.set_raw(&out);
    }
}

/// A record reconstructed by parsing hash-framed bytes; `logger`/`message`
/// remain hashes until resolved against a dictionary.
#[derive(Debug, PartialEq, Eq)]
pub struct DecodedHashRecord {
    pub timestamp: u64,
    pub thread_id: u64,
    pub level: Level,
    pub logger_hash: u32,
    pub message_hash: u32,
    pub buffer: Vec<u8>,
}

pub fn decode(bytes: &[u8]) -> Option<(DecodedHashRecord, usize)> {
    if bytes.len() < 4 {
        return None;
    }
    let body_len = u32::from_le_bytes(bytes[0..4].try_into().ok()?) as usize;
    let total_len = 4 + body_len + 1;
    if bytes.len() < total_len {
        return None;
    }
    let body = &bytes[4..4 + body_len];
    let mut pos = 0usize;

    let timestamp = u64::from_le_bytes(body.get(pos..pos + 8)?.try_into().ok()?);
    pos += 8;
    let thread_id = u64::from_le_bytes(body.get(pos..pos + 8)?.try_into().ok()?);
    pos += 8;
    let level = Level::from_u8(*body.get(pos)?)?;
    pos += 1;
    let logger_hash = u32::from_le_bytes(body.get(pos..pos + 4)?.try_into().ok()?);
    pos += 4;
    let message_hash = u32::from_le_bytes(body.get(pos..pos + 4)?.try_into().ok()?);
    pos += 4;
    let buffer_len = u32::from_le_bytes(body.get(pos..pos + 4)?.try_into().ok()?) as usize;
    pos += 4;
    let buffer = body.get(pos..pos + buffer_len)?.to_vec();
    pos += buffer_len;
    if pos != body.len() || bytes[total_len - 1] != 0x00 {
        return None;
    }

    Some((
        DecodedHashRecord {
            timestamp,
            thread_id,
            level,
            logger_hash,
            message_hash,
            buffer,
        },
        total_len,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_matches_canonical_constants() {
        assert_eq!(fnv1a(b""), 2166136261);
        assert_eq!(fnv1a(b"a"), 0xE40C292C);
        assert_eq!(fnv1a(b"foobar"), 0xBF9CF968);
    }

    #[test]
    fn dictionary_round_trips_through_wire_format() {
        let dict = HashDictionary::new();
        dict.record("hello {}");
        dict.record("goodbye");

        let mut buf = Vec::new();
        dict.write_to(&mut buf).unwrap();
        let restored = HashDictionary::read_from(&buf[..]).unwrap();

        assert_eq!(restored.len(), 2);
        assert_eq!(restored.lookup(fnv1a(b"hello {}")).as_deref(), Some("hello {}"));
    }

    #[test]
    fn layout_replaces_logger_and_message_with_hashes() {
        let dict = std::sync::Arc::new(HashDictionary::new());
        let layout = HashLayout::new(dict.clone());
        let mut record = Record::new(Level::Info);
        record.set_logger("svc").unwrap();
        record.set_message("started").unwrap();
        layout.layout(&mut record);

        let (decoded, consumed) = decode(record.raw()).unwrap();
        assert_eq!(consumed, record.raw().len());
        assert_eq!(decoded.logger_hash, fnv1a(b"svc"));
        assert_eq!(decoded.message_hash, fnv1a(b"started"));
        assert_eq!(dict.lookup(decoded.message_hash).as_deref(), Some("started"));
    }
}
