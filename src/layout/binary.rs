//! Bit-stable binary layout: the canonical on-disk format read by `binlog`.
//!
//! Framing grounded in `source/logging/layouts/binary_layout.cpp`
//! (original_source), field order preserved exactly:
//! `size, timestamp, thread, level, logger_len, logger, message_len,
//! message, buffer_len, buffer, 0x00`.

use super::Layout;
use crate::level::Level;
use crate::record::Record;

pub struct BinaryLayout;

impl Layout for BinaryLayout {
    fn layout(&self, record: &mut Record) {
        let bytes = encode(record);
        record.set_raw(&bytes);
    }
}

/// Serializes a record into the canonical binary framing, independent of
/// the `Layout` trait so appenders and the `binlog` tool can call it
/// directly without owning a `BinaryLayout` instance.
pub fn encode(record: &Record) -> Vec<u8> {
    let logger = record.logger();
    let message = record.message();
    let buffer = record.argument_buffer();

    let body_len = 8 + 8 + 1 + 1 + logger.len() + 2 + message.len() + 4 + buffer.len();
    let mut out = Vec::with_capacity(4 + body_len + 1);

    out.extend_from_slice(&(body_len as u32).to_le_bytes());
    out.extend_from_slice(&record.timestamp.to_le_bytes());
    out.extend_from_slice(&record.thread_id.to_le_bytes());
    out.push(record.level as u8);
    out.push(logger.len() as u8);
    out.extend_from_slice(logger);
    out.extend_from_slice(&(message.len() as u16).to_le_bytes());
    out.extend_from_slice(message);
    out.extend_from_slice(&(buffer.len() as u32).to_le_bytes());
    out.extend_from_slice(buffer);
    out.push(0x00);
    out
}

/// A record reconstructed by parsing the binary framing back out.
#[derive(Debug, PartialEq, Eq)]
pub struct DecodedRecord {
    pub timestamp: u64,
    pub thread_id: u64,
    pub level: Level,
    pub logger: Vec<u8>,
    pub message: Vec<u8>,
    pub buffer: Vec<u8>,
}

/// Parses one framed record from the start of `bytes`, returning the
/// decoded record and the number of bytes consumed (including the leading
/// size field and the trailing NUL). Returns `None` on any malformed input;
/// callers (the replay tools) treat that as end-of-stream.
pub fn decode(bytes: &[u8]) -> Option<(DecodedRecord, usize)> {
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
    let logger_len = *body.get(pos)? as usize;
    pos += 1;
    let logger = body.get(pos..pos + logger_len)?.to_vec();
    pos += logger_len;
    let message_len = u16::from_le_bytes(body.get(pos..pos + 2)?.try_into().ok()?) as usize;
    pos += 2;
    let message = body.get(pos..pos + message_len)?.to_vec();
    pos += message_len;
    let buffer_len = u32::from_le_bytes(body.get(pos..pos + 4)?.try_into().ok()?) as usize;
    pos += 4;
    let buffer = body.get(pos..pos + buffer_len)?.to_vec();
    pos += buffer_len;
    if pos != body.len() {
        return None;
    }
    if bytes[total_len - 1] != 0x00 {
        return None;
    }

    Some((
        DecodedRecord {
            timestamp,
            thread_id,
            level,
            logger,
            message,
            buffer,
        },
        total_len,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::Arg;

    #[test]
    fn round_trips_all_fields() {
        let mut record = Record::new(Level::Info);
        record.set_timestamp(42);
        record.set_thread_id(7);
        record.set_logger("L").unwrap();
        record.set_message("M").unwrap();
        record.append_arg(&Arg::U8(0xAA));

        let encoded = encode(&record);
        let (decoded, consumed) = decode(&encoded).expect("decode succeeds");

        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded.timestamp, 42);
        assert_eq!(decoded.thread_id, 7);
        assert_eq!(decoded.level, Level::Info);
        assert_eq!(decoded.logger, b"L");
        assert_eq!(decoded.message, b"M");
        assert_eq!(decoded.buffer, record.argument_buffer());
    }

    #[test]
    fn truncated_input_fails_to_decode() {
        let mut record = Record::new(Level::Warn);
        record.set_message("hi").unwrap();
        let encoded = encode(&record);
        assert!(decode(&encoded[..encoded.len() - 2]).is_none());
    }

    #[test]
    fn layout_trait_populates_raw() {
        let mut record = Record::new(Level::Error);
        record.set_message("boom").unwrap();
        BinaryLayout.layout(&mut record);
        assert!(!record.raw_is_empty());
        let (decoded, _) = decode(record.raw()).unwrap();
        assert_eq!(decoded.message, b"boom");
    }
}
