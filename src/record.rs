//! The logging record: the unit of data passed from producer to consumer.
//!
//! Grounded in `include/logging/record.h` and `source/logging/record.cpp`
//! (original_source). A `Record` is built on the producer's stack, handed
//! across the processor tree by value (or via the wait-free ring, which
//! copies it into a pre-allocated slot), and consumed by exactly one layout
//! on the single consumer thread. It never allocates on the heap in the
//! steady state: all byte buffers are `smallvec::SmallVec`s sized to avoid
//! spilling for a typical short logger name, message, and argument list.

use crate::argument::{encode_arg, Arg, ArgBuffer};
use crate::error::{LogError, Result};
use crate::level::Level;
use smallvec::SmallVec;

/// Wire limit on a logger name, matching the original's `uint8_t` length
/// prefix for the `logger` field.
pub const MAX_LOGGER_NAME_LEN: usize = 255;

/// Wire limit on a message template, matching the original's `uint16_t`
/// length prefix for the `message` field.
pub const MAX_MESSAGE_LEN: usize = 65535;

/// Inline capacity for a logger name; almost all logger names are short
/// dotted identifiers well under this.
type LoggerBuf = SmallVec<[u8; 32]>;

/// Inline capacity for a message template.
type MessageBuf = SmallVec<[u8; 96]>;

/// Inline capacity for the laid-out output buffer appenders consume.
type RawBuf = SmallVec<[u8; 128]>;

/// Reserved timestamp meaning "shutdown token" for async processors.
pub const SHUTDOWN_TIMESTAMP: u64 = 0;
/// Reserved timestamp meaning "flush token" for async processors.
pub const FLUSH_TIMESTAMP: u64 = 1;

/// A single log event: a timestamp, thread id, severity, logger name,
/// message template, an encoded argument buffer, and a layout-produced
/// output buffer.
///
/// Deliberately does not derive `Clone`/`Copy`: records are meant to move
/// through the pipeline by value or be written into a preallocated ring
/// slot, never duplicated. Does derive a cheap `Default` (an empty record)
/// so an async processor can `std::mem::take` a record out of a `&mut`
/// reference to move its contents into a queue without cloning.
#[derive(Debug, Default)]
pub struct Record {
    pub timestamp: u64,
    pub thread_id: u64,
    pub level: Level,
    logger: LoggerBuf,
    message: MessageBuf,
    buffer: ArgBuffer,
    raw: RawBuf,
}

impl Record {
    /// Constructs an empty record at the given severity level.
    pub fn new(level: Level) -> Record {
        Record {
            timestamp: 0,
            thread_id: 0,
            level,
            logger: LoggerBuf::new(),
            message: MessageBuf::new(),
            buffer: ArgBuffer::new(),
            raw: RawBuf::new(),
        }
    }

    /// Builds a reserved shutdown token record for async processor queues.
    pub fn shutdown_token() -> Record {
        let mut r = Record::new(Level::None);
        r.timestamp = SHUTDOWN_TIMESTAMP;
        r
    }

    /// Builds a reserved flush token record for async processor queues.
    pub fn flush_token() -> Record {
        let mut r = Record::new(Level::None);
        r.timestamp = FLUSH_TIMESTAMP;
        r
    }

    pub fn is_shutdown_token(&self) -> bool {
        self.timestamp == SHUTDOWN_TIMESTAMP
    }

    pub fn is_flush_token(&self) -> bool {
        self.timestamp == FLUSH_TIMESTAMP
    }

    /// Resets this record to an empty state so its storage can be reused for
    /// the next log call without reallocating.
    pub fn clear(&mut self) {
        self.timestamp = 0;
        self.thread_id = 0;
        self.level = Level::None;
        self.logger.clear();
        self.message.clear();
        self.buffer.clear();
        self.raw.clear();
    }

    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    pub fn set_thread_id(&mut self, thread_id: u64) {
        self.thread_id = thread_id;
    }

    pub fn set_level(&mut self, level: Level) {
        self.level = level;
    }

    /// Sets the logger name, rejecting names over the 255-byte wire limit.
    pub fn set_logger(&mut self, name: &str) -> Result<()> {
        let bytes = name.as_bytes();
        if bytes.len() > MAX_LOGGER_NAME_LEN {
            return Err(LogError::LoggerNameTooLong(bytes.len()));
        }
        self.logger.clear();
        self.logger.extend_from_slice(bytes);
        Ok(())
    }

    /// Sets the message template, rejecting templates over the 65535-byte
    /// wire limit.
    pub fn set_message(&mut self, message: &str) -> Result<()> {
        let bytes = message.as_bytes();
        if bytes.len() > MAX_MESSAGE_LEN {
            return Err(LogError::MessageTooLong(bytes.len()));
        }
        self.message.clear();
        self.message.extend_from_slice(bytes);
        Ok(())
    }

    /// Appends one typed argument to the record's argument buffer. Oversize
    /// string arguments are truncated rather than rejected, since this runs
    /// on the hot path and must not fail.
    pub fn append_arg(&mut self, arg: &Arg) {
        encode_arg(&mut self.buffer, arg, u16::MAX as usize);
    }

    pub fn logger(&self) -> &[u8] {
        &self.logger
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub fn message_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.message)
    }

    pub fn logger_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.logger)
    }

    pub fn argument_buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Replaces the argument buffer wholesale with already-encoded bytes.
    /// Used by the replay tools, which decode a wire-framed buffer directly
    /// rather than re-capturing typed arguments.
    pub fn set_argument_buffer(&mut self, bytes: &[u8]) {
        self.buffer.clear();
        self.buffer.extend_from_slice(bytes);
    }

    /// The layout-produced output buffer. Empty iff no layout has processed
    /// this record yet; appenders only ever read this field.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Replaces the output buffer. Called exactly once per record by the
    /// layout that processes it.
    pub fn set_raw(&mut self, bytes: &[u8]) {
        self.raw.clear();
        self.raw.extend_from_slice(bytes);
    }

    pub fn raw_is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// A cheap upper-bound estimate of the record's serialized size, used by
    /// appenders/layouts that need to preallocate an output buffer.
    pub fn estimate_size(&self) -> usize {
        // timestamp + thread + level + logger len prefix + logger bytes
        // + message len prefix + message bytes + buffer len prefix + buffer bytes
        8 + 8 + 1 + 1 + self.logger.len() + 2 + self.message.len() + 4 + self.buffer.len() + self.raw.len()
    }

    /// Formats this record's message template against its argument buffer.
    pub fn format_message(&self) -> String {
        crate::argument::deserialize(&self.message_str(), &self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_resets_all_fields() {
        let mut r = Record::new(Level::Info);
        r.set_logger("app.net").unwrap();
        r.set_message("hello {}").unwrap();
        r.append_arg(&Arg::I32(1));
        r.set_timestamp(123);
        r.clear();
        assert_eq!(r.logger(), b"");
        assert_eq!(r.message(), b"");
        assert!(r.argument_buffer().is_empty());
        assert_eq!(r.timestamp, 0);
        assert_eq!(r.level, Level::None);
    }

    #[test]
    fn raw_is_empty_until_a_layout_runs() {
        let mut r = Record::new(Level::Info);
        assert!(r.raw_is_empty());
        r.set_raw(b"laid out bytes");
        assert!(!r.raw_is_empty());
        assert_eq!(r.raw(), b"laid out bytes");
    }

    #[test]
    fn tokens_are_distinguishable_from_real_timestamps() {
        let shutdown = Record::shutdown_token();
        let flush = Record::flush_token();
        assert!(shutdown.is_shutdown_token());
        assert!(flush.is_flush_token());
        assert!(!shutdown.is_flush_token());
    }

    #[test]
    fn oversize_logger_name_is_rejected() {
        let mut r = Record::new(Level::Info);
        let name = "x".repeat(MAX_LOGGER_NAME_LEN + 1);
        assert!(matches!(r.set_logger(&name), Err(LogError::LoggerNameTooLong(_))));
    }

    #[test]
    fn oversize_message_is_rejected() {
        let mut r = Record::new(Level::Info);
        let msg = "x".repeat(MAX_MESSAGE_LEN + 1);
        assert!(matches!(r.set_message(&msg), Err(LogError::MessageTooLong(_))));
    }

    #[test]
    fn format_message_uses_argument_buffer() {
        let mut r = Record::new(Level::Info);
        r.set_message("count={}").unwrap();
        r.append_arg(&Arg::I32(42));
        assert_eq!(r.format_message(), "count=42");
    }

    #[test]
    fn estimate_size_grows_with_content() {
        let mut r = Record::new(Level::Info);
        let empty = r.estimate_size();
        r.set_message("hello world").unwrap();
        assert!(r.estimate_size() > empty);
    }
}
