use super::{payload, Appender};
use crate::record::Record;
use parking_lot::Mutex;

/// Appends each record's payload to a growing, externally readable byte
/// vector. Used heavily in tests as a deterministic sink.
#[derive(Default)]
pub struct MemoryAppender {
    buffer: Mutex<Vec<u8>>,
}

impl MemoryAppender {
    pub fn new() -> MemoryAppender {
        MemoryAppender { buffer: Mutex::new(Vec::new()) }
    }

    pub fn contents(&self) -> Vec<u8> {
        self.buffer.lock().clone()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

impl Appender for MemoryAppender {
    fn append(&self, record: &Record) {
        if record.raw_is_empty() {
            return;
        }
        self.buffer.lock().extend_from_slice(payload(record.raw()));
    }
}
