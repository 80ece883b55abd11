use super::Appender;
use crate::record::Record;

/// Discards every record. Useful as a processor's appender when only its
/// filters/sub-processors matter (e.g. a trigger-counting exclusive node).
pub struct NullAppender;

impl Appender for NullAppender {
    fn append(&self, _record: &Record) {}
}
