//! Layouts: transformations from a `Record` into its output byte form.
//!
//! Grounded in `include/logging/layout.h` (original_source): a closed,
//! compile-time-known set of implementations, represented here as a trait
//! object behind `Arc<dyn Layout>` rather than an enum, since layouts carry
//! meaningfully different internal state (a compiled placeholder list, a
//! time-decomposition cache) that doesn't fit neatly into one tagged
//! variant's fields. A processor holds at most one.

mod binary;
mod empty;
mod hash;
mod null;
mod text;

pub use binary::{decode as decode_binary, encode as encode_binary, BinaryLayout, DecodedRecord};
pub use empty::EmptyLayout;
pub use hash::{decode as decode_hash, fnv1a, DecodedHashRecord, HashDictionary, HashLayout};
pub use null::NullLayout;
pub use text::{TextLayout, DEFAULT_PATTERN};

use crate::record::Record;

/// A transformation from a record into its `raw` output buffer.
///
/// Mirrors the appender contract's start/stop lifecycle: a layout that is
/// not started leaves `raw` untouched (which, per the Null layout's
/// contract, is the appender short-circuit signal).
pub trait Layout: Send + Sync {
    /// Populates `record`'s `raw` buffer from its other fields.
    fn layout(&self, record: &mut Record);

    fn is_started(&self) -> bool {
        true
    }

    fn start(&self) -> bool {
        true
    }

    fn stop(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    #[test]
    fn null_layout_leaves_raw_empty() {
        let layout = NullLayout;
        let mut record = Record::new(Level::Info);
        record.set_message("hi").unwrap();
        layout.layout(&mut record);
        assert!(record.raw_is_empty());
    }
}
