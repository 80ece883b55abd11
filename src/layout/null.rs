use super::Layout;
use crate::record::Record;

/// A no-op layout. `raw` stays empty, which appenders treat as "skip this
/// record" — the cheapest possible way to wire up a processor that filters
/// but never emits.
pub struct NullLayout;

impl Layout for NullLayout {
    fn layout(&self, _record: &mut Record) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    #[test]
    fn leaves_raw_untouched() {
        let mut record = Record::new(Level::Info);
        record.set_message("hello").unwrap();
        NullLayout.layout(&mut record);
        assert!(record.raw_is_empty());
    }
}
