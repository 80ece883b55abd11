use super::Layout;
use crate::record::Record;

/// Assigns `raw = [0]`: the minimal non-empty output, used when a processor
/// only needs appenders to observe "something happened" (e.g. a trigger
/// counter appender) without paying for real formatting.
pub struct EmptyLayout;

impl Layout for EmptyLayout {
    fn layout(&self, record: &mut Record) {
        record.set_raw(&[0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    #[test]
    fn produces_a_single_nul_byte() {
        let mut record = Record::new(Level::Info);
        EmptyLayout.layout(&mut record);
        assert_eq!(record.raw(), &[0]);
    }
}
