use super::Filter;
use crate::level::Level;
use crate::record::Record;

/// Admits records whose level falls within `[from, to]` inclusive, or (when
/// `negate` is set) admits everything outside that range.
pub struct LevelRangeFilter {
    from: Level,
    to: Level,
    negate: bool,
}

impl LevelRangeFilter {
    pub fn new(from: Level, to: Level) -> LevelRangeFilter {
        LevelRangeFilter { from, to, negate: false }
    }

    pub fn negated(from: Level, to: Level) -> LevelRangeFilter {
        LevelRangeFilter { from, to, negate: true }
    }
}

impl Filter for LevelRangeFilter {
    fn filter(&self, record: &Record) -> bool {
        let in_range = record.level >= self.from && record.level <= self.to;
        in_range != self.negate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_at(level: Level) -> Record {
        Record::new(level)
    }

    #[test]
    fn inclusive_range_admits_boundaries() {
        let filter = LevelRangeFilter::new(Level::Error, Level::Warn);
        assert!(filter.filter(&record_at(Level::Warn)));
        assert!(filter.filter(&record_at(Level::Error)));
        assert!(!filter.filter(&record_at(Level::Info)));
    }

    #[test]
    fn negated_range_inverts_admission() {
        let filter = LevelRangeFilter::negated(Level::Error, Level::Warn);
        assert!(!filter.filter(&record_at(Level::Warn)));
        assert!(filter.filter(&record_at(Level::Info)));
    }
}
