use super::Filter;
use crate::record::Record;
use std::sync::atomic::{AtomicBool, Ordering};

/// A single atomic boolean gate, flippable from outside the pipeline (e.g.
/// a debug-mode toggle or an admin endpoint) without reconfiguring the
/// processor tree.
pub struct SwitchFilter {
    enabled: AtomicBool,
}

impl SwitchFilter {
    pub fn new(initially_enabled: bool) -> SwitchFilter {
        SwitchFilter { enabled: AtomicBool::new(initially_enabled) }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl Filter for SwitchFilter {
    fn filter(&self, _record: &Record) -> bool {
        self.is_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    #[test]
    fn toggles_admission_live() {
        let filter = SwitchFilter::new(true);
        let record = Record::new(Level::Info);
        assert!(filter.filter(&record));
        filter.disable();
        assert!(!filter.filter(&record));
        filter.enable();
        assert!(filter.filter(&record));
    }
}
