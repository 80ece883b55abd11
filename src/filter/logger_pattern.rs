use super::Filter;
use crate::error::{LogError, Result};
use crate::record::Record;
use regex::Regex;

/// Admits records whose logger name matches a regex.
pub struct LoggerPatternFilter {
    pattern: Regex,
    negate: bool,
}

impl LoggerPatternFilter {
    pub fn new(pattern: &str) -> Result<LoggerPatternFilter> {
        let pattern = Regex::new(pattern).map_err(|e| LogError::InvalidRegex(e.to_string()))?;
        Ok(LoggerPatternFilter { pattern, negate: false })
    }

    pub fn negated(pattern: &str) -> Result<LoggerPatternFilter> {
        let mut f = LoggerPatternFilter::new(pattern)?;
        f.negate = true;
        Ok(f)
    }
}

impl Filter for LoggerPatternFilter {
    fn filter(&self, record: &Record) -> bool {
        let matches = self.pattern.is_match(&record.logger_str());
        matches != self.negate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    #[test]
    fn matches_against_logger_name() {
        let filter = LoggerPatternFilter::new("^net\\.").unwrap();
        let mut admitted = Record::new(Level::Info);
        admitted.set_logger("net.tcp").unwrap();
        let mut rejected = Record::new(Level::Info);
        rejected.set_logger("db.pool").unwrap();

        assert!(filter.filter(&admitted));
        assert!(!filter.filter(&rejected));
    }

    #[test]
    fn invalid_pattern_is_rejected_at_construction() {
        assert!(matches!(LoggerPatternFilter::new("("), Err(LogError::InvalidRegex(_))));
    }
}
