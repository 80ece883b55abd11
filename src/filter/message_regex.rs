use super::Filter;
use crate::error::{LogError, Result};
use crate::record::Record;
use regex::Regex;

/// Admits records whose message template matches a regex. Runs before the
/// layout step, so it always sees the raw template text, never the
/// formatted message.
pub struct MessageRegexFilter {
    pattern: Regex,
    negate: bool,
}

impl MessageRegexFilter {
    pub fn new(pattern: &str) -> Result<MessageRegexFilter> {
        let pattern = Regex::new(pattern).map_err(|e| LogError::InvalidRegex(e.to_string()))?;
        Ok(MessageRegexFilter { pattern, negate: false })
    }

    pub fn negated(pattern: &str) -> Result<MessageRegexFilter> {
        let mut f = MessageRegexFilter::new(pattern)?;
        f.negate = true;
        Ok(f)
    }
}

impl Filter for MessageRegexFilter {
    fn filter(&self, record: &Record) -> bool {
        let matches = self.pattern.is_match(&record.message_str());
        matches != self.negate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    #[test]
    fn matches_against_raw_template() {
        let filter = MessageRegexFilter::new("timeout").unwrap();
        let mut admitted = Record::new(Level::Error);
        admitted.set_message("connection timeout after {}ms").unwrap();
        let mut rejected = Record::new(Level::Error);
        rejected.set_message("connection refused").unwrap();

        assert!(filter.filter(&admitted));
        assert!(!filter.filter(&rejected));
    }
}
