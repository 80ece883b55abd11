//! Time-pattern rollover: filename recomputed from a truncated period
//! boundary. Grounded in `rolling_file_appender.cpp`'s `TimePolicyImpl`
//! (original_source).

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollInterval {
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

#[derive(Clone)]
pub struct TimePolicyConfig {
    pub directory: PathBuf,
    pub filename_pattern: String,
    pub interval: RollInterval,
    pub archive: bool,
    pub truncate: bool,
    pub auto_flush: bool,
}

fn to_utc(timestamp_ns: u64) -> DateTime<Utc> {
    let secs = (timestamp_ns / 1_000_000_000) as i64;
    let nanos = (timestamp_ns % 1_000_000_000) as u32;
    Utc.timestamp_opt(secs, nanos).single().unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap())
}

/// Truncates `timestamp_ns` down to the start of its rolling period,
/// returned as whole seconds since the epoch — the `rollover_stamp` that a
/// new record's own truncated timestamp is compared against.
pub fn truncate_to_period(timestamp_ns: u64, interval: RollInterval) -> i64 {
    let dt = to_utc(timestamp_ns);
    let truncated = match interval {
        RollInterval::Second => dt,
        RollInterval::Minute => dt.with_second(0).unwrap(),
        RollInterval::Hour => dt.with_minute(0).unwrap().with_second(0).unwrap(),
        RollInterval::Day => dt
            .with_hour(0)
            .unwrap()
            .with_minute(0)
            .unwrap()
            .with_second(0)
            .unwrap(),
        RollInterval::Month => Utc
            .with_ymd_and_hms(dt.year(), dt.month(), 1, 0, 0, 0)
            .single()
            .unwrap(),
        RollInterval::Year => Utc.with_ymd_and_hms(dt.year(), 1, 1, 0, 0, 0).single().unwrap(),
    };
    truncated.timestamp()
}

/// Renders the filename-pattern subset of the text-layout placeholder
/// grammar (date/time fields only) against `timestamp_ns`, replacing any
/// colon in the result with a dash so the output is filesystem-safe.
pub fn render_filename(pattern: &str, timestamp_ns: u64) -> String {
    let utc = to_utc(timestamp_ns);
    let local = utc.with_timezone(&chrono::Local);

    let mut rendered = String::with_capacity(pattern.len());
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        if chars[i] == '{' {
            if let Some(close) = chars[i..].iter().position(|&c| c == '}') {
                let close = i + close;
                let name: String = chars[i + 1..close].iter().collect();
                if let Some(text) = render_field(&name, &utc, &local) {
                    rendered.push_str(&text);
                    i = close + 1;
                    continue;
                }
            }
            rendered.push('{');
            i += 1;
        } else {
            rendered.push(chars[i]);
            i += 1;
        }
    }
    rendered.replace(':', "-")
}

fn render_field(
    name: &str,
    utc: &DateTime<Utc>,
    local: &DateTime<chrono::Local>,
) -> Option<String> {
    Some(match name {
        "UtcDateTime" => utc.format("%Y-%m-%d %H:%M:%S").to_string(),
        "UtcDate" => utc.format("%Y-%m-%d").to_string(),
        "UtcTime" => utc.format("%H:%M:%S").to_string(),
        "UtcYear" => format!("{:04}", utc.year()),
        "UtcMonth" => format!("{:02}", utc.month()),
        "UtcDay" => format!("{:02}", utc.day()),
        "UtcHour" => format!("{:02}", utc.hour()),
        "UtcMinute" => format!("{:02}", utc.minute()),
        "UtcSecond" => format!("{:02}", utc.second()),
        "UtcTimezone" => "Z".to_string(),
        "LocalDateTime" => local.format("%Y-%m-%d %H:%M:%S").to_string(),
        "LocalDate" => local.format("%Y-%m-%d").to_string(),
        "LocalTime" => local.format("%H:%M:%S").to_string(),
        "LocalYear" => format!("{:04}", local.year()),
        "LocalMonth" => format!("{:02}", local.month()),
        "LocalDay" => format!("{:02}", local.day()),
        "LocalHour" => format!("{:02}", local.hour()),
        "LocalMinute" => format!("{:02}", local.minute()),
        "LocalSecond" => format!("{:02}", local.second()),
        "LocalTimezone" => local.format("%:z").to_string(),
        _ => return None,
    })
}
