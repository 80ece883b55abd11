//! Pattern-based text layout.
//!
//! Compiles a pattern once, at construction, into a vector of tokens
//! (literal spans and placeholders) — grounded in
//! `source/logging/layouts/text_layout.cpp`'s `AppendPattern` /
//! `AppendPlaceholder` tokenizer (original_source). Calendar decomposition
//! uses `chrono` rather than hand-rolled calendar math (the teacher depends
//! on `chrono` for exactly this).

use super::Layout;
use crate::record::Record;
use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};
use parking_lot::Mutex;

/// The pattern used wherever a caller hasn't configured their own: the
/// config registry's default pipeline and the replay CLIs both render
/// through this.
pub const DEFAULT_PATTERN: &str = "{UtcDateTime} {Level} {Logger} - {Message}{EndLine}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    UtcDateTime,
    UtcDate,
    UtcTime,
    UtcYear,
    UtcMonth,
    UtcDay,
    UtcHour,
    UtcMinute,
    UtcSecond,
    UtcTimezone,
    LocalDateTime,
    LocalDate,
    LocalTime,
    LocalYear,
    LocalMonth,
    LocalDay,
    LocalHour,
    LocalMinute,
    LocalSecond,
    LocalTimezone,
    Millisecond,
    Microsecond,
    Nanosecond,
    Thread,
    Level,
    Logger,
    Message,
    EndLine,
}

impl Placeholder {
    fn parse(name: &str) -> Option<Placeholder> {
        use Placeholder::*;
        Some(match name {
            "UtcDateTime" => UtcDateTime,
            "UtcDate" => UtcDate,
            "UtcTime" => UtcTime,
            "UtcYear" => UtcYear,
            "UtcMonth" => UtcMonth,
            "UtcDay" => UtcDay,
            "UtcHour" => UtcHour,
            "UtcMinute" => UtcMinute,
            "UtcSecond" => UtcSecond,
            "UtcTimezone" => UtcTimezone,
            "LocalDateTime" => LocalDateTime,
            "LocalDate" => LocalDate,
            "LocalTime" => LocalTime,
            "LocalYear" => LocalYear,
            "LocalMonth" => LocalMonth,
            "LocalDay" => LocalDay,
            "LocalHour" => LocalHour,
            "LocalMinute" => LocalMinute,
            "LocalSecond" => LocalSecond,
            "LocalTimezone" => LocalTimezone,
            "Millisecond" => Millisecond,
            "Microsecond" => Microsecond,
            "Nanosecond" => Nanosecond,
            "Thread" => Thread,
            "Level" => Level,
            "Logger" => Logger,
            "Message" => Message,
            "EndLine" => EndLine,
            _ => return None,
        })
    }
}

enum Token {
    Literal(String),
    Field(Placeholder),
}

/// A compiled time decomposition, recomputed only when the record's
/// timestamp moves into a new second (for the calendar fields) or a new
/// microsecond/nanosecond (for the sub-second fields) — purely a
/// performance optimization with no observable effect if omitted
/// (see the design note this mirrors in `rolling::time`).
struct Cache {
    second: i64,
    utc: DateTime<Utc>,
    local: DateTime<Local>,
    utc_tz: String,
    local_tz: String,
    nanos_in_second: u32,
    millisecond: String,
    microsecond: String,
    nanosecond: String,
}

impl Cache {
    fn for_timestamp(timestamp_ns: u64) -> Cache {
        let total_secs = (timestamp_ns / 1_000_000_000) as i64;
        let nanos_in_second = (timestamp_ns % 1_000_000_000) as u32;
        let utc = Utc.timestamp_opt(total_secs, nanos_in_second).single().unwrap_or_else(|| {
            Utc.timestamp_opt(0, 0).single().expect("epoch is always valid")
        });
        let local: DateTime<Local> = utc.with_timezone(&Local);
        Cache {
            second: total_secs,
            utc_tz: format_utc_offset(&utc),
            local_tz: format_offset(&local),
            millisecond: format!("{:03}", nanos_in_second / 1_000_000),
            microsecond: format!("{:03}", (nanos_in_second / 1_000) % 1_000),
            nanosecond: format!("{:03}", nanos_in_second % 1_000),
            utc,
            local,
            nanos_in_second,
        }
    }
}

fn format_utc_offset(_dt: &DateTime<Utc>) -> String {
    "Z".to_string()
}

fn format_offset(dt: &DateTime<Local>) -> String {
    dt.format("%:z").to_string()
}

/// A text layout compiled from a pattern string.
pub struct TextLayout {
    tokens: Vec<Token>,
    cache: Mutex<Option<Cache>>,
}

impl TextLayout {
    /// Compiles `pattern` into a token list. Unknown placeholders (anything
    /// inside `{…}` that isn't a recognized name) pass through verbatim,
    /// braces included.
    pub fn new(pattern: &str) -> TextLayout {
        TextLayout {
            tokens: compile(pattern),
            cache: Mutex::new(None),
        }
    }

    fn render(&self, record: &Record) -> String {
        let mut cache_guard = self.cache.lock();
        let needs_refresh = match cache_guard.as_ref() {
            Some(c) => {
                let secs = (record.timestamp / 1_000_000_000) as i64;
                let nanos = (record.timestamp % 1_000_000_000) as u32;
                c.second != secs || c.nanos_in_second != nanos
            }
            None => true,
        };
        if needs_refresh {
            *cache_guard = Some(Cache::for_timestamp(record.timestamp));
        }
        let cache = cache_guard.as_ref().unwrap();

        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(s) => out.push_str(s),
                Token::Field(p) => render_placeholder(*p, record, cache, &mut out),
            }
        }
        out
    }
}

impl Layout for TextLayout {
    fn layout(&self, record: &mut Record) {
        let rendered = self.render(record);
        // `raw` is always NUL-terminated (see `Record`'s invariants) so it
        // can be passed through to the system log as a C string.
        let mut bytes = rendered.into_bytes();
        bytes.push(0);
        record.set_raw(&bytes);
    }
}

fn render_placeholder(p: Placeholder, record: &Record, cache: &Cache, out: &mut String) {
    use Placeholder::*;
    match p {
        UtcDateTime => out.push_str(&cache.utc.format("%Y-%m-%d %H:%M:%S").to_string()),
        UtcDate => out.push_str(&cache.utc.format("%Y-%m-%d").to_string()),
        UtcTime => out.push_str(&cache.utc.format("%H:%M:%S").to_string()),
        UtcYear => out.push_str(&format!("{:04}", cache.utc.year())),
        UtcMonth => out.push_str(&format!("{:02}", cache.utc.month())),
        UtcDay => out.push_str(&format!("{:02}", cache.utc.day())),
        UtcHour => out.push_str(&format!("{:02}", cache.utc.hour())),
        UtcMinute => out.push_str(&format!("{:02}", cache.utc.minute())),
        UtcSecond => out.push_str(&format!("{:02}", cache.utc.second())),
        UtcTimezone => out.push_str(&cache.utc_tz),
        LocalDateTime => out.push_str(&cache.local.format("%Y-%m-%d %H:%M:%S").to_string()),
        LocalDate => out.push_str(&cache.local.format("%Y-%m-%d").to_string()),
        LocalTime => out.push_str(&cache.local.format("%H:%M:%S").to_string()),
        LocalYear => out.push_str(&format!("{:04}", cache.local.year())),
        LocalMonth => out.push_str(&format!("{:02}", cache.local.month())),
        LocalDay => out.push_str(&format!("{:02}", cache.local.day())),
        LocalHour => out.push_str(&format!("{:02}", cache.local.hour())),
        LocalMinute => out.push_str(&format!("{:02}", cache.local.minute())),
        LocalSecond => out.push_str(&format!("{:02}", cache.local.second())),
        LocalTimezone => out.push_str(&cache.local_tz),
        Millisecond => out.push_str(&cache.millisecond),
        Microsecond => out.push_str(&cache.microsecond),
        Nanosecond => out.push_str(&cache.nanosecond),
        Thread => out.push_str(&format!("0x{:X}", record.thread_id)),
        Level => out.push_str(record.level.as_padded_str()),
        Logger => out.push_str(&record.logger_str()),
        Message => out.push_str(&record.format_message()),
        EndLine => out.push('\n'),
    }
}

/// Tokenizes `pattern` into literal spans and recognized placeholders.
fn compile(pattern: &str) -> Vec<Token> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut i = 0usize;

    while i < chars.len() {
        if chars[i] == '{' {
            if let Some(close) = chars[i..].iter().position(|&c| c == '}') {
                let close = i + close;
                let name: String = chars[i + 1..close].iter().collect();
                if let Some(p) = Placeholder::parse(&name) {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(Token::Field(p));
                    i = close + 1;
                    continue;
                }
            }
            // Unknown or unterminated placeholder: pass the brace through
            // literally and keep scanning from the next character.
            literal.push('{');
            i += 1;
        } else {
            literal.push(chars[i]);
            i += 1;
        }
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}
