use super::{payload, Appender};
use crate::level::Level;
use crate::record::Record;
use parking_lot::Mutex;
use std::io::{self, Write};

/// ANSI color codes per level, reset before each record. `None` disables
/// coloring entirely (plain file-like streams, `stderr`/`stdout` writers
/// that aren't an interactive console).
fn color_for(level: Level) -> &'static str {
    match level {
        Level::Fatal | Level::Error => "\x1b[31m", // red
        Level::Warn => "\x1b[33m",                 // yellow
        Level::Info => "\x1b[32m",                 // green
        Level::Debug => "\x1b[36m",                // cyan
        Level::None | Level::All => "",
    }
}

const RESET: &str = "\x1b[0m";

/// Writes a record's payload to any `Write` implementation: `stdout`,
/// `stderr`, an in-process debugger hook, or a wrapped console with
/// per-level coloring.
pub struct OstreamAppender {
    writer: Mutex<Box<dyn Write + Send>>,
    colorize: bool,
}

impl OstreamAppender {
    pub fn new(writer: Box<dyn Write + Send>) -> OstreamAppender {
        OstreamAppender { writer: Mutex::new(writer), colorize: false }
    }

    pub fn with_color(writer: Box<dyn Write + Send>) -> OstreamAppender {
        OstreamAppender { writer: Mutex::new(writer), colorize: true }
    }

    pub fn stdout() -> OstreamAppender {
        OstreamAppender::new(Box::new(io::stdout()))
    }

    pub fn stderr() -> OstreamAppender {
        OstreamAppender::new(Box::new(io::stderr()))
    }

    /// A console appender: `stdout`, colorized per severity.
    pub fn console() -> OstreamAppender {
        OstreamAppender::with_color(Box::new(io::stdout()))
    }

    /// A debug-hook appender: in a real debugger-attached process this
    /// would call into the platform's debug-output API; here it writes to
    /// `stderr`, which is the closest portable equivalent.
    pub fn debug() -> OstreamAppender {
        OstreamAppender::new(Box::new(io::stderr()))
    }
}

impl Appender for OstreamAppender {
    fn append(&self, record: &Record) {
        if record.raw_is_empty() {
            return;
        }
        let mut writer = self.writer.lock();
        let bytes = payload(record.raw());
        let result = if self.colorize {
            let color = color_for(record.level);
            writer
                .write_all(color.as_bytes())
                .and_then(|_| writer.write_all(bytes))
                .and_then(|_| writer.write_all(RESET.as_bytes()))
        } else {
            writer.write_all(bytes)
        };
        // Writes to console/stderr/stdout are best-effort; a failure here
        // has nowhere safe to be reported without risking recursion.
        let _ = result;
    }

    fn flush(&self) -> bool {
        self.writer.lock().flush().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct VecWriter(std::sync::Arc<Mutex<Vec<u8>>>);
    impl Write for VecWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_payload_without_color_when_disabled() {
        let sink = std::sync::Arc::new(Mutex::new(Vec::new()));
        let appender = OstreamAppender::new(Box::new(VecWriter(sink.clone())));
        let mut record = Record::new(Level::Info);
        record.set_raw(b"hello\0");
        appender.append(&record);
        assert_eq!(sink.lock().as_slice(), b"hello");
    }

    #[test]
    fn colorizes_when_enabled() {
        let sink = std::sync::Arc::new(Mutex::new(Vec::new()));
        let appender = OstreamAppender::with_color(Box::new(VecWriter(sink.clone())));
        let mut record = Record::new(Level::Error);
        record.set_raw(b"boom\0");
        appender.append(&record);
        let written = sink.lock().clone();
        assert!(written.starts_with(b"\x1b[31m"));
        assert!(written.ends_with(b"\x1b[0m"));
    }
}
