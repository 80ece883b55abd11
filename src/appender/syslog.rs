use super::{payload, Appender};
use crate::level::Level;
use crate::record::Record;

/// Maps a severity level to a syslog priority (RFC 5424 numeric levels),
/// collapsing the library's seven-level scale onto syslog's eight.
fn priority_for(level: Level) -> u8 {
    match level {
        Level::None => 7,  // debug
        Level::Fatal => 2, // critical
        Level::Error => 3, // error
        Level::Warn => 4,  // warning
        Level::Info => 6,  // informational
        Level::Debug => 7, // debug
        Level::All => 7,
    }
}

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use parking_lot::Mutex;
    use std::os::unix::net::UnixDatagram;

    /// A `/dev/log` syslog appender using a raw `UnixDatagram`, sending a
    /// minimal RFC 3164-style `<priority>message` datagram. Avoids binding
    /// libc's `syslog()` so the appender stays a pure-Rust socket client.
    pub struct SyslogAppender {
        socket: Mutex<Option<UnixDatagram>>,
        facility: u8,
    }

    impl SyslogAppender {
        /// `facility` is the syslog facility code (e.g. `1` for `user`).
        pub fn new(facility: u8) -> SyslogAppender {
            let socket = UnixDatagram::unbound().ok().and_then(|s| {
                s.connect("/dev/log").ok()?;
                Some(s)
            });
            SyslogAppender { socket: Mutex::new(socket), facility }
        }
    }

    impl Appender for SyslogAppender {
        fn append(&self, record: &Record) {
            if record.raw_is_empty() {
                return;
            }
            let priority = self.facility * 8 + priority_for(record.level);
            let mut datagram = format!("<{priority}>").into_bytes();
            datagram.extend_from_slice(payload(record.raw()));

            let guard = self.socket.lock();
            if let Some(socket) = guard.as_ref() {
                let _ = socket.send(&datagram);
            }
        }
    }
}

#[cfg(not(unix))]
mod fallback_impl {
    use super::*;

    /// Non-Unix platforms have no `/dev/log`; the appender degrades to a
    /// no-op rather than failing to construct.
    pub struct SyslogAppender;

    impl SyslogAppender {
        pub fn new(_facility: u8) -> SyslogAppender {
            SyslogAppender
        }
    }

    impl Appender for SyslogAppender {
        fn append(&self, _record: &Record) {}
    }
}

#[cfg(unix)]
pub use unix_impl::SyslogAppender;
#[cfg(not(unix))]
pub use fallback_impl::SyslogAppender;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_mapping_is_monotonic_with_severity() {
        assert!(priority_for(Level::Fatal) < priority_for(Level::Warn));
        assert!(priority_for(Level::Warn) < priority_for(Level::Debug));
    }
}
