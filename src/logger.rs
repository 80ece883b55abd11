//! The producer-facing handle.
//!
//! Grounded in `include/logging/logger.h` (original_source): a cheap
//! value-type carrying a name and a shared pointer to its root processor.
//! Cloning a `Logger` is an `Arc` bump, matching "Loggers are cheaply
//! clonable value-types that each hold a shared reference to the root
//! processor."

use crate::argument::Arg;
use crate::level::Level;
use crate::processor::Processor;
use crate::record::Record;
use arc_swap::ArcSwap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Derives a stable-for-the-process-lifetime `u64` from the calling
/// thread's `std::thread::ThreadId`. The id type itself has no public
/// numeric representation on stable Rust, so we hash it.
fn current_thread_id() -> u64 {
    let mut hasher = ahash::AHasher::default();
    std::thread::current().id().hash(&mut hasher);
    hasher.finish()
}

/// Current wall-clock time in nanoseconds since the Unix epoch, clamped to
/// never collide with the reserved shutdown/flush sentinel values `0`/`1`.
fn now_nanos() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    nanos.max(2)
}

/// A named handle onto a processor tree. Building a `Record` and handing it
/// to `root` is the entire hot path; everything else happens downstream on
/// whatever thread the root processor variant schedules it on.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    root: Arc<ArcSwap<Arc<dyn Processor>>>,
    resolve: Arc<dyn Fn(&str) -> Arc<dyn Processor> + Send + Sync>,
}

impl Logger {
    pub(crate) fn new(
        name: Arc<str>,
        root: Arc<dyn Processor>,
        resolve: Arc<dyn Fn(&str) -> Arc<dyn Processor> + Send + Sync>,
    ) -> Logger {
        Logger { name, root: Arc::new(ArcSwap::new(Arc::new(root))), resolve }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, level: Level, template: &str, args: &[Arg]) {
        let mut record = Record::new(level);
        record.set_timestamp(now_nanos());
        record.set_thread_id(current_thread_id());
        // A malformed logger name or an oversize template both indicate a
        // caller bug; silently truncating would hide it, so these entry
        // points simply skip emitting rather than panicking on the hot path.
        if record.set_logger(&self.name).is_err() || record.set_message(template).is_err() {
            return;
        }
        for arg in args {
            record.append_arg(arg);
        }
        self.root.load().process(&mut record);
    }

    pub fn fatal(&self, template: &str, args: &[Arg]) {
        self.log(Level::Fatal, template, args);
    }

    pub fn error(&self, template: &str, args: &[Arg]) {
        self.log(Level::Error, template, args);
    }

    pub fn warn(&self, template: &str, args: &[Arg]) {
        self.log(Level::Warn, template, args);
    }

    pub fn info(&self, template: &str, args: &[Arg]) {
        self.log(Level::Info, template, args);
    }

    /// Compiled out entirely in release builds, matching "the whole call is
    /// elided" — callers pay nothing for debug logging outside of
    /// `debug_assertions` builds.
    #[cfg(debug_assertions)]
    pub fn debug(&self, template: &str, args: &[Arg]) {
        self.log(Level::Debug, template, args);
    }

    #[cfg(not(debug_assertions))]
    pub fn debug(&self, _template: &str, _args: &[Arg]) {}

    pub fn flush(&self) -> bool {
        self.root.load().flush()
    }

    /// Re-resolves this logger's root from the config registry it was
    /// created from, picking up a live configuration swap.
    pub fn update(&self) {
        let resolved = (self.resolve)(&self.name);
        self.root.store(Arc::new(resolved));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appender::MemoryAppender;
    use crate::layout::TextLayout;
    use crate::processor::{BaseProcessor, PipelineCore};

    fn test_logger(name: &str, appender: Arc<MemoryAppender>) -> Logger {
        let core = PipelineCore::new()
            .with_layout(Arc::new(TextLayout::new("{Message}")))
            .with_appender(appender);
        let root: Arc<dyn Processor> = Arc::new(BaseProcessor::new(core));
        Logger::new(Arc::from(name), root, Arc::new(|_| unreachable!("not exercised in this test")))
    }

    #[test]
    fn info_call_reaches_the_appender() {
        let memory = Arc::new(MemoryAppender::new());
        let logger = test_logger("app.net", memory.clone());
        logger.info("connected to {}", &[Arg::Str("host".into())]);
        assert_eq!(memory.contents(), b"connected to host");
    }

    #[test]
    fn clone_shares_the_same_root() {
        let memory = Arc::new(MemoryAppender::new());
        let logger = test_logger("app.net", memory.clone());
        let cloned = logger.clone();
        cloned.warn("hi", &[]);
        assert_eq!(memory.contents(), b"hi");
    }

    #[test]
    fn update_swaps_the_root_via_the_resolver() {
        let first_sink = Arc::new(MemoryAppender::new());
        let second_sink = Arc::new(MemoryAppender::new());
        let second_root: Arc<dyn Processor> = Arc::new(BaseProcessor::new(
            PipelineCore::new()
                .with_layout(Arc::new(TextLayout::new("{Message}")))
                .with_appender(second_sink.clone()),
        ));

        let first_root: Arc<dyn Processor> = Arc::new(BaseProcessor::new(
            PipelineCore::new()
                .with_layout(Arc::new(TextLayout::new("{Message}")))
                .with_appender(first_sink.clone()),
        ));
        let resolve: Arc<dyn Fn(&str) -> Arc<dyn Processor> + Send + Sync> =
            Arc::new(move |_name| second_root.clone());
        let logger = Logger::new(Arc::from("swap.me"), first_root, resolve);

        logger.info("before", &[]);
        assert_eq!(first_sink.contents(), b"before");

        logger.update();
        logger.info("after", &[]);
        assert_eq!(second_sink.contents(), b"after");
        assert!(first_sink.contents() == b"before");
    }
}
