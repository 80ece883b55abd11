//! Exercises `Logger`/config registry wiring end-to-end: registering a
//! custom pipeline, logging through it, and idempotent flush/stop.

use corelog::appender::MemoryAppender;
use corelog::argument::Arg;
use corelog::config;
use corelog::layout::TextLayout;
use corelog::processor::{AsyncWaitProcessor, PipelineCore, Processor};
use std::sync::Arc;

#[test]
fn registered_pipeline_receives_records_through_async_wait_and_flush_is_idempotent() {
    let memory = Arc::new(MemoryAppender::new());
    let core = PipelineCore::new()
        .with_layout(Arc::new(TextLayout::new("{Logger}: {Message}{EndLine}")))
        .with_appender(memory.clone());
    let root = Arc::new(AsyncWaitProcessor::new(core));
    root.start();

    config::register("tests.logger_lifecycle.unique", root.clone() as Arc<dyn Processor>);
    let logger = config::create_logger("tests.logger_lifecycle.unique");

    logger.info("hello {}", &[Arg::Str("world".into())]);
    logger.warn("count={}", &[Arg::I32(7)]);

    assert!(logger.flush());
    assert!(logger.flush());

    let contents = String::from_utf8(memory.contents()).unwrap();
    assert_eq!(
        contents,
        "tests.logger_lifecycle.unique: hello world\ntests.logger_lifecycle.unique: count=7\n"
    );

    assert!(root.stop());
    assert!(!root.stop());
}

#[test]
fn unconfigured_logger_name_falls_back_to_the_default_pipeline_without_panicking() {
    let logger = config::create_logger("tests.logger_lifecycle.never_registered");
    logger.error("boom", &[]);
    logger.flush();
}
