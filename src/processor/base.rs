use super::{run_pipeline, start_core, stop_core, PipelineCore, Processor};
use crate::record::Record;
use std::sync::atomic::{AtomicBool, Ordering};

/// The sequential processor: runs filter → layout → append → recurse
/// inline on the calling thread, no synchronization beyond whatever its
/// appenders need internally.
pub struct BaseProcessor {
    core: PipelineCore,
    started: AtomicBool,
}

impl BaseProcessor {
    pub fn new(core: PipelineCore) -> BaseProcessor {
        BaseProcessor { core, started: AtomicBool::new(false) }
    }
}

impl Processor for BaseProcessor {
    fn process(&self, record: &mut Record) -> bool {
        run_pipeline(&self.core, record)
    }

    fn flush(&self) -> bool {
        self.core.appenders.iter().all(|a| a.flush())
    }

    fn start(&self) -> bool {
        let was_started = self.started.swap(true, Ordering::AcqRel);
        start_core(&self.core);
        !was_started
    }

    fn stop(&self) -> bool {
        let was_started = self.started.swap(false, Ordering::AcqRel);
        if was_started {
            stop_core(&self.core);
        }
        was_started
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appender::MemoryAppender;
    use crate::layout::TextLayout;
    use crate::level::Level;
    use std::sync::Arc;

    #[test]
    fn runs_filter_layout_append_in_order() {
        let memory = Arc::new(MemoryAppender::new());
        let core = PipelineCore::new()
            .with_layout(Arc::new(TextLayout::new("{Message}")))
            .with_appender(memory.clone());
        let processor = BaseProcessor::new(core);

        let mut record = Record::new(Level::Info);
        record.set_message("hello").unwrap();
        assert!(processor.process(&mut record));
        assert_eq!(memory.contents(), b"hello");
    }

    #[test]
    fn start_stop_are_idempotent() {
        let processor = BaseProcessor::new(PipelineCore::new());
        assert!(processor.start());
        assert!(!processor.start());
        assert!(processor.stop());
        assert!(!processor.stop());
    }
}
