use super::{run_pipeline, start_core, stop_core, PipelineCore, Processor};
use crate::record::Record;
use std::sync::atomic::{AtomicBool, Ordering};

/// Identical pipeline step to [`super::BaseProcessor`], but `is_exclusive`
/// returns `true`: when this node admits a record, its parent's
/// `run_pipeline` stops iterating remaining siblings, letting one branch of
/// the tree claim a record to the exclusion of the rest.
pub struct ExclusiveProcessor {
    core: PipelineCore,
    started: AtomicBool,
}

impl ExclusiveProcessor {
    pub fn new(core: PipelineCore) -> ExclusiveProcessor {
        ExclusiveProcessor { core, started: AtomicBool::new(false) }
    }
}

impl Processor for ExclusiveProcessor {
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

    fn is_exclusive(&self) -> bool {
        true
    }
}
