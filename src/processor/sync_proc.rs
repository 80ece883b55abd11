use super::{run_pipeline, start_core, stop_core, PipelineCore, Processor};
use crate::record::Record;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// The synchronous processor: identical pipeline to [`super::BaseProcessor`],
/// wrapped in a process-local mutex so concurrent producer threads calling
/// into the same tree serialize at this node.
pub struct SyncProcessor {
    core: PipelineCore,
    lock: Mutex<()>,
    started: AtomicBool,
}

impl SyncProcessor {
    pub fn new(core: PipelineCore) -> SyncProcessor {
        SyncProcessor { core, lock: Mutex::new(()), started: AtomicBool::new(false) }
    }
}

impl Processor for SyncProcessor {
    fn process(&self, record: &mut Record) -> bool {
        let _guard = self.lock.lock();
        run_pipeline(&self.core, record)
    }

    fn flush(&self) -> bool {
        let _guard = self.lock.lock();
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
