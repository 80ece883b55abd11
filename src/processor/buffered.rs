use super::{run_pipeline, start_core, stop_core, PipelineCore, Processor};
use crate::record::Record;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// The buffered processor: accumulates records on the calling thread and
/// only runs the pipeline step once `threshold` records have piled up (or
/// [`Processor::flush`] is called), trading per-record latency for fewer,
/// larger bursts through the appenders below it.
pub struct BufferedProcessor {
    core: PipelineCore,
    threshold: usize,
    pending: Mutex<Vec<Record>>,
    started: AtomicBool,
}

impl BufferedProcessor {
    pub fn new(core: PipelineCore, threshold: usize) -> BufferedProcessor {
        BufferedProcessor {
            core,
            threshold: threshold.max(1),
            pending: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Number of records currently held, not yet drained. Exposed for tests.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    fn drain_locked(&self, pending: &mut Vec<Record>) -> bool {
        let mut all_admitted = true;
        for mut record in pending.drain(..) {
            all_admitted &= run_pipeline(&self.core, &mut record);
        }
        all_admitted
    }
}

impl Processor for BufferedProcessor {
    fn process(&self, record: &mut Record) -> bool {
        let owned = std::mem::take(record);
        let mut pending = self.pending.lock();
        pending.push(owned);
        if pending.len() >= self.threshold {
            self.drain_locked(&mut pending)
        } else {
            true
        }
    }

    fn flush(&self) -> bool {
        let mut pending = self.pending.lock();
        let drained = self.drain_locked(&mut pending);
        drained & self.core.appenders.iter().all(|a| a.flush())
    }

    fn start(&self) -> bool {
        let was_started = self.started.swap(true, Ordering::AcqRel);
        start_core(&self.core);
        !was_started
    }

    fn stop(&self) -> bool {
        let was_started = self.started.swap(false, Ordering::AcqRel);
        if was_started {
            self.flush();
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
    use crate::level::Level;
    use std::sync::Arc;

    #[test]
    fn holds_records_until_threshold_then_drains_all_at_once() {
        let memory = Arc::new(MemoryAppender::new());
        let core = PipelineCore::new().with_appender(memory.clone());
        let processor = BufferedProcessor::new(core, 4);

        for i in 0..3u8 {
            let mut record = Record::new(Level::Info);
            record.set_timestamp(1_000 + i as u64);
            record.set_raw(&[i, 0]);
            processor.process(&mut record);
        }
        assert_eq!(processor.pending_len(), 3);
        assert!(memory.contents().is_empty());

        let mut record = Record::new(Level::Info);
        record.set_timestamp(1_003);
        record.set_raw(&[3, 0]);
        processor.process(&mut record);

        assert_eq!(processor.pending_len(), 0);
        assert_eq!(memory.contents(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn flush_drains_regardless_of_threshold() {
        let memory = Arc::new(MemoryAppender::new());
        let core = PipelineCore::new().with_appender(memory.clone());
        let processor = BufferedProcessor::new(core, 1_000);

        let mut record = Record::new(Level::Info);
        record.set_timestamp(1_000);
        record.set_raw(b"x\0");
        processor.process(&mut record);
        assert_eq!(processor.pending_len(), 1);

        processor.flush();
        assert_eq!(processor.pending_len(), 0);
        assert_eq!(memory.contents(), b"x");
    }
}
