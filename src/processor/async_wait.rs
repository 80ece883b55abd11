use super::{run_pipeline, start_core, stop_core, PipelineCore, Processor};
use crate::fatal;
use crate::record::Record;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// The unbounded async processor: producers never block and never drop a
/// record. Unlike [`super::AsyncWaitFreeProcessor`] this trades a hard
/// capacity bound for that guarantee, backed by `crossbeam_channel`'s
/// unbounded MPMC queue rather than a hand-rolled ring.
pub struct AsyncWaitProcessor {
    core: Arc<PipelineCore>,
    sender: Sender<Record>,
    receiver: Receiver<Record>,
    consumer: parking_lot::Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
    flush_requests: AtomicU64,
    completed_flushes: Arc<AtomicU64>,
}

impl AsyncWaitProcessor {
    pub fn new(core: PipelineCore) -> AsyncWaitProcessor {
        let (sender, receiver) = unbounded();
        AsyncWaitProcessor {
            core: Arc::new(core),
            sender,
            receiver,
            consumer: parking_lot::Mutex::new(None),
            started: AtomicBool::new(false),
            flush_requests: AtomicU64::new(0),
            completed_flushes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of records queued but not yet drained. Exposed for tests and
    /// operational introspection (e.g. a health check alerting on backlog).
    pub fn queue_len(&self) -> usize {
        self.receiver.len()
    }
}

impl Processor for AsyncWaitProcessor {
    fn process(&self, record: &mut Record) -> bool {
        let owned = std::mem::take(record);
        // An unbounded channel's `send` only fails if every receiver has
        // been dropped, which can't happen while `self` is alive.
        self.sender.send(owned).is_ok()
    }

    fn flush(&self) -> bool {
        if !self.is_started() {
            return true;
        }
        let target = self.flush_requests.fetch_add(1, Ordering::AcqRel) + 1;
        let _ = self.sender.send(Record::flush_token());
        while self.completed_flushes.load(Ordering::Acquire) < target {
            std::thread::yield_now();
        }
        true
    }

    fn start(&self) -> bool {
        let was_started = self.started.swap(true, Ordering::AcqRel);
        if was_started {
            return false;
        }
        start_core(&self.core);

        let receiver = self.receiver.clone();
        let core = self.core.clone();
        let completed_flushes = self.completed_flushes.clone();
        let handle = std::thread::Builder::new()
            .name("corelog-consumer".into())
            .spawn(move || consumer_loop(receiver, core, completed_flushes))
            .expect("spawning the async-wait consumer thread");
        *self.consumer.lock() = Some(handle);
        true
    }

    fn stop(&self) -> bool {
        let was_started = self.started.swap(false, Ordering::AcqRel);
        if !was_started {
            return false;
        }
        let _ = self.sender.send(Record::shutdown_token());
        if let Some(handle) = self.consumer.lock().take() {
            let _ = handle.join();
        }
        stop_core(&self.core);
        true
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

fn consumer_loop(receiver: Receiver<Record>, core: Arc<PipelineCore>, completed_flushes: Arc<AtomicU64>) {
    while let Ok(mut record) = receiver.recv() {
        if record.is_shutdown_token() {
            return;
        }
        if record.is_flush_token() {
            for appender in &core.appenders {
                appender.flush();
            }
            completed_flushes.fetch_add(1, Ordering::AcqRel);
            continue;
        }
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            run_pipeline(&core, &mut record);
        }));
        if result.is_err() {
            fatal::report("panic while processing a record on the async-wait consumer thread");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appender::MemoryAppender;
    use crate::level::Level;

    #[test]
    fn never_drops_under_burst_load() {
        let memory = Arc::new(MemoryAppender::new());
        let core = PipelineCore::new().with_appender(memory.clone());
        let processor = AsyncWaitProcessor::new(core);

        for i in 0..5_000u32 {
            let mut record = Record::new(Level::Info);
            record.set_timestamp(1_000 + i as u64);
            record.set_raw(&[(i % 251) as u8, 0]);
            assert!(processor.process(&mut record));
        }
        assert_eq!(processor.queue_len(), 5_000);

        processor.start();
        processor.flush();
        processor.stop();
        assert_eq!(memory.contents().len(), 5_000);
    }

    #[test]
    fn flush_waits_for_prior_records_to_drain() {
        let memory = Arc::new(MemoryAppender::new());
        let core = PipelineCore::new().with_appender(memory.clone());
        let processor = AsyncWaitProcessor::new(core);
        processor.start();

        for i in 0..100u8 {
            let mut record = Record::new(Level::Info);
            record.set_timestamp(1_000 + i as u64);
            record.set_raw(&[i, 0]);
            processor.process(&mut record);
        }
        processor.flush();
        assert_eq!(memory.contents().len(), 100);
        processor.stop();
    }
}
