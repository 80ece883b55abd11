//! The processor tree: composable pipeline nodes owning layouts, filters,
//! appenders, and sub-processors.
//!
//! Grounded in `include/logging/processor.h` (original_source) — a closed
//! set of variants sharing one sequential pipeline step, represented here
//! as a trait object forest (`Arc<dyn Processor>`), never a DAG: every
//! sub-processor has exactly one parent by construction.

mod async_wait;
mod async_wait_free;
mod base;
mod buffered;
mod exclusive;
mod ring;
mod sync_proc;

pub use async_wait::AsyncWaitProcessor;
pub use async_wait_free::{AsyncWaitFreePolicy, AsyncWaitFreeProcessor};
pub use base::BaseProcessor;
pub use buffered::BufferedProcessor;
pub use exclusive::ExclusiveProcessor;
pub use sync_proc::SyncProcessor;

use crate::appender::Appender;
use crate::filter::Filter;
use crate::layout::Layout;
use crate::record::Record;
use std::sync::Arc;

/// A node in the pipeline tree.
///
/// `process` takes `&mut Record` uniformly across every variant: base/sync
/// processors borrow it for the lifetime of the pipeline step, and async
/// processors `std::mem::take` it, moving its contents into a queue and
/// leaving `*record` as an empty placeholder in the caller's frame — this
/// is what "moves the record into a bounded buffer" means in owned-value
/// Rust rather than C++'s move constructor.
pub trait Processor: Send + Sync {
    /// Runs this node's pipeline step. Returns whether the record was
    /// admitted by this node's own filters (used by a parent iterating
    /// children to decide whether an exclusive sibling should short-circuit
    /// the rest of the list).
    fn process(&self, record: &mut Record) -> bool;

    fn flush(&self) -> bool {
        true
    }

    fn start(&self) -> bool {
        true
    }

    fn stop(&self) -> bool {
        true
    }

    fn is_started(&self) -> bool {
        true
    }

    /// Overridden by [`ExclusiveProcessor`]; every other variant keeps the
    /// default, meaning siblings after it still see the record regardless
    /// of whether it returned `true`.
    fn is_exclusive(&self) -> bool {
        false
    }
}

/// The shared fields every processor variant composes: a single optional
/// layout, an ordered filter list, an ordered appender list, and an ordered
/// sub-processor list.
pub struct PipelineCore {
    pub layout: Option<Arc<dyn Layout>>,
    pub filters: Vec<Arc<dyn Filter>>,
    pub appenders: Vec<Arc<dyn Appender>>,
    pub children: Vec<Arc<dyn Processor>>,
}

impl PipelineCore {
    pub fn new() -> PipelineCore {
        PipelineCore { layout: None, filters: Vec::new(), appenders: Vec::new(), children: Vec::new() }
    }

    pub fn with_layout(mut self, layout: Arc<dyn Layout>) -> PipelineCore {
        self.layout = Some(layout);
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn Filter>) -> PipelineCore {
        self.filters.push(filter);
        self
    }

    pub fn with_appender(mut self, appender: Arc<dyn Appender>) -> PipelineCore {
        self.appenders.push(appender);
        self
    }

    pub fn with_child(mut self, child: Arc<dyn Processor>) -> PipelineCore {
        self.children.push(child);
        self
    }
}

impl Default for PipelineCore {
    fn default() -> PipelineCore {
        PipelineCore::new()
    }
}

/// Runs the four-step sequential pipeline (filter → layout → append →
/// recurse) shared by every processor variant's "inline" behavior.
pub(crate) fn run_pipeline(core: &PipelineCore, record: &mut Record) -> bool {
    for filter in &core.filters {
        if !filter.filter(record) {
            return false;
        }
    }

    if let Some(layout) = &core.layout {
        if layout.is_started() {
            layout.layout(record);
        }
    }

    for appender in &core.appenders {
        appender.append(record);
    }

    for child in &core.children {
        let handled = child.process(record);
        if handled && child.is_exclusive() {
            break;
        }
    }

    true
}

/// Starts every processor in `children` (bottom-up: a child's own
/// sub-processors start before it reports started), then `appenders`.
pub(crate) fn start_core(core: &PipelineCore) -> bool {
    let mut changed = false;
    for child in &core.children {
        changed |= child.start();
    }
    for appender in &core.appenders {
        changed |= appender.start();
    }
    if let Some(layout) = &core.layout {
        changed |= layout.start();
    }
    changed
}

/// Stops `appenders` then `children` (top-down relative to start).
pub(crate) fn stop_core(core: &PipelineCore) -> bool {
    let mut changed = false;
    if let Some(layout) = &core.layout {
        changed |= layout.stop();
    }
    for appender in &core.appenders {
        changed |= appender.stop();
    }
    for child in &core.children {
        changed |= child.stop();
    }
    changed
}
