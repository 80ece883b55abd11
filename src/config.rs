//! Process-wide logger name → root processor registry.
//!
//! Grounded in `include/logging/config.h` (original_source): a single
//! reader-writer-locked map, lazily seeded with a default `text layout →
//! console appender` pipeline under the empty-string key the first time
//! any unconfigured name is requested.

use crate::appender::OstreamAppender;
use crate::layout::{TextLayout, DEFAULT_PATTERN};
use crate::logger::Logger;
use crate::processor::{BaseProcessor, PipelineCore, Processor};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// The process-wide registry. One instance, reachable only through the
/// free functions below — mirrors the teacher's single global dispatcher
/// rather than exposing the lock type to callers.
pub struct Registry {
    processors: RwLock<HashMap<String, Arc<dyn Processor>, ahash::RandomState>>,
}

impl Registry {
    fn new() -> Registry {
        Registry { processors: RwLock::new(HashMap::default()) }
    }

    /// Installs `root` under `name`, replacing whatever was there. Existing
    /// `Logger` handles bound to the old root keep working until they next
    /// call `update()`.
    pub fn register(&self, name: impl Into<String>, root: Arc<dyn Processor>) {
        self.processors.write().insert(name.into(), root);
    }

    fn default_root(&self) -> Arc<dyn Processor> {
        if let Some(root) = self.processors.read().get("") {
            return root.clone();
        }
        let mut map = self.processors.write();
        if let Some(root) = map.get("") {
            return root.clone();
        }
        let root = default_pipeline();
        map.insert(String::new(), root.clone());
        root
    }

    /// Resolves the current root for `name`, falling back to the default
    /// pipeline when nothing is registered under that exact name.
    pub fn resolve(&self, name: &str) -> Arc<dyn Processor> {
        if let Some(root) = self.processors.read().get(name) {
            return root.clone();
        }
        self.default_root()
    }

    pub fn create_logger(&'static self, name: &str) -> Logger {
        let root = self.resolve(name);
        Logger::new(Arc::from(name), root, Arc::new(move |n| self.resolve(n)))
    }

    /// Starts every registered root bottom-up. Returns whether any
    /// processor actually transitioned from stopped to started.
    pub fn startup(&self) -> bool {
        let mut changed = false;
        for root in self.processors.read().values() {
            changed |= root.start();
        }
        changed
    }

    /// Stops every registered root top-down, joining any consumer threads
    /// owned by async variants.
    pub fn shutdown(&self) -> bool {
        let mut changed = false;
        for root in self.processors.read().values() {
            changed |= root.stop();
        }
        changed
    }
}

fn default_pipeline() -> Arc<dyn Processor> {
    let core = PipelineCore::new()
        .with_layout(Arc::new(TextLayout::new(DEFAULT_PATTERN)))
        .with_appender(Arc::new(OstreamAppender::console()));
    Arc::new(BaseProcessor::new(core))
}

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Returns a `Logger` bound to `name`'s current root, seeding the default
/// pipeline under the empty key if this is the first call for an
/// unconfigured name.
pub fn create_logger(name: &str) -> Logger {
    REGISTRY.create_logger(name)
}

/// Installs `root` as the pipeline for `name` (or the default pipeline when
/// `name` is empty).
pub fn register(name: impl Into<String>, root: Arc<dyn Processor>) {
    REGISTRY.register(name, root);
}

pub fn startup() -> bool {
    REGISTRY.startup()
}

pub fn shutdown() -> bool {
    REGISTRY.shutdown()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appender::MemoryAppender;

    #[test]
    fn unconfigured_name_gets_the_default_pipeline() {
        let logger = create_logger("scratch.unconfigured.unique.a");
        logger.info("hello", &[]);
    }

    #[test]
    fn registered_root_is_used_over_the_default() {
        let memory = Arc::new(MemoryAppender::new());
        let core = PipelineCore::new()
            .with_layout(Arc::new(TextLayout::new("{Message}")))
            .with_appender(memory.clone());
        register("scratch.registered.unique.b", Arc::new(BaseProcessor::new(core)));

        let logger = create_logger("scratch.registered.unique.b");
        logger.info("routed", &[]);
        assert_eq!(memory.contents(), b"routed");
    }

    #[test]
    fn startup_and_shutdown_touch_every_registered_root() {
        let memory = Arc::new(MemoryAppender::new());
        let core = PipelineCore::new().with_appender(memory);
        register("scratch.lifecycle.unique.c", Arc::new(BaseProcessor::new(core)));

        assert!(startup());
        assert!(shutdown());
    }
}
