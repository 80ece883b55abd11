//! Process-level fatality hook for background-thread failures.
//!
//! The consumer and archiver threads cannot use another logging facade to
//! report their own failures (this crate *is* the logging facade), so an
//! unrecoverable failure on either thread funnels through a single
//! swappable hook. The default hook prints to stderr and aborts the
//! process, matching the original design's intent that a background-thread
//! panic should not silently degrade into a logger that looks alive but
//! drops everything.

use once_cell::sync::OnceCell;
use std::sync::Arc;

type Hook = dyn Fn(&str) + Send + Sync;

static HOOK: OnceCell<Arc<Hook>> = OnceCell::new();

fn default_hook(message: &str) {
    eprintln!("corelog: fatal error on background thread: {message}");
    std::process::abort();
}

/// Installs a custom fatality hook. Only the first call has effect; later
/// calls are ignored so test suites can install a capturing hook once.
pub fn set_hook(hook: impl Fn(&str) + Send + Sync + 'static) {
    let _ = HOOK.set(Arc::new(hook));
}

/// Reports a fatal background-thread failure.
pub fn report(message: &str) {
    match HOOK.get() {
        Some(hook) => hook(message),
        None => default_hook(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn default_hook_exists_without_panicking_to_install() {
        // Installing a hook is idempotent-safe; we don't invoke `report` here
        // because the default aborts the process.
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        // This may lose the race against other tests that already set a hook
        // in-process; either way, no panic should occur.
        set_hook(|_| {
            CALLS.fetch_add(1, Ordering::SeqCst);
        });
    }
}
