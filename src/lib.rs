//! A high-throughput, low-latency structured logging pipeline.
//!
//! Producers call a [`logger::Logger`]'s severity method with a format
//! template and a slice of typed [`argument::Arg`] values; the call builds a
//! [`record::Record`] and hands it to the logger's root
//! [`processor::Processor`]. From there a [`layout`] renders the record's
//! bytes, an ordered list of [`filter`]s may veto it first, and an ordered
//! list of [`appender`]s consumes whatever the layout produced. The
//! processor tree (not a DAG — every node has exactly one parent) decides
//! whether that work happens inline on the caller's thread or is handed off
//! to a dedicated consumer thread.
//!
//! [`config`] is the process-wide name → pipeline registry most callers
//! should start from: `corelog::config::create_logger("app.net")`.

pub mod appender;
pub mod argument;
pub mod config;
pub mod error;
pub mod fatal;
pub mod filter;
pub mod layout;
pub mod level;
pub mod logger;
pub mod processor;
pub mod record;

pub use argument::Arg;
pub use error::{LogError, Result};
pub use level::Level;
pub use logger::Logger;
pub use record::Record;
