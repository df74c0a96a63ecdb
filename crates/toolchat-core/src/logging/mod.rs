//! Logging abstractions
//!
//! Components take an `Arc<dyn Logger>` so the embedding application decides
//! where records go. `TracingLogger` is the default backend.

mod traits;
mod noop;
mod memory;
mod tracing_logger;

pub use traits::{Logger, LogLevel, SharedLogger};
pub use noop::NoOpLogger;
pub use memory::{LogRecord, MemoryLogger};
pub use tracing_logger::TracingLogger;
