//! Logger backed by the `tracing` crate
//!
//! The embedding binary owns subscriber setup (`tracing-subscriber`, OTLP,
//! ...); this adapter only emits events. Each instance carries a component
//! name that is recorded as the `component` field.

use super::traits::{LogLevel, Logger};

/// Forwards log records to `tracing`
#[derive(Debug, Clone)]
pub struct TracingLogger {
    component: String,
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("toolchat")
    }
}

impl TracingLogger {
    /// Create a tracing logger for the given component
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// The component name recorded on every event
    pub fn component(&self) -> &str {
        &self.component
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        let component = self.component.as_str();
        match level {
            LogLevel::Debug => tracing::debug!(component, "{}", message),
            LogLevel::Info => tracing::info!(component, "{}", message),
            LogLevel::Warn => tracing::warn!(component, "{}", message),
            LogLevel::Error => tracing::error!(component, "{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_logger_without_subscriber() {
        // No subscriber installed: events are dropped, nothing panics.
        let logger = TracingLogger::new("registry");
        assert_eq!(logger.component(), "registry");
        logger.debug("debug message");
        logger.warn("warn message");
        logger.error("error message");
    }
}
