use std::fmt;

/// Sink for non-fatal operational failures (renewal and deregistration).
pub trait Logger: Send + Sync {
    fn error(&self, message: fmt::Arguments<'_>);
}

/// Default [`Logger`], forwarding to `tracing` at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, message: fmt::Arguments<'_>) {
        tracing::error!("{}", message);
    }
}
