use std::fmt;

/// Receives non-fatal numeric warnings raised during summarization.
///
/// Injected into the evaluation so that warnings are scoped to it instead of
/// going through process-wide state.
pub trait WarningSink: fmt::Debug + Send + Sync {
    fn warn(&self, message: &str);
}

/// Forwards warnings to `tracing` at `WARN` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWarningSink;

impl WarningSink for TracingWarningSink {
    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }
}
