use parking_lot::Mutex;

/// Sink for warnings and errors raised by collectors. Fire-and-forget.
pub trait Reporter: Send + Sync {
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards diagnostics to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Warn(String),
    Error(String),
}

/// Keeps every diagnostic in memory, in order. Used by tests and by the runner's
/// end-of-run summary.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    seen: Mutex<Vec<Diagnostic>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.seen.lock().clone()
    }

    pub fn errors(&self) -> usize {
        self.seen
            .lock()
            .iter()
            .filter(|d| matches!(d, Diagnostic::Error(_)))
            .count()
    }

    pub fn warnings(&self) -> usize {
        self.seen
            .lock()
            .iter()
            .filter(|d| matches!(d, Diagnostic::Warn(_)))
            .count()
    }
}

impl Reporter for RecordingReporter {
    fn warn(&self, message: &str) {
        self.seen.lock().push(Diagnostic::Warn(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.seen.lock().push(Diagnostic::Error(message.to_string()));
    }
}

/// Records like `RecordingReporter` and also forwards to `tracing`.
#[derive(Debug, Default)]
pub struct TeeReporter {
    pub recorded: RecordingReporter,
}

impl Reporter for TeeReporter {
    fn warn(&self, message: &str) {
        TracingReporter.warn(message);
        self.recorded.warn(message);
    }

    fn error(&self, message: &str) {
        TracingReporter.error(message);
        self.recorded.error(message);
    }
}
