use parking_lot::Mutex;

/// Operator-visible channel for dropped samples and skipped files.
/// Never used to stop processing.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, message: String);
}

/// Forwards every diagnostic to `tracing` at WARN.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, message: String) {
        tracing::warn!(target: "perf_report::diagnostics", "{message}");
    }
}

/// Keeps every diagnostic in memory for later inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, message: String) {
        self.messages.lock().push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());
        sink.report("first".into());
        sink.report("second".into());
        assert_eq!(sink.messages(), ["first", "second"]);
    }
}
