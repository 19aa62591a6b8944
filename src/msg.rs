/// Severity of a log-pane line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub message: String,
    pub severity: Severity,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Info,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Effects an install worker posts back to the window thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMsg {
    Log(LogEntry),
    /// Sent exactly once when a run ends, whatever the outcome.
    TriggerReleased,
}
