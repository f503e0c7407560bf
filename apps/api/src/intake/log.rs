use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Step-by-step outcomes of one intake run, returned to the caller and then dropped.
/// Each entry is also emitted as a tracing event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IntakeLog {
    entries: Vec<LogEntry>,
}

impl IntakeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.push(LogLevel::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.push(LogLevel::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.push(LogLevel::Warning, message);
    }

    pub fn failure(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{message}");
        self.push(LogLevel::Failure, message);
    }

    fn push(&mut self, level: LogLevel, message: String) {
        self.entries.push(LogEntry { level, message });
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    #[cfg(test)]
    pub fn has_level(&self, level: LogLevel) -> bool {
        self.entries.iter().any(|e| e.level == level)
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_keep_insertion_order() {
        let mut log = IntakeLog::new();
        log.success("saved");
        log.warning("sheet down");
        log.failure("boom");

        let levels: Vec<_> = log.entries().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Success, LogLevel::Warning, LogLevel::Failure]);
        assert!(log.has_level(LogLevel::Warning));
        assert!(!log.has_level(LogLevel::Info));
    }

    #[test]
    fn test_serializes_as_array_of_entries() {
        let mut log = IntakeLog::new();
        log.info("skipped");
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json, serde_json::json!([{"level": "info", "message": "skipped"}]));
    }
}
