use serde::{Deserialize, Serialize};

pub(super) mod file_log;
pub(super) mod multilog;

/// A log record as written, one JSON document per line, to the log file.
#[derive(Debug, Serialize, Deserialize)]
struct LogEntry {
    level: Level,
    target: String,
    message: String,
    /// Source location as `file:line`, when the record carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Level {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl From<log::Level> for Level {
    fn from(value: log::Level) -> Self {
        match value {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug => Level::Debug,
            log::Level::Trace => Level::Trace,
        }
    }
}

impl From<&log::Record<'_>> for LogEntry {
    fn from(record: &log::Record) -> Self {
        Self {
            level: record.level().into(),
            target: record.target().into(),
            message: record.args().to_string(),
            location: record
                .file()
                .zip(record.line())
                .map(|(file, line)| format!("{file}:{line}")),
        }
    }
}
