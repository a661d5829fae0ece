use crate::shared::time::now_secs;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const PIPELINE_LOG_FILE_NAME: &str = "stratcomp.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Diagnostic sink for one execution: a console line per event plus a JSON line
/// appended to the execution's log file. Neither side can fail the run.
#[derive(Debug, Clone)]
pub struct PipelineLog {
    path: PathBuf,
    console: bool,
}

impl PipelineLog {
    pub fn new(logs_dir: &Path) -> Self {
        Self {
            path: logs_dir.join(PIPELINE_LOG_FILE_NAME),
            console: true,
        }
    }

    pub fn quiet(mut self) -> Self {
        self.console = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self, event: &str, message: &str) {
        self.record(LogLevel::Info, event, message);
    }

    pub fn warn(&self, event: &str, message: &str) {
        self.record(LogLevel::Warn, event, message);
    }

    pub fn error(&self, event: &str, message: &str) {
        self.record(LogLevel::Error, event, message);
    }

    pub fn record(&self, level: LogLevel, event: &str, message: &str) {
        if self.console {
            match level {
                LogLevel::Info => println!("[{event}] {message}"),
                LogLevel::Warn | LogLevel::Error => {
                    eprintln!("[{event}] {}: {message}", level.as_str())
                }
            }
        }
        append_log_line(&self.path, level, event, message);
    }
}

pub fn append_log_line(path: &Path, level: LogLevel, event: &str, message: &str) {
    let payload = serde_json::json!({
        "timestamp": now_secs(),
        "level": level.as_str(),
        "event": event,
        "message": message,
    });

    let Ok(line) = serde_json::to_string(&payload) else {
        return;
    };

    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };
    let _ = writeln!(file, "{line}");
}
