//! Append-only file logger
//!
//! Walkers push [`LogRecord`]s into an unbounded queue through a cloneable
//! [`LogSender`]. A single writer task drains the queue, drops records below
//! the configured threshold and appends the rest to the log file, one line
//! per record:
//!
//! ```text
//! 17-10-2026 14:03:22 - ERROR - FUNC: check_file; LOG: Permission denied (os error 13);
//! ```

use crate::types::MirrorError;
use chrono::Local;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Timestamp layout of persisted records (day-month-year)
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Record severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    Info,

    #[default]
    Error,

    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Whether a record of this level is persisted under `threshold`
    pub fn passes(self, threshold: LogLevel) -> bool {
        self >= threshold
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(LogLevel::Info),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            _ => Err(MirrorError::InvalidLogLevel(s.to_string())),
        }
    }
}

/// One structured log message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,

    /// Operation that produced the record (e.g. `copy_file`)
    pub op: &'static str,

    pub message: String,
}

impl LogRecord {
    pub fn new(level: LogLevel, op: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            op,
            message: message.into(),
        }
    }

    /// Render the persisted line, newline included
    pub fn format_line(&self, timestamp: &str) -> String {
        format!(
            "{} - {} - FUNC: {}; LOG: {};\n",
            timestamp, self.level, self.op, self.message
        )
    }
}

/// Receiving half of the log queue
pub type LogReceiver = mpsc::UnboundedReceiver<LogRecord>;

/// Cloneable handle used to submit records
#[derive(Debug, Clone)]
pub struct LogSender {
    tx: mpsc::UnboundedSender<LogRecord>,
}

impl LogSender {
    /// Submit a record. Records sent after the writer stopped are dropped.
    pub fn send(&self, record: LogRecord) {
        let _ = self.tx.send(record);
    }

    pub fn info(&self, op: &'static str, message: impl Into<String>) {
        self.send(LogRecord::new(LogLevel::Info, op, message));
    }

    pub fn error(&self, op: &'static str, message: impl Into<String>) {
        self.send(LogRecord::new(LogLevel::Error, op, message));
    }

    pub fn critical(&self, op: &'static str, message: impl Into<String>) {
        self.send(LogRecord::new(LogLevel::Critical, op, message));
    }
}

/// Create a log queue without a writer attached.
///
/// [`Logger::spawn`] wires one of these to the log file; tests drain the
/// receiver directly.
pub fn log_channel() -> (LogSender, LogReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (LogSender { tx }, rx)
}

/// Writer side of the log queue
#[derive(Debug, Clone)]
pub struct Logger {
    path: PathBuf,
    threshold: LogLevel,
}

impl Logger {
    pub fn new(path: impl Into<PathBuf>, threshold: LogLevel) -> Self {
        Self {
            path: path.into(),
            threshold,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }

    /// Open the log file and start the writer task.
    ///
    /// The task finishes once every [`LogSender`] clone has been dropped and
    /// resolves to the number of records written.
    pub async fn spawn(
        self,
    ) -> Result<(LogSender, JoinHandle<Result<u64, MirrorError>>), MirrorError> {
        let file = self.open().await?;
        let (sender, receiver) = log_channel();
        let handle = tokio::spawn(self.drain(file, receiver));
        Ok((sender, handle))
    }

    async fn open(&self) -> Result<File, MirrorError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        Ok(file)
    }

    async fn drain(self, mut file: File, mut rx: LogReceiver) -> Result<u64, MirrorError> {
        let mut written = 0u64;
        while let Some(record) = rx.recv().await {
            if !record.level.passes(self.threshold) {
                continue;
            }

            let line = record.format_line(&Local::now().format(TIMESTAMP_FORMAT).to_string());
            let result = match file.write_all(line.as_bytes()).await {
                Ok(()) => file.flush().await,
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => written += 1,
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "dropping log record"
                ),
            }
        }

        file.flush().await?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_log_levels() {
        let cases = [
            ("INFO", LogLevel::Info),
            ("ERROR", LogLevel::Error),
            ("CRITICAL", LogLevel::Critical),
            ("info", LogLevel::Info),
            (" Critical ", LogLevel::Critical),
        ];
        for (raw, expected) in cases {
            assert_eq!(raw.parse::<LogLevel>().expect(raw), expected);
        }
    }

    #[test]
    fn test_parse_unknown_level_fails() {
        let err = "SOMETHING".parse::<LogLevel>().unwrap_err();
        assert!(matches!(err, MirrorError::InvalidLogLevel(_)));
        assert!(err
            .to_string()
            .contains("log level is not set in config. Default log level ERROR"));
    }

    #[test]
    fn test_threshold_filtering() {
        use LogLevel::*;

        assert!(Info.passes(Info));
        assert!(Error.passes(Info));
        assert!(Critical.passes(Info));

        assert!(!Info.passes(Error));
        assert!(Error.passes(Error));
        assert!(Critical.passes(Error));

        assert!(!Info.passes(Critical));
        assert!(!Error.passes(Critical));
        assert!(Critical.passes(Critical));

        assert_eq!(LogLevel::default(), Error);
    }

    #[test]
    fn test_format_line() {
        let record = LogRecord::new(LogLevel::Error, "check_file", "permission denied");
        assert_eq!(
            record.format_line("17-10-2026 14:03:22"),
            "17-10-2026 14:03:22 - ERROR - FUNC: check_file; LOG: permission denied;\n"
        );
    }

    #[tokio::test]
    async fn test_logger_writes_records_above_threshold() {
        let temp = TempDir::new().expect("create tempdir");
        let path = temp.path().join("logs/log.txt");

        let (sender, handle) = Logger::new(&path, LogLevel::Error)
            .spawn()
            .await
            .expect("open log");
        sender.info("copy_file", "Copy file a to b");
        sender.error("check_file", "disk full");
        sender.critical("check_master_folder", "root gone");
        drop(sender);

        let written = handle.await.expect("join logger").expect("logger run");
        assert_eq!(written, 2);

        let content = std::fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(" - ERROR - FUNC: check_file; LOG: disk full;"));
        assert!(lines[1].contains(" - CRITICAL - FUNC: check_master_folder; LOG: root gone;"));
        assert!(!content.contains("Copy file"));
    }

    #[tokio::test]
    async fn test_logger_appends_to_existing_file() {
        let temp = TempDir::new().expect("create tempdir");
        let path = temp.path().join("log.txt");
        std::fs::write(&path, "previous line\n").expect("seed log");

        let (sender, handle) = Logger::new(&path, LogLevel::Info)
            .spawn()
            .await
            .expect("open log");
        sender.info("main", "start");
        drop(sender);
        handle.await.expect("join logger").expect("logger run");

        let content = std::fs::read_to_string(&path).expect("read log");
        assert!(content.starts_with("previous line\n"));
        assert!(content.ends_with("FUNC: main; LOG: start;\n"));
    }

    #[tokio::test]
    async fn test_send_after_writer_stopped_is_ignored() {
        let (sender, receiver) = log_channel();
        drop(receiver);
        sender.error("check_file", "nobody listens");
    }
}
