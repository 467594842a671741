// src/logging/runtime_logger.rs

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task;
use tokio::time::{self, Duration};
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const ALL: [LogLevel; 4] = [LogLevel::Debug, LogLevel::Info, LogLevel::Warn, LogLevel::Error];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Command {
    Entry { level: LogLevel, content: String },
    Flush(oneshot::Sender<()>),
}

/// 运行日志管理器：按级别分文件写入，批量落盘
pub struct RuntimeLogger {
    sender: Sender<Command>,
}

impl RuntimeLogger {
    /// - `log_dir`: 日志目录
    /// - `file_prefix`: 文件前缀（最终文件名形如 `session_info.json.2026-01-01-10`）
    /// - `buffer_size`: 通道容量
    /// - `batch_size`: 单个级别累计多少条后写盘
    /// - `flush_interval`: 定时刷新间隔（毫秒）
    pub fn new(
        log_dir: &str,
        file_prefix: &str,
        buffer_size: usize,
        batch_size: usize,
        flush_interval: u64,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let log_files: HashMap<LogLevel, Arc<RollingFileAppender>> = LogLevel::ALL
            .into_iter()
            .map(|level| {
                let file_name = format!("{}_{}.json", file_prefix, level.as_str().to_lowercase());
                (level, Arc::new(rolling::hourly(log_dir, file_name)))
            })
            .collect();
        tokio::spawn(Self::background_log_writer(log_files, receiver, batch_size, flush_interval));

        let log_dir = log_dir.to_string();
        tokio::spawn(async move {
            let retention_hours = 72;
            let cleanup_interval = Duration::from_secs(3600);
            loop {
                Self::cleanup_old_logs(&log_dir, retention_hours).await;
                time::sleep(cleanup_interval).await;
            }
        });

        Arc::new(Self { sender })
    }

    pub async fn log(&self, level: LogLevel, message: &str) {
        let content = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level.as_str(),
            "message": message,
        })
        .to_string();
        self.send(Command::Entry { level, content }).await;
    }

    /// Writes a structured record (e.g. a `SessionLog`) as one JSON line.
    pub async fn log_record<T: Serialize>(&self, level: LogLevel, record: &T) {
        match serde_json::to_string(record) {
            Ok(content) => self.send(Command::Entry { level, content }).await,
            Err(e) => eprintln!("Failed to serialize runtime log record: {}", e),
        }
    }

    /// Writes every buffered entry and waits until it is on disk.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.send(Command::Flush(done)).await;
        let _ = wait.await;
    }

    pub async fn shutdown(&self) {
        self.flush().await;
    }

    async fn send(&self, command: Command) {
        if let Err(e) = self.sender.send(command).await {
            eprintln!("Failed to send runtime log message: {}", e);
        }
    }

    async fn background_log_writer(
        log_files: HashMap<LogLevel, Arc<RollingFileAppender>>,
        mut receiver: Receiver<Command>,
        batch_size: usize,
        flush_interval: u64,
    ) {
        let mut buffers: HashMap<LogLevel, Vec<String>> = HashMap::new();
        let mut interval = time::interval(Duration::from_millis(flush_interval));
        loop {
            tokio::select! {
                command = receiver.recv() => {
                    match command {
                        Some(Command::Entry { level, content }) => {
                            let buffer = buffers.entry(level).or_default();
                            buffer.push(content);
                            if buffer.len() >= batch_size {
                                if let Some(appender) = log_files.get(&level) {
                                    Self::write_logs_to_disk(appender.clone(), std::mem::take(buffer)).await;
                                }
                            }
                        }
                        Some(Command::Flush(done)) => {
                            Self::flush_all(&log_files, &mut buffers).await;
                            let _ = done.send(());
                        }
                        None => {
                            Self::flush_all(&log_files, &mut buffers).await;
                            break;
                        }
                    }
                }
                _ = interval.tick() => {
                    Self::flush_all(&log_files, &mut buffers).await;
                }
            }
        }
    }

    async fn flush_all(
        log_files: &HashMap<LogLevel, Arc<RollingFileAppender>>,
        buffers: &mut HashMap<LogLevel, Vec<String>>,
    ) {
        for (level, buffer) in buffers.iter_mut() {
            if buffer.is_empty() {
                continue;
            }
            if let Some(appender) = log_files.get(level) {
                Self::write_logs_to_disk(appender.clone(), std::mem::take(buffer)).await;
            }
        }
    }

    async fn write_logs_to_disk(file: Arc<RollingFileAppender>, lines: Vec<String>) {
        let content = lines.join("\n") + "\n";
        let written = task::spawn_blocking(move || {
            let mut writer = file.make_writer();
            writer.write_all(content.as_bytes())
        })
        .await;
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => eprintln!("Failed to write runtime logs: {}", e),
            Err(e) => eprintln!("Runtime log writer task failed: {}", e),
        }
    }

    async fn cleanup_old_logs(log_dir: &str, retention_hours: u64) {
        use std::time::{Duration as StdDuration, SystemTime};
        let retention = StdDuration::from_secs(retention_hours * 3600);
        let now = SystemTime::now();
        let mut dir = match tokio::fs::read_dir(log_dir).await {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("Failed to read log directory {}: {}", log_dir, e);
                return;
            }
        };
        while let Ok(Some(entry)) = dir.next_entry().await {
            let path = entry.path();
            let Ok(modified) = entry.metadata().await.and_then(|m| m.modified()) else {
                continue;
            };
            if now.duration_since(modified).unwrap_or_default() > retention {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    eprintln!("Failed to delete old log file {:?}: {}", path, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::delivery_log::SessionLog;

    fn read_dir_text(dir: &std::path::Path) -> String {
        let mut all = String::new();
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            all.push_str(&std::fs::read_to_string(path).unwrap());
        }
        all
    }

    #[tokio::test]
    async fn flush_writes_buffered_entries_per_level() {
        let dir = std::env::temp_dir().join(format!("ad-slots-logs-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let logger = RuntimeLogger::new(dir.to_str().unwrap(), "session", 64, 100, 60_000);

        logger.log(LogLevel::Warn, "slot top fell back").await;
        logger
            .log_record(LogLevel::Info, &SessionLog::new("s-42", "desktop", "defaults"))
            .await;
        logger.flush().await;

        let names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|n| n.starts_with("session_warn.json")));
        assert!(names.iter().any(|n| n.starts_with("session_info.json")));

        let text = read_dir_text(&dir);
        assert!(text.contains("slot top fell back"));
        assert!(text.contains("\"session_id\":\"s-42\""));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
