use crate::config::LogConfig;
use crate::errors::{BfsError, BfsResult};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// One line of the access log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub timestamp: String,
    pub level: String,
    pub operation: String,
    /// File name, disk path, or file descriptor the operation acted on
    pub target: String,
    pub result: String,
    pub details: Option<String>,
    pub duration_us: Option<u64>,
    /// Bytes moved by a read or write
    pub bytes: Option<u64>,
}

impl AccessLogEntry {
    pub fn new(
        level: LogLevel,
        operation: &str,
        target: &str,
        result: &str,
        details: Option<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: format!("{level:?}").to_lowercase(),
            operation: operation.to_string(),
            target: target.to_string(),
            result: result.to_string(),
            details,
            duration_us: None,
            bytes: None,
        }
    }
}

/// JSON-lines access log with batching and size-based rotation.
pub struct LogHandler {
    config: LogConfig,
    writer: Mutex<BufWriter<Box<dyn std::io::Write + Send>>>,
    pending_logs: Mutex<VecDeque<AccessLogEntry>>,
    batch_size: usize,
}

impl LogHandler {
    pub fn new(config: &LogConfig) -> BfsResult<Self> {
        if !config.enabled {
            let null_writer: Box<dyn std::io::Write + Send> = Box::new(std::io::sink());
            return Ok(Self {
                config: config.clone(),
                writer: Mutex::new(BufWriter::new(null_writer)),
                pending_logs: Mutex::new(VecDeque::new()),
                batch_size: 100,
            });
        }

        if let Some(parent) = Path::new(&config.file_path).parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.file_path)?;

        Ok(Self {
            config: config.clone(),
            writer: Mutex::new(BufWriter::new(
                Box::new(file) as Box<dyn std::io::Write + Send>
            )),
            pending_logs: Mutex::new(VecDeque::new()),
            batch_size: 100,
        })
    }

    pub fn with_batch_size(config: &LogConfig, batch_size: usize) -> BfsResult<Self> {
        let mut handler = Self::new(config)?;
        handler.batch_size = batch_size.max(1);
        Ok(handler)
    }

    pub fn log_access(
        &self,
        operation: &str,
        target: &str,
        result: &str,
        details: Option<String>,
    ) -> BfsResult<()> {
        self.record(AccessLogEntry::new(
            LogLevel::Info,
            operation,
            target,
            result,
            details,
        ))
    }

    pub fn log_error(&self, operation: &str, target: &str, error: &BfsError) -> BfsResult<()> {
        let level = if error.is_fatal() {
            LogLevel::Error
        } else {
            LogLevel::Warn
        };
        self.record(AccessLogEntry::new(
            level,
            operation,
            target,
            "error",
            Some(error.to_string()),
        ))
    }

    /// Record a completed transfer with its duration and byte count.
    pub fn log_transfer(
        &self,
        operation: &str,
        target: &str,
        bytes: u64,
        duration_us: u64,
    ) -> BfsResult<()> {
        let mut entry = AccessLogEntry::new(LogLevel::Debug, operation, target, "success", None);
        entry.bytes = Some(bytes);
        entry.duration_us = Some(duration_us);
        self.record(entry)
    }

    fn record(&self, entry: AccessLogEntry) -> BfsResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let mut logs = self
            .pending_logs
            .lock()
            .map_err(|_| BfsError::Log("Failed to acquire pending log lock".to_string()))?;
        logs.push_back(entry);

        if logs.len() >= self.batch_size {
            let logs_to_write: Vec<_> = logs.drain(..).collect();
            drop(logs);
            self.flush_logs(&logs_to_write)?;
        }

        Ok(())
    }

    /// Serialize a batch as JSON lines, flush, then rotate if the file grew too large.
    pub fn flush_logs(&self, logs: &[AccessLogEntry]) -> BfsResult<()> {
        if !self.config.enabled || logs.is_empty() {
            return Ok(());
        }

        {
            let mut writer = self
                .writer
                .lock()
                .map_err(|_| BfsError::Log("Failed to acquire writer lock".to_string()))?;

            for log in logs {
                let json_line = serde_json::to_string(log)?;
                writeln!(writer, "{json_line}")?;
            }
            writer.flush()?;
        }

        self.rotate_if_needed()
    }

    pub fn rotate_if_needed(&self) -> BfsResult<()> {
        let metadata = fs::metadata(&self.config.file_path)?;
        if metadata.len() > self.config.max_size {
            self.rotate_log_file()?;
        }
        Ok(())
    }

    /// Shift `access.log.N` to `.N+1`, dropping the oldest, and start a fresh file.
    pub fn rotate_log_file(&self) -> BfsResult<()> {
        let base_path = Path::new(&self.config.file_path);
        let rotated = |i: u32| {
            let mut name = base_path.as_os_str().to_owned();
            name.push(format!(".{i}"));
            std::path::PathBuf::from(name)
        };

        for i in (1..=self.config.rotation_count).rev() {
            let old_file = rotated(i);
            if old_file.exists() {
                if i == self.config.rotation_count {
                    fs::remove_file(&old_file)?;
                } else {
                    fs::rename(&old_file, rotated(i + 1))?;
                }
            }
        }

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| BfsError::Log("Failed to acquire writer lock".to_string()))?;
        writer.flush()?;

        if self.config.rotation_count > 0 {
            fs::rename(base_path, rotated(1))?;
        }
        let new_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(base_path)?;
        *writer = BufWriter::new(Box::new(new_file) as Box<dyn std::io::Write + Send>);

        log::debug!("Rotated access log {base_path:?}");
        Ok(())
    }

    pub fn flush_all(&self) -> BfsResult<()> {
        let logs_to_write = match self.pending_logs.lock() {
            Ok(mut logs) if !logs.is_empty() => logs.drain(..).collect::<Vec<_>>(),
            _ => return Ok(()),
        };
        self.flush_logs(&logs_to_write)
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    pub fn validate_config(config: &LogConfig) -> BfsResult<()> {
        if config.enabled {
            if config.file_path.is_empty() {
                return Err(BfsError::Config(
                    "Log file path cannot be empty when logging is enabled".to_string(),
                ));
            }
            if config.max_size == 0 {
                return Err(BfsError::Config(
                    "Log max size must be greater than 0".to_string(),
                ));
            }
            if config.rotation_count == 0 {
                return Err(BfsError::Config(
                    "Log rotation count must be greater than 0".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Drop for LogHandler {
    fn drop(&mut self) {
        if let Err(e) = self.flush_all() {
            log::error!("Failed to flush logs on drop: {e}");
        }
    }
}
