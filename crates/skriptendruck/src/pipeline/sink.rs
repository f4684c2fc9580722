use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::ConfigError;
use crate::order::Order;

/// Receives every finished order exactly once.
pub trait ResultSink: Send + Sync {
    fn record(&self, order: &Order) -> std::io::Result<()>;

    fn flush(&self) -> std::io::Result<()> {
        Ok(())
    }
}

pub struct NoopSink;

impl ResultSink for NoopSink {
    fn record(&self, _order: &Order) -> std::io::Result<()> {
        Ok(())
    }
}

/// Appends one JSON object per order to a file.
pub struct JsonLinesSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    pub fn create(path: &Path) -> Result<Self, ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ResultsFile {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ConfigError::ResultsFile {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for JsonLinesSink {
    fn record(&self, order: &Order) -> std::io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| std::io::Error::other("result sink lock poisoned"))?;
        serde_json::to_writer(&mut *writer, order)?;
        writer.write_all(b"\n")
    }

    fn flush(&self) -> std::io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| std::io::Error::other("result sink lock poisoned"))?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use chrono::Local;
    use tempfile::TempDir;

    #[test]
    fn test_json_lines_one_record_per_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs/results.jsonl");
        let sink = JsonLinesSink::create(&path).unwrap();

        let mut blocked = Order::new(1, PathBuf::from("/in/a.pdf"), 10, Local::now());
        blocked.fail(OrderStatus::ErrorBlocked, "blocked");
        let fresh = Order::new(2, PathBuf::from("/in/b.pdf"), 20, Local::now());
        sink.record(&blocked).unwrap();
        sink.record(&fresh).unwrap();
        sink.flush().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["order_id"], 1);
        assert_eq!(lines[0]["status"], "error_blocked");
        assert_eq!(lines[1]["filename"], "b.pdf");
    }

    #[test]
    fn test_json_lines_appends() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("results.jsonl");
        let order = Order::new(1, PathBuf::from("/in/a.pdf"), 10, Local::now());

        for _ in 0..2 {
            let sink = JsonLinesSink::create(&path).unwrap();
            sink.record(&order).unwrap();
            sink.flush().unwrap();
        }

        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
    }
}
