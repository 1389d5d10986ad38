//! Persisted transfer logs (spec §6.4: "append-only JSON-lines of
//! session summaries"). No cross-process session resumption is
//! implemented; this log is write-only history for operators.

use crate::state_machine::TransferState;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// One terminal-transition summary appended to the transfer log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferLogEntry {
    /// Local session identifier.
    pub local_id: u64,
    /// Remote endpoint, formatted as `ip:port`.
    pub remote_endpoint: String,
    /// Transferred file's name.
    pub file_name: String,
    /// Transferred file's total length, in bytes.
    pub total_length: u64,
    /// Bytes actually sent or received.
    pub bytes_transferred: u64,
    /// Wall-clock duration of the transfer, in seconds.
    pub duration_secs: f64,
    /// Terminal state reached (`Completed` or `Error`).
    pub final_state: TransferState,
    /// Human-readable detail if the transfer ended in `Error`.
    pub error_detail: Option<String>,
}

impl TransferLogEntry {
    /// Append this entry as one JSON line to `path`, creating the file
    /// if absent.
    pub async fn append_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut line = serde_json::to_string(self).expect("TransferLogEntry always serializes");
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line.as_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn appends_one_json_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transfers.jsonl");

        let entry = TransferLogEntry {
            local_id: 1,
            remote_endpoint: "127.0.0.1:9000".into(),
            file_name: "report.pdf".into(),
            total_length: 1024,
            bytes_transferred: 1024,
            duration_secs: 0.5,
            final_state: TransferState::Completed,
            error_detail: None,
        };
        entry.append_to(&path).await.unwrap();
        entry.append_to(&path).await.unwrap();

        let mut contents = String::new();
        tokio::fs::File::open(&path)
            .await
            .unwrap()
            .read_to_string(&mut contents)
            .await
            .unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: TransferLogEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.file_name, "report.pdf");
    }
}
