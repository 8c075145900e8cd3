//! Append-only persistence of research summaries.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use ra_core::{Error, Tool};

const TOOL_NAME: &str = "save_text_to_file";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Appends each call's text to a single file as a timestamped block.
pub struct SaveTextTool {
    path: PathBuf,
}

impl SaveTextTool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// One research block as it lands in the file.
pub fn format_entry(data: &str, timestamp: &DateTime<Local>) -> String {
    format!(
        "--- Research Output ---\nTimestamp: {}\n\n{}\n\n",
        timestamp.format(TIMESTAMP_FORMAT),
        data
    )
}

#[async_trait]
impl Tool for SaveTextTool {
    fn description(&self) -> &str {
        "Saves structured research data to a text file."
    }

    async fn execute(&self, argument: &str) -> Result<String, Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::tool(
                        TOOL_NAME,
                        format!("Failed to create '{}': {}", parent.display(), e),
                    )
                })?;
            }
        }

        let entry = format_entry(argument, &Local::now());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                Error::tool(
                    TOOL_NAME,
                    format!("Failed to open '{}': {}", self.path.display(), e),
                )
            })?;

        file.write_all(entry.as_bytes()).await.map_err(|e| {
            Error::tool(
                TOOL_NAME,
                format!("Failed to write '{}': {}", self.path.display(), e),
            )
        })?;
        file.flush()
            .await
            .map_err(|e| Error::tool(TOOL_NAME, format!("Failed to flush: {}", e)))?;

        debug!(path = %self.path.display(), bytes = entry.len(), "Appended research output");
        Ok(format!("Data successfully saved to {}", self.path.display()))
    }
}
