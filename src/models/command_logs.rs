use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of one submitted command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Success,
    Failure,
}

impl CommandStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            other => Err(anyhow::anyhow!("unknown command status: {}", other)),
        }
    }
}

/// CommandLogEntry is one command/response pair in a device transcript.
/// Entries are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandLogEntry {
    pub id: String,
    pub device_id: String,
    pub command: String,
    pub response: String,
    pub status: CommandStatus,
    pub timestamp: DateTime<Utc>,
}

/// Ordering for transcript listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOrder {
    /// Oldest first, as stored
    Storage,
    /// Newest first, as shown in the terminal panel
    #[default]
    Display,
}

/// SendCommandRequest submits one line to a device
#[derive(Debug, Clone, Deserialize)]
pub struct SendCommandRequest {
    pub command: String,
}

/// HistoryRecall is the edit buffer after moving the history cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRecall {
    pub buffer: String,
    pub index: Option<usize>,
}

impl HistoryRecall {
    /// Empty edit buffer, cursor off the history
    pub fn empty() -> Self {
        Self {
            buffer: String::new(),
            index: None,
        }
    }
}
