//! Per-device command transcript and line-editor style history recall.

use chrono::Utc;
use std::collections::VecDeque;

use crate::models::{CommandLogEntry, CommandStatus, HistoryRecall, LogOrder};
use crate::session::DeviceSession;

use super::inventory::CommandLogStore;
use super::{EngineError, EngineResult};

/// Distinct commands kept for recall
pub const HISTORY_CAP: usize = 50;

/// Recency-ordered list of distinct submitted commands with a recall cursor.
///
/// The cursor walks a snapshot taken when it was last reset, so recording a
/// command never shifts what `back`/`forward` are pointing at mid-traversal.
#[derive(Debug, Clone, Default)]
pub struct CommandHistory {
    /// Most recent first
    commands: VecDeque<String>,
    snapshot: Vec<String>,
    cursor: Option<usize>,
}

impl CommandHistory {
    /// Remember a submission and reset the cursor
    pub fn record(&mut self, command: &str) {
        let command = command.trim();
        if command.is_empty() {
            return;
        }
        self.commands.retain(|c| c != command);
        self.commands.push_front(command.to_string());
        self.commands.truncate(HISTORY_CAP);
        self.reset();
    }

    fn reset(&mut self) {
        self.snapshot = self.commands.iter().cloned().collect();
        self.cursor = None;
    }

    /// Step to an older command; stays on the oldest once reached
    pub fn back(&mut self) -> HistoryRecall {
        if self.snapshot.is_empty() {
            return HistoryRecall::empty();
        }
        let last = self.snapshot.len() - 1;
        let index = self.cursor.map_or(0, |i| (i + 1).min(last));
        self.cursor = Some(index);
        HistoryRecall {
            buffer: self.snapshot[index].clone(),
            index: Some(index),
        }
    }

    /// Step to a newer command; past the newest the buffer is cleared
    pub fn forward(&mut self) -> HistoryRecall {
        match self.cursor {
            Some(i) if i > 0 => {
                self.cursor = Some(i - 1);
                HistoryRecall {
                    buffer: self.snapshot[i - 1].clone(),
                    index: Some(i - 1),
                }
            }
            _ => {
                self.cursor = None;
                HistoryRecall::empty()
            }
        }
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands most recent first
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(String::as_str)
    }
}

/// Send one command and append exactly one transcript entry for it.
///
/// Device failures do not surface as errors: they are logged as a `failure`
/// entry carrying the error text. Only a blank command or a failing log store
/// returns `Err`.
pub async fn submit<S, L>(session: &S, log: &L, device_id: &str, command: &str) -> EngineResult<CommandLogEntry>
where
    S: DeviceSession + ?Sized,
    L: CommandLogStore + ?Sized,
{
    let command = command.trim();
    if command.is_empty() {
        return Err(EngineError::EmptyCommand);
    }

    let result = if session.is_connected(device_id).await {
        session.send_command(device_id, command).await
    } else {
        Err(EngineError::NotConnected(device_id.to_string()))
    };

    let (response, status) = match result {
        Ok(response) => (response, CommandStatus::Success),
        Err(e) => {
            tracing::warn!("Command {:?} on device {} failed: {}", command, device_id, e);
            (e.to_string(), CommandStatus::Failure)
        }
    };

    let entry = CommandLogEntry {
        id: uuid::Uuid::new_v4().to_string(),
        device_id: device_id.to_string(),
        command: command.to_string(),
        response,
        status,
        timestamp: Utc::now(),
    };
    log.append_log(&entry).await?;
    Ok(entry)
}

/// Arrange stored entries (oldest first) for a listing.
/// `limit` keeps the most recent entries in either order.
pub fn ordered(mut entries: Vec<CommandLogEntry>, order: LogOrder, limit: Option<usize>) -> Vec<CommandLogEntry> {
    if let Some(limit) = limit {
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
    }
    if order == LogOrder::Display {
        entries.reverse();
    }
    entries
}

/// Plain-text transcript, oldest first
pub fn render_transcript(entries: &[CommandLogEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            format!(
                "[{}] {}\nCommand: {}\nResponse: {}\n\n",
                e.timestamp.to_rfc3339(),
                e.status.as_str().to_uppercase(),
                e.command,
                e.response
            )
        })
        .collect::<Vec<_>>()
        .join("---\n\n")
}
