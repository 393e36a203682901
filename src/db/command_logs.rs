use anyhow::Result;
use sqlx::{Pool, Sqlite};

use crate::models::*;

use super::row_helpers::map_command_log_row;

/// Command transcript database operations. Rows are never updated.
pub struct CommandLogRepo;

impl CommandLogRepo {
    pub async fn append(pool: &Pool<Sqlite>, entry: &CommandLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO command_logs (id, device_id, command, response, status, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.device_id)
        .bind(&entry.command)
        .bind(&entry.response)
        .bind(entry.status.as_str())
        .bind(entry.timestamp)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Entries of one device in insertion order
    pub async fn list_by_device(pool: &Pool<Sqlite>, device_id: &str) -> Result<Vec<CommandLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, device_id, command, response, status, timestamp
            FROM command_logs WHERE device_id = ? ORDER BY rowid
            "#,
        )
        .bind(device_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.iter().map(map_command_log_row).collect())
    }

    pub async fn clear(pool: &Pool<Sqlite>, device_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM command_logs WHERE device_id = ?")
            .bind(device_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
