use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::*;

use super::row_helpers::map_ont_row;
use super::{is_unique_violation, ConflictError, NotFoundError};

const SELECT_ONT: &str = r#"
    SELECT id, device_id, frame, board, port, ont_id, serial_number, bindings,
           description, status, registration_code, created_at
    FROM onts
"#;

/// ONT inventory database operations
pub struct OntRepo;

impl OntRepo {
    /// ONTs of one device, ordered by port then id
    pub async fn list_by_device(pool: &Pool<Sqlite>, device_id: &str) -> Result<Vec<OntRecord>> {
        let rows = sqlx::query(&format!(
            "{} WHERE device_id = ? ORDER BY frame, board, port, ont_id",
            SELECT_ONT
        ))
        .bind(device_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.iter().map(map_ont_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: &str) -> Result<Option<OntRecord>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_ONT))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.as_ref().map(map_ont_row))
    }

    /// Insert a registration; unique index hits become `ConflictError`
    pub async fn create(pool: &Pool<Sqlite>, req: &RegistrationRequest) -> Result<OntRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let bindings = serde_json::to_string(&req.bindings)?;
        let result = sqlx::query(
            r#"
            INSERT INTO onts (id, device_id, frame, board, port, ont_id, serial_number, bindings,
                              description, status, registration_code, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&req.device_id)
        .bind(i64::from(req.address.frame))
        .bind(i64::from(req.address.board))
        .bind(i64::from(req.address.port))
        .bind(i64::from(req.ont_id))
        .bind(&req.serial_number)
        .bind(&bindings)
        .bind(req.description.clone().unwrap_or_default())
        .bind(OntStatus::Registering.as_str())
        .bind(&req.registration_code)
        .bind(Utc::now())
        .execute(pool)
        .await;

        if let Err(e) = result {
            if is_unique_violation(&e) {
                return Err(ConflictError::new(format!(
                    "ONT {} or ID {} on {} already exists",
                    req.serial_number, req.ont_id, req.address
                ))
                .into());
            }
            return Err(e.into());
        }

        Self::get(pool, &id)
            .await?
            .context("ONT not found after creation")
    }

    pub async fn update_status(pool: &Pool<Sqlite>, id: &str, status: OntStatus) -> Result<OntRecord> {
        let result = sqlx::query("UPDATE onts SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(NotFoundError::new("ONT", id).into());
        }

        Self::get(pool, id)
            .await?
            .context("ONT not found after update")
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM onts WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(NotFoundError::new("ONT", id).into());
        }
        Ok(())
    }
}
