use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::*;

use super::row_helpers::map_device_row;

const SELECT_DEVICE: &str = r#"
    SELECT id, name, ip, ssh_port, username, password, pon_technology,
           registration_rule, default_gem_ports, default_vlans,
           last_connected, created_at, updated_at
    FROM devices
"#;

/// Device database operations
pub struct DeviceRepo;

impl DeviceRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<OltDevice>> {
        let rows = sqlx::query(&format!("{} ORDER BY name", SELECT_DEVICE))
            .fetch_all(pool)
            .await?;

        Ok(rows.iter().map(map_device_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: &str) -> Result<Option<OltDevice>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_DEVICE))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.as_ref().map(map_device_row))
    }

    pub async fn create(pool: &Pool<Sqlite>, req: &CreateDeviceRequest) -> Result<OltDevice> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO devices (id, name, ip, ssh_port, username, password, pon_technology,
                                 registration_rule, default_gem_ports, default_vlans,
                                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&req.name)
        .bind(&req.ip)
        .bind(i64::from(req.ssh_port))
        .bind(&req.username)
        .bind(&req.password)
        .bind(req.pon_technology.as_str())
        .bind(&req.registration_rule)
        .bind(&req.default_gem_ports)
        .bind(&req.default_vlans)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Self::get(pool, &id)
            .await?
            .context("Device not found after creation")
    }

    pub async fn update(pool: &Pool<Sqlite>, id: &str, req: &CreateDeviceRequest) -> Result<OltDevice> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE devices SET name = ?, ip = ?, ssh_port = ?, username = ?, password = ?,
                               pon_technology = ?, registration_rule = ?, default_gem_ports = ?,
                               default_vlans = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&req.name)
        .bind(&req.ip)
        .bind(i64::from(req.ssh_port))
        .bind(&req.username)
        .bind(&req.password)
        .bind(req.pon_technology.as_str())
        .bind(&req.registration_rule)
        .bind(&req.default_gem_ports)
        .bind(&req.default_vlans)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Device", id).into());
        }

        Self::get(pool, id)
            .await?
            .context("Device not found after update")
    }

    /// Delete a device together with its ONTs and command logs
    pub async fn delete(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM onts WHERE device_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM command_logs WHERE device_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM devices WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Device", id).into());
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn update_last_connected(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
        let now = Utc::now();
        sqlx::query("UPDATE devices SET last_connected = ?, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
