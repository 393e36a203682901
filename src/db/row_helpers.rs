use sqlx::{sqlite::SqliteRow, Row};

use crate::models::*;

/// Filter empty strings to None, used when DB stores '' instead of NULL
pub fn none_if_empty(opt: Option<String>) -> Option<String> {
    opt.filter(|s| !s.is_empty())
}

fn get_u32(row: &SqliteRow, column: &str) -> u32 {
    let v: i64 = row.get(column);
    u32::try_from(v).unwrap_or_default()
}

/// Map a SQLite row to an OltDevice struct
pub fn map_device_row(row: &SqliteRow) -> OltDevice {
    let pon_technology: String = row.get("pon_technology");
    let ssh_port: i64 = row.get("ssh_port");
    OltDevice {
        id: row.get("id"),
        name: row.get("name"),
        ip: row.get("ip"),
        ssh_port: u16::try_from(ssh_port).unwrap_or(22),
        username: row.get("username"),
        password: row.get("password"),
        pon_technology: pon_technology.parse().unwrap_or_default(),
        registration_rule: row.get("registration_rule"),
        default_gem_ports: row.get("default_gem_ports"),
        default_vlans: row.get("default_vlans"),
        last_connected: row.get("last_connected"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Map a SQLite row to an OntRecord struct
pub fn map_ont_row(row: &SqliteRow) -> OntRecord {
    let bindings_json: String = row.get("bindings");
    let bindings: Vec<ServiceBinding> = serde_json::from_str(&bindings_json).unwrap_or_default();
    let status: String = row.get("status");
    OntRecord {
        id: row.get("id"),
        device_id: row.get("device_id"),
        address: TopologyAddress::new(get_u32(row, "frame"), get_u32(row, "board"), get_u32(row, "port")),
        ont_id: get_u32(row, "ont_id"),
        serial_number: row.get("serial_number"),
        bindings,
        description: none_if_empty(row.get("description")),
        status: status.parse().unwrap_or(OntStatus::Error),
        registration_code: row.get("registration_code"),
        created_at: row.get("created_at"),
    }
}

/// Map a SQLite row to a CommandLogEntry struct
pub fn map_command_log_row(row: &SqliteRow) -> CommandLogEntry {
    let status: String = row.get("status");
    CommandLogEntry {
        id: row.get("id"),
        device_id: row.get("device_id"),
        command: row.get("command"),
        response: row.get("response"),
        status: status.parse().unwrap_or(CommandStatus::Failure),
        timestamp: row.get("timestamp"),
    }
}
