use std::env;

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub db_max_connections: u32,
    pub listen_addr: String,
    pub frontend_dir: String,
    /// Login and command timeout for OLT sessions
    pub ssh_timeout_secs: u64,
    /// Synthesize scans for devices without a live session
    pub simulate_scan: bool,
    /// Default page size of command log listings
    pub log_limit: usize,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        Self {
            db_path: get("DB_PATH", "/data/ont-console.db"),
            db_max_connections: get("DB_MAX_CONNECTIONS", "5").parse().unwrap_or(5),
            listen_addr: get("LISTEN_ADDR", "0.0.0.0:8080"),
            frontend_dir: get("FRONTEND_DIR", "/app/frontend"),
            ssh_timeout_secs: get("SSH_TIMEOUT_SECS", "10").parse().unwrap_or(10),
            simulate_scan: parse_bool(&get("SIMULATE_SCAN", "true")).unwrap_or(true),
            log_limit: get("LOG_LIMIT", "100").parse().unwrap_or(100),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
