use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::engine::EngineError;

/// TopologyAddress identifies one PON port on an OLT as frame/board/port.
///
/// Ordering is lexicographic (frame, then board, then port) so the address
/// can key ordered maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawTopologyAddress")]
pub struct TopologyAddress {
    pub frame: u32,
    pub board: u32,
    pub port: u32,
}

impl TopologyAddress {
    pub const fn new(frame: u32, board: u32, port: u32) -> Self {
        Self { frame, board, port }
    }

    /// Validate signed components, rejecting any negative field
    pub fn validate(frame: i64, board: i64, port: i64) -> Result<Self, EngineError> {
        Ok(Self {
            frame: component("frame", frame)?,
            board: component("board", board)?,
            port: component("port", port)?,
        })
    }
}

fn component(name: &str, value: i64) -> Result<u32, EngineError> {
    u32::try_from(value)
        .map_err(|_| EngineError::InvalidAddress(format!("{} must be a non-negative integer, got {}", name, value)))
}

impl fmt::Display for TopologyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.frame, self.board, self.port)
    }
}

/// Parses the "F/B/P" notation used in OLT output, e.g. "0/1/3"
impl FromStr for TopologyAddress {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        let [frame, board, port] = parts.as_slice() else {
            return Err(EngineError::InvalidAddress(format!("expected frame/board/port, got {:?}", s)));
        };
        Ok(Self {
            frame: parse_component("frame", frame)?,
            board: parse_component("board", board)?,
            port: parse_component("port", port)?,
        })
    }
}

fn parse_component(name: &str, raw: &str) -> Result<u32, EngineError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| EngineError::InvalidAddress(format!("{} must be a non-negative integer, got {:?}", name, raw)))
}

/// Untyped address as it arrives from JSON bodies or query strings.
///
/// Fields may be numbers or numeric strings; anything else (negative,
/// fractional, non-numeric) is rejected when converted.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTopologyAddress {
    pub frame: serde_json::Value,
    pub board: serde_json::Value,
    pub port: serde_json::Value,
}

impl TryFrom<RawTopologyAddress> for TopologyAddress {
    type Error = EngineError;

    fn try_from(raw: RawTopologyAddress) -> Result<Self, Self::Error> {
        Ok(Self {
            frame: value_component("frame", &raw.frame)?,
            board: value_component("board", &raw.board)?,
            port: value_component("port", &raw.port)?,
        })
    }
}

fn value_component(name: &str, value: &serde_json::Value) -> Result<u32, EngineError> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| EngineError::InvalidAddress(format!("{} must be a non-negative integer, got {}", name, n))),
        serde_json::Value::String(s) => parse_component(name, s),
        other => Err(EngineError::InvalidAddress(format!("{} must be a non-negative integer, got {}", name, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_rejects_negative_fields() {
        assert_eq!(TopologyAddress::validate(0, 1, 3).unwrap(), TopologyAddress::new(0, 1, 3));
        assert!(matches!(TopologyAddress::validate(-1, 1, 3), Err(EngineError::InvalidAddress(_))));
        assert!(matches!(TopologyAddress::validate(0, -1, 3), Err(EngineError::InvalidAddress(_))));
        assert!(matches!(TopologyAddress::validate(0, 1, -3), Err(EngineError::InvalidAddress(_))));
    }

    #[test]
    fn test_equality_needs_all_three_fields() {
        let a = TopologyAddress::new(0, 1, 3);
        assert_eq!(a, TopologyAddress::new(0, 1, 3));
        assert_ne!(a, TopologyAddress::new(1, 1, 3));
        assert_ne!(a, TopologyAddress::new(0, 2, 3));
        assert_ne!(a, TopologyAddress::new(0, 1, 4));
    }

    #[test]
    fn test_parse_slash_notation() {
        assert_eq!("0/1/3".parse::<TopologyAddress>().unwrap(), TopologyAddress::new(0, 1, 3));
        assert_eq!(" 0 / 2 / 15 ".parse::<TopologyAddress>().unwrap(), TopologyAddress::new(0, 2, 15));
        assert!("0/1".parse::<TopologyAddress>().is_err());
        assert!("0/x/3".parse::<TopologyAddress>().is_err());
        assert!("0/-1/3".parse::<TopologyAddress>().is_err());
        assert_eq!(TopologyAddress::new(0, 1, 3).to_string(), "0/1/3");
    }

    #[test]
    fn test_deserialize_validates_components() {
        let ok: TopologyAddress = serde_json::from_value(json!({"frame": 0, "board": "1", "port": 3})).unwrap();
        assert_eq!(ok, TopologyAddress::new(0, 1, 3));

        for bad in [
            json!({"frame": -1, "board": 1, "port": 3}),
            json!({"frame": 0, "board": 1.5, "port": 3}),
            json!({"frame": 0, "board": 1, "port": "three"}),
            json!({"frame": 0, "board": null, "port": 3}),
        ] {
            assert!(serde_json::from_value::<TopologyAddress>(bad).is_err());
        }
    }
}
