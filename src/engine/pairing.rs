//! Positional pairing of GEM ports with VLANs.
//!
//! The i-th GEM port always carries the i-th VLAN. Lists are never sorted:
//! GEM 1 on VLAN 41 and GEM 1 on VLAN 50 are different service contracts.

use crate::models::{ListToken, ServiceBinding, ServiceList};

use super::{EngineError, EngineResult};

/// Parse one list into integers, keeping declaration order
pub fn parse_list(list: &'static str, input: &ServiceList) -> EngineResult<Vec<u32>> {
    match input {
        ServiceList::Text(text) => text.split(',').map(|token| parse_token(list, token)).collect(),
        ServiceList::Tokens(tokens) => tokens
            .iter()
            .map(|token| match token {
                ListToken::Number(n) => u32::try_from(*n).map_err(|_| EngineError::MalformedList {
                    list,
                    token: n.to_string(),
                }),
                ListToken::Text(text) => parse_token(list, text),
            })
            .collect::<EngineResult<Vec<u32>>>()
            .and_then(|values| {
                if values.is_empty() {
                    Err(EngineError::MalformedList { list, token: String::new() })
                } else {
                    Ok(values)
                }
            }),
    }
}

fn parse_token(list: &'static str, token: &str) -> EngineResult<u32> {
    let trimmed = token.trim();
    trimmed.parse::<u32>().map_err(|_| EngineError::MalformedList {
        list,
        token: trimmed.to_string(),
    })
}

/// Pair GEM ports with VLANs by position
pub fn pair(gem_ports: &ServiceList, vlans: &ServiceList) -> EngineResult<Vec<ServiceBinding>> {
    let gem_ports = parse_list("GEM port", gem_ports)?;
    let vlans = parse_list("VLAN", vlans)?;
    pair_parsed(&gem_ports, &vlans)
}

/// Pair two already-parsed lists by position
pub fn pair_parsed(gem_ports: &[u32], vlans: &[u32]) -> EngineResult<Vec<ServiceBinding>> {
    if gem_ports.len() != vlans.len() {
        return Err(EngineError::LengthMismatch {
            gem_ports: gem_ports.len(),
            vlans: vlans.len(),
        });
    }

    Ok(gem_ports
        .iter()
        .zip(vlans)
        .zip(0u32..)
        .map(|((&gem_port, &vlan), order)| ServiceBinding { gem_port, vlan, order })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> ServiceList {
        ServiceList::Text(s.to_string())
    }

    fn binding(gem_port: u32, vlan: u32, order: u32) -> ServiceBinding {
        ServiceBinding { gem_port, vlan, order }
    }

    #[test]
    fn test_pairs_positionally() {
        let bindings = pair(&text("1,2"), &text("41,42")).unwrap();
        assert_eq!(bindings, vec![binding(1, 41, 0), binding(2, 42, 1)]);
    }

    #[test]
    fn test_keeps_declaration_order() {
        let bindings = pair(&text("3,1,2"), &text("69,41,42")).unwrap();
        assert_eq!(bindings, vec![binding(3, 69, 0), binding(1, 41, 1), binding(2, 42, 2)]);
    }

    #[test]
    fn test_single_service() {
        assert_eq!(pair(&text("1"), &text("41")).unwrap(), vec![binding(1, 41, 0)]);
    }

    #[test]
    fn test_trims_whitespace() {
        let bindings = pair(&text(" 1 , 2 ,3"), &text("41,  42 , 43 ")).unwrap();
        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings[2], binding(3, 43, 2));
    }

    #[test]
    fn test_length_mismatch() {
        let err = pair(&text("1,2,3"), &text("41,42")).unwrap_err();
        assert!(matches!(err, EngineError::LengthMismatch { gem_ports: 3, vlans: 2 }));

        let err = pair(&text("1"), &text("41,42")).unwrap_err();
        assert!(matches!(err, EngineError::LengthMismatch { gem_ports: 1, vlans: 2 }));
    }

    #[test]
    fn test_malformed_tokens() {
        for bad in ["", "1,,2", "1,a", "1,2,", "-1", "1.5"] {
            let err = pair(&text(bad), &text("41")).unwrap_err();
            assert!(matches!(err, EngineError::MalformedList { list: "GEM port", .. }), "input {:?}", bad);
        }
        let err = pair(&text("1"), &text("vlan41")).unwrap_err();
        assert!(matches!(err, EngineError::MalformedList { list: "VLAN", .. }));
    }

    #[test]
    fn test_malformed_checked_before_length() {
        let err = pair(&text("1,x,3"), &text("41")).unwrap_err();
        assert!(matches!(err, EngineError::MalformedList { .. }));
    }

    #[test]
    fn test_token_arrays() {
        let gem = ServiceList::Tokens(vec![ListToken::Number(1), ListToken::Text(" 2 ".into())]);
        let vlan = ServiceList::Tokens(vec![ListToken::Text("41".into()), ListToken::Number(42)]);
        assert_eq!(pair(&gem, &vlan).unwrap(), vec![binding(1, 41, 0), binding(2, 42, 1)]);

        let negative = ServiceList::Tokens(vec![ListToken::Number(-4)]);
        assert!(matches!(pair(&negative, &text("41")), Err(EngineError::MalformedList { .. })));

        let empty = ServiceList::Tokens(vec![]);
        assert!(matches!(pair(&empty, &empty), Err(EngineError::MalformedList { .. })));
    }

    #[test]
    fn test_every_binding_matches_its_inputs() {
        let gem: Vec<u32> = (1..=8).collect();
        let vlan: Vec<u32> = (100..108).rev().collect();
        let bindings = pair_parsed(&gem, &vlan).unwrap();
        assert_eq!(bindings.len(), gem.len());
        for (i, b) in bindings.iter().enumerate() {
            assert_eq!((b.gem_port, b.vlan, b.order as usize), (gem[i], vlan[i], i));
        }
    }

    #[test]
    fn test_json_lists_deserialize() {
        let as_text: ServiceList = serde_json::from_str(r#""1,2""#).unwrap();
        let as_array: ServiceList = serde_json::from_str(r#"[41, "42"]"#).unwrap();
        assert_eq!(pair(&as_text, &as_array).unwrap(), vec![binding(1, 41, 0), binding(2, 42, 1)]);
    }
}
