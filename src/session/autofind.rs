use crate::models::{ScannedOnt, TopologyAddress};
use crate::utils::{is_valid_serial, normalize_serial};

/// Lists terminals seen on the PON that have no registration yet
pub const AUTOFIND_COMMAND: &str = "display ont autofind all";

/// Parse autofind output into scanned terminals.
///
/// Accepts table rows such as `0/1/3  1  HWTC12345678` and block output with
/// `F/S/P : 0/1/3` followed by `Ont SN : 48575443A1B2C3D4 (HWTC-A1B2C3D4)`.
/// Lines that match neither are ignored.
pub fn parse_autofind(output: &str) -> Vec<ScannedOnt> {
    let mut found = Vec::new();
    let mut block_address: Option<TopologyAddress> = None;

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            let value = value.trim();
            if key.eq_ignore_ascii_case("F/S/P") {
                block_address = value.parse().ok();
            } else if key.eq_ignore_ascii_case("Ont SN") {
                let serial = value.split_whitespace().next().map(normalize_serial);
                if let (Some(address), Some(serial_number)) = (block_address.take(), serial) {
                    if is_valid_serial(&serial_number) {
                        found.push(ScannedOnt { serial_number, address });
                    }
                }
            }
            continue;
        }

        if let Some(ont) = parse_table_row(line) {
            found.push(ont);
        }
    }

    found
}

fn parse_table_row(line: &str) -> Option<ScannedOnt> {
    let mut tokens = line.split_whitespace();
    let address: TopologyAddress = tokens.next()?.parse().ok()?;
    let serial_number = tokens
        .map(normalize_serial)
        .filter(|t| t.len() >= 8 && is_valid_serial(t))
        .last()?;
    Some(ScannedOnt { serial_number, address })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_rows() {
        let output = "\
  F/S/P   ONT  SN
  ------------------------
  0/1/3   1    HWTC12345678
  0/1/4   2    hwtc87654321
  junk line
";
        let onts = parse_autofind(output);
        assert_eq!(
            onts,
            vec![
                ScannedOnt {
                    serial_number: "HWTC12345678".into(),
                    address: TopologyAddress::new(0, 1, 3),
                },
                ScannedOnt {
                    serial_number: "HWTC87654321".into(),
                    address: TopologyAddress::new(0, 1, 4),
                },
            ]
        );
    }

    #[test]
    fn test_block_output() {
        let output = "\
   ----------------------------------------------------------------------------
   Number              : 1
   F/S/P               : 0/2/7
   Ont SN              : 48575443A1B2C3D4 (HWTC-A1B2C3D4)
   Password            : 0x00000000000000000000
   ----------------------------------------------------------------------------
   Number              : 2
   F/S/P               : 0/2/1
   Ont SN              : 48575443DEADBEEF (HWTC-DEADBEEF)
";
        let onts = parse_autofind(output);
        assert_eq!(onts.len(), 2);
        assert_eq!(onts[0].serial_number, "48575443A1B2C3D4");
        assert_eq!(onts[0].address, TopologyAddress::new(0, 2, 7));
        assert_eq!(onts[1].address, TopologyAddress::new(0, 2, 1));
    }

    #[test]
    fn test_serial_without_address_is_skipped() {
        let output = "Ont SN : 48575443A1B2C3D4\nF/S/P : bad\nOnt SN : 48575443A1B2C3D5\n";
        assert!(parse_autofind(output).is_empty());
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_autofind("").is_empty());
        assert!(parse_autofind("Failure: The automatically found ONTs do not exist").is_empty());
    }
}
