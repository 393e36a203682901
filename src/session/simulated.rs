use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::models::{ScannedOnt, TopologyAddress};

/// Synthesizes plausible autofind results for disconnected devices
pub struct SimulatedScanner {
    rng: Mutex<StdRng>,
}

impl Default for SimulatedScanner {
    fn default() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

impl SimulatedScanner {
    #[cfg(test)]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// 3 to 5 terminals, `HWTC` serials, frame 0 board 1 ports 1 to 5
    pub fn scan(&self) -> Vec<ScannedOnt> {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let count = rng.gen_range(3..=5);
        (0..count)
            .map(|_| ScannedOnt {
                serial_number: format!("HWTC{:08}", rng.gen_range(0..100_000_000u32)),
                address: TopologyAddress::new(0, 1, rng.gen_range(1..=5)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::is_valid_serial;

    #[test]
    fn test_simulated_shape() {
        let scanner = SimulatedScanner::seeded(7);
        for _ in 0..20 {
            let onts = scanner.scan();
            assert!((3..=5).contains(&onts.len()));
            for ont in onts {
                assert!(ont.serial_number.starts_with("HWTC"));
                assert_eq!(ont.serial_number.len(), 12);
                assert!(is_valid_serial(&ont.serial_number));
                assert_eq!((ont.address.frame, ont.address.board), (0, 1));
                assert!((1..=5).contains(&ont.address.port));
            }
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        assert_eq!(SimulatedScanner::seeded(42).scan(), SimulatedScanner::seeded(42).scan());
    }
}
