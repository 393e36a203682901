//! ONT identifier allocation, scoped per PON port.
//!
//! Ids are unique within one `(device, TopologyAddress)`, never across the
//! whole device, so every lookup goes through the address's own pool.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{NextIdResponse, OntRecord, TopologyAddress};

use super::{EngineError, EngineResult};

/// How the id for a registration is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationMode {
    /// Smallest free id on the port
    Auto,
    /// Operator-supplied id, validated only
    Manual(u32),
}

impl From<Option<u32>> for AllocationMode {
    fn from(ont_id: Option<u32>) -> Self {
        ont_id.map_or(Self::Auto, Self::Manual)
    }
}

/// Compute or validate the id for one port.
///
/// `existing` is the id set of that port only; `ceiling` is inclusive and
/// comes from the port's PON technology.
pub fn next_id(
    existing: &BTreeSet<u32>,
    mode: AllocationMode,
    ceiling: u32,
    address: TopologyAddress,
) -> EngineResult<u32> {
    match mode {
        AllocationMode::Auto => lowest_free(existing, ceiling).ok_or(EngineError::PoolExhausted { address, ceiling }),
        AllocationMode::Manual(ont_id) if ont_id > ceiling => Err(EngineError::OutOfRange { ont_id, ceiling }),
        AllocationMode::Manual(ont_id) if existing.contains(&ont_id) => {
            Err(EngineError::DuplicateId { ont_id, address })
        }
        AllocationMode::Manual(ont_id) => Ok(ont_id),
    }
}

/// Walk the sorted set until the first gap
fn lowest_free(existing: &BTreeSet<u32>, ceiling: u32) -> Option<u32> {
    let mut candidate = 0u32;
    for &used in existing.range(..=ceiling) {
        if used != candidate {
            break;
        }
        candidate = candidate.checked_add(1)?;
    }
    (candidate <= ceiling).then_some(candidate)
}

/// Used ids of one device, keyed by port
#[derive(Debug, Clone, Default)]
pub struct AddressPools {
    pools: BTreeMap<TopologyAddress, BTreeSet<u32>>,
}

static EMPTY_POOL: BTreeSet<u32> = BTreeSet::new();

impl AddressPools {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a OntRecord>) -> Self {
        let mut pools = Self::default();
        for record in records {
            pools.reserve(record.address, record.ont_id);
        }
        pools
    }

    /// Used ids at one port (empty when nothing is registered there)
    pub fn used(&self, address: &TopologyAddress) -> &BTreeSet<u32> {
        self.pools.get(address).unwrap_or(&EMPTY_POOL)
    }

    /// Mark an id taken; returns false if it already was
    pub fn reserve(&mut self, address: TopologyAddress, ont_id: u32) -> bool {
        self.pools.entry(address).or_default().insert(ont_id)
    }

    pub fn allocate(&self, address: TopologyAddress, mode: AllocationMode, ceiling: u32) -> EngineResult<u32> {
        next_id(self.used(&address), mode, ceiling, address)
    }

    /// Summarise a port's pool for the registration form
    pub fn report(&self, address: TopologyAddress, ceiling: u32) -> NextIdResponse {
        let used = self.used(&address);
        let available: Vec<u32> = (0..=ceiling).filter(|id| !used.contains(id)).collect();
        NextIdResponse {
            address,
            next_ont_id: available.first().copied(),
            ceiling,
            used_count: used.range(..=ceiling).count(),
            available_count: available.len(),
            available_ids: available.into_iter().take(10).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GPON: u32 = 127;
    const EPON: u32 = 63;
    const ADDR: TopologyAddress = TopologyAddress::new(0, 1, 3);

    fn set(ids: &[u32]) -> BTreeSet<u32> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_auto_fills_first_gap() {
        assert_eq!(next_id(&set(&[0, 1, 2, 4]), AllocationMode::Auto, GPON, ADDR).unwrap(), 3);
        assert_eq!(next_id(&set(&[]), AllocationMode::Auto, GPON, ADDR).unwrap(), 0);
        assert_eq!(next_id(&set(&[1, 2]), AllocationMode::Auto, GPON, ADDR).unwrap(), 0);
        assert_eq!(next_id(&set(&[0, 1, 2]), AllocationMode::Auto, GPON, ADDR).unwrap(), 3);
    }

    #[test]
    fn test_auto_returns_minimum_missing_value() {
        // Every subset of a small range against a brute-force minimum
        let ceiling = 5;
        for mask in 0u32..(1 << (ceiling + 1)) {
            let used: BTreeSet<u32> = (0..=ceiling).filter(|i| mask & (1 << i) != 0).collect();
            let expected = (0..=ceiling).find(|i| !used.contains(i));
            let got = next_id(&used, AllocationMode::Auto, ceiling, ADDR);
            match expected {
                Some(id) => assert_eq!(got.unwrap(), id),
                None => assert!(matches!(got, Err(EngineError::PoolExhausted { .. }))),
            }
        }
    }

    #[test]
    fn test_pool_exhausted() {
        let full: BTreeSet<u32> = (0..=EPON).collect();
        let err = next_id(&full, AllocationMode::Auto, EPON, ADDR).unwrap_err();
        assert!(matches!(err, EngineError::PoolExhausted { ceiling: 63, .. }));

        // The same ids only half-fill a GPON port
        assert_eq!(next_id(&full, AllocationMode::Auto, GPON, ADDR).unwrap(), 64);
    }

    #[test]
    fn test_ids_above_ceiling_are_ignored() {
        let mut used: BTreeSet<u32> = (0..=EPON).collect();
        used.insert(100);
        assert!(next_id(&used, AllocationMode::Auto, EPON, ADDR).is_err());
        assert_eq!(next_id(&set(&[0, 100]), AllocationMode::Auto, EPON, ADDR).unwrap(), 1);
    }

    #[test]
    fn test_manual_validates_range_and_uniqueness() {
        let used = set(&[0, 5]);
        assert_eq!(next_id(&used, AllocationMode::Manual(7), GPON, ADDR).unwrap(), 7);
        assert!(matches!(
            next_id(&used, AllocationMode::Manual(5), GPON, ADDR),
            Err(EngineError::DuplicateId { ont_id: 5, .. })
        ));
        assert!(matches!(
            next_id(&used, AllocationMode::Manual(64), EPON, ADDR),
            Err(EngineError::OutOfRange { ont_id: 64, ceiling: 63 })
        ));
        assert_eq!(next_id(&used, AllocationMode::Manual(127), GPON, ADDR).unwrap(), 127);
        assert!(next_id(&used, AllocationMode::Manual(128), GPON, ADDR).is_err());
    }

    #[test]
    fn test_pools_are_scoped_per_address() {
        let mut pools = AddressPools::default();
        for id in [0, 1, 2, 4] {
            pools.reserve(ADDR, id);
        }
        let other = TopologyAddress::new(0, 1, 4);
        pools.reserve(other, 0);

        assert_eq!(pools.allocate(ADDR, AllocationMode::Auto, GPON).unwrap(), 3);
        assert_eq!(pools.allocate(other, AllocationMode::Auto, GPON).unwrap(), 1);
        assert_eq!(pools.allocate(TopologyAddress::new(1, 1, 3), AllocationMode::Auto, GPON).unwrap(), 0);
        assert!(!pools.reserve(ADDR, 4));
    }

    #[test]
    fn test_report() {
        let mut pools = AddressPools::default();
        for id in [0, 1, 2, 4] {
            pools.reserve(ADDR, id);
        }
        let report = pools.report(ADDR, GPON);
        assert_eq!(report.next_ont_id, Some(3));
        assert_eq!(report.used_count, 4);
        assert_eq!(report.available_count, 124);
        assert_eq!(report.available_ids, vec![3, 5, 6, 7, 8, 9, 10, 11, 12, 13]);
    }

    #[test]
    fn test_report_follows_address_change() {
        let first = TopologyAddress::new(0, 1, 3);
        let second = TopologyAddress::new(0, 1, 4);
        let mut pools = AddressPools::default();
        for id in [0, 1, 2] {
            pools.reserve(first, id);
        }
        for id in [0, 1, 2, 3, 4, 5] {
            pools.reserve(second, id);
        }

        assert_eq!(pools.report(first, GPON).next_ont_id, Some(3));
        // The suggestion for the new port comes from its own pool
        let moved = pools.report(second, GPON);
        assert_eq!(moved.next_ont_id, Some(6));
        assert_eq!(
            moved.next_ont_id,
            next_id(pools.used(&second), AllocationMode::Auto, GPON, second).ok()
        );
        assert_eq!(pools.report(first, GPON).next_ont_id, Some(3));
    }
}
