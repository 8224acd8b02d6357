use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A country as listed by `/regions`. `iso` is the natural key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub iso: String,
    pub name: String,
}

impl Region {
    pub fn new(iso: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            iso: iso.into(),
            name: name.into(),
        }
    }
}

/// Result of collapsing a region list to one entry per ISO code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionDedup {
    pub regions: Vec<Region>,
    /// Number of later entries discarded because their ISO was already seen.
    pub dropped: usize,
}

/// Keep the first region for each ISO code, preserving input order.
///
/// The upstream API occasionally lists the same ISO twice; later duplicates
/// are dropped silently and only counted.
pub fn dedup_by_iso(regions: Vec<Region>) -> RegionDedup {
    let total = regions.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(total);
    let regions: Vec<Region> = regions
        .into_iter()
        .filter(|r| seen.insert(r.iso.clone()))
        .collect();

    RegionDedup {
        dropped: total - regions.len(),
        regions,
    }
}
