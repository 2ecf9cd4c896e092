//! Display-name resolution for catalog records.

use std::collections::HashMap;

use crate::StarRecord;

/// Injected catalog-id to common-name lookup. Display-only; the kinematic
/// pipeline never consults it.
pub type CommonNameMap = HashMap<u64, String>;

/// Resolve a human-readable name for a record.
///
/// Strategies run in order and the first hit wins: the injected common-name
/// map, the record's proper name, its alternate designation, and finally an
/// identifier synthesized from the catalog id.
pub fn display_name(record: &StarRecord, common_names: &CommonNameMap) -> String {
    common_names
        .get(&record.id)
        .cloned()
        .or_else(|| record.proper.clone())
        .or_else(|| record.designation.clone())
        .unwrap_or_else(|| format!("star {}", record.id))
}
