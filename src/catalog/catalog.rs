use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::StarRecord;

/// Immutable star table with lookup indices.
///
/// The record vector is the unified position/velocity table handed to
/// queries; queries never mutate it, each analysis derives its own shifted
/// copy. Indices are skipped during serialization and rebuilt on load.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StarCatalog {
    pub records: Vec<StarRecord>,
    #[serde(skip)]
    id_index: HashMap<u64, usize>,
    #[serde(skip)]
    name_index: HashMap<String, Vec<usize>>,
}

impl StarCatalog {
    pub fn new(records: Vec<StarRecord>) -> Self {
        let mut catalog = StarCatalog {
            records,
            id_index: HashMap::new(),
            name_index: HashMap::new(),
        };
        catalog.rebuild_indices();
        catalog
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StarRecord> {
        self.records.get(index)
    }

    pub fn index_of_id(&self, id: u64) -> Option<usize> {
        self.id_index.get(&id).copied()
    }

    /// Indices of records whose proper name or designation equals `name`.
    /// More than one hit means the name is ambiguous as a reference.
    pub fn indices_of_name(&self, name: &str) -> &[usize] {
        self.name_index.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rebuild_indices(&mut self) {
        self.id_index = self
            .records
            .iter()
            .enumerate()
            .map(|(idx, record)| (record.id, idx))
            .collect();
        self.name_index.clear();
        for (idx, record) in self.records.iter().enumerate() {
            let names = [record.proper.as_deref(), record.designation.as_deref()];
            for name in names.into_iter().flatten() {
                self.name_index.entry(name.to_string()).or_default().push(idx);
            }
        }
    }
}
