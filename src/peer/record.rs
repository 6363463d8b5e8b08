use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: String,
    pub display_name: String,
    /// Outgoing references; "this peer links to".
    pub neighbor_ids: Vec<String>,
}

impl NodeRecord {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        neighbor_ids: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            neighbor_ids,
        }
    }

    pub fn links_to(&self, id: &str) -> bool {
        self.neighbor_ids.iter().any(|neighbor| neighbor == id)
    }
}

/// Insertion-ordered id -> record map. Iteration order is the order records were
/// first inserted, which decides which records survive the inclusion cap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawStore {
    records: Vec<NodeRecord>,
    index_by_id: HashMap<String, usize>,
}

impl RawStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` and leaves the store untouched when the id is already present.
    pub fn insert(&mut self, record: NodeRecord) -> bool {
        if self.index_by_id.contains_key(&record.id) {
            return false;
        }

        self.index_by_id
            .insert(record.id.clone(), self.records.len());
        self.records.push(record);
        true
    }

    pub fn get(&self, id: &str) -> Option<&NodeRecord> {
        self.index_by_id
            .get(id)
            .and_then(|&index| self.records.get(index))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_by_id.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.records
            .iter()
            .map(|record| record.neighbor_ids.len())
            .sum()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index_by_id.clear();
    }
}

impl FromIterator<NodeRecord> for RawStore {
    fn from_iter<I: IntoIterator<Item = NodeRecord>>(iter: I) -> Self {
        let mut store = Self::new();
        for record in iter {
            store.insert(record);
        }
        store
    }
}
