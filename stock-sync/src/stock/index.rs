//! Identifier index over the remote table's identifier column

use std::collections::HashMap;

use super::export::normalize_id;

/// Key under which blank identifier cells are filed
pub const BLANK_ID: &str = "-1";

/// Identifier -> zero-based data row
///
/// Built from one top-to-bottom scan; a repeated identifier keeps the last
/// row it was seen on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierIndex {
    rows: HashMap<String, usize>,
}

impl IdentifierIndex {
    pub fn build(column: &[Option<String>]) -> Self {
        let mut rows = HashMap::with_capacity(column.len());
        for (offset, cell) in column.iter().enumerate() {
            let key = match cell.as_deref().map(normalize_id) {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => BLANK_ID.to_string(),
            };
            rows.insert(key, offset);
        }
        Self { rows }
    }

    /// Row of `id`; the blank-cell key never matches
    pub fn get(&self, id: &str) -> Option<usize> {
        if id == BLANK_ID {
            return None;
        }
        self.rows.get(id).copied()
    }

    /// Number of distinct keys, the blank key included
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
