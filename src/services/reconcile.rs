//! Identity-based reconciliation.
//!
//! Skipping already-known records during a fetch and collapsing duplicates
//! during a merge are the same rule: a record is identified by its key, and
//! the latest occurrence of a key is the one that counts.

use std::collections::{HashMap, HashSet};

/// Anything with a stable primary key.
pub trait Keyed {
    fn key(&self) -> i64;
}

/// Set of primary keys already present in the accumulation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownIds(HashSet<i64>);

impl KnownIds {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_records<T: Keyed>(records: &[T]) -> Self {
        records.iter().map(Keyed::key).collect()
    }

    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.0.contains(&id)
    }

    /// Returns `true` if the id was not already present.
    pub fn insert(&mut self, id: i64) -> bool {
        self.0.insert(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<i64> for KnownIds {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<i64> for KnownIds {
    fn extend<I: IntoIterator<Item = i64>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// Drops every item whose key appears again later in `items`.
///
/// Survivors keep the relative order of their last occurrence.
#[must_use]
pub fn dedup_keep_last<T: Keyed>(items: Vec<T>) -> Vec<T> {
    let mut last_index: HashMap<i64, usize> = HashMap::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        last_index.insert(item.key(), index);
    }

    items
        .into_iter()
        .enumerate()
        .filter(|(index, item)| last_index.get(&item.key()) == Some(index))
        .map(|(_, item)| item)
        .collect()
}
