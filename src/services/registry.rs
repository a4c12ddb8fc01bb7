use std::collections::{HashMap, HashSet};

use crate::{
    error::LoadError,
    models::{BookmarkKey, BookmarkRecord, BookmarkState},
};

/// In-memory set of bookmarked items for one session
///
/// Presence of a key means the item is bookmarked. Records keep the order they were first
/// inserted in, which is the order the bookmarks page lists them.
#[derive(Debug, Default, Clone)]
pub struct BookmarkRegistry {
    records: HashMap<BookmarkKey, BookmarkRecord>,
    order: Vec<BookmarkKey>,
}

impl BookmarkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole mapping with `records`
    ///
    /// Duplicate keys are reported rather than resolved; the registry is left empty on failure.
    pub fn load(&mut self, records: Vec<BookmarkRecord>) -> Result<(), LoadError> {
        self.clear();

        let mut seen = HashSet::with_capacity(records.len());
        if let Some(duplicate) = records.iter().find(|r| !seen.insert(&r.key)) {
            return Err(LoadError::DuplicateKey(duplicate.key.clone()));
        }

        for record in records {
            self.order.push(record.key.clone());
            self.records.insert(record.key.clone(), record);
        }

        Ok(())
    }

    pub fn has(&self, key: &BookmarkKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn state(&self, key: &BookmarkKey) -> BookmarkState {
        BookmarkState::from_present(self.has(key))
    }

    pub fn get(&self, key: &BookmarkKey) -> Option<&BookmarkRecord> {
        self.records.get(key)
    }

    /// Adds or replaces the record for `record.key`, returning whether anything changed
    pub fn upsert(&mut self, record: BookmarkRecord) -> bool {
        match self.records.get_mut(&record.key) {
            Some(existing) if *existing == record => false,
            Some(existing) => {
                *existing = record;
                true
            }
            None => {
                self.order.push(record.key.clone());
                self.records.insert(record.key.clone(), record);
                true
            }
        }
    }

    /// Deletes the record for `key`, returning it if it was present
    pub fn remove(&mut self, key: &BookmarkKey) -> Option<BookmarkRecord> {
        let removed = self.records.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed)
    }

    /// Owned copy of every record in insertion order
    pub fn snapshot(&self) -> Vec<BookmarkRecord> {
        self.order
            .iter()
            .filter_map(|key| self.records.get(key))
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemType;

    fn record(id: &str, title: &str) -> BookmarkRecord {
        BookmarkRecord::new(BookmarkKey::new(id, ItemType::Movie), title, None)
    }

    #[test]
    fn test_load_replaces_contents() {
        let mut registry = BookmarkRegistry::new();
        registry.upsert(record("9", "Old"));

        registry
            .load(vec![record("1", "Alien"), record("2", "Aliens")])
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(!registry.has(&BookmarkKey::new("9", ItemType::Movie)));
    }

    #[test]
    fn test_load_rejects_duplicates_and_stays_empty() {
        let mut registry = BookmarkRegistry::new();
        registry.upsert(record("9", "Old"));

        let result = registry.load(vec![record("1", "First"), record(" 1", "Second")]);

        assert_eq!(
            result,
            Err(LoadError::DuplicateKey(BookmarkKey::new("1", ItemType::Movie)))
        );
        assert!(registry.is_empty());
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_same_id_different_type_is_not_a_duplicate() {
        let mut registry = BookmarkRegistry::new();
        let tv = BookmarkRecord::new(BookmarkKey::new("1", ItemType::Tv), "Show", None);
        registry.load(vec![record("1", "Movie"), tv]).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut registry = BookmarkRegistry::new();
        assert!(registry.upsert(record("42", "X")));
        let once = registry.snapshot();

        assert!(!registry.upsert(record("42", "X")));
        assert_eq!(registry.snapshot(), once);
    }

    #[test]
    fn test_upsert_replacement_keeps_position() {
        let mut registry = BookmarkRegistry::new();
        registry.upsert(record("1", "One"));
        registry.upsert(record("2", "Two"));

        assert!(registry.upsert(record("1", "One (Director's Cut)")));

        let titles: Vec<_> = registry.snapshot().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["One (Director's Cut)", "Two"]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = BookmarkRegistry::new();
        let key = BookmarkKey::new("42", ItemType::Movie);
        registry.upsert(record("42", "X"));

        assert!(registry.remove(&key).is_some());
        let once = registry.snapshot();
        assert!(registry.remove(&key).is_none());
        assert_eq!(registry.snapshot(), once);
        assert_eq!(registry.state(&key), BookmarkState::Absent);
    }

    #[test]
    fn test_snapshot_is_isolated() {
        let mut registry = BookmarkRegistry::new();
        registry.upsert(record("1", "One"));

        let mut snapshot = registry.snapshot();
        snapshot.clear();
        snapshot.push(record("2", "Injected"));

        assert_eq!(registry.len(), 1);
        assert!(registry.has(&BookmarkKey::new("1", ItemType::Movie)));
        assert!(!registry.has(&BookmarkKey::new("2", ItemType::Movie)));
    }
}
