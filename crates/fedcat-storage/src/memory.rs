//! # In-Memory Entity Storage
//!
//! [`MemoryStorage`] keeps entities in a `BTreeMap` behind a
//! `parking_lot::RwLock`. Clones share the same map, so one instance can be
//! handed to several owners. Writes are atomic per key (last write wins);
//! queries run against a snapshot taken under the read lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::StorageError;
use crate::query::{execute, QueryRequest, QueryResult};
use crate::{Entity, EntityStorage};

/// Thread-safe in-memory store keyed by primary key.
#[derive(Debug)]
pub struct MemoryStorage<T: Entity> {
    data: Arc<RwLock<BTreeMap<String, T>>>,
}

impl<T: Entity> Clone for MemoryStorage<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Entity> Default for MemoryStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> MemoryStorage<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Number of stored entities.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// All entities in primary-key order.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }
}

impl<T: Entity> EntityStorage<T> for MemoryStorage<T> {
    fn set(&self, entity: T) -> Result<(), StorageError> {
        let key = entity.primary_key().to_string();
        let replaced = self.data.write().insert(key.clone(), entity).is_some();
        tracing::trace!(%key, replaced, "entity stored");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<T>, StorageError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.data.write().remove(key);
        Ok(())
    }

    fn query(&self, request: &QueryRequest) -> Result<QueryResult<T>, StorageError> {
        let snapshot: Vec<(String, T)> = self
            .data
            .read()
            .iter()
            .map(|(key, entity)| (key.clone(), entity.clone()))
            .collect();
        let items = snapshot
            .into_iter()
            .map(|(key, entity)| -> Result<_, StorageError> {
                let json = serde_json::to_value(&entity)?;
                Ok((key, entity, json))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let page = execute(items, request)?;
        tracing::trace!(
            returned = page.entities.len(),
            total = page.total_entities,
            "entity query"
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::EntityCondition;
    use serde::Serialize;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Record {
        record_id: String,
        owner: String,
        size: u32,
    }

    impl Entity for Record {
        fn primary_key(&self) -> &str {
            &self.record_id
        }
    }

    fn record(id: &str, owner: &str, size: u32) -> Record {
        Record {
            record_id: id.into(),
            owner: owner.into(),
            size,
        }
    }

    #[test]
    fn set_get_remove() {
        let store = MemoryStorage::new();
        store.set(record("a", "alice", 1)).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(record("a", "alice", 1)));
        assert_eq!(store.get("b").unwrap(), None);
        store.remove("a").unwrap();
        assert!(store.is_empty());
        store.remove("a").unwrap();
    }

    #[test]
    fn set_replaces_existing_key() {
        let store = MemoryStorage::new();
        store.set(record("a", "alice", 1)).unwrap();
        store.set(record("a", "bob", 2)).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().unwrap().owner, "bob");
    }

    #[test]
    fn query_in_key_order_with_condition() {
        let store = MemoryStorage::new();
        for (id, owner) in [("c", "alice"), ("a", "alice"), ("b", "bob")] {
            store.set(record(id, owner, 0)).unwrap();
        }
        let all = store.query(&QueryRequest::new()).unwrap();
        let ids: Vec<_> = all.entities.iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let req = QueryRequest::new().with_condition(Some(EntityCondition::equals("owner", "alice")));
        let alice = store.query(&req).unwrap();
        assert_eq!(alice.total_entities, 2);
    }

    #[test]
    fn registration_between_pages_is_not_returned_twice() {
        let store = MemoryStorage::new();
        for id in ["b", "c", "d"] {
            store.set(record(id, "alice", 0)).unwrap();
        }
        let req = QueryRequest::new().with_page_size(Some(2));
        let first = store.query(&req).unwrap();
        store.set(record("a", "alice", 0)).unwrap();
        let second = store.query(&req.clone().with_cursor(first.cursor)).unwrap();

        let seen: Vec<_> = first
            .entities
            .iter()
            .chain(&second.entities)
            .map(|r| r.record_id.as_str())
            .collect();
        assert_eq!(seen, vec!["b", "c", "d"]);
        assert!(second.cursor.is_none());
    }

    #[test]
    fn query_projected_keeps_requested_properties() {
        let store = MemoryStorage::new();
        store.set(record("a", "alice", 3)).unwrap();
        let page = store
            .query_projected(&QueryRequest::new(), &["recordId", "size"])
            .unwrap();
        assert_eq!(page.entities, vec![serde_json::json!({"recordId": "a", "size": 3})]);
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryStorage::new();
        let other = store.clone();
        other.set(record("x", "alice", 0)).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn concurrent_writers_to_one_key_leave_one_entity() {
        let store = MemoryStorage::new();
        std::thread::scope(|s| {
            for i in 0..8u32 {
                let store = store.clone();
                s.spawn(move || {
                    for _ in 0..50 {
                        store.set(record("shared", "writer", i)).unwrap();
                    }
                });
            }
        });
        assert_eq!(store.len(), 1);
        assert!(store.get("shared").unwrap().unwrap().size < 8);
    }
}
