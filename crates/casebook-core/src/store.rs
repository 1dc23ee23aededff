//! Sled-backed case store with one tree per collection plus a `singletons` tree.
//!
//! Values are JSON bytes keyed by record id, so array and object fields
//! round-trip through serialization. Batch writes are not transactional: a
//! failing write stops the loop and earlier writes stay.

use crate::error::{CaseError, CaseResult};
use crate::models::{CaseRecord, Singleton};
use sled::Db;
use std::path::Path;

const DEFAULT_PATH: &str = "./data/casebook";
const SINGLETONS_TREE: &str = "singletons";

/// Persistent store for every case collection.
pub struct CaseStore {
    db: Db,
}

impl CaseStore {
    /// Open the store at the default path (`./data/casebook`).
    pub fn new() -> Result<Self, sled::Error> {
        Self::open_path(DEFAULT_PATH)
    }

    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Full-collection fetch, in key order.
    pub fn list<T: CaseRecord>(&self) -> CaseResult<Vec<T>> {
        let tree = self.db.open_tree(T::COLLECTION.tree_name())?;
        let mut out = Vec::new();
        for item in tree.iter() {
            let (_, value) = item?;
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    pub fn get<T: CaseRecord>(&self, id: &str) -> CaseResult<Option<T>> {
        let tree = self.db.open_tree(T::COLLECTION.tree_name())?;
        match tree.get(id.as_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Insert or overwrite each record by id. Returns the number written.
    pub fn upsert_batch<T: CaseRecord>(&self, records: &[T]) -> CaseResult<usize> {
        let tree = self.db.open_tree(T::COLLECTION.tree_name())?;
        for record in records {
            let bytes = serde_json::to_vec(record)?;
            tree.insert(record.id().as_bytes(), bytes)?;
        }
        tree.flush()?;
        tracing::debug!(
            collection = T::COLLECTION.tree_name(),
            count = records.len(),
            "batch upsert"
        );
        Ok(records.len())
    }

    /// Overwrite an existing record. The record's own id is rewritten to `id`,
    /// so the stored value always matches its key. Returns the stored record.
    pub fn update<T: CaseRecord>(&self, id: &str, mut record: T) -> CaseResult<T> {
        let tree = self.db.open_tree(T::COLLECTION.tree_name())?;
        if !tree.contains_key(id.as_bytes())? {
            return Err(CaseError::not_found(T::COLLECTION.tree_name(), id));
        }
        if record.id() != id {
            tracing::debug!(
                collection = T::COLLECTION.tree_name(),
                path_id = id,
                body_id = record.id(),
                "body id replaced by path id"
            );
            record.set_id(id.to_string());
        }
        tree.insert(id.as_bytes(), serde_json::to_vec(&record)?)?;
        tree.flush()?;
        Ok(record)
    }

    /// Replace the whole collection (timeline batch save).
    pub fn replace_all<T: CaseRecord>(&self, records: &[T]) -> CaseResult<usize> {
        let tree = self.db.open_tree(T::COLLECTION.tree_name())?;
        tree.clear()?;
        for record in records {
            tree.insert(record.id().as_bytes(), serde_json::to_vec(record)?)?;
        }
        tree.flush()?;
        tracing::info!(
            collection = T::COLLECTION.tree_name(),
            count = records.len(),
            "collection replaced"
        );
        Ok(records.len())
    }

    /// Append a single record (used for the agent activity log).
    pub fn insert<T: CaseRecord>(&self, record: &T) -> CaseResult<()> {
        let tree = self.db.open_tree(T::COLLECTION.tree_name())?;
        tree.insert(record.id().as_bytes(), serde_json::to_vec(record)?)?;
        Ok(())
    }

    pub fn count<T: CaseRecord>(&self) -> CaseResult<usize> {
        Ok(self.db.open_tree(T::COLLECTION.tree_name())?.len())
    }

    /// Singleton value, or its default when never written.
    pub fn get_singleton<S: Singleton>(&self) -> CaseResult<S> {
        let tree = self.db.open_tree(SINGLETONS_TREE)?;
        match tree.get(S::KEY.as_bytes())? {
            Some(value) => Ok(serde_json::from_slice(&value)?),
            None => Ok(S::default()),
        }
    }

    pub fn put_singleton<S: Singleton>(&self, value: &S) -> CaseResult<()> {
        let tree = self.db.open_tree(SINGLETONS_TREE)?;
        tree.insert(S::KEY.as_bytes(), serde_json::to_vec(value)?)?;
        tree.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaseContext, Entity, RiskFlags, TimelineEvent};

    fn entity(id: &str, tags: &[&str]) -> Entity {
        Entity {
            id: id.to_string(),
            name: format!("entity {id}"),
            kind: "person".to_string(),
            description: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn timeline(id: &str, date: &str) -> TimelineEvent {
        TimelineEvent {
            id: id.to_string(),
            date: date.to_string(),
            title: format!("event {id}"),
            description: String::new(),
            source_document_id: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn upsert_then_list_keeps_array_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaseStore::open_path(dir.path()).unwrap();
        store
            .upsert_batch(&[entity("a", &["victim", "journalist"]), entity("b", &[])])
            .unwrap();
        let all: Vec<Entity> = store.list().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].tags, vec!["victim", "journalist"]);
    }

    #[test]
    fn upsert_overwrites_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaseStore::open_path(dir.path()).unwrap();
        store.upsert_batch(&[entity("a", &["old"])]).unwrap();
        store.upsert_batch(&[entity("a", &["new"])]).unwrap();
        let all: Vec<Entity> = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].tags, vec!["new"]);
    }

    #[test]
    fn update_missing_record_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaseStore::open_path(dir.path()).unwrap();
        let err = store.update("ghost", entity("ghost", &[])).unwrap_err();
        assert!(matches!(err, CaseError::NotFound { .. }));
    }

    #[test]
    fn update_keeps_ids_unique_when_body_id_differs() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaseStore::open_path(dir.path()).unwrap();
        store.upsert_batch(&[entity("a", &[])]).unwrap();

        let stored = store.update("a", entity("b", &["renamed"])).unwrap();
        assert_eq!(stored.id, "a");
        store.upsert_batch(&[entity("b", &[])]).unwrap();

        let mut ids: Vec<String> = store.list::<Entity>().unwrap().into_iter().map(|e| e.id).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
        let a: Entity = store.get("a").unwrap().unwrap();
        assert_eq!(a.tags, vec!["renamed"]);
    }

    #[test]
    fn replace_all_drops_previous_timeline() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaseStore::open_path(dir.path()).unwrap();
        store
            .replace_all(&[timeline("t1", "2024-01-01"), timeline("t2", "2024-02-01")])
            .unwrap();
        store.replace_all(&[timeline("t3", "2024-03-01")]).unwrap();
        let all: Vec<TimelineEvent> = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "t3");
    }

    #[test]
    fn singletons_default_until_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaseStore::open_path(dir.path()).unwrap();
        let flags: RiskFlags = store.get_singleton().unwrap();
        assert!(!flags.any());

        store
            .put_singleton(&CaseContext {
                description: "Detention of a lawyer".into(),
            })
            .unwrap();
        let ctx: CaseContext = store.get_singleton().unwrap();
        assert_eq!(ctx.description, "Detention of a lawyer");
    }
}
