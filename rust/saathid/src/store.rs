//! Named-collection persistence over the workspace database.
//!
//! Every collection is read and written whole. A missing or unparseable blob
//! reads as the caller's default; it is never surfaced as an error.

use crate::db;
use anyhow::Context;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKey {
    Schools,
    Classes,
    Subjects,
    Students,
    Tests,
    Marks,
    Attendance,
    Feedback,
    CurrentUser,
}

impl CollectionKey {
    pub const ALL: [CollectionKey; 9] = [
        CollectionKey::Schools,
        CollectionKey::Classes,
        CollectionKey::Subjects,
        CollectionKey::Students,
        CollectionKey::Tests,
        CollectionKey::Marks,
        CollectionKey::Attendance,
        CollectionKey::Feedback,
        CollectionKey::CurrentUser,
    ];

    pub fn storage_key(self) -> &'static str {
        match self {
            CollectionKey::Schools => "rs_schools",
            CollectionKey::Classes => "rs_classes",
            CollectionKey::Subjects => "rs_subjects",
            CollectionKey::Students => "rs_students",
            CollectionKey::Tests => "rs_tests",
            CollectionKey::Marks => "rs_marks",
            CollectionKey::Attendance => "rs_attendance",
            CollectionKey::Feedback => "rs_feedback",
            CollectionKey::CurrentUser => "rs_user_v4",
        }
    }
}

pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        let conn = db::open_db(workspace).with_context(|| {
            format!("failed to open workspace {}", workspace.to_string_lossy())
        })?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_in_memory()?,
        })
    }

    pub fn get<T: DeserializeOwned>(&self, key: CollectionKey, default: T) -> T {
        let raw = match db::record_get_raw(&self.conn, key.storage_key()) {
            Ok(Some(v)) => v,
            Ok(None) => return default,
            Err(e) => {
                tracing::warn!(key = key.storage_key(), error = %e, "record read failed; using default");
                return default;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key = key.storage_key(), error = %e, "stored record is not valid; using default");
                default
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: CollectionKey, value: &T) -> anyhow::Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("failed to serialize {}", key.storage_key()))?;
        db::record_set_raw(&self.conn, key.storage_key(), &raw)
            .with_context(|| format!("failed to write {}", key.storage_key()))
    }

    /// Presence of the stored blob, parseable or not.
    pub fn contains(&self, key: CollectionKey) -> bool {
        matches!(db::record_get_raw(&self.conn, key.storage_key()), Ok(Some(_)))
    }

    pub fn snapshot(&self) -> anyhow::Result<BTreeMap<String, String>> {
        db::records_all_raw(&self.conn).context("failed to read records")
    }

    /// Replaces every stored record. Keys that name no known collection are
    /// dropped.
    pub fn restore(&mut self, records: &BTreeMap<String, String>) -> anyhow::Result<()> {
        let known: BTreeMap<String, String> = records
            .iter()
            .filter(|(k, _)| {
                let ok = CollectionKey::ALL.iter().any(|c| c.storage_key() == k.as_str());
                if !ok {
                    tracing::warn!(key = %k, "skipping unknown record key");
                }
                ok
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        db::records_replace_all(&mut self.conn, &known).context("failed to restore records")
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        db::records_clear(&self.conn).context("failed to clear records")
    }

    #[cfg(test)]
    pub(crate) fn put_raw(&self, key: CollectionKey, raw: &str) {
        db::record_set_raw(&self.conn, key.storage_key(), raw).expect("write raw record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassRoom;

    #[test]
    fn missing_collection_reads_as_default() {
        let store = RecordStore::open_in_memory().expect("store");
        let classes: Vec<ClassRoom> = store.get(CollectionKey::Classes, Vec::new());
        assert!(classes.is_empty());
        assert!(!store.contains(CollectionKey::Classes));
    }

    #[test]
    fn corrupt_blob_reads_as_default() {
        let store = RecordStore::open_in_memory().expect("store");
        store.put_raw(CollectionKey::Classes, "{not json");
        let classes: Vec<ClassRoom> = store.get(CollectionKey::Classes, Vec::new());
        assert!(classes.is_empty());
        assert!(store.contains(CollectionKey::Classes));
    }

    #[test]
    fn set_replaces_whole_collection() {
        let store = RecordStore::open_in_memory().expect("store");
        let first = vec![
            ClassRoom { id: "c9".into(), name: "9".into() },
            ClassRoom { id: "c10".into(), name: "10".into() },
        ];
        store.set(CollectionKey::Classes, &first).expect("set");
        let second = vec![ClassRoom { id: "c11".into(), name: "11".into() }];
        store.set(CollectionKey::Classes, &second).expect("set");
        let got: Vec<ClassRoom> = store.get(CollectionKey::Classes, Vec::new());
        assert_eq!(got, second);
    }

    #[test]
    fn snapshot_restore_replaces_every_key() {
        let mut store = RecordStore::open_in_memory().expect("store");
        store
            .set(CollectionKey::Classes, &vec![ClassRoom { id: "c9".into(), name: "9".into() }])
            .expect("set");
        let snap = store.snapshot().expect("snapshot");
        store.set(CollectionKey::Marks, &Vec::<u8>::new()).expect("set marks");
        store.restore(&snap).expect("restore");
        assert!(store.contains(CollectionKey::Classes));
        assert!(!store.contains(CollectionKey::Marks));
    }

    #[test]
    fn restore_drops_unknown_keys() {
        let mut store = RecordStore::open_in_memory().expect("store");
        let mut records = BTreeMap::new();
        records.insert("rs_classes".to_string(), "[]".to_string());
        records.insert("something_else".to_string(), "1".to_string());
        store.restore(&records).expect("restore");
        let snap = store.snapshot().expect("snapshot");
        assert_eq!(snap.keys().collect::<Vec<_>>(), vec!["rs_classes"]);
    }
}
