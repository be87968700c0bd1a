//! Project documents per user, stored in redb.
//!
//! # Table design
//!
//! A single `PROJECTS` table keyed by
//! ```text
//! [ user_len: u32 big-endian (4 bytes) | user bytes | project id bytes ]
//! ```
//!
//! The length prefix makes the user part unambiguous, so every document of
//! one user sits in a contiguous key range that starts with
//! `user_len ++ user`. Values are the JSON documents exactly as last merged.

use anyhow::Context;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use strategy_core::model::merge_fields;

const PROJECTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("projects");

// ---------------------------------------------------------------------------
// Key helpers
// ---------------------------------------------------------------------------

fn user_prefix(user: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + user.len());
    key.extend_from_slice(&(user.len() as u32).to_be_bytes());
    key.extend_from_slice(user.as_bytes());
    key
}

fn project_key(user: &str, project: &str) -> Vec<u8> {
    let mut key = user_prefix(user);
    key.extend_from_slice(project.as_bytes());
    key
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

pub struct DocumentStore {
    db: Database,
}

impl DocumentStore {
    /// Open or create the database at `path`, creating the table up front so
    /// reads never race its creation.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let db = Database::create(path)
            .with_context(|| format!("opening project store {}", path.display()))?;
        let wt = db.begin_write()?;
        wt.open_table(PROJECTS)?;
        wt.commit()?;
        Ok(Self { db })
    }

    /// All documents owned by `user`, in key order.
    pub fn list(&self, user: &str) -> anyhow::Result<Vec<serde_json::Value>> {
        let prefix = user_prefix(user);
        let rt = self.db.begin_read()?;
        let table = rt.open_table(PROJECTS)?;

        let mut docs = Vec::new();
        for entry in table.range(prefix.as_slice()..)? {
            let (k, v) = entry?;
            if !k.value().starts_with(&prefix) {
                break;
            }
            match serde_json::from_slice(v.value()) {
                Ok(doc) => docs.push(doc),
                Err(e) => tracing::warn!(user, error = %e, "skipping corrupt project document"),
            }
        }
        Ok(docs)
    }

    /// Insert `doc`, or merge its top-level fields into the stored document.
    /// Returns the document as stored.
    pub fn upsert(
        &self,
        user: &str,
        project: &str,
        doc: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        let key = project_key(user, project);
        let wt = self.db.begin_write()?;
        let merged = {
            let mut table = wt.open_table(PROJECTS)?;
            let existing = match table.get(key.as_slice())? {
                Some(v) => serde_json::from_slice::<serde_json::Value>(v.value()).ok(),
                None => None,
            };
            let merged = match existing {
                Some(mut current) => {
                    merge_fields(&mut current, doc);
                    current
                }
                None => doc,
            };
            let bytes = serde_json::to_vec(&merged)?;
            table.insert(key.as_slice(), bytes.as_slice())?;
            merged
        };
        wt.commit()?;
        Ok(merged)
    }

    /// Remove one document. Returns `false` if it did not exist.
    pub fn delete(&self, user: &str, project: &str) -> anyhow::Result<bool> {
        let key = project_key(user, project);
        let wt = self.db.begin_write()?;
        let removed = {
            let mut table = wt.open_table(PROJECTS)?;
            let removed = table.remove(key.as_slice())?.is_some();
            removed
        };
        wt.commit()?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> DocumentStore {
        DocumentStore::open(&dir.path().join("projects.redb")).unwrap()
    }

    #[test]
    fn upsert_then_list() {
        let dir = TempDir::new().unwrap();
        let db = store(&dir);
        db.upsert("alice", "p1", json!({"id": "p1", "name": "Acme"})).unwrap();
        db.upsert("alice", "p2", json!({"id": "p2", "name": "Beta"})).unwrap();

        let docs = db.list("alice").unwrap();
        assert_eq!(docs.len(), 2);
        assert!(db.list("bob").unwrap().is_empty());
    }

    #[test]
    fn upsert_merges_top_level_fields() {
        let dir = TempDir::new().unwrap();
        let db = store(&dir);
        db.upsert("alice", "p1", json!({"id": "p1", "name": "Acme", "extra": 1}))
            .unwrap();
        let merged = db
            .upsert("alice", "p1", json!({"id": "p1", "name": "Renamed"}))
            .unwrap();
        assert_eq!(merged, json!({"id": "p1", "name": "Renamed", "extra": 1}));

        // Idempotent.
        let again = db
            .upsert("alice", "p1", json!({"id": "p1", "name": "Renamed"}))
            .unwrap();
        assert_eq!(again, merged);
        assert_eq!(db.list("alice").unwrap(), vec![merged]);
    }

    #[test]
    fn users_with_shared_prefixes_stay_apart() {
        let dir = TempDir::new().unwrap();
        let db = store(&dir);
        db.upsert("al", "ice-p1", json!({"id": "ice-p1"})).unwrap();
        db.upsert("alice", "p1", json!({"id": "p1"})).unwrap();

        assert_eq!(db.list("al").unwrap(), vec![json!({"id": "ice-p1"})]);
        assert_eq!(db.list("alice").unwrap(), vec![json!({"id": "p1"})]);
    }

    #[test]
    fn delete_reports_presence() {
        let dir = TempDir::new().unwrap();
        let db = store(&dir);
        db.upsert("alice", "p1", json!({"id": "p1"})).unwrap();
        assert!(db.delete("alice", "p1").unwrap());
        assert!(!db.delete("alice", "p1").unwrap());
        assert!(db.list("alice").unwrap().is_empty());
    }

    #[test]
    fn documents_survive_reopen() {
        let dir = TempDir::new().unwrap();
        store(&dir)
            .upsert("alice", "p1", json!({"id": "p1"}))
            .unwrap();
        assert_eq!(store(&dir).list("alice").unwrap().len(), 1);
    }
}
