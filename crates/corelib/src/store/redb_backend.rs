//! `redb`-backed durable store: a LevelDB-class ordered KV with atomic
//! multi-key writes, satisfying the `KvStore` contract.

use std::path::Path;

use redb::{Database, TableDefinition};

use crate::error::Result;

use super::backend::{store_err, BatchOp, KvStore};

const TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("ring");

pub struct RedbBackend {
    db: Database,
}

impl RedbBackend {
    /// Create a fresh database at `path`, failing if one already exists.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref()).map_err(|e| store_err("redb create", e))?;
        // Touch the table so a freshly created database already has it,
        // instead of deferring table creation to the first write batch.
        let txn = db.begin_write().map_err(|e| store_err("redb begin_write", e))?;
        {
            let _ = txn.open_table(TABLE).map_err(|e| store_err("redb open_table", e))?;
        }
        txn.commit().map_err(|e| store_err("redb commit", e))?;
        Ok(Self { db })
    }

    /// Open an existing database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::open(path.as_ref()).map_err(|e| store_err("redb open", e))?;
        Ok(Self { db })
    }
}

impl KvStore for RedbBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(|e| store_err("redb begin_read", e))?;
        let table = txn.open_table(TABLE).map_err(|e| store_err("redb open_table", e))?;
        let value = table
            .get(key)
            .map_err(|e| store_err("redb get", e))?
            .map(|v| v.value().to_vec());
        Ok(value)
    }

    fn batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        let txn = self.db.begin_write().map_err(|e| store_err("redb begin_write", e))?;
        {
            let mut table = txn.open_table(TABLE).map_err(|e| store_err("redb open_table", e))?;
            for op in ops {
                match op {
                    BatchOp::Put(k, v) => {
                        table
                            .insert(k.as_slice(), v.as_slice())
                            .map_err(|e| store_err("redb insert", e))?;
                    }
                    BatchOp::Delete(k) => {
                        table.remove(k.as_slice()).map_err(|e| store_err("redb remove", e))?;
                    }
                }
            }
        }
        txn.commit().map_err(|e| store_err("redb commit", e))?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        // `redb::Database` flushes and releases its file lock on drop; there
        // is no separate close call to make.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RedbBackend::create(dir.path().join("ring.redb")).unwrap();
        backend
            .batch(vec![BatchOp::Put(b"VNODE_COUNT".to_vec(), b"6".to_vec())])
            .unwrap();
        assert_eq!(backend.get(b"VNODE_COUNT").unwrap(), Some(b"6".to_vec()));
    }

    #[test]
    fn reopen_sees_prior_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ring.redb");
        {
            let backend = RedbBackend::create(&path).unwrap();
            backend
                .batch(vec![BatchOp::Put(b"COMPLETE".to_vec(), b"1".to_vec())])
                .unwrap();
        }
        let backend = RedbBackend::open(&path).unwrap();
        assert_eq!(backend.get(b"COMPLETE").unwrap(), Some(b"1".to_vec()));
    }
}
