//! In-memory backend: a sorted map behind a mutex, suitable for tests and
//! for ephemeral rings that never need to survive a process restart.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::error::Result;

use super::backend::{BatchOp, KvStore};

#[derive(Default)]
pub struct MemoryBackend {
    data: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        let mut data = self.data.lock();
        for op in ops {
            match op {
                BatchOp::Put(k, v) => {
                    data.insert(k, v);
                }
                BatchOp::Delete(k) => {
                    data.remove(&k);
                }
            }
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_applies_puts_and_deletes_together() {
        let backend = MemoryBackend::new();
        backend
            .batch(vec![
                BatchOp::Put(b"a".to_vec(), b"1".to_vec()),
                BatchOp::Put(b"b".to_vec(), b"2".to_vec()),
            ])
            .unwrap();
        assert_eq!(backend.get(b"a").unwrap(), Some(b"1".to_vec()));

        backend
            .batch(vec![
                BatchOp::Delete(b"a".to_vec()),
                BatchOp::Put(b"b".to_vec(), b"3".to_vec()),
            ])
            .unwrap();
        assert_eq!(backend.get(b"a").unwrap(), None);
        assert_eq!(backend.get(b"b").unwrap(), Some(b"3".to_vec()));
    }
}
