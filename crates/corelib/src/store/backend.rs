//! The abstract ordered KV contract the durable store adapter is built on.
//!
//! The underlying engine is an external collaborator: any backend with the
//! same semantics (point reads, atomic multi-key writes) is acceptable.
//! This trait is that seam. [`super::memory::MemoryBackend`] and
//! [`super::redb_backend::RedbBackend`] are the two implementations this
//! crate ships.

use crate::error::{Error, Result};

/// One write in an atomic batch.
#[derive(Clone, Debug)]
pub enum BatchOp {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// An ordered key-value store with point reads and atomic multi-key writes.
///
/// Implementations must apply every op in a `batch` call atomically: from
/// any concurrent reader's perspective, either all of them are visible or
/// none are.
pub trait KvStore: Send + Sync {
    /// Point lookup.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Apply every operation in `ops` as one atomic transaction.
    fn batch(&self, ops: Vec<BatchOp>) -> Result<()>;

    /// Release the backend's resources. Idempotent.
    fn close(&self) -> Result<()>;
}

pub(crate) fn store_err(context: &str, err: impl std::fmt::Display) -> Error {
    Error::Store(format!("{context}: {err}"))
}
