//! Error taxonomy for the ring library.
//!
//! One variant per distinct failure kind the ring and its store can
//! produce. Callers match on variants, not on message text.

use crate::vnode::VnodeId;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, querying, or mutating a ring.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad algorithm name, non-positive `V`, or an empty pnode list at create.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A vnode id fell outside `[0, V)`.
    #[error("vnode {vnode} is out of range for a ring of {v} vnodes")]
    VnodeOutOfRange { vnode: VnodeId, v: u32 },

    /// `remap` was asked to move a vnode to the pnode that already owns it.
    #[error("vnode {vnode} is already owned by pnode \"{pnode}\"")]
    VnodeAlreadyOnTarget { vnode: VnodeId, pnode: String },

    /// `remove_pnode`/a query referenced a pnode never seen by this ring.
    #[error("pnode \"{0}\" is not part of this ring")]
    PnodeUnknown(String),

    /// `remove_pnode` was called on a pnode that still owns vnodes.
    #[error("pnode \"{0}\" still owns vnodes and cannot be removed")]
    PnodeStillInUse(String),

    /// The store was opened but no `COMPLETE` marker was found.
    #[error("ring store has no COMPLETE marker; creation was torn")]
    RingIncomplete,

    /// The store's persisted schema `VERSION` is not one this build understands.
    #[error("unsupported ring schema version: {0}")]
    RingVersionMismatch(String),

    /// The underlying KV backend failed (I/O, corruption, transaction conflict).
    #[error("store error: {0}")]
    Store(String),

    /// A topology snapshot could not be parsed or was internally inconsistent.
    #[error("malformed ring snapshot: {0}")]
    SerializationError(String),
}
