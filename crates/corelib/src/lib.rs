//! Consistent hash ring and its durable store.
//!
//! A ring slices a cryptographic hash space into a fixed number of virtual
//! nodes (vnodes), assigns each to a physical node (pnode), and resolves
//! application keys to their owning pnode deterministically. This crate
//! provides:
//! - the ring model and lookup (`ring::Ring`)
//! - the mutation protocol (`remap`, `remove_pnode`, `add_data`) and its
//!   change-sets
//! - a durable store adapter over an abstract ordered KV (`store`), with
//!   an in-memory backend and a `redb`-backed one
//! - canonical JSON serialization for moving a ring between hosts
//!   (`serialize`)
//! - topology diffing between two rings (`ring::diff`)

pub mod error;
pub mod hash;
pub mod pnode;
pub mod ring;
pub mod serialize;
pub mod store;
pub mod vnode;

pub use error::{Error, Result};
pub use hash::{Algorithm, HashEngine};
pub use pnode::Pnode;
pub use ring::{diff, Backend, ChangeSet, ChangeSetMap, CreateOptions, NodeLookup, Ring};
pub use serialize::{AlgorithmSnapshot, CanonicalRing};
pub use vnode::{VnodeData, VnodeId};
