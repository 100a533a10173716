//! Canonical JSON snapshot: the interchange format used to move a ring
//! between hosts.
//!
//! Key order at every level is load-bearing: the top-level object is
//! `vnodes`, `pnodeToVnodeMap`, `algorithm`, `version`, in that order, and
//! `pnodeToVnodeMap`'s nested objects preserve pnode/vnode insertion order
//! rather than sorting by key. `IndexMap` plus `serde_json`'s
//! `preserve_order` feature make that the structural default instead of
//! something each call site has to remember.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::{Algorithm, HashEngine};
use crate::pnode::Pnode;
use crate::ring::{Backend, Ring};
use crate::vnode::{VnodeData, VnodeId};

/// `algorithm` field of the canonical snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlgorithmSnapshot {
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "MAX")]
    pub max: String,
    #[serde(rename = "VNODE_HASH_INTERVAL")]
    pub vnode_hash_interval: String,
}

/// The full canonical JSON form of a ring.
///
/// Field declaration order is the serialized key order: `serde_json`
/// writes struct fields in the order they're declared, so this order is
/// not incidental.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CanonicalRing {
    pub vnodes: u32,
    #[serde(rename = "pnodeToVnodeMap")]
    pub pnode_to_vnode_map: IndexMap<String, IndexMap<String, VnodeData>>,
    pub algorithm: AlgorithmSnapshot,
    pub version: String,
}

impl Ring {
    /// Produce the canonical snapshot of this ring's current state.
    pub fn serialize(&self) -> CanonicalRing {
        let engine = self.engine();
        let mut pnode_to_vnode_map = IndexMap::new();
        for pnode in self.get_pnodes() {
            let mut per_vnode = IndexMap::new();
            for vnode in self.get_vnodes(&pnode) {
                let data = self
                    .get_vnode_pnode_and_data(vnode)
                    .expect("vnode returned by get_vnodes is always in range")
                    .data;
                per_vnode.insert(vnode.to_string(), data);
            }
            pnode_to_vnode_map.insert(pnode.to_string(), per_vnode);
        }

        CanonicalRing {
            vnodes: engine.v(),
            pnode_to_vnode_map,
            algorithm: AlgorithmSnapshot {
                name: engine.algorithm().name().to_string(),
                max: engine.max_hex().to_string(),
                vnode_hash_interval: engine.interval_hex().to_string(),
            },
            version: crate::store::schema::SCHEMA_VERSION.to_string(),
        }
    }

    /// Reconstruct a ring from a canonical snapshot, writing its full
    /// vnode/pnode key set to a fresh store at `backend`.
    ///
    /// `serialize(deserialize(s)) == s` byte-for-byte for any `s` produced
    /// by `serialize`, since the snapshot already carries pnode and vnode
    /// id order and this round trip preserves both.
    pub fn deserialize(snapshot: &CanonicalRing, backend: Backend) -> Result<Self> {
        let algorithm = Algorithm::parse(&snapshot.algorithm.name)?;
        let engine = HashEngine::from_snapshot(
            algorithm,
            snapshot.vnodes,
            &snapshot.algorithm.max,
            &snapshot.algorithm.vnode_hash_interval,
        )?;

        let mut pnodes = indexmap::IndexSet::new();
        let mut vnode_to_pnode: Vec<Option<Pnode>> = vec![None; snapshot.vnodes as usize];
        let mut vnode_to_data = std::collections::HashMap::new();

        for (pnode_name, per_vnode) in &snapshot.pnode_to_vnode_map {
            let pnode = Pnode::new(pnode_name.clone())?;
            for (vnode_str, data) in per_vnode {
                let vnode: VnodeId = vnode_str
                    .parse()
                    .map_err(|_| Error::SerializationError(format!("non-numeric vnode id {vnode_str:?}")))?;
                let slot = vnode_to_pnode.get_mut(vnode as usize).ok_or_else(|| {
                    Error::SerializationError(format!("vnode {vnode} is out of range for V={}", snapshot.vnodes))
                })?;
                *slot = Some(pnode.clone());
                if let VnodeData::Value(v) = data {
                    vnode_to_data.insert(vnode, v.clone());
                }
            }
            pnodes.insert(pnode);
        }

        let vnode_to_pnode = vnode_to_pnode
            .into_iter()
            .enumerate()
            .map(|(i, owner)| {
                owner.ok_or_else(|| Error::SerializationError(format!("vnode {i} is unassigned in snapshot")))
            })
            .collect::<Result<Vec<_>>>()?;

        let store = crate::ring::model::open_backend(&backend, true)?;
        let adapter = crate::store::Adapter::new(store);
        adapter.restore(algorithm, snapshot.vnodes, &vnode_to_pnode, &pnodes, &vnode_to_data)?;

        Ok(Ring {
            engine: std::sync::Arc::new(engine),
            state: std::sync::Arc::new(parking_lot::RwLock::new(crate::ring::model::RingState {
                pnodes,
                vnode_to_pnode,
                vnode_to_data,
            })),
            adapter: std::sync::Arc::new(adapter),
        })
    }
}
