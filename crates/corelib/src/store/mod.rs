//! Durable Store Adapter: translates ring state to/from an ordered KV and
//! executes mutations as atomic batches.
//!
//! [`Adapter`] owns the key-schema knowledge ([`schema`]) needed to create a
//! fresh ring and to reconstruct one on open/recovery. Mutation commits
//! themselves are assembled by [`crate::ring::mutation`], which already
//! holds the pnode/vnode context, and handed to [`Adapter::commit`] as a
//! plain batch: the adapter doesn't need to re-derive what changed.

mod backend;
mod memory;
mod redb_backend;
pub(crate) mod schema;

pub use backend::{BatchOp, KvStore};
pub use memory::MemoryBackend;
pub use redb_backend::RedbBackend;

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexSet;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::hash::Algorithm;
use crate::pnode::Pnode;
use crate::vnode::VnodeId;

/// Ring state reconstructed from a durable store on open.
pub struct LoadedRing {
    pub algorithm: Algorithm,
    pub v: u32,
    pub pnodes: IndexSet<Pnode>,
    pub vnode_to_pnode: Vec<Pnode>,
    pub vnode_to_data: HashMap<VnodeId, String>,
}

/// Maximum number of key writes per batch during creation.
const CREATE_BATCH_SIZE: usize = 1000;

pub struct Adapter {
    store: Arc<dyn KvStore>,
}

impl Adapter {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Borrow the backing store, e.g. to close it (see [`crate::ring::Ring::close`]).
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Write a fresh ring's full key set in the mandated order. Not atomic
    /// as a whole: `COMPLETE` is the durability marker, and a reader that
    /// finds it absent knows creation was torn.
    #[instrument(skip(self, vnode_to_pnode, pnodes))]
    pub fn create(
        &self,
        algorithm: Algorithm,
        v: u32,
        vnode_to_pnode: &[Pnode],
        pnodes: &IndexSet<Pnode>,
    ) -> Result<()> {
        self.write_full_key_set(algorithm, v, vnode_to_pnode, pnodes, &HashMap::new())
    }

    /// Write a ring's full key set with pre-existing per-vnode data, used to
    /// reconstruct a ring from a canonical snapshot (`deserialize`). Same
    /// write order as `create`; the only difference is that `/PNODE/%s/%d`
    /// and `VNODE_DATA` carry the snapshot's data instead of all-sentinel.
    #[instrument(skip(self, vnode_to_pnode, pnodes, vnode_to_data))]
    pub fn restore(
        &self,
        algorithm: Algorithm,
        v: u32,
        vnode_to_pnode: &[Pnode],
        pnodes: &IndexSet<Pnode>,
        vnode_to_data: &HashMap<VnodeId, String>,
    ) -> Result<()> {
        self.write_full_key_set(algorithm, v, vnode_to_pnode, pnodes, vnode_to_data)
    }

    fn write_full_key_set(
        &self,
        algorithm: Algorithm,
        v: u32,
        vnode_to_pnode: &[Pnode],
        pnodes: &IndexSet<Pnode>,
        vnode_to_data: &HashMap<VnodeId, String>,
    ) -> Result<()> {
        debug!(v, pnodes = pnodes.len(), "writing ring creation key set");

        // 1. VNODE_COUNT
        self.store.batch(vec![BatchOp::Put(
            schema::KEY_VNODE_COUNT.to_vec(),
            serde_json::to_vec(&v).map_err(|e| Error::SerializationError(e.to_string()))?,
        )])?;

        // 2. /VNODE/%d for every vnode, batched.
        for chunk in (0..v).collect::<Vec<_>>().chunks(CREATE_BATCH_SIZE) {
            let ops = chunk
                .iter()
                .map(|&i| {
                    let owner = &vnode_to_pnode[i as usize];
                    BatchOp::Put(schema::key_vnode(i), owner.as_str().as_bytes().to_vec())
                })
                .collect();
            self.store.batch(ops)?;
        }

        // 3. /PNODE/%s/%d = datum (sentinel 1 unless the snapshot carries a value).
        for chunk in (0..v).collect::<Vec<_>>().chunks(CREATE_BATCH_SIZE) {
            let ops = chunk
                .iter()
                .map(|&i| -> Result<BatchOp> {
                    let owner = &vnode_to_pnode[i as usize];
                    let datum = vnode_to_data
                        .get(&i)
                        .cloned()
                        .map(crate::vnode::VnodeData::Value)
                        .unwrap_or(crate::vnode::VnodeData::Default);
                    let bytes =
                        serde_json::to_vec(&datum).map_err(|e| Error::SerializationError(e.to_string()))?;
                    Ok(BatchOp::Put(schema::key_pnode_vnode(owner, i), bytes))
                })
                .collect::<Result<Vec<_>>>()?;
            self.store.batch(ops)?;
        }

        // 4. /PNODE/%s per pnode, and /PNODE for the set.
        let mut owned: HashMap<&Pnode, Vec<VnodeId>> = HashMap::new();
        for (i, p) in vnode_to_pnode.iter().enumerate() {
            owned.entry(p).or_default().push(i as VnodeId);
        }
        let mut ops = Vec::with_capacity(pnodes.len() + 1);
        for p in pnodes {
            let list = owned.get(p).cloned().unwrap_or_default();
            ops.push(BatchOp::Put(
                schema::key_pnode(p),
                serde_json::to_vec(&list).map_err(|e| Error::SerializationError(e.to_string()))?,
            ));
        }
        let pnode_names: Vec<&str> = pnodes.iter().map(Pnode::as_str).collect();
        ops.push(BatchOp::Put(
            schema::KEY_PNODE_SET.to_vec(),
            serde_json::to_vec(&pnode_names).map_err(|e| Error::SerializationError(e.to_string()))?,
        ));
        self.store.batch(ops)?;

        // 5. ALGORITHM, VERSION, COMPLETE, VNODE_DATA.
        let mut data_ids: Vec<VnodeId> = vnode_to_data.keys().copied().collect();
        data_ids.sort_unstable();
        self.store.batch(vec![
            BatchOp::Put(schema::KEY_ALGORITHM.to_vec(), algorithm.name().as_bytes().to_vec()),
            BatchOp::Put(schema::KEY_VERSION.to_vec(), schema::SCHEMA_VERSION.as_bytes().to_vec()),
            BatchOp::Put(
                schema::KEY_VNODE_DATA.to_vec(),
                serde_json::to_vec(&data_ids).map_err(|e| Error::SerializationError(e.to_string()))?,
            ),
            BatchOp::Put(schema::KEY_COMPLETE.to_vec(), b"1".to_vec()),
        ])?;

        Ok(())
    }

    /// Open an existing ring, verifying `COMPLETE` and reconstructing the
    /// full vnode/pnode state.
    #[instrument(skip(self))]
    pub fn open(&self) -> Result<LoadedRing> {
        if self.store.get(schema::KEY_COMPLETE)?.is_none() {
            return Err(Error::RingIncomplete);
        }

        let version = self.read_string(schema::KEY_VERSION)?;
        if version != schema::SCHEMA_VERSION {
            return Err(Error::RingVersionMismatch(version));
        }

        let v: u32 = self.read_json(schema::KEY_VNODE_COUNT)?;
        let algorithm_name = self.read_string(schema::KEY_ALGORITHM)?;
        let algorithm = Algorithm::parse(&algorithm_name)?;

        let pnode_names: Vec<String> = self.read_json(schema::KEY_PNODE_SET)?;
        let mut pnodes = IndexSet::new();
        let mut vnode_to_pnode: Vec<Option<Pnode>> = vec![None; v as usize];
        for name in pnode_names {
            let p = Pnode::new(name)?;
            let owned: Vec<VnodeId> = self
                .store
                .get(&schema::key_pnode(&p))?
                .map(|bytes| serde_json::from_slice(&bytes))
                .transpose()
                .map_err(|e| Error::Store(e.to_string()))?
                .unwrap_or_default();
            for vid in owned {
                let slot = vnode_to_pnode.get_mut(vid as usize).ok_or_else(|| {
                    Error::Store(format!("persisted vnode {vid} is out of range for V={v}"))
                })?;
                *slot = Some(p.clone());
            }
            pnodes.insert(p);
        }

        let vnode_to_pnode = vnode_to_pnode
            .into_iter()
            .enumerate()
            .map(|(i, owner)| {
                owner.ok_or_else(|| Error::Store(format!("vnode {i} has no owner in the persisted ring")))
            })
            .collect::<Result<Vec<_>>>()?;

        let data_ids: Vec<VnodeId> = self
            .store
            .get(schema::KEY_VNODE_DATA)?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()
            .map_err(|e| Error::Store(e.to_string()))?
            .unwrap_or_default();
        let mut vnode_to_data = HashMap::new();
        for vid in data_ids {
            let owner = &vnode_to_pnode[vid as usize];
            let raw = self
                .store
                .get(&schema::key_pnode_vnode(owner, vid))?
                .ok_or_else(|| Error::Store(format!("vnode {vid} listed in VNODE_DATA has no datum key")))?;
            let value: serde_json::Value =
                serde_json::from_slice(&raw).map_err(|e| Error::Store(e.to_string()))?;
            if let Some(s) = value.as_str() {
                vnode_to_data.insert(vid, s.to_string());
            }
        }

        Ok(LoadedRing {
            algorithm,
            v,
            pnodes,
            vnode_to_pnode,
            vnode_to_data,
        })
    }

    /// Commit a pre-assembled set of writes/deletes as one atomic batch.
    /// Mutations build `ops` themselves (they already hold the pnode/vnode
    /// context); the adapter's job is only to guarantee atomic commit.
    pub fn commit(&self, ops: Vec<BatchOp>) -> Result<()> {
        self.store.batch(ops)
    }

    fn read_string(&self, key: &[u8]) -> Result<String> {
        let bytes = self
            .store
            .get(key)?
            .ok_or_else(|| Error::Store(format!("missing required key {}", String::from_utf8_lossy(key))))?;
        String::from_utf8(bytes).map_err(|e| Error::Store(e.to_string()))
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &[u8]) -> Result<T> {
        let bytes = self
            .store
            .get(key)?
            .ok_or_else(|| Error::Store(format!("missing required key {}", String::from_utf8_lossy(key))))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::SerializationError(e.to_string()))
    }
}
