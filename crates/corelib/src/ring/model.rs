//! The ring model: `(algorithm, V, vnode→pnode, vnode→data, pnode-set,
//! version)` plus the durable store handle backing it, and the read-only
//! operations over that state.
//!
//! Mutations (`remap`, `remove_pnode`, `add_data`) live in
//! [`super::mutation`]; this module owns creation, lookup, and the plain
//! enumerations (`get_vnodes`, `get_pnodes`, `get_data_vnodes`).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use crate::error::{Error, Result};
use crate::hash::{Algorithm, HashEngine};
use crate::pnode::Pnode;
use crate::store::{Adapter, KvStore, MemoryBackend, RedbBackend};
use crate::vnode::{VnodeData, VnodeId};

/// Where a ring's durable state lives.
#[derive(Clone, Debug)]
pub enum Backend {
    /// A `Mutex<BTreeMap<..>>` with no persistence, for tests and
    /// ephemeral rings.
    Memory,
    /// A `redb` database at the given path.
    Redb(PathBuf),
}

/// Everything needed to create a new ring.
pub struct CreateOptions {
    pub algorithm: Algorithm,
    pub pnodes: Vec<Pnode>,
    pub vnodes: u32,
    pub backend: Backend,
}

/// What `get_node` returns for a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeLookup {
    pub pnode: Pnode,
    pub vnode: VnodeId,
    pub data: VnodeData,
}

pub(crate) struct RingState {
    pub(crate) pnodes: IndexSet<Pnode>,
    pub(crate) vnode_to_pnode: Vec<Pnode>,
    pub(crate) vnode_to_data: HashMap<VnodeId, String>,
}

/// A consistent hash ring: vnode layout, the vnode↔pnode assignment, and
/// the durable store backing it.
///
/// Cheap to clone: `Ring` is an `Arc`-backed handle, and mutation methods
/// take `&self` (not `&mut self`), acquiring an internal write lock that
/// they hold for their entire body, including the store commit. This is a
/// single-writer/many-reader model: many threads can hold a `Ring` and
/// call `get_node` concurrently, while at most one mutation proceeds at a
/// time and no reader observes a state straddling a mutation's commit.
#[derive(Clone)]
pub struct Ring {
    pub(crate) engine: Arc<HashEngine>,
    pub(crate) state: Arc<RwLock<RingState>>,
    pub(crate) adapter: Arc<Adapter>,
}

impl Ring {
    /// Create a ring from a pnode list, writing the canonical even
    /// distribution (vnode `i` → `pnodes[i mod n]`) to the backing store.
    #[instrument(skip(opts), fields(v = opts.vnodes, pnodes = opts.pnodes.len()))]
    pub fn create(opts: CreateOptions) -> Result<Self> {
        if opts.pnodes.is_empty() {
            return Err(Error::ConfigInvalid("pnode list must be non-empty".into()));
        }
        if opts.vnodes == 0 {
            return Err(Error::ConfigInvalid("vnode count must be positive".into()));
        }

        let engine = HashEngine::new(opts.algorithm, opts.vnodes)?;
        let n = opts.pnodes.len();
        let vnode_to_pnode: Vec<Pnode> = (0..opts.vnodes)
            .map(|i| opts.pnodes[i as usize % n].clone())
            .collect();
        let pnodes: IndexSet<Pnode> = opts.pnodes.into_iter().collect();

        let store = open_backend(&opts.backend, true)?;
        let adapter = Adapter::new(store);
        adapter.create(opts.algorithm, opts.vnodes, &vnode_to_pnode, &pnodes)?;
        info!(v = opts.vnodes, pnodes = pnodes.len(), algorithm = opts.algorithm.name(), "ring created");

        Ok(Self {
            engine: Arc::new(engine),
            state: Arc::new(RwLock::new(RingState {
                pnodes,
                vnode_to_pnode,
                vnode_to_data: HashMap::new(),
            })),
            adapter: Arc::new(adapter),
        })
    }

    /// Open a ring previously created at `location` (or reconstructed via
    /// [`crate::serialize::deserialize`]).
    #[instrument]
    pub fn open(backend: Backend) -> Result<Self> {
        let store = open_backend(&backend, false)?;
        let adapter = Adapter::new(store);
        let loaded = adapter.open()?;
        let engine = HashEngine::new(loaded.algorithm, loaded.v)?;
        debug!(v = loaded.v, pnodes = loaded.pnodes.len(), "ring opened");
        Ok(Self {
            engine: Arc::new(engine),
            state: Arc::new(RwLock::new(RingState {
                pnodes: loaded.pnodes,
                vnode_to_pnode: loaded.vnode_to_pnode,
                vnode_to_data: loaded.vnode_to_data,
            })),
            adapter: Arc::new(adapter),
        })
    }

    /// `V`, the fixed vnode count.
    pub fn vnode_count(&self) -> u32 {
        self.engine.v()
    }

    pub fn algorithm(&self) -> Algorithm {
        self.engine.algorithm()
    }

    pub(crate) fn engine(&self) -> &HashEngine {
        &self.engine
    }

    pub(crate) fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Release the backing store's resources. Idempotent; safe to call even
    /// though every `KvStore` implementation also releases its resources on
    /// drop.
    pub fn close(&self) -> Result<()> {
        self.adapter.store().close()
    }

    /// Resolve a key to its owning pnode, vnode, and data.
    pub fn get_node(&self, key: &[u8]) -> NodeLookup {
        let vnode = self.engine.vnode_of(key);
        let state = self.state.read();
        let pnode = state.vnode_to_pnode[vnode as usize].clone();
        let data = state
            .vnode_to_data
            .get(&vnode)
            .cloned()
            .map(VnodeData::Value)
            .unwrap_or(VnodeData::Default);
        NodeLookup { pnode, vnode, data }
    }

    /// All vnodes owned by `pnode`, ascending.
    pub fn get_vnodes(&self, pnode: &Pnode) -> Vec<VnodeId> {
        let state = self.state.read();
        let mut vnodes: Vec<VnodeId> = state
            .vnode_to_pnode
            .iter()
            .enumerate()
            .filter(|(_, owner)| *owner == pnode)
            .map(|(i, _)| i as VnodeId)
            .collect();
        vnodes.sort_unstable();
        vnodes
    }

    /// All pnodes, in order of first appearance.
    pub fn get_pnodes(&self) -> Vec<Pnode> {
        self.state.read().pnodes.iter().cloned().collect()
    }

    /// The owning pnode and current data of a single vnode.
    pub fn get_vnode_pnode_and_data(&self, vnode: VnodeId) -> Result<NodeLookup> {
        self.check_vnode_range(vnode)?;
        let state = self.state.read();
        let pnode = state.vnode_to_pnode[vnode as usize].clone();
        let data = state
            .vnode_to_data
            .get(&vnode)
            .cloned()
            .map(VnodeData::Value)
            .unwrap_or(VnodeData::Default);
        Ok(NodeLookup { pnode, vnode, data })
    }

    /// Ascending ids of vnodes carrying operator-supplied (non-sentinel) data.
    pub fn get_data_vnodes(&self) -> Vec<VnodeId> {
        let state = self.state.read();
        let mut ids: Vec<VnodeId> = state.vnode_to_data.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub(crate) fn check_vnode_range(&self, vnode: VnodeId) -> Result<()> {
        if vnode >= self.engine.v() {
            return Err(Error::VnodeOutOfRange { vnode, v: self.engine.v() });
        }
        Ok(())
    }
}

pub(crate) fn open_backend(backend: &Backend, creating: bool) -> Result<Arc<dyn KvStore>> {
    match backend {
        Backend::Memory => Ok(Arc::new(MemoryBackend::new())),
        Backend::Redb(path) => {
            let redb = if creating {
                RedbBackend::create(path)?
            } else {
                RedbBackend::open(path)?
            };
            Ok(Arc::new(redb))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pnode(s: &str) -> Pnode {
        Pnode::new(s).unwrap()
    }

    #[test]
    fn even_distribution_matches_modulo_assignment() {
        // S1: algorithm=sha256, V=6, pnodes=[P1, P2]
        let ring = Ring::create(CreateOptions {
            algorithm: Algorithm::Sha256,
            pnodes: vec![pnode("P1"), pnode("P2")],
            vnodes: 6,
            backend: Backend::Memory,
        })
        .unwrap();

        assert_eq!(ring.get_vnodes(&pnode("P1")), vec![0, 2, 4]);
        assert_eq!(ring.get_vnodes(&pnode("P2")), vec![1, 3, 5]);
    }

    #[test]
    fn lookup_is_deterministic_and_in_range() {
        let ring = Ring::create(CreateOptions {
            algorithm: Algorithm::Sha256,
            pnodes: vec![pnode("P1"), pnode("P2"), pnode("P3")],
            vnodes: 64,
            backend: Backend::Memory,
        })
        .unwrap();

        for key in [&b"a"[..], b"consistent-key", b""] {
            let first = ring.get_node(key);
            let second = ring.get_node(key);
            assert_eq!(first, second);
            assert!(first.vnode < 64);
        }
    }

    #[test]
    fn every_vnode_has_exactly_one_owner() {
        let ring = Ring::create(CreateOptions {
            algorithm: Algorithm::Sha1,
            pnodes: vec![pnode("a"), pnode("b"), pnode("c")],
            vnodes: 17,
            backend: Backend::Memory,
        })
        .unwrap();

        let mut seen = vec![0u32; 17];
        for p in ring.get_pnodes() {
            for v in ring.get_vnodes(&p) {
                seen[v as usize] += 1;
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn get_pnodes_preserves_first_appearance_order() {
        let ring = Ring::create(CreateOptions {
            algorithm: Algorithm::Sha256,
            pnodes: vec![pnode("z"), pnode("a"), pnode("m")],
            vnodes: 9,
            backend: Backend::Memory,
        })
        .unwrap();
        assert_eq!(ring.get_pnodes(), vec![pnode("z"), pnode("a"), pnode("m")]);
    }
}
