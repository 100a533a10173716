//! The mutation protocol: `remap`, `remove_pnode`, `add_data`, and the
//! change-set type they return.
//!
//! Each mutation holds the ring's write lock for its entire body: it
//! validates against the in-memory state, builds the full set of store
//! writes, commits that batch through [`crate::store::Adapter`], and only
//! then updates the in-memory maps, all under the same lock acquisition.
//! Two overlapping mutations can therefore never read the same pre-state
//! and commit against it independently; the second one always observes the
//! first one's effects. If the batch commit fails partway through a
//! mutation's body, the in-memory maps are simply never touched (they are
//! only written after `commit` returns `Ok`), so no explicit
//! discard-and-reopen dance is needed.

use std::collections::BTreeMap;

use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::pnode::Pnode;
use crate::store::BatchOp;
use crate::store::schema;
use crate::vnode::{VnodeData, VnodeId};

use super::model::Ring;

/// The per-pnode delta produced by a mutation: vnodes it gained and lost.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<VnodeId>,
    pub removed: Vec<VnodeId>,
}

/// `pnode → change-set`, one entry per pnode touched by a mutation or diff.
pub type ChangeSetMap = BTreeMap<Pnode, ChangeSet>;

impl Ring {
    /// Move `vnodes` to `target_pnode`, creating it if it is new to this
    /// ring. Fails without touching the store if any vnode is already
    /// owned by `target_pnode`, any id is out of range, `vnodes` is empty,
    /// or `vnodes` contains a duplicate.
    #[instrument(skip(self, vnodes), fields(target = %target_pnode, n = vnodes.len()))]
    pub fn remap(&self, target_pnode: &Pnode, vnodes: &[VnodeId]) -> Result<ChangeSetMap> {
        if vnodes.is_empty() {
            return Err(Error::ConfigInvalid("remap requires at least one vnode".into()));
        }
        let mut seen = std::collections::HashSet::with_capacity(vnodes.len());
        for &v in vnodes {
            self.check_vnode_range(v)?;
            if !seen.insert(v) {
                return Err(Error::ConfigInvalid(format!("vnode {v} repeated in remap list")));
            }
        }

        let mut ops = Vec::new();
        let mut change = ChangeSetMap::new();

        // Hold the write lock for the whole validate-build-commit-apply
        // sequence: a reader or a second mutation must see either this
        // remap's full effect or none of it, never the state it read
        // before commit.
        let mut state = self.state.write();

        for &v in vnodes {
            if &state.vnode_to_pnode[v as usize] == target_pnode {
                return Err(Error::VnodeAlreadyOnTarget {
                    vnode: v,
                    pnode: target_pnode.to_string(),
                });
            }
        }

        // Group moved vnodes by prior owner so each owner's `/PNODE/%s`
        // array is rewritten exactly once.
        let mut by_old_owner: BTreeMap<Pnode, Vec<VnodeId>> = BTreeMap::new();
        for &v in vnodes {
            by_old_owner
                .entry(state.vnode_to_pnode[v as usize].clone())
                .or_default()
                .push(v);
        }

        for (old_owner, moved) in &by_old_owner {
            let remaining: Vec<VnodeId> = current_vnodes(&state, old_owner)
                .into_iter()
                .filter(|v| !moved.contains(v))
                .collect();
            ops.push(BatchOp::Put(
                schema::key_pnode(old_owner),
                serde_json::to_vec(&remaining).map_err(|e| Error::SerializationError(e.to_string()))?,
            ));
            for &v in moved {
                ops.push(BatchOp::Delete(schema::key_pnode_vnode(old_owner, v)));
            }
            change.entry(old_owner.clone()).or_default().removed.extend(moved.iter().copied());
        }

        let mut target_vnodes = current_vnodes(&state, target_pnode);
        target_vnodes.extend_from_slice(vnodes);
        target_vnodes.sort_unstable();
        ops.push(BatchOp::Put(
            schema::key_pnode(target_pnode),
            serde_json::to_vec(&target_vnodes).map_err(|e| Error::SerializationError(e.to_string()))?,
        ));
        for &v in vnodes {
            let datum = state
                .vnode_to_data
                .get(&v)
                .cloned()
                .map(VnodeData::Value)
                .unwrap_or(VnodeData::Default);
            ops.push(BatchOp::Put(
                schema::key_pnode_vnode(target_pnode, v),
                serde_json::to_vec(&datum).map_err(|e| Error::SerializationError(e.to_string()))?,
            ));
            ops.push(BatchOp::Put(schema::key_vnode(v), target_pnode.as_str().as_bytes().to_vec()));
        }
        change.entry(target_pnode.clone()).or_default().added.extend(vnodes.iter().copied());

        let target_is_new = !state.pnodes.contains(target_pnode);
        if target_is_new {
            let mut names: Vec<&str> = state.pnodes.iter().map(Pnode::as_str).collect();
            names.push(target_pnode.as_str());
            ops.push(BatchOp::Put(
                schema::KEY_PNODE_SET.to_vec(),
                serde_json::to_vec(&names).map_err(|e| Error::SerializationError(e.to_string()))?,
            ));
        }

        self.adapter().commit(ops)?;

        for &v in vnodes {
            state.vnode_to_pnode[v as usize] = target_pnode.clone();
        }
        state.pnodes.insert(target_pnode.clone());
        drop(state);

        for delta in change.values_mut() {
            delta.added.sort_unstable();
            delta.removed.sort_unstable();
        }
        info!(target = %target_pnode, n = vnodes.len(), "remap committed");
        Ok(change)
    }

    /// Remove `pnode` from the pnode set. Requires it to own zero vnodes.
    #[instrument(skip(self), fields(pnode = %pnode))]
    pub fn remove_pnode(&self, pnode: &Pnode) -> Result<()> {
        let mut state = self.state.write();

        if !state.pnodes.contains(pnode) {
            return Err(Error::PnodeUnknown(pnode.to_string()));
        }
        let owned = current_vnodes(&state, pnode);
        if !owned.is_empty() {
            return Err(Error::PnodeStillInUse(pnode.to_string()));
        }

        let names: Vec<String> = state
            .pnodes
            .iter()
            .filter(|p| *p != pnode)
            .map(|p| p.as_str().to_string())
            .collect();
        let ops = vec![
            BatchOp::Delete(schema::key_pnode(pnode)),
            BatchOp::Put(
                schema::KEY_PNODE_SET.to_vec(),
                serde_json::to_vec(&names).map_err(|e| Error::SerializationError(e.to_string()))?,
            ),
        ];
        self.adapter().commit(ops)?;

        state.pnodes.shift_remove(pnode);
        info!(pnode = %pnode, "pnode removed");
        Ok(())
    }

    /// Attach `value` to `vnode`, or (when `value` is `None`) clear it back
    /// to the sentinel default.
    #[instrument(skip(self, value), fields(vnode))]
    pub fn add_data(&self, vnode: VnodeId, value: Option<String>) -> Result<()> {
        self.check_vnode_range(vnode)?;

        let mut state = self.state.write();
        let owner = state.vnode_to_pnode[vnode as usize].clone();
        let datum = VnodeData::from_option(value.clone());

        let mut ops = vec![BatchOp::Put(
            schema::key_pnode_vnode(&owner, vnode),
            serde_json::to_vec(&datum).map_err(|e| Error::SerializationError(e.to_string()))?,
        )];

        let mut data_ids: Vec<VnodeId> = state.vnode_to_data.keys().copied().collect();
        match &value {
            Some(_) => {
                if !data_ids.contains(&vnode) {
                    data_ids.push(vnode);
                }
            }
            None => data_ids.retain(|&v| v != vnode),
        }
        data_ids.sort_unstable();
        ops.push(BatchOp::Put(
            schema::KEY_VNODE_DATA.to_vec(),
            serde_json::to_vec(&data_ids).map_err(|e| Error::SerializationError(e.to_string()))?,
        ));

        self.adapter().commit(ops)?;

        match value {
            Some(v) => {
                state.vnode_to_data.insert(vnode, v);
            }
            None => {
                state.vnode_to_data.remove(&vnode);
            }
        }
        info!(vnode, "data updated");
        Ok(())
    }
}

fn current_vnodes(state: &super::model::RingState, pnode: &Pnode) -> Vec<VnodeId> {
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

/// Compute the topology diff between two rings: per pnode, which vnodes
/// were added or removed going from `a` to `b`. Per-vnode data is ignored.
pub fn diff(a: &Ring, b: &Ring) -> ChangeSetMap {
    let mut result = ChangeSetMap::new();
    let pnodes: std::collections::BTreeSet<Pnode> =
        a.get_pnodes().into_iter().chain(b.get_pnodes()).collect();

    for p in pnodes {
        let in_a: std::collections::BTreeSet<VnodeId> = a.get_vnodes(&p).into_iter().collect();
        let in_b: std::collections::BTreeSet<VnodeId> = b.get_vnodes(&p).into_iter().collect();
        let removed: Vec<VnodeId> = in_a.difference(&in_b).copied().collect();
        let added: Vec<VnodeId> = in_b.difference(&in_a).copied().collect();
        if !removed.is_empty() || !added.is_empty() {
            result.insert(p, ChangeSet { added, removed });
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Algorithm;
    use crate::ring::model::{Backend, CreateOptions};

    fn pnode(s: &str) -> Pnode {
        Pnode::new(s).unwrap()
    }

    fn s1() -> Ring {
        Ring::create(CreateOptions {
            algorithm: Algorithm::Sha256,
            pnodes: vec![pnode("P1"), pnode("P2")],
            vnodes: 6,
            backend: Backend::Memory,
        })
        .unwrap()
    }

    #[test]
    fn remap_moves_vnodes_and_reports_change_set() {
        let ring = s1();
        ring.add_data(4, Some("ro".to_string())).unwrap();
        let changes = ring.remap(&pnode("P3"), &[4]).unwrap();

        let got = ring.get_vnode_pnode_and_data(4).unwrap();
        assert_eq!(got.pnode, pnode("P3"));
        assert_eq!(got.data.as_value(), Some("ro"));
        assert!(ring.get_pnodes().contains(&pnode("P3")));
        assert_eq!(ring.get_vnodes(&pnode("P1")), vec![0, 2]);

        assert_eq!(changes[&pnode("P1")].removed, vec![4]);
        assert_eq!(changes[&pnode("P3")].added, vec![4]);
    }

    #[test]
    fn remap_to_current_owner_is_an_error() {
        let ring = s1();
        let err = ring.remap(&pnode("P1"), &[0]).unwrap_err();
        assert!(matches!(err, Error::VnodeAlreadyOnTarget { vnode: 0, .. }));
    }

    #[test]
    fn remap_rejects_empty_or_duplicate_vnode_list() {
        let ring = s1();
        assert!(ring.remap(&pnode("P3"), &[]).is_err());
        assert!(ring.remap(&pnode("P3"), &[0, 0]).is_err());
    }

    #[test]
    fn remove_pnode_requires_zero_owned_vnodes() {
        let ring = s1();
        ring.add_data(4, Some("ro".to_string())).unwrap();
        ring.remap(&pnode("P3"), &[4]).unwrap();

        let err = ring.remove_pnode(&pnode("P1")).unwrap_err();
        assert!(matches!(err, Error::PnodeStillInUse(_)));

        ring.remap(&pnode("P2"), &[0, 2]).unwrap();
        ring.remove_pnode(&pnode("P1")).unwrap();
        assert!(!ring.get_pnodes().contains(&pnode("P1")));
    }

    #[test]
    fn remove_pnode_rejects_unknown_pnode() {
        let ring = s1();
        let err = ring.remove_pnode(&pnode("ghost")).unwrap_err();
        assert!(matches!(err, Error::PnodeUnknown(_)));
    }

    #[test]
    fn add_data_null_restores_sentinel_and_clears_data_vnode_set() {
        let ring = s1();
        ring.add_data(2, Some("x".to_string())).unwrap();
        assert_eq!(ring.get_data_vnodes(), vec![2]);

        ring.add_data(2, None).unwrap();
        assert!(ring.get_data_vnodes().is_empty());
        assert!(ring.get_vnode_pnode_and_data(2).unwrap().data.is_default());
    }

    #[test]
    fn diff_reports_added_and_removed_per_pnode() {
        let a = s1();
        let b = s1();
        b.remap(&pnode("P1"), &[1]).unwrap();

        let changes = diff(&a, &b);
        assert_eq!(changes[&pnode("P1")].added, vec![1]);
        assert!(changes[&pnode("P1")].removed.is_empty());
        assert_eq!(changes[&pnode("P2")].removed, vec![1]);
        assert!(changes[&pnode("P2")].added.is_empty());
    }

    #[test]
    fn diff_is_empty_for_identical_rings() {
        let a = s1();
        let b = s1();
        assert!(diff(&a, &b).is_empty());
    }
}
