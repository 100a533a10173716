//! Durable store key schema and the JSON value shapes written under each
//! key.
//!
//! Keys are ASCII byte strings. Vnode ids are zero-padded to a fixed width
//! so that `/PNODE/%s/%d` keys for a given pnode sort in numeric vnode
//! order under the backend's natural byte ordering.

use crate::pnode::Pnode;
use crate::vnode::VnodeId;

/// Width vnode ids are zero-padded to in key strings. Ten digits covers
/// rings up to 10^6 vnodes with room to spare.
const VNODE_DIGITS: usize = 10;

pub const SCHEMA_VERSION: &str = "2.1.0";

pub const KEY_VNODE_COUNT: &[u8] = b"VNODE_COUNT";
pub const KEY_ALGORITHM: &[u8] = b"ALGORITHM";
pub const KEY_VERSION: &[u8] = b"VERSION";
pub const KEY_COMPLETE: &[u8] = b"COMPLETE";
pub const KEY_PNODE_SET: &[u8] = b"/PNODE";
pub const KEY_VNODE_DATA: &[u8] = b"VNODE_DATA";

/// `/VNODE/%d`: the owning pnode of vnode `%d`.
pub fn key_vnode(v: VnodeId) -> Vec<u8> {
    format!("/VNODE/{v:0width$}", width = VNODE_DIGITS).into_bytes()
}

/// `/PNODE/%s`: the vnodes owned by pnode `%s`.
pub fn key_pnode(p: &Pnode) -> Vec<u8> {
    format!("/PNODE/{p}").into_bytes()
}

/// `/PNODE/%s/%d`: the datum attached to vnode `%d` while owned by `%s`.
pub fn key_pnode_vnode(p: &Pnode, v: VnodeId) -> Vec<u8> {
    format!("/PNODE/{p}/{v:0width$}", width = VNODE_DIGITS).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pnode_vnode_keys_sort_in_numeric_order() {
        let p = Pnode::new("p1").unwrap();
        let mut keys: Vec<_> = (0..12).map(|v| key_pnode_vnode(&p, v)).collect();
        let sorted = {
            let mut k = keys.clone();
            k.sort();
            k
        };
        keys.sort_by_key(|k| k.clone());
        assert_eq!(keys, sorted);
        // and the sort order matches ascending vnode id
        let mut ids: Vec<VnodeId> = (0..12).collect();
        ids.sort_by_key(|&v| key_pnode_vnode(&p, v));
        assert_eq!(ids, (0..12).collect::<Vec<_>>());
    }
}
