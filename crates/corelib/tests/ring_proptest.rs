//! Property-based checks of the quantified invariants: lookups stay in
//! range, every vnode has exactly one owner, and serialize/deserialize is
//! lossless, across randomized `(algorithm, V, pnodes, key)` inputs.

use proptest::prelude::*;
use ringcore::{Algorithm, Backend, CreateOptions, Pnode, Ring};

fn algorithm_strategy() -> impl Strategy<Value = Algorithm> {
    prop_oneof![Just(Algorithm::Sha1), Just(Algorithm::Sha256), Just(Algorithm::Sha512)]
}

fn pnodes_strategy() -> impl Strategy<Value = Vec<Pnode>> {
    prop::collection::vec("[a-z]{1,6}", 1..6).prop_map(|names| {
        let mut seen = std::collections::HashSet::new();
        names
            .into_iter()
            .filter(|n| seen.insert(n.clone()))
            .map(|n| Pnode::new(n).unwrap())
            .collect()
    })
}

proptest! {
    #[test]
    fn lookup_is_always_in_range(
        algorithm in algorithm_strategy(),
        v in 1u32..200,
        pnodes in pnodes_strategy(),
        key in ".*",
    ) {
        prop_assume!(!pnodes.is_empty());
        let ring = Ring::create(CreateOptions { algorithm, pnodes, vnodes: v, backend: Backend::Memory }).unwrap();
        let lookup = ring.get_node(key.as_bytes());
        prop_assert!(lookup.vnode < v);
    }

    #[test]
    fn every_vnode_has_exactly_one_owner(
        algorithm in algorithm_strategy(),
        v in 1u32..200,
        pnodes in pnodes_strategy(),
    ) {
        prop_assume!(!pnodes.is_empty());
        let ring = Ring::create(CreateOptions { algorithm, pnodes, vnodes: v, backend: Backend::Memory }).unwrap();
        let mut owners = vec![0u32; v as usize];
        for p in ring.get_pnodes() {
            for vn in ring.get_vnodes(&p) {
                owners[vn as usize] += 1;
            }
        }
        prop_assert!(owners.iter().all(|&count| count == 1));
    }

    #[test]
    fn serialize_deserialize_round_trip_is_byte_identical(
        algorithm in algorithm_strategy(),
        v in 1u32..64,
        pnodes in pnodes_strategy(),
    ) {
        prop_assume!(!pnodes.is_empty());
        let ring = Ring::create(CreateOptions { algorithm, pnodes, vnodes: v, backend: Backend::Memory }).unwrap();
        let snapshot = ring.serialize();
        let before = serde_json::to_string(&snapshot).unwrap();

        let rebuilt = Ring::deserialize(&snapshot, Backend::Memory).unwrap();
        let after = serde_json::to_string(&rebuilt.serialize()).unwrap();

        prop_assert_eq!(before, after);
    }
}
