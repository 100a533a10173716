//! End-to-end scenarios over a full `Ring`: creation, lookup, mutation,
//! removal, and diffing.

use ringcore::{Algorithm, Backend, CreateOptions, Pnode, Ring};

fn pnode(s: &str) -> Pnode {
    Pnode::new(s).unwrap()
}

fn create_s1() -> Ring {
    Ring::create(CreateOptions {
        algorithm: Algorithm::Sha256,
        pnodes: vec![pnode("P1"), pnode("P2")],
        vnodes: 6,
        backend: Backend::Memory,
    })
    .unwrap()
}

#[test]
fn s1_even_distribution() {
    let ring = create_s1();
    assert_eq!(ring.get_vnodes(&pnode("P1")), vec![0, 2, 4]);
    assert_eq!(ring.get_vnodes(&pnode("P2")), vec![1, 3, 5]);
}

#[test]
fn s2_determinism_across_independent_rings() {
    let a = create_s1();
    let b = create_s1();
    let json_a = serde_json::to_string(&a.serialize()).unwrap();
    let json_b = serde_json::to_string(&b.serialize()).unwrap();
    assert_eq!(json_a, json_b);
}

#[test]
fn s3_lookup_matches_independently_computed_hash() {
    let ring = create_s1();
    let key = b"/yunong/yunong.txt";

    let engine = ringcore::HashEngine::new(Algorithm::Sha256, 6).unwrap();
    let expected_vnode = engine.vnode_of(key);

    let lookup = ring.get_node(key);
    assert_eq!(lookup.vnode, expected_vnode);
    assert!(lookup.data.is_default());
    assert_eq!(lookup.pnode, if expected_vnode % 2 == 0 { pnode("P1") } else { pnode("P2") });
}

#[test]
fn s4_data_survives_remap() {
    let ring = create_s1();
    ring.add_data(4, Some("ro".to_string())).unwrap();
    ring.remap(&pnode("P3"), &[4]).unwrap();

    let lookup = ring.get_vnode_pnode_and_data(4).unwrap();
    assert_eq!(lookup.pnode, pnode("P3"));
    assert_eq!(lookup.data.as_value(), Some("ro"));
    assert!(ring.get_pnodes().contains(&pnode("P3")));
    assert_eq!(ring.get_vnodes(&pnode("P1")), vec![0, 2]);
}

#[test]
fn s5_remove_guard_then_success() {
    let ring = create_s1();
    ring.add_data(4, Some("ro".to_string())).unwrap();
    ring.remap(&pnode("P3"), &[4]).unwrap();

    let err = ring.remove_pnode(&pnode("P1")).unwrap_err();
    assert!(matches!(err, ringcore::Error::PnodeStillInUse(_)));

    ring.remap(&pnode("P2"), &[0, 2]).unwrap();
    ring.remove_pnode(&pnode("P1")).unwrap();
    assert!(!ring.get_pnodes().contains(&pnode("P1")));
}

#[test]
fn s6_diff_reports_the_single_moved_vnode() {
    let a = create_s1();
    let b = create_s1();
    b.remap(&pnode("P1"), &[1]).unwrap();

    let changes = ringcore::diff(&a, &b);
    assert_eq!(changes[&pnode("P1")].added, vec![1]);
    assert!(changes[&pnode("P1")].removed.is_empty());
    assert_eq!(changes[&pnode("P2")].removed, vec![1]);
    assert!(changes[&pnode("P2")].added.is_empty());
}

#[test]
fn diff_applied_as_remaps_reconstructs_target_topology() {
    // Invariant 6: applying diff(A, B) as a script of remaps to A
    // reproduces B's vnode->pnode map.
    let a = create_s1();
    let b = create_s1();
    b.remap(&pnode("P1"), &[1]).unwrap();
    b.remap(&pnode("P2"), &[0]).unwrap();

    let changes = ringcore::diff(&a, &b);
    for (target, delta) in &changes {
        if !delta.added.is_empty() {
            a.remap(target, &delta.added).unwrap();
        }
    }

    for p in b.get_pnodes() {
        assert_eq!(a.get_vnodes(&p), b.get_vnodes(&p));
    }
}
