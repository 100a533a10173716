//! The consistent hash ring: vnode layout, lookup, and the mutation
//! protocol that keeps its invariants across `remap`, `remove_pnode`, and
//! `add_data`.

pub mod model;
pub mod mutation;

pub use model::{Backend, CreateOptions, NodeLookup, Ring};
pub use mutation::{diff, ChangeSet, ChangeSetMap};
