//! Hash Engine: maps key bytes to a vnode index.
//!
//! `Algorithm` names one of a fixed set of cryptographic hashes, and
//! `HashEngine` bundles an algorithm with the ring's `V` so that `INTERVAL`
//! (and its hex forms, needed for the canonical snapshot) are computed once
//! and reused for every lookup.

mod algorithm;
mod engine;

pub use algorithm::Algorithm;
pub use engine::HashEngine;
