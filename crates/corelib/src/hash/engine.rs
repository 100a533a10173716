//! `HashEngine`: an algorithm bound to a vnode count, with the fixed-width
//! big-integer arithmetic needed for deterministic, cross-host lookups.

use num_bigint::BigUint;
use num_traits::ToPrimitive;

use crate::error::Error;
use crate::vnode::VnodeId;

use super::algorithm::Algorithm;

/// Computes `vnode_of(key_bytes)` for one `(algorithm, V)` pair.
///
/// `MAX` and `INTERVAL` are big-integers (the digest may be up to 512 bits
/// wide) computed once at construction and cached, along with their hex
/// forms for the canonical snapshot, rather than rederived per lookup.
///
/// # Algorithm
///
/// 1. Digest the key bytes with the bound algorithm.
/// 2. Interpret the digest as an unsigned big-endian integer `H`.
/// 3. Divide `H` by `INTERVAL` and clamp the quotient to `V - 1`.
///
/// # Performance
///
/// - **Time**: O(k) to digest a key of length `k`, plus one big-integer
///   division whose cost is fixed by the algorithm's bit width.
/// - **Space**: O(1) beyond the cached `MAX`/`INTERVAL` big-integers.
#[derive(Clone, Debug)]
pub struct HashEngine {
    algorithm: Algorithm,
    v: u32,
    max: BigUint,
    interval: BigUint,
    max_hex: String,
    interval_hex: String,
}

impl HashEngine {
    /// Build an engine for `algorithm` over a ring of `v` vnodes.
    ///
    /// `v` must be positive; `MAX + 1` need not be evenly divisible by `v`
    /// (the last vnode absorbs the remainder, see [`HashEngine::vnode_of`]).
    pub fn new(algorithm: Algorithm, v: u32) -> Result<Self, Error> {
        if v == 0 {
            return Err(Error::ConfigInvalid("vnode count must be positive".into()));
        }
        let max = (BigUint::from(1u8) << algorithm.bit_width()) - BigUint::from(1u8);
        let interval = (&max + BigUint::from(1u8)) / BigUint::from(v);
        let max_hex = max.to_str_radix(16).to_uppercase();
        let interval_hex = interval.to_str_radix(16);
        Ok(Self {
            algorithm,
            v,
            max,
            interval,
            max_hex,
            interval_hex,
        })
    }

    /// Reconstruct an engine from a persisted/serialized snapshot, verifying
    /// that the recomputed `MAX`/`INTERVAL` match what was stored. A
    /// mismatch means the snapshot names a `V` or algorithm inconsistent
    /// with its own cached hex fields.
    pub fn from_snapshot(
        algorithm: Algorithm,
        v: u32,
        max_hex: &str,
        interval_hex: &str,
    ) -> Result<Self, Error> {
        let engine = Self::new(algorithm, v)?;
        if !engine.max_hex.eq_ignore_ascii_case(max_hex) || engine.interval_hex != interval_hex.to_lowercase() {
            return Err(Error::SerializationError(format!(
                "algorithm/vnodes imply MAX={} INTERVAL={}, snapshot has MAX={} INTERVAL={}",
                engine.max_hex, engine.interval_hex, max_hex, interval_hex
            )));
        }
        Ok(engine)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn v(&self) -> u32 {
        self.v
    }

    pub fn max_hex(&self) -> &str {
        &self.max_hex
    }

    pub fn interval_hex(&self) -> &str {
        &self.interval_hex
    }

    /// `H = hash(key_bytes)` interpreted as an unsigned big-endian integer,
    /// divided by `INTERVAL` and clamped to `V - 1`.
    ///
    /// The clamp matters at exactly the top of the hash space: when `V`
    /// does not evenly divide `MAX + 1`, keys hashing into the final,
    /// undersized interval divide out to `V` rather than `V - 1`. Without
    /// the clamp that would be one past the end of the vnode range,
    /// breaking the "every vnode has exactly one owner" coverage invariant.
    pub fn vnode_of(&self, key_bytes: &[u8]) -> VnodeId {
        let digest = self.algorithm.digest(key_bytes);
        let h = BigUint::from_bytes_be(&digest);
        let idx = &h / &self.interval;
        let idx = idx.to_u64().unwrap_or(u64::MAX);
        idx.min((self.v - 1) as u64) as VnodeId
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vnode_of_is_always_in_range() {
        let engine = HashEngine::new(Algorithm::Sha256, 6).unwrap();
        for key in [&b"a"[..], b"b", b"the-quick-brown-fox", b""] {
            let v = engine.vnode_of(key);
            assert!(v < 6);
        }
    }

    #[test]
    fn vnode_of_is_deterministic() {
        let engine = HashEngine::new(Algorithm::Sha256, 1024).unwrap();
        let key = b"/yunong/yunong.txt";
        assert_eq!(engine.vnode_of(key), engine.vnode_of(key));
    }

    #[test]
    fn from_snapshot_roundtrips() {
        let engine = HashEngine::new(Algorithm::Sha512, 17).unwrap();
        let rebuilt =
            HashEngine::from_snapshot(Algorithm::Sha512, 17, engine.max_hex(), engine.interval_hex())
                .unwrap();
        assert_eq!(rebuilt.max_hex(), engine.max_hex());
        assert_eq!(rebuilt.interval_hex(), engine.interval_hex());
    }

    #[test]
    fn from_snapshot_rejects_mismatch() {
        let engine = HashEngine::new(Algorithm::Sha256, 6).unwrap();
        assert!(HashEngine::from_snapshot(Algorithm::Sha256, 7, engine.max_hex(), engine.interval_hex())
            .is_err());
    }
}
