//! The fixed set of cryptographic hashes a ring may be bound to.

use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::error::Error;

/// A cryptographic hash function a ring is bound to at creation.
///
/// The choice is made once, stored verbatim (see [`Algorithm::name`]), and
/// never changes for the lifetime of a ring: selecting among algorithms at
/// lookup time is explicitly a non-goal.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Algorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl Algorithm {
    /// Bit width `B` of this hash's digest.
    pub fn bit_width(&self) -> u32 {
        match self {
            Algorithm::Sha1 => 160,
            Algorithm::Sha256 => 256,
            Algorithm::Sha512 => 512,
        }
    }

    /// The name persisted in `ALGORITHM` and the canonical snapshot's
    /// `algorithm.NAME` field.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha512 => "sha512",
        }
    }

    /// Recover an algorithm from its persisted name.
    pub fn parse(name: &str) -> Result<Self, Error> {
        match name {
            "sha1" => Ok(Algorithm::Sha1),
            "sha256" => Ok(Algorithm::Sha256),
            "sha512" => Ok(Algorithm::Sha512),
            other => Err(Error::ConfigInvalid(format!(
                "unknown hash algorithm \"{other}\" (expected one of sha1, sha256, sha512)"
            ))),
        }
    }

    /// Digest `key_bytes`, returning a big-endian unsigned integer of width
    /// [`Algorithm::bit_width`] bits.
    pub fn digest(&self, key_bytes: &[u8]) -> Vec<u8> {
        match self {
            Algorithm::Sha1 => Sha1::digest(key_bytes).to_vec(),
            Algorithm::Sha256 => Sha256::digest(key_bytes).to_vec(),
            Algorithm::Sha512 => Sha512::digest(key_bytes).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trips_through_parse() {
        for alg in [Algorithm::Sha1, Algorithm::Sha256, Algorithm::Sha512] {
            assert_eq!(Algorithm::parse(alg.name()).unwrap(), alg);
        }
    }

    #[test]
    fn rejects_unknown_name() {
        assert!(Algorithm::parse("md5").is_err());
    }

    #[test]
    fn digest_length_matches_bit_width() {
        for alg in [Algorithm::Sha1, Algorithm::Sha256, Algorithm::Sha512] {
            assert_eq!(alg.digest(b"key").len() as u32 * 8, alg.bit_width());
        }
    }
}
