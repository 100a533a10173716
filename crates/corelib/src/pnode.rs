//! Physical node (pnode) identity.
//!
//! A pnode is an opaque non-empty byte string (in practice a network
//! address) that owns zero or more vnodes. Its identity is the string
//! itself: there is no separate numeric id, and two `Pnode` values compare
//! equal iff their underlying strings are equal.

use std::fmt;
use std::sync::Arc;

use crate::error::Error;

/// A physical node participating in the ring.
///
/// Cheap to clone (`Arc`-backed): the same pnode typically appears in the
/// vnode→pnode map hundreds of times, once per vnode it owns.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Pnode(Arc<str>);

impl Pnode {
    /// Build a pnode from any non-empty string-like value.
    ///
    /// Returns `Error::ConfigInvalid` for the empty string: a pnode's
    /// identity is its string, and the empty string cannot serve as one.
    pub fn new(value: impl Into<String>) -> Result<Self, Error> {
        let value = value.into();
        if value.is_empty() {
            return Err(Error::ConfigInvalid("pnode identity must be non-empty".into()));
        }
        Ok(Self(Arc::from(value)))
    }

    /// Borrow the pnode's identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pnode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Pnode {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Error> {
        Pnode::new(value)
    }
}

impl TryFrom<String> for Pnode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Error> {
        Pnode::new(value)
    }
}

impl std::borrow::Borrow<str> for Pnode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_identity() {
        assert!(Pnode::new("").is_err());
    }

    #[test]
    fn equality_is_by_identity_string() {
        let a = Pnode::new("10.0.0.1:4242").unwrap();
        let b = Pnode::new("10.0.0.1:4242").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "10.0.0.1:4242");
    }
}
