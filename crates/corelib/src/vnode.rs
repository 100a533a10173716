//! Virtual node identity and per-vnode data.
//!
//! # Virtual Nodes (VNodes)
//!
//! The hash space `[0, 2^B)` is sliced into `V` equal-width vnodes; vnode
//! `i` nominally starts at `i * INTERVAL` (see [`crate::hash`]). Exactly one
//! pnode owns each vnode at all times: that mapping, and any per-vnode
//! operator data, live on [`crate::ring::Ring`]; this module only defines
//! the vnode id type and the data sentinel.
//!
//! # Invariants
//!
//! - A vnode id is always in `[0, V)`; `V` is fixed for the lifetime of a
//!   ring (see [`crate::ring::Ring::vnode_count`]).
//! - A vnode's data is either the sentinel [`VnodeData::Default`] or an
//!   operator-supplied [`VnodeData::Value`], never both and never absent.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A vnode is simply its index in `[0, V)`.
pub type VnodeId = u32;

/// The value attached to a vnode.
///
/// `Default` is the sentinel: a vnode with no operator-supplied data
/// carries the literal integer `1`, which is
/// distinguishable in the persisted and canonical-JSON formats from any
/// string an operator attaches via `add_data`. Representing this as a
/// tagged variant (rather than, say, `Option<String>` with `None` meaning
/// "unset") keeps that distinction explicit at the type level instead of
/// overloading absence with two meanings.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum VnodeData {
    /// No operator data has been attached; serializes as the JSON integer `1`.
    Default,
    /// Operator-supplied data, passed through unchanged (bytes in, bytes out).
    Value(String),
}

impl VnodeData {
    /// `true` if this is the sentinel default (i.e. not in `data-vnode-set`).
    pub fn is_default(&self) -> bool {
        matches!(self, VnodeData::Default)
    }

    /// Construct from an optional operator value: `None` is the sentinel,
    /// `Some(v)` is the operator's opaque string.
    pub fn from_option(value: Option<String>) -> Self {
        match value {
            Some(v) => VnodeData::Value(v),
            None => VnodeData::Default,
        }
    }

    /// The operator value, if any.
    pub fn as_value(&self) -> Option<&str> {
        match self {
            VnodeData::Default => None,
            VnodeData::Value(v) => Some(v),
        }
    }
}

impl Default for VnodeData {
    fn default() -> Self {
        VnodeData::Default
    }
}

impl Serialize for VnodeData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            VnodeData::Default => serializer.serialize_u8(1),
            VnodeData::Value(v) => serializer.serialize_str(v),
        }
    }
}

impl<'de> Deserialize<'de> for VnodeData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VnodeDataVisitor;

        impl<'de> de::Visitor<'de> for VnodeDataVisitor {
            type Value = VnodeData;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("the integer 1 or an operator-supplied string")
            }

            // The ring only ever writes the literal 1, but any integer maps
            // back to the sentinel rather than being rejected.
            fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
                Ok(VnodeData::Default)
            }

            fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
                Ok(VnodeData::Default)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(VnodeData::Value(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(VnodeData::Value(v))
            }
        }

        deserializer.deserialize_any(VnodeDataVisitor)
    }
}
