//! Explicit set shapes.
//!
//! Rust collections do not say whether they are sets on the wire; `Vec`, `HashSet` and
//! `BTreeSet` all serialize as sequences. Wrapping a collection in `Set`, or tagging a
//! field with `#[serde(with = "dynrpc::as_set")]`, makes it travel as a Thrift set.
//! Other serializers see the inner collection unchanged.

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

pub(crate) const SET_TOKEN: &str = "$dynrpc::Set";

/// A collection sent as a set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Set<C>(pub C);

impl<C: Serialize> Serialize for Set<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(SET_TOKEN, &self.0)
    }
}

impl<'de, C: Deserialize<'de>> Deserialize<'de> for Set<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        C::deserialize(deserializer).map(Set)
    }
}

/// `#[serde(with = "dynrpc::as_set")]`
pub mod as_set {
    use super::*;

    pub fn serialize<C: Serialize, S: Serializer>(value: &C, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(SET_TOKEN, value)
    }

    pub fn deserialize<'de, C: Deserialize<'de>, D: Deserializer<'de>>(deserializer: D) -> Result<C, D::Error> {
        C::deserialize(deserializer)
    }
}
