//! Serde helpers for the beacon API convention of encoding integers as decimal strings.
//!
//! Quotes are optional during decoding.

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

struct QuotedU64Visitor;

impl<'de> Visitor<'de> for QuotedU64Visitor {
    type Value = u64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a quoted or unquoted integer")
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        s.parse::<u64>().map_err(de::Error::custom)
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(v)
    }
}

/// `#[serde(with = "quoted::quoted_u64")]`
pub mod quoted_u64 {
    use super::*;

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(QuotedU64Visitor)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct QuotedIntWrapper {
    #[serde(with = "quoted_u64")]
    int: u64,
}

struct QuotedIntVecVisitor;

impl<'de> Visitor<'de> for QuotedIntVecVisitor {
    type Value = Vec<u64>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a list of quoted or unquoted integers")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut vec = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(val) = seq.next_element::<QuotedIntWrapper>()? {
            vec.push(val.int);
        }
        Ok(vec)
    }
}

/// `#[serde(with = "quoted::quoted_u64_vec")]`
pub mod quoted_u64_vec {
    use super::*;

    pub fn serialize<S>(value: &[u64], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(value.len()))?;
        for &int in value {
            seq.serialize_element(&QuotedIntWrapper { int })?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(QuotedIntVecVisitor)
    }
}
