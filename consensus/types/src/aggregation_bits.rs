//! The aggregation bitfield of an attestation.
//!
//! Bit `i` is set if member `i` of the attesting committee contributed a signature. On the wire
//! this is an SSZ bitlist: bits are packed little-endian into bytes and the highest set bit of the
//! final byte is a delimiter marking the length of the list. The JSON encoding is the `0x`-prefixed
//! hex of those bytes.
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    /// The requested bit is beyond the length of the list.
    OutOfBounds { i: usize, len: usize },
    /// The SSZ bytes are empty or the final byte lacks the length delimiter.
    MissingLengthInformation,
    InvalidHex(String),
}

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct AggregationBits {
    len: usize,
    bytes: Vec<u8>,
}

fn bytes_for_bit_len(bit_len: usize) -> usize {
    (bit_len + 7) / 8
}

impl AggregationBits {
    /// Create a bitfield of `len` bits, all unset.
    pub fn with_capacity(len: usize) -> Self {
        Self {
            len,
            bytes: vec![0; bytes_for_bit_len(len)],
        }
    }

    /// Create a bitfield where bit `i` takes the value of `bits[i]`.
    pub fn from_bools(bits: &[bool]) -> Self {
        let mut bitfield = Self::with_capacity(bits.len());
        for (i, bit) in bits.iter().enumerate() {
            bitfield.bytes[i / 8] |= (*bit as u8) << (i % 8);
        }
        bitfield
    }

    /// Decode an SSZ bitlist, stripping the length delimiter.
    pub fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let last_byte = *bytes.last().ok_or(Error::MissingLengthInformation)?;
        if last_byte == 0 {
            return Err(Error::MissingLengthInformation);
        }

        let delimiter = 7 - last_byte.leading_zeros() as usize;
        let len = (bytes.len() - 1) * 8 + delimiter;

        let mut bytes = bytes[..bytes_for_bit_len(len)].to_vec();
        if let Some(last) = bytes.last_mut() {
            if len % 8 != 0 {
                *last &= (1 << (len % 8)) - 1;
            }
        }

        Ok(Self { len, bytes })
    }

    /// Encode as an SSZ bitlist, including the length delimiter.
    pub fn as_ssz_bytes(&self) -> Vec<u8> {
        let mut bytes = self.bytes.clone();
        bytes.resize(self.len / 8 + 1, 0);
        bytes[self.len / 8] |= 1 << (self.len % 8);
        bytes
    }

    /// Read the value of bit `i`.
    pub fn get(&self, i: usize) -> Result<bool, Error> {
        if i < self.len {
            Ok(self.bytes[i / 8] & (1 << (i % 8)) != 0)
        } else {
            Err(Error::OutOfBounds { i, len: self.len })
        }
    }

    /// The number of bits in the list, excluding the delimiter.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Count the number of set bits.
    pub fn num_set_bits(&self) -> usize {
        self.bytes.iter().map(|byte| byte.count_ones() as usize).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.bytes[i / 8] & (1 << (i % 8)) != 0)
    }
}

impl Serialize for AggregationBits {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = "0x".to_string();
        s.push_str(&hex::encode(self.as_ssz_bytes()));
        serializer.serialize_str(&s)
    }
}

struct PrefixedHexVisitor;

impl<'de> Visitor<'de> for PrefixedHexVisitor {
    type Value = AggregationBits;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a hex string with 0x prefix")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let stripped = value
            .strip_prefix("0x")
            .ok_or_else(|| de::Error::custom("hex must have 0x prefix"))?;
        let bytes = hex::decode(stripped)
            .map_err(|e| de::Error::custom(Error::InvalidHex(format!("{:?}", e)).to_string()))?;
        AggregationBits::from_ssz_bytes(&bytes).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl<'de> Deserialize<'de> for AggregationBits {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(PrefixedHexVisitor)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bools_and_get() {
        let bits = AggregationBits::from_bools(&[true, false, true]);
        assert_eq!(bits.len(), 3);
        assert_eq!(bits.get(0), Ok(true));
        assert_eq!(bits.get(1), Ok(false));
        assert_eq!(bits.get(2), Ok(true));
        assert_eq!(bits.get(3), Err(Error::OutOfBounds { i: 3, len: 3 }));
        assert_eq!(bits.num_set_bits(), 2);
    }

    #[test]
    fn ssz_delimiter() {
        // Three bits `[1, 0, 1]` plus the delimiter at bit 3.
        let bits = AggregationBits::from_ssz_bytes(&[0b0000_1101]).unwrap();
        assert_eq!(bits, AggregationBits::from_bools(&[true, false, true]));
        assert_eq!(bits.as_ssz_bytes(), vec![0b0000_1101]);

        // Eight bits fill a byte, so the delimiter takes a byte of its own.
        let bits = AggregationBits::from_ssz_bytes(&[0xff, 0x01]).unwrap();
        assert_eq!(bits.len(), 8);
        assert_eq!(bits.num_set_bits(), 8);
        assert_eq!(bits.as_ssz_bytes(), vec![0xff, 0x01]);

        let empty = AggregationBits::from_ssz_bytes(&[0x01]).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn ssz_missing_length() {
        assert_eq!(
            AggregationBits::from_ssz_bytes(&[]),
            Err(Error::MissingLengthInformation)
        );
        assert_eq!(
            AggregationBits::from_ssz_bytes(&[0x0f, 0x00]),
            Err(Error::MissingLengthInformation)
        );
    }

    #[test]
    fn json_hex() {
        let bits: AggregationBits = serde_json::from_str(r#""0x0d""#).unwrap();
        assert_eq!(bits.iter().collect::<Vec<_>>(), vec![true, false, true]);
        assert_eq!(serde_json::to_string(&bits).unwrap(), r#""0x0d""#);

        serde_json::from_str::<AggregationBits>(r#""0d""#).unwrap_err();
        serde_json::from_str::<AggregationBits>(r#""0x""#).unwrap_err();
    }
}
