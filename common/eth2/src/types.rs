//! This module exposes a superset of the `types` crate. It adds additional types that are only
//! required for the HTTP API.

use serde::{Deserialize, Serialize};
use std::fmt;

pub use types::*;

/// An API error serializable to JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub stacktraces: Vec<String>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BlockId {
    Head,
    Slot(Slot),
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BlockId::Head => write!(f, "head"),
            BlockId::Slot(slot) => write!(f, "{}", slot),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum StateId {
    Head,
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StateId::Head => write!(f, "head"),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Serialize + serde::de::DeserializeOwned")]
pub struct GenericResponse<T: Serialize + serde::de::DeserializeOwned> {
    pub data: T,
}

impl<T: Serialize + serde::de::DeserializeOwned> From<T> for GenericResponse<T> {
    fn from(data: T) -> Self {
        Self { data }
    }
}

/// A response which carries the name of the fork its `data` belongs to.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Serialize + serde::de::DeserializeOwned")]
pub struct ForkVersionedResponse<T: Serialize + serde::de::DeserializeOwned> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub execution_optimistic: Option<bool>,
    #[serde(default)]
    pub finalized: Option<bool>,
    pub data: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_id_display() {
        assert_eq!(BlockId::Head.to_string(), "head");
        assert_eq!(BlockId::Slot(Slot::new(1234)).to_string(), "1234");
        assert_eq!(StateId::Head.to_string(), "head");
    }

    #[test]
    fn committees_response() {
        let response: GenericResponse<Vec<Committee>> = serde_json::from_str(
            r#"{
                "execution_optimistic": false,
                "data": [
                    { "index": "0", "slot": "64", "validators": ["1", "2"] },
                    { "index": "1", "slot": "64", "validators": ["3"] }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(response.data.len(), 2);
        assert_eq!(response.data[1].validators, vec![3]);
    }

    #[test]
    fn fork_versioned_block_response() {
        let response: ForkVersionedResponse<SignedBeaconBlock> = serde_json::from_str(
            r#"{
                "version": "phase0",
                "data": {
                    "message": {
                        "slot": "65",
                        "proposer_index": "3",
                        "body": { "attestations": [] }
                    },
                    "signature": "0x00"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(response.version.as_deref(), Some("phase0"));
        assert_eq!(response.data.slot(), Slot::new(65));
        assert!(response.data.attestations().is_empty());
    }

    #[test]
    fn error_message() {
        let msg: ErrorMessage =
            serde_json::from_str(r#"{ "code": 404, "message": "NOT_FOUND: beacon block" }"#)
                .unwrap();
        assert_eq!(msg.code, 404);
        assert!(msg.stacktraces.is_empty());
    }
}
