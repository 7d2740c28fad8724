//! Read preference metadata

use braid_core::Document;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Which replica of a shard a fetch may be served from.
///
/// Attached as request metadata so a remote that changes roles mid-stream
/// fails the getMore instead of silently serving from the wrong member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadPreference {
    Primary,
    PrimaryPreferred,
    Secondary,
    SecondaryPreferred,
    Nearest,
}

impl ReadPreference {
    /// The wire-level mode string
    pub fn mode(&self) -> &'static str {
        match self {
            ReadPreference::Primary => "primary",
            ReadPreference::PrimaryPreferred => "primaryPreferred",
            ReadPreference::Secondary => "secondary",
            ReadPreference::SecondaryPreferred => "secondaryPreferred",
            ReadPreference::Nearest => "nearest",
        }
    }

    /// Encode as the metadata document attached to fetch requests
    pub fn to_metadata(&self) -> Document {
        json!({"$readPreference": {"mode": self.mode()}})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_encoding() {
        assert_eq!(
            ReadPreference::SecondaryPreferred.to_metadata(),
            json!({"$readPreference": {"mode": "secondaryPreferred"}})
        );
    }

    #[test]
    fn test_serde_mode_names() {
        let json = serde_json::to_string(&ReadPreference::PrimaryPreferred).unwrap();
        assert_eq!(json, "\"primaryPreferred\"");
        let parsed: ReadPreference = serde_json::from_str("\"nearest\"").unwrap();
        assert_eq!(parsed, ReadPreference::Nearest);
    }
}
