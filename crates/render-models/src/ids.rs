//! Newtype identifiers.
//!
//! Wrapping job/project/asset ids in their own types means a `JobId` can
//! never be passed where a `ProjectId` is expected, even though both are
//! just UUID strings on the wire.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a new random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Wrap an existing string as an id.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(JobId);
string_id!(ProjectId);
string_id!(AssetId);
string_id!(ClipId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_roundtrip_through_json() {
        let id = JobId::new();
        let json = serde_json::to_string(&id).unwrap();
        let decoded: JobId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, decoded);
    }

    #[test]
    fn from_string_preserves_value() {
        let id = ProjectId::from_string("proj_123");
        assert_eq!(id.as_str(), "proj_123");
        assert_eq!(id.to_string(), "proj_123");
    }
}
