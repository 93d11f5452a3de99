//! Asset references. Read-only to the render core — assets are authored and
//! uploaded elsewhere.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::AssetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Video,
    Image,
    Audio,
    Logo,
}

impl AssetKind {
    /// Default extension to fall back to when nothing else narrows it down.
    pub fn default_extension(&self) -> &'static str {
        match self {
            AssetKind::Video => "mp4",
            AssetKind::Image => "png",
            AssetKind::Audio => "mp3",
            AssetKind::Logo => "png",
        }
    }
}

/// Where an asset's bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "locationType")]
pub enum AssetLocation {
    /// A fully-qualified, directly fetchable URL.
    PublicUrl { url: String },
    /// A key in the object store this worker has credentials for; resolved
    /// to a presigned GET before download.
    ObjectKey { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Asset {
    pub id: AssetId,
    pub kind: AssetKind,
    pub location: AssetLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_extensions_match_spec_table() {
        assert_eq!(AssetKind::Video.default_extension(), "mp4");
        assert_eq!(AssetKind::Image.default_extension(), "png");
        assert_eq!(AssetKind::Audio.default_extension(), "mp3");
        assert_eq!(AssetKind::Logo.default_extension(), "png");
    }
}
