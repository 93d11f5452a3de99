//! Scene entries within a `Timeline`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::AssetId;
use crate::timeline::TextOverlay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    Video,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CropMode {
    #[default]
    Cover,
    Contain,
    Fill,
}

/// Where a scene's video/image source comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "sourceType")]
pub enum SceneSource {
    /// A user-owned asset, resolved through the Asset Fetcher's path map.
    Asset { asset_id: AssetId },
    /// A public B-roll clip referenced directly by URL.
    Clip {
        clip_url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        clip_id: Option<String>,
    },
    /// No underlying media; the compiler synthesizes a black frame.
    None,
}

/// Transitions honored by the compiler. Anything else falls back to a plain
/// concat per §4.4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    None,
    Fade,
    FadeBlack,
    WipeLeft,
    WipeRight,
    SlideLeft,
    SlideRight,
    Dissolve,
}

impl Transition {
    /// The xfade `transition=` name FFmpeg expects.
    pub fn ffmpeg_name(&self) -> Option<&'static str> {
        match self {
            Transition::None => None,
            Transition::Fade => Some("fade"),
            Transition::FadeBlack => Some("fadeblack"),
            Transition::WipeLeft => Some("wipeleft"),
            Transition::WipeRight => Some("wiperight"),
            Transition::SlideLeft => Some("slideleft"),
            Transition::SlideRight => Some("slideright"),
            Transition::Dissolve => Some("dissolve"),
        }
    }

    /// Parse a wire-supplied transition name, falling back to `None` for
    /// anything outside the allow-list rather than erroring — an unknown
    /// transition degrades to concat per §4.4.3/§7, it does not abort the job.
    pub fn from_wire_name(name: &str) -> Self {
        match name {
            "fade" => Transition::Fade,
            "fadeblack" => Transition::FadeBlack,
            "wipeleft" => Transition::WipeLeft,
            "wiperight" => Transition::WipeRight,
            "slideleft" => Transition::SlideLeft,
            "slideright" => Transition::SlideRight,
            "dissolve" => Transition::Dissolve,
            _ => Transition::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    pub id: String,
    pub source: SceneSource,
    pub kind: SceneKind,
    pub in_sec: f64,
    pub out_sec: f64,
    pub duration_sec: f64,
    #[serde(default)]
    pub crop_mode: CropMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_overlay: Option<TextOverlay>,
    #[serde(default = "Transition::none")]
    pub transition_out: Transition,
    #[serde(default)]
    pub transition_duration_sec: f64,
    #[serde(default)]
    pub is_talking_head: bool,
}

impl Transition {
    fn none() -> Self {
        Transition::None
    }
}

impl Scene {
    /// The trimmed source length, before any freeze-frame padding.
    pub fn trimmed_len_sec(&self) -> f64 {
        (self.out_sec - self.in_sec).max(0.0)
    }

    /// Whether the scene's declared duration exceeds its trimmed source,
    /// requiring a freeze-frame pad per §4.4.2.
    pub fn needs_freeze_pad(&self) -> bool {
        self.kind == SceneKind::Video && self.duration_sec > self.trimmed_len_sec() + 0.1
    }

    pub fn freeze_pad_sec(&self) -> f64 {
        if self.needs_freeze_pad() {
            self.duration_sec - self.trimmed_len_sec()
        } else {
            0.0
        }
    }

    pub fn has_transition(&self) -> bool {
        !matches!(self.transition_out, Transition::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(in_sec: f64, out_sec: f64, duration_sec: f64) -> Scene {
        Scene {
            id: "s0".into(),
            source: SceneSource::None,
            kind: SceneKind::Video,
            in_sec,
            out_sec,
            duration_sec,
            crop_mode: CropMode::Cover,
            text_overlay: None,
            transition_out: Transition::None,
            transition_duration_sec: 0.0,
            is_talking_head: false,
        }
    }

    #[test]
    fn freeze_pad_only_when_duration_exceeds_trim_by_a_tenth() {
        let exact = scene(0.0, 3.0, 3.0);
        assert!(!exact.needs_freeze_pad());

        let padded = scene(0.0, 2.0, 3.0);
        assert!(padded.needs_freeze_pad());
        assert!((padded.freeze_pad_sec() - 1.0).abs() < 1e-9);

        let within_tolerance = scene(0.0, 3.0, 3.05);
        assert!(!within_tolerance.needs_freeze_pad());
    }

    #[test]
    fn unknown_transition_name_falls_back_to_none() {
        assert_eq!(Transition::from_wire_name("ken-burns"), Transition::None);
        assert_eq!(Transition::from_wire_name("fade"), Transition::Fade);
    }
}
