//! The Timeline document and its component entities.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::ids::AssetId;
use crate::scene::Scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn portrait_1080x1920() -> Self {
        Self {
            width: 1080,
            height: 1920,
        }
    }
}

fn default_music_volume() -> f64 {
    0.3
}

/// Global background music. The compiler must accept the music key as
/// either an explicit asset id or the sentinel `"music"` when no id is
/// carried alongside the URL (see §4.4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Music {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,
    pub url: String,
    #[serde(default = "default_music_volume")]
    pub volume: f64,
}

impl Music {
    /// The key this track is addressed by in the asset path map.
    pub fn path_key(&self) -> String {
        match &self.asset_id {
            Some(id) => id.to_string(),
            None => "music".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Voiceover {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,
    #[serde(default = "default_voiceover_volume")]
    pub volume: f64,
    #[serde(default)]
    pub start_offset_sec: f64,
}

fn default_voiceover_volume() -> f64 {
    1.0
}

impl Voiceover {
    pub fn path_key(&self) -> String {
        match &self.asset_id {
            Some(id) => id.to_string(),
            None => "voiceover".to_string(),
        }
    }
}

/// Continuous per-track audio for talking-head mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioTrack {
    pub asset_id: AssetId,
    #[serde(default)]
    pub start_offset_sec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SoundEffect {
    pub asset_id: AssetId,
    pub at_time_sec: f64,
    #[serde(default = "default_sfx_volume")]
    pub volume: f64,
}

fn default_sfx_volume() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImageOverlay {
    pub asset_id: AssetId,
    pub start_sec: f64,
    pub duration_sec: f64,
    /// Center-relative position, in percent of frame width/height, 0-100.
    pub x_pct: f64,
    pub y_pct: f64,
    #[serde(default = "default_overlay_scale")]
    pub scale: f64,
    #[serde(default)]
    pub is_gif: bool,
}

fn default_overlay_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextStyle {
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_text_color")]
    pub color_hex: String,
    #[serde(default)]
    pub drop_shadow: bool,
}

fn default_font_size() -> f64 {
    48.0
}

fn default_text_color() -> String {
    "#FFFFFF".to_string()
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            color_hex: default_text_color(),
            drop_shadow: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextOverlay {
    pub text: String,
    #[serde(default)]
    pub style: TextStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,
    pub x_pct: f64,
    pub y_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CaptionSegment {
    pub text: String,
    pub start_sec: f64,
    pub end_sec: f64,
}

impl CaptionSegment {
    pub fn duration_sec(&self) -> f64 {
        self.end_sec - self.start_sec
    }

    /// Segments shorter than 100ms or with a negative start are dropped
    /// per §4.4.5.
    pub fn is_droppable(&self) -> bool {
        self.start_sec < 0.0 || self.duration_sec() < 0.1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Captions {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_burn_in")]
    pub burn_in: bool,
    #[serde(default)]
    pub segments: Vec<CaptionSegment>,
}

fn default_burn_in() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Brand {
    pub logo_asset_id: AssetId,
    pub corner: Corner,
    pub size_px: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Codec {
    H264,
    H265,
}

impl Codec {
    pub fn ffmpeg_encoder(&self) -> &'static str {
        match self {
            Codec::H264 => "libx264",
            Codec::H265 => "libx265",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Export {
    pub codec: Codec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_mbps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crf: Option<u32>,
    #[serde(default = "default_audio_kbps")]
    pub audio_kbps: u32,
}

fn default_audio_kbps() -> u32 {
    128
}

/// Out-of-band hints attached by the orchestrating service, not authored by
/// the user. Used only for §4.4.4 duration reconciliation and §4.4.7 output
/// duration bounding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderingHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voiceover_duration_sec: Option<f64>,
    #[serde(default)]
    pub intro_offset_sec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Timeline {
    #[serde(default = "default_timeline_version")]
    pub version: u32,
    pub resolution: Resolution,
    pub fps: f64,
    /// Catalog of every asset referenced elsewhere in this timeline
    /// (scenes, overlays, brand, sound effects) by id. The Asset Fetcher
    /// resolves every entry here before compilation starts (§4.3); a
    /// timeline referencing an id absent from this catalog is malformed.
    #[serde(default)]
    pub assets: Vec<Asset>,
    pub scenes: Vec<Scene>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music: Option<Music>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voiceover: Option<Voiceover>,
    #[serde(default)]
    pub audio_tracks: Vec<AudioTrack>,
    #[serde(default)]
    pub sound_effects: Vec<SoundEffect>,
    #[serde(default)]
    pub image_overlays: Vec<ImageOverlay>,
    #[serde(default)]
    pub text_overlays: Vec<TextOverlay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captions: Option<Captions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<Brand>,
    pub export: Export,
    #[serde(default)]
    pub rendering: RenderingHints,
}

fn default_timeline_version() -> u32 {
    1
}

impl Timeline {
    /// Whether this timeline has any declared talking-head audio tracks.
    pub fn has_audio_tracks(&self) -> bool {
        !self.audio_tracks.is_empty()
    }

    /// Scenes flagged as talking-head, for the audio-track fallback path.
    pub fn talking_head_scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.iter().filter(|s| s.is_talking_head)
    }

    /// Looks up a catalog asset by id.
    pub fn find_asset(&self, id: &AssetId) -> Option<&Asset> {
        self.assets.iter().find(|a| &a.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn music_path_key_falls_back_to_sentinel() {
        let music = Music {
            asset_id: None,
            url: "https://example.com/track.mp3".into(),
            volume: 0.3,
        };
        assert_eq!(music.path_key(), "music");

        let with_id = Music {
            asset_id: Some(AssetId::from_string("a1")),
            ..music
        };
        assert_eq!(with_id.path_key(), "a1");
    }

    #[test]
    fn caption_segment_drop_rules() {
        let ok = CaptionSegment {
            text: "hi".into(),
            start_sec: 0.0,
            end_sec: 1.0,
        };
        assert!(!ok.is_droppable());

        let too_short = CaptionSegment {
            text: "drop-me".into(),
            start_sec: 2.0,
            end_sec: 2.05,
        };
        assert!(too_short.is_droppable());

        let negative_start = CaptionSegment {
            text: "bad".into(),
            start_sec: -1.0,
            end_sec: 1.0,
        };
        assert!(negative_start.is_droppable());
    }
}
