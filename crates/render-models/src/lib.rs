//! Shared data types for the render worker: the wire/storage shapes for
//! jobs, projects, timelines, and the entities a timeline is made of.

mod asset;
mod ids;
mod job;
mod project;
mod rendition;
mod scene;
mod timeline;

pub use asset::{Asset, AssetKind, AssetLocation};
pub use ids::{AssetId, ClipId, JobId, ProjectId};
pub use job::{JobState, LogLine, RenderJob};
pub use project::Project;
pub use rendition::ClipRendition;
pub use scene::{CropMode, Scene, SceneKind, SceneSource, Transition};
pub use timeline::{
    AudioTrack, Brand, Captions, CaptionSegment, Codec, Corner, Export, ImageOverlay, Music,
    RenderingHints, Resolution, SoundEffect, TextOverlay, TextStyle, Timeline, Voiceover,
};
