//! The Timeline Compiler: turns a declarative [`Timeline`] into one
//! multi-input FFmpeg filter-graph invocation.
//!
//! This is a pure function over its inputs: given the same timeline and the
//! same resolved asset paths, it always emits the same [`EncodeCommand`].
//! No filesystem access, no randomness, no wall-clock reads — the Asset
//! Fetcher and Job Controller own those concerns.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use render_models::{
    Brand, CaptionSegment, Corner, CropMode, ImageOverlay, Resolution, Scene, SceneKind,
    SceneSource, SoundEffect, TextOverlay, Timeline, Transition,
};

use crate::command::{EncodeCommand, InputSpec};
use crate::error::{MediaError, MediaResult};
use crate::graph::{FilterChain, FilterGraph, LabelAllocator};
use crate::text::{escape_filter_text, hex_to_ffmpeg_color, visibility_expr};

/// How long an inter-scene hard cut leaves between scenes: zero. Kept as a
/// constant purely so the two duration formulas below read the same way.
const NO_OVERLAP: f64 = 0.0;

/// Maps every key a timeline can address a local asset by — an asset id, a
/// bare clip URL, or the `"music"` / `"voiceover"` sentinel — to the file
/// the Asset Fetcher already materialized in the job's working directory.
#[derive(Debug, Clone, Default)]
pub struct AssetPaths(HashMap<String, PathBuf>);

impl AssetPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, path: impl Into<PathBuf>) {
        self.0.insert(key.into(), path.into());
    }

    pub fn get(&self, key: &str) -> Option<&Path> {
        self.0.get(key).map(PathBuf::as_path)
    }
}

fn scene_path_key(source: &SceneSource) -> Option<String> {
    match source {
        SceneSource::Asset { asset_id } => Some(asset_id.to_string()),
        SceneSource::Clip { clip_url, .. } => Some(clip_url.clone()),
        SceneSource::None => None,
    }
}

fn is_gif(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("gif")).unwrap_or(false)
}

fn scale_crop_filter(mode: CropMode, res: Resolution) -> String {
    let (w, h) = (res.width, res.height);
    match mode {
        CropMode::Cover => format!("scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}"),
        CropMode::Contain => {
            format!("scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black")
        }
        CropMode::Fill => format!("scale={w}:{h}"),
    }
}

/// Compiles a timeline against already-resolved asset paths into the
/// `ffmpeg` invocation that renders it.
pub struct Compiler<'a> {
    timeline: &'a Timeline,
    paths: &'a AssetPaths,
    inputs: Vec<InputSpec>,
    graph: FilterGraph,
    labels: LabelAllocator,
}

impl<'a> Compiler<'a> {
    pub fn new(timeline: &'a Timeline, paths: &'a AssetPaths) -> Self {
        Self {
            timeline,
            paths,
            inputs: Vec::new(),
            graph: FilterGraph::new(),
            labels: LabelAllocator::default(),
        }
    }

    /// §4.4.1: assigns each distinct local path one input slot, reusing a
    /// slot when the same path (and loop flag) is addressed more than once.
    fn add_input(&mut self, spec: InputSpec) -> usize {
        if let Some(pos) = self
            .inputs
            .iter()
            .position(|existing| existing.path == spec.path && existing.pre_args == spec.pre_args)
        {
            return pos;
        }
        self.inputs.push(spec);
        self.inputs.len() - 1
    }

    fn add_color_source(&mut self, res: Resolution, fps: f64, duration_sec: f64) -> usize {
        let mut spec = InputSpec::new(format!("color=c=black:s={}x{}:r={}:d={:.3}", res.width, res.height, fps, duration_sec));
        spec.pre_args = vec!["-f".to_string(), "lavfi".to_string()];
        self.add_input(spec)
    }

    /// Total visual length after transitions shorten the junctions they
    /// apply to. Plain concatenation leaves `NO_OVERLAP` at every junction.
    fn visual_duration(&self, scenes: &[Scene]) -> f64 {
        let mut total = 0.0;
        for (i, scene) in scenes.iter().enumerate() {
            total += scene.duration_sec;
            if i > 0 {
                let overlap = if scenes[i - 1].has_transition() {
                    scenes[i - 1].transition_duration_sec
                } else {
                    NO_OVERLAP
                };
                total -= overlap;
            }
        }
        total
    }

    /// §4.4.4: extra freeze-pad to apply to the final scene so the visual
    /// track covers a voiceover that outlasts it, with a half-second margin
    /// so the last frame doesn't end exactly on the voiceover's tail. The
    /// voiceover doesn't start until `intro_offset_sec` into the timeline,
    /// so its effective end is offset by that much too.
    fn reconciliation_pad(&self, visual_duration: f64) -> f64 {
        let intro_offset = self.timeline.rendering.intro_offset_sec;
        match self.timeline.rendering.voiceover_duration_sec {
            Some(voiceover_duration_sec) => {
                let voiceover_end = voiceover_duration_sec + intro_offset;
                if voiceover_end > visual_duration + 0.5 {
                    voiceover_end - visual_duration + 0.5
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }

    fn scene_input_spec(&self, scene: &Scene, path: &Path) -> InputSpec {
        if is_gif(path) {
            InputSpec::looped(path)
        } else if scene.kind == SceneKind::Image {
            let mut spec = InputSpec::new(path);
            spec.pre_args = vec!["-loop".to_string(), "1".to_string()];
            spec
        } else {
            InputSpec::new(path)
        }
    }

    /// §4.4.2: one scene's source -> a normalized, correctly-timed video
    /// stream at the timeline's resolution and frame rate.
    fn build_scene_chain(&mut self, scene: &Scene, extra_pad_sec: f64) -> MediaResult<String> {
        let res = self.timeline.resolution;
        let fps = self.timeline.fps;

        let (input_idx, trim, crop_mode) = match scene_path_key(&scene.source) {
            Some(key) => {
                let path = self
                    .paths
                    .get(&key)
                    .ok_or_else(|| MediaError::FileNotFound(key.clone()))?
                    .to_path_buf();
                let spec = self.scene_input_spec(scene, &path);
                let idx = self.add_input(spec);
                let gif_or_image = is_gif(&path) || scene.kind == SceneKind::Image;
                let trim = if gif_or_image {
                    format!("trim=duration={:.3},setpts=PTS-STARTPTS", scene.trimmed_len_sec().max(scene.duration_sec))
                } else {
                    format!(
                        "trim=start={:.3}:end={:.3},setpts=PTS-STARTPTS",
                        scene.in_sec, scene.out_sec
                    )
                };
                // §4.4.2: GIF sources always cover, image sources always
                // contain, regardless of the scene's declared crop mode.
                let crop_mode = if is_gif(&path) {
                    CropMode::Cover
                } else if scene.kind == SceneKind::Image {
                    CropMode::Contain
                } else {
                    scene.crop_mode
                };
                (idx, trim, crop_mode)
            }
            None => {
                let idx = self.add_color_source(res, fps, scene.duration_sec + extra_pad_sec);
                (idx, String::new(), scene.crop_mode)
            }
        };

        let mut steps: Vec<String> = Vec::new();
        if !trim.is_empty() {
            steps.push(trim);
        }
        steps.push(scale_crop_filter(crop_mode, res));
        steps.push(format!("fps={fps}"));
        steps.push("setsar=1".to_string());

        let total_pad = scene.freeze_pad_sec() + extra_pad_sec;
        if total_pad > 0.0 {
            steps.push(format!("tpad=stop_mode=clone:stop_duration={:.3}", total_pad));
        }

        let out_label = self.labels.next("scene");
        self.graph.push(FilterChain::simple(format!("{input_idx}:v"), steps.join(","), out_label.clone()));
        Ok(out_label)
    }

    /// §4.4.3: joins normalized scene streams. A cascading `xfade` chain
    /// when any junction declares a transition, a plain `concat` otherwise.
    /// Unknown transitions were already downgraded to `Transition::None` by
    /// the wire-parsing layer, so this only ever sees the allow-listed set.
    fn join_scenes(&mut self, scene_labels: &[String], scenes: &[Scene], extra_pad_sec: f64) -> String {
        if scene_labels.is_empty() {
            return String::new();
        }
        if scene_labels.len() == 1 {
            return scene_labels[0].clone();
        }

        let mut current = scene_labels[0].clone();
        let mut cumulative = scenes[0].duration_sec + scenes[0].freeze_pad_sec();

        for i in 1..scene_labels.len() {
            let prev = &scenes[i - 1];
            let is_last_pair = i == scene_labels.len() - 1;
            let next_len = scenes[i].duration_sec + scenes[i].freeze_pad_sec() + if is_last_pair { extra_pad_sec } else { 0.0 };

            if let Some(name) = prev.transition_out.ffmpeg_name() {
                let duration = prev.transition_duration_sec.max(0.01);
                let out_label = self.labels.next("xfade");
                let filter = format!("xfade=transition={name}:duration={:.3}:offset={:.3}", duration, (cumulative - duration).max(0.0));
                self.graph.push(FilterChain::new(
                    vec![current.clone(), scene_labels[i].clone()],
                    filter,
                    vec![out_label.clone()],
                ));
                cumulative = cumulative - duration + next_len;
                current = out_label;
            } else {
                let out_label = self.labels.next("concat");
                self.graph.push(FilterChain::new(
                    vec![current.clone(), scene_labels[i].clone()],
                    "concat=n=2:v=1:a=0".to_string(),
                    vec![out_label.clone()],
                ));
                cumulative += next_len;
                current = out_label;
            }
        }

        current
    }

    /// §4.4.5: global text overlays, drawn in declared order.
    fn apply_text_overlays(&mut self, mut current: String, overlays: &[TextOverlay]) -> String {
        let height = self.timeline.resolution.height as f64;
        for overlay in overlays {
            let scaled_font_size = (overlay.style.font_size / 10.0) * (height / 10.0);
            let mut filter = format!(
                "drawtext=text='{}':fontsize={:.0}:fontcolor={}:x=(w-text_w)*{}/100:y=(h-text_h)*{}/100",
                escape_filter_text(&overlay.text),
                scaled_font_size,
                hex_to_ffmpeg_color(&overlay.style.color_hex),
                overlay.x_pct,
                overlay.y_pct,
            );
            if overlay.style.drop_shadow {
                filter.push_str(":shadowx=2:shadowy=2");
            }
            if let Some(enable) = visibility_expr(overlay.start_sec, overlay.duration_sec) {
                filter.push_str(&format!(":enable='{enable}'"));
            }
            let out = self.labels.next("text");
            self.graph.push(FilterChain::simple(current, filter, out.clone()));
            current = out;
        }
        current
    }

    /// §4.4.5: corner-anchored brand logo, 30px margin from both edges.
    fn apply_brand(&mut self, current: String, brand: &Brand) -> MediaResult<String> {
        let key = brand.logo_asset_id.to_string();
        let path = self.paths.get(&key).ok_or_else(|| MediaError::FileNotFound(key.clone()))?.to_path_buf();
        let logo_idx = self.add_input(InputSpec::new(path));

        let scaled = self.labels.next("logo");
        self.graph.push(FilterChain::simple(format!("{logo_idx}:v"), format!("scale={}:-1", brand.size_px), scaled.clone()));

        let (x, y) = match brand.corner {
            Corner::TopLeft => ("30".to_string(), "30".to_string()),
            Corner::TopRight => ("main_w-overlay_w-30".to_string(), "30".to_string()),
            Corner::BottomLeft => ("30".to_string(), "main_h-overlay_h-30".to_string()),
            Corner::BottomRight => ("main_w-overlay_w-30".to_string(), "main_h-overlay_h-30".to_string()),
        };

        let out = self.labels.next("brand");
        self.graph.push(FilterChain::new(
            vec![current, scaled],
            format!("overlay=x={x}:y={y}"),
            vec![out.clone()],
        ));
        Ok(out)
    }

    /// §4.4.5: center-relative image overlays, GIFs looped and pre-trimmed
    /// to their declared window.
    fn apply_image_overlays(&mut self, mut current: String, overlays: &[ImageOverlay]) -> MediaResult<String> {
        for overlay in overlays {
            let key = overlay.asset_id.to_string();
            let path = self.paths.get(&key).ok_or_else(|| MediaError::FileNotFound(key.clone()))?.to_path_buf();

            let spec = if overlay.is_gif { InputSpec::looped(path.clone()) } else { InputSpec::new(path.clone()) };
            let idx = self.add_input(spec);

            let mut steps = Vec::new();
            if overlay.is_gif {
                steps.push(format!("trim=duration={:.3},setpts=PTS-STARTPTS", overlay.duration_sec));
            }
            steps.push(format!("scale=iw*{}:ih*{}", overlay.scale, overlay.scale));
            let prepared = self.labels.next("imgovl");
            self.graph.push(FilterChain::simple(format!("{idx}:v"), steps.join(","), prepared.clone()));

            let x = format!("({}/100)*main_w-overlay_w/2", overlay.x_pct);
            let y = format!("({}/100)*main_h-overlay_h/2", overlay.y_pct);
            let enable = visibility_expr(Some(overlay.start_sec), Some(overlay.duration_sec)).unwrap_or_default();

            let out = self.labels.next("composite");
            self.graph.push(FilterChain::new(
                vec![current, prepared],
                format!("overlay=x={x}:y={y}:eof_action=pass:enable='{enable}'"),
                vec![out.clone()],
            ));
            current = out;
        }
        Ok(current)
    }

    /// §4.4.5: burned-in captions, one `drawtext` per non-droppable segment.
    fn apply_captions(&mut self, mut current: String, segments: &[CaptionSegment]) -> String {
        for segment in segments {
            if segment.is_droppable() {
                continue;
            }
            let enable = format!("between(t\\,{:.3}\\,{:.3})", segment.start_sec, segment.end_sec);
            let filter = format!(
                "drawtext=text='{}':fontsize=42:fontcolor=0xFFFFFF:box=1:boxcolor=0x000000@0.5:boxborderw=8:x=(w-text_w)/2:y=h-160:enable='{enable}'",
                escape_filter_text(&segment.text),
            );
            let out = self.labels.next("caption");
            self.graph.push(FilterChain::simple(current, filter, out.clone()));
            current = out;
        }
        current
    }

    /// §4.4.6: music, voiceover/talking-head tracks, and sound effects mixed
    /// into a single audio stream. Returns `None` when the timeline carries
    /// no audio at all, in which case the output has no audio stream.
    fn build_audio_graph(&mut self, output_duration: f64) -> MediaResult<Option<String>> {
        let mut branches: Vec<String> = Vec::new();

        if let Some(voiceover) = &self.timeline.voiceover {
            let key = voiceover.path_key();
            if let Some(path) = self.paths.get(&key) {
                let idx = self.add_input(InputSpec::new(path));
                let delay_ms = (voiceover.start_offset_sec * 1000.0).max(0.0);
                let filter = format!("adelay={delay_ms:.0}|{delay_ms:.0},volume={}", voiceover.volume);
                let out = self.labels.next("voice");
                self.graph.push(FilterChain::simple(format!("{idx}:a"), filter, out.clone()));
                branches.push(out);
            }
        } else if self.timeline.has_audio_tracks() {
            for track in &self.timeline.audio_tracks {
                let key = track.asset_id.to_string();
                if let Some(path) = self.paths.get(&key) {
                    let idx = self.add_input(InputSpec::new(path));
                    let delay_ms = (track.start_offset_sec * 1000.0).max(0.0);
                    let out = self.labels.next("track");
                    self.graph.push(FilterChain::simple(format!("{idx}:a"), format!("adelay={delay_ms:.0}|{delay_ms:.0}"), out.clone()));
                    branches.push(out);
                }
            }
        } else {
            // §4.4.6 fallback: no voiceover, no explicit audio tracks — pull
            // dialogue straight out of the scenes flagged as talking-head
            // and concatenate them into one continuous track.
            if let Some(branch) = self.build_talking_head_audio()? {
                branches.push(branch);
            }
        }

        if let Some(music) = &self.timeline.music {
            let key = music.path_key();
            if let Some(path) = self.paths.get(&key) {
                let mut spec = InputSpec::new(path);
                spec.pre_args = vec!["-stream_loop".to_string(), "-1".to_string()];
                let idx = self.add_input(spec);
                let filter = format!("atrim=duration={:.3},volume={}", output_duration, music.volume);
                let out = self.labels.next("music");
                self.graph.push(FilterChain::simple(format!("{idx}:a"), filter, out.clone()));
                branches.push(out);
            }
        }

        for sfx in &self.timeline.sound_effects {
            if let Some(out) = self.build_sound_effect(sfx) {
                branches.push(out);
            }
        }

        if branches.is_empty() {
            return Ok(None);
        }
        if branches.len() == 1 {
            return Ok(Some(branches.into_iter().next().unwrap()));
        }

        let weights = vec!["1"; branches.len()].join(" ");
        let input_count = branches.len();
        let out = self.labels.next("aout");
        self.graph.push(FilterChain::new(
            branches,
            format!("amix=inputs={input_count}:duration=longest:weights=\"{weights}\":normalize=0"),
            vec![out.clone()],
        ));
        Ok(Some(out))
    }

    /// §4.4.6 fallback: extracts the audio track from each scene flagged
    /// `is_talking_head`, trimmed to that scene's in/out points, and
    /// concatenates them into a single branch. Scenes with no resolvable
    /// source (a synthesized color card) contribute no audio and are
    /// skipped.
    fn build_talking_head_audio(&mut self) -> MediaResult<Option<String>> {
        let scenes: Vec<Scene> = self.timeline.talking_head_scenes().cloned().collect();
        let mut branches: Vec<String> = Vec::new();

        for scene in &scenes {
            let Some(key) = scene_path_key(&scene.source) else { continue };
            let Some(path) = self.paths.get(&key) else { continue };
            let path = path.to_path_buf();
            let idx = self.add_input(InputSpec::new(path));
            let filter = format!("atrim=start={:.3}:end={:.3},asetpts=PTS-STARTPTS", scene.in_sec, scene.out_sec);
            let out = self.labels.next("talk");
            self.graph.push(FilterChain::simple(format!("{idx}:a"), filter, out.clone()));
            branches.push(out);
        }

        if branches.is_empty() {
            return Ok(None);
        }
        if branches.len() == 1 {
            return Ok(Some(branches.into_iter().next().unwrap()));
        }

        let input_count = branches.len();
        let out = self.labels.next("talkconcat");
        self.graph.push(FilterChain::new(
            branches,
            format!("concat=n={input_count}:v=0:a=1"),
            vec![out.clone()],
        ));
        Ok(Some(out))
    }

    fn build_sound_effect(&mut self, sfx: &SoundEffect) -> Option<String> {
        let key = sfx.asset_id.to_string();
        let path = self.paths.get(&key)?.to_path_buf();
        let idx = self.add_input(InputSpec::new(path));
        let delay_ms = (sfx.at_time_sec * 1000.0).max(0.0);
        let filter = format!("adelay={delay_ms:.0}|{delay_ms:.0},volume={}", sfx.volume);
        let out = self.labels.next("sfx");
        self.graph.push(FilterChain::simple(format!("{idx}:a"), filter, out.clone()));
        Some(out)
    }

    /// Runs the full compile and returns the ready-to-execute command.
    pub fn compile(mut self, output_path: impl AsRef<Path>) -> MediaResult<EncodeCommand> {
        if self.timeline.scenes.is_empty() {
            return Err(MediaError::NoScenes);
        }

        let scenes = self.timeline.scenes.clone();
        let visual_duration = self.visual_duration(&scenes);
        let extra_pad = self.reconciliation_pad(visual_duration);

        let mut scene_labels = Vec::with_capacity(scenes.len());
        for (i, scene) in scenes.iter().enumerate() {
            let pad = if i == scenes.len() - 1 { extra_pad } else { 0.0 };
            scene_labels.push(self.build_scene_chain(scene, pad)?);
        }

        let mut video_label = self.join_scenes(&scene_labels, &scenes, extra_pad);
        video_label = self.apply_text_overlays(video_label, &self.timeline.text_overlays.clone());

        if let Some(brand) = self.timeline.brand.clone() {
            video_label = self.apply_brand(video_label, &brand)?;
        }

        video_label = self.apply_image_overlays(video_label, &self.timeline.image_overlays.clone())?;

        if let Some(captions) = &self.timeline.captions {
            if captions.enabled && captions.burn_in {
                video_label = self.apply_captions(video_label, &captions.segments.clone());
            }
        }

        let output_duration = (visual_duration + extra_pad).max(
            self.timeline.rendering.voiceover_duration_sec.unwrap_or(0.0) + self.timeline.rendering.intro_offset_sec,
        );
        let audio_label = self.build_audio_graph(output_duration)?;

        let export = &self.timeline.export;
        let mut cmd = EncodeCommand::new(output_path);
        for input in self.inputs {
            cmd = cmd.add_input(input);
        }
        cmd = cmd
            .filter_complex(self.graph.to_filter_complex_string())
            .map(format!("[{video_label}]"));
        if let Some(audio_label) = &audio_label {
            cmd = cmd.map(format!("[{audio_label}]"));
        }
        cmd = cmd
            .video_codec(export.codec.ffmpeg_encoder())
            .preset("medium")
            .no_subtitles_or_data()
            .faststart()
            .pixel_format("yuv420p")
            .output_duration(output_duration);
        cmd = match export.crf {
            Some(crf) => cmd.crf(crf),
            None => cmd,
        };
        cmd = match export.bitrate_mbps {
            Some(mbps) => cmd.video_bitrate_mbps(mbps),
            None => cmd,
        };
        cmd = cmd.audio_codec("aac").audio_bitrate_kbps(export.audio_kbps);

        Ok(cmd)
    }
}

/// Entry point used by the rest of the worker: compiles `timeline` into the
/// `ffmpeg` invocation that writes `output_path`.
pub fn compile(timeline: &Timeline, paths: &AssetPaths, output_path: impl AsRef<Path>) -> MediaResult<EncodeCommand> {
    Compiler::new(timeline, paths).compile(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::BuildArgs;
    use render_models::{Codec, Export, Resolution, Scene, SceneKind, SceneSource, Timeline};

    fn base_timeline(scenes: Vec<Scene>) -> Timeline {
        Timeline {
            version: 1,
            resolution: Resolution::portrait_1080x1920(),
            fps: 30.0,
            assets: Vec::new(),
            scenes,
            music: None,
            voiceover: None,
            audio_tracks: Vec::new(),
            sound_effects: Vec::new(),
            image_overlays: Vec::new(),
            text_overlays: Vec::new(),
            captions: None,
            brand: None,
            export: Export {
                codec: Codec::H264,
                bitrate_mbps: None,
                crf: Some(23),
                audio_kbps: 128,
            },
            rendering: Default::default(),
        }
    }

    fn video_scene(id: &str, key: &str, in_sec: f64, out_sec: f64, duration_sec: f64) -> Scene {
        Scene {
            id: id.to_string(),
            source: SceneSource::Asset { asset_id: render_models::AssetId::from_string(key) },
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
    fn rejects_empty_scene_list() {
        let timeline = base_timeline(Vec::new());
        let paths = AssetPaths::new();
        let err = compile(&timeline, &paths, "out.mp4").unwrap_err();
        assert!(matches!(err, MediaError::NoScenes));
    }

    #[test]
    fn two_scene_concat_has_no_xfade() {
        let timeline = base_timeline(vec![
            video_scene("s0", "a0", 0.0, 3.0, 3.0),
            video_scene("s1", "a1", 0.0, 2.0, 2.0),
        ]);
        let mut paths = AssetPaths::new();
        paths.insert("a0", "a0.mp4");
        paths.insert("a1", "a1.mp4");

        let cmd = compile(&timeline, &paths, "out.mp4").unwrap();
        let args = cmd.build_args();
        let graph = args.iter().find(|a| a.contains("concat=n=2")).expect("concat present");
        assert!(!graph.contains("xfade"));
    }

    #[test]
    fn crossfade_scenes_emit_xfade_with_offset() {
        let mut first = video_scene("s0", "a0", 0.0, 3.0, 3.0);
        first.transition_out = Transition::Fade;
        first.transition_duration_sec = 0.5;
        let second = video_scene("s1", "a1", 0.0, 2.0, 2.0);

        let timeline = base_timeline(vec![first, second]);
        let mut paths = AssetPaths::new();
        paths.insert("a0", "a0.mp4");
        paths.insert("a1", "a1.mp4");

        let cmd = compile(&timeline, &paths, "out.mp4").unwrap();
        let args = cmd.build_args();
        let graph = args.iter().find(|a| a.contains("xfade")).expect("xfade present");
        assert!(graph.contains("transition=fade"));
        assert!(graph.contains("offset=2.500"));
    }

    #[test]
    fn voiceover_longer_than_visuals_pads_last_scene() {
        let mut timeline = base_timeline(vec![video_scene("s0", "a0", 0.0, 4.0, 4.0)]);
        timeline.rendering.voiceover_duration_sec = Some(6.0);
        let mut paths = AssetPaths::new();
        paths.insert("a0", "a0.mp4");

        let cmd = compile(&timeline, &paths, "out.mp4").unwrap();
        let args = cmd.build_args();
        let graph = args.iter().find(|a| a.contains("tpad")).expect("tpad present");
        assert!(graph.contains("stop_duration=2.500"));
    }

    #[test]
    fn missing_asset_path_is_reported() {
        let timeline = base_timeline(vec![video_scene("s0", "missing", 0.0, 3.0, 3.0)]);
        let paths = AssetPaths::new();
        let err = compile(&timeline, &paths, "out.mp4").unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[test]
    fn scene_with_no_source_synthesizes_color_input() {
        let mut scene = video_scene("s0", "unused", 0.0, 3.0, 3.0);
        scene.source = SceneSource::None;
        let timeline = base_timeline(vec![scene]);
        let paths = AssetPaths::new();

        let cmd = compile(&timeline, &paths, "out.mp4").unwrap();
        let args = cmd.build_args();
        assert!(args.iter().any(|a| a.starts_with("color=c=black")));
    }
}
