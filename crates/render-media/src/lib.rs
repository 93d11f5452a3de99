//! FFmpeg orchestration: asset fetching, filter-graph compilation, and
//! subprocess execution for the render worker.

pub mod command;
pub mod compiler;
pub mod error;
pub mod fetcher;
pub mod graph;
pub mod text;
pub mod thumbnail;

pub use command::{check_ffmpeg, check_ffprobe, BuildArgs, EncodeCommand, EncodeProgress, FfmpegCommand, FfmpegRunner, InputSpec};
pub use compiler::{compile, AssetPaths, Compiler};
pub use error::{MediaError, MediaResult};
pub use fetcher::Fetcher;
pub use graph::{FilterChain, FilterGraph, LabelAllocator};
pub use thumbnail::generate_thumbnail;
