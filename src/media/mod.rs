// Media toolkit adapter
//
// Wraps the ffmpeg/ffprobe command-line tools:
// - Commands: command builders with timeouts and typed failures
// - Probe: ffprobe JSON into MediaAsset
// - Processor: the ffmpeg-backed implementation
// - Style: subtitle styling for burn-in
// - Validate: pre-flight checks on uploaded videos

pub mod commands;
pub mod probe;
pub mod processor;
pub mod style;
pub mod validate;

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub use commands::*;
pub use probe::*;
pub use processor::*;
pub use style::*;
pub use validate::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Availability of the external media tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub ffmpeg: bool,
    pub ffprobe: bool,
}

impl ToolStatus {
    pub fn all_available(&self) -> bool {
        self.ffmpeg && self.ffprobe
    }
}

/// Main trait for media processing operations used by the pipeline
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Inspect a media file
    async fn probe(&self, path: &Path) -> Result<MediaAsset>;

    /// Extract a mono 16 kHz audio track into `destination_dir`
    async fn extract_audio(&self, video_path: &Path, destination_dir: &Path) -> Result<PathBuf>;

    /// Burn subtitles into the video image, writing `destination_dir/filename`
    async fn burn_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        destination_dir: &Path,
        filename: &str,
        style: &SubtitleStyle,
    ) -> Result<PathBuf>;

    /// Check whether the media tools can be executed
    async fn check_availability(&self) -> ToolStatus;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::FfmpegProcessor::new(config))
    }
}
