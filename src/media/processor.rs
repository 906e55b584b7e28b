use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{Result, VidlocError};
use super::{
    CompressionQuality, MediaAsset, MediaCommandBuilder, MediaProcessorTrait, SubtitleStyle,
    ToolStatus,
};

/// Media processor backed by the ffmpeg and ffprobe binaries
pub struct FfmpegProcessor {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegProcessor {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path);

        Self {
            config,
            command_builder,
        }
    }

    /// Grab a single frame as `<stem>_thumbnail.jpg`
    pub async fn create_thumbnail(
        &self,
        video_path: &Path,
        destination_dir: &Path,
        timestamp: &str,
    ) -> Result<PathBuf> {
        require_file(video_path, VidlocError::NotFound)?;
        let output_path = destination_dir.join(format!("{}_thumbnail.jpg", file_stem(video_path)));

        info!("Creating thumbnail of {} at {}", video_path.display(), timestamp);
        self.command_builder
            .thumbnail(video_path, timestamp, output_path.as_path())
            .timeout_secs(self.config.thumbnail_timeout_secs)
            .execute()
            .await?;

        Ok(output_path)
    }

    /// Re-encode as `<stem>_compressed.mp4`
    pub async fn compress(
        &self,
        video_path: &Path,
        destination_dir: &Path,
        quality: CompressionQuality,
    ) -> Result<PathBuf> {
        require_file(video_path, VidlocError::NotFound)?;
        let output_path = destination_dir.join(format!("{}_compressed.mp4", file_stem(video_path)));

        info!("Compressing {} with {:?} quality", video_path.display(), quality);
        self.command_builder
            .compress(video_path, quality, output_path.as_path())
            .timeout_secs(self.config.compress_timeout_secs)
            .execute()
            .await?;

        Ok(output_path)
    }

    /// Render a short clip with subtitles as `preview_<start>s.mp4`
    pub async fn create_preview(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        destination_dir: &Path,
        start_secs: u64,
        duration_secs: u64,
        style: &SubtitleStyle,
    ) -> Result<PathBuf> {
        require_file(video_path, VidlocError::SourceNotFound)?;
        require_file(subtitle_path, VidlocError::SourceNotFound)?;
        let output_path = destination_dir.join(format!("preview_{}s.mp4", start_secs));

        info!("Creating {}s preview of {} from {}s", duration_secs, video_path.display(), start_secs);
        self.command_builder
            .preview(
                video_path,
                style.subtitles_filter(subtitle_path),
                start_secs,
                duration_secs,
                output_path.as_path(),
            )
            .timeout_secs(self.config.preview_timeout_secs)
            .execute()
            .await?;

        Ok(output_path)
    }
}

#[async_trait]
impl MediaProcessorTrait for FfmpegProcessor {
    async fn probe(&self, path: &Path) -> Result<MediaAsset> {
        require_file(path, VidlocError::NotFound)?;
        debug!("Probing {}", path.display());

        let output = self
            .command_builder
            .probe(path)
            .timeout_secs(self.config.probe_timeout_secs)
            .execute()
            .await?;

        let mut asset = MediaAsset::from_probe_json(path, &output.stdout)?;
        if asset.size_bytes == 0 {
            asset.size_bytes = tokio::fs::metadata(path).await?.len();
        }
        Ok(asset)
    }

    async fn extract_audio(&self, video_path: &Path, destination_dir: &Path) -> Result<PathBuf> {
        require_file(video_path, VidlocError::NotFound)?;
        let audio_path = destination_dir.join(format!("{}.wav", file_stem(video_path)));

        info!("Extracting audio from {} to {}", video_path.display(), audio_path.display());
        self.command_builder
            .extract_audio(video_path, audio_path.as_path())
            .timeout_secs(self.config.extract_timeout_secs)
            .execute()
            .await?;

        info!("Audio extraction completed");
        Ok(audio_path)
    }

    async fn burn_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        destination_dir: &Path,
        filename: &str,
        style: &SubtitleStyle,
    ) -> Result<PathBuf> {
        require_file(video_path, VidlocError::SourceNotFound)?;
        require_file(subtitle_path, VidlocError::SourceNotFound)?;
        let output_path = destination_dir.join(filename);

        info!("Burning subtitles from {} into {} -> {}",
              subtitle_path.display(), video_path.display(), output_path.display());

        self.command_builder
            .burn_subtitles(
                video_path,
                style.subtitles_filter(subtitle_path),
                output_path.as_path(),
                &self.config.subtitle_options,
            )
            .timeout_secs(self.config.burn_timeout_secs)
            .execute()
            .await?;

        info!("Subtitle burn-in completed: {}", output_path.display());
        Ok(output_path)
    }

    async fn check_availability(&self) -> ToolStatus {
        let [ffmpeg, ffprobe] = self.command_builder.version_checks();
        let ffmpeg = ffmpeg.timeout_secs(10).execute().await.is_ok();
        let ffprobe = ffprobe.timeout_secs(10).execute().await.is_ok();

        info!("Media tools available - ffmpeg: {}, ffprobe: {}", ffmpeg, ffprobe);
        ToolStatus { ffmpeg, ffprobe }
    }
}

fn require_file(path: &Path, missing: fn(PathBuf) -> VidlocError) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(missing(path.to_path_buf()))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn processor() -> FfmpegProcessor {
        FfmpegProcessor::new(Config::default().media)
    }

    #[tokio::test]
    async fn test_probe_missing_file_is_not_found() {
        let result = processor().probe(Path::new("/no/such/video.mp4")).await;
        assert!(matches!(result, Err(VidlocError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_burn_requires_both_sources() {
        let dir = assert_fs::TempDir::new().unwrap();
        let video = dir.path().join("video.mp4");
        std::fs::write(&video, b"not really a video").unwrap();

        let result = processor()
            .burn_subtitles(&video, &dir.path().join("missing.srt"), dir.path(), "out.mp4", &SubtitleStyle::default())
            .await;

        assert!(matches!(result, Err(VidlocError::SourceNotFound(path)) if path.ends_with("missing.srt")));
    }

    #[tokio::test]
    async fn test_extract_missing_video_is_not_found() {
        let dir = assert_fs::TempDir::new().unwrap();
        let result = processor().extract_audio(&dir.path().join("gone.mp4"), dir.path()).await;
        assert!(matches!(result, Err(VidlocError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_tools_are_reported_unavailable() {
        let mut config = Config::default().media;
        config.ffmpeg_path = "no-such-ffmpeg-binary".to_string();
        config.ffprobe_path = "no-such-ffprobe-binary".to_string();

        let status = FfmpegProcessor::new(config).check_availability().await;
        assert!(!status.all_available());
    }
}
