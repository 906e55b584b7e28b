use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Result, VidlocError};

/// Which media operation a command performs; decides how failures are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaOperation {
    Probe,
    ExtractAudio,
    BurnSubtitles,
    Thumbnail,
    Compress,
    Preview,
    VersionCheck,
}

impl MediaOperation {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Probe => "Media probe",
            Self::ExtractAudio => "Audio extraction",
            Self::BurnSubtitles => "Subtitle burn-in",
            Self::Thumbnail => "Thumbnail creation",
            Self::Compress => "Video compression",
            Self::Preview => "Preview creation",
            Self::VersionCheck => "Version check",
        }
    }

    /// Error for a non-zero exit, carrying the tool's diagnostics verbatim.
    pub fn failure(&self, diagnostics: String) -> VidlocError {
        match self {
            Self::Probe => VidlocError::ProbeFailed(diagnostics),
            Self::ExtractAudio => VidlocError::ExtractionFailed(diagnostics),
            Self::BurnSubtitles => VidlocError::BurnFailed(diagnostics),
            _ => VidlocError::Media(format!("{} failed: {}", self.description(), diagnostics)),
        }
    }
}

/// One invocation of ffmpeg or ffprobe, assembled argument by argument.
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub operation: MediaOperation,
    pub timeout: Duration,
    /// File the command must leave behind for the run to count as successful
    pub expected_output: Option<PathBuf>,
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl MediaCommand {
    pub fn new<S: Into<String>>(binary_path: S, operation: MediaOperation) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            operation,
            timeout: Duration::from_secs(60),
            expected_output: None,
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// `-i <path>`
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        let path = path_arg(path.as_ref());
        self.arg("-i").arg(path)
    }

    /// Final positional argument; the run fails with `OutputMissing` unless it appears
    pub fn output<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref();
        self.expected_output = Some(path.to_path_buf());
        self.arg(path_arg(path))
    }

    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Pass the audio stream through without re-encoding
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Drop the video stream (`-vn`)
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Resample and downmix the audio track
    pub fn audio_format(self, sample_rate: u32, channels: u32) -> Self {
        self.arg("-ac")
            .arg(channels.to_string())
            .arg("-ar")
            .arg(sample_rate.to_string())
    }

    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Seek to a position (placed before `-i` for fast input seeking)
    pub fn seek<S: Into<String>>(self, position: S) -> Self {
        self.arg("-ss").arg(position)
    }

    /// Run the command, enforcing the timeout and checking exit status and output file.
    pub async fn execute(&self) -> Result<Output> {
        let description = self.operation.description();
        debug!("{}: {} {}", description, self.binary_path, self.args.join(" "));

        let child = Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VidlocError::Media(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        // Dropping the wait future on timeout kills the child.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("{} timed out after {} seconds, killing process", description, self.timeout.as_secs());
                return Err(VidlocError::Timeout {
                    operation: description.to_string(),
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let diagnostics = match output.status.code() {
                Some(code) if stderr.is_empty() => format!("exit code {}", code),
                Some(code) => format!("exit code {}: {}", code, stderr),
                None => format!("terminated by signal: {}", stderr),
            };
            return Err(self.operation.failure(diagnostics));
        }

        if let Some(expected) = &self.expected_output {
            let produced = tokio::fs::metadata(expected)
                .await
                .map(|m| m.len() > 0)
                .unwrap_or(false);
            if !produced {
                return Err(VidlocError::OutputMissing(expected.clone()));
            }
        }

        Ok(output)
    }
}

/// Compression presets: (crf, x264 preset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl CompressionQuality {
    pub fn settings(&self) -> (&'static str, &'static str) {
        match self {
            Self::Low => ("28", "fast"),
            Self::Medium => ("23", "medium"),
            Self::High => ("18", "slow"),
        }
    }

    /// Unknown names use the medium preset.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }
}

/// Prepared commands for each media operation, bound to the configured tool paths
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, ffprobe_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// ffprobe printing stream and container metadata as JSON on stdout
    pub fn probe<P: AsRef<Path>>(&self, path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, MediaOperation::Probe)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path_arg(path.as_ref()))
    }

    /// Mono 16 kHz PCM, the format speech-to-text services expect
    pub fn extract_audio<P: AsRef<Path>>(&self, video_path: P, audio_path: P) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, MediaOperation::ExtractAudio)
            .input(video_path)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_format(16_000, 1)
            .overwrite()
            .output(audio_path)
    }

    /// Re-encode the image with the subtitles filter; audio is passed through
    pub fn burn_subtitles<P: AsRef<Path>>(
        &self,
        video_path: P,
        subtitles_filter: String,
        output_path: P,
        encoder_options: &[String],
    ) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, MediaOperation::BurnSubtitles)
            .input(video_path)
            .video_filter(subtitles_filter)
            .copy_audio()
            .args(encoder_options.iter().cloned())
            .overwrite()
            .output(output_path)
    }

    /// One JPEG frame at `timestamp`
    pub fn thumbnail<P: AsRef<Path>>(&self, video_path: P, timestamp: &str, output_path: P) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, MediaOperation::Thumbnail)
            .input(video_path)
            .seek(timestamp)
            .args(["-vframes", "1", "-q:v", "2"])
            .overwrite()
            .output(output_path)
    }

    /// x264/AAC re-encode at the preset's CRF
    pub fn compress<P: AsRef<Path>>(&self, video_path: P, quality: CompressionQuality, output_path: P) -> MediaCommand {
        let (crf, preset) = quality.settings();
        MediaCommand::new(&self.ffmpeg_path, MediaOperation::Compress)
            .input(video_path)
            .video_codec("libx264")
            .args(["-crf", crf, "-preset", preset])
            .audio_codec("aac")
            .args(["-b:a", "128k"])
            .overwrite()
            .output(output_path)
    }

    /// Short subtitled clip starting at `start_secs`
    pub fn preview<P: AsRef<Path>>(
        &self,
        video_path: P,
        subtitles_filter: String,
        start_secs: u64,
        duration_secs: u64,
        output_path: P,
    ) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, MediaOperation::Preview)
            .seek(start_secs.to_string())
            .input(video_path)
            .arg("-t")
            .arg(duration_secs.to_string())
            .video_filter(subtitles_filter)
            .copy_audio()
            .overwrite()
            .output(output_path)
    }

    /// `-version` for both tools
    pub fn version_checks(&self) -> [MediaCommand; 2] {
        [
            MediaCommand::new(&self.ffmpeg_path, MediaOperation::VersionCheck).arg("-version"),
            MediaCommand::new(&self.ffprobe_path, MediaOperation::VersionCheck).arg("-version"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> MediaCommandBuilder {
        MediaCommandBuilder::new("ffmpeg", "ffprobe")
    }

    #[test]
    fn test_extract_audio_arguments() {
        let cmd = builder().extract_audio(Path::new("in.mp4"), Path::new("out.wav"));
        assert_eq!(
            cmd.args,
            vec!["-i", "in.mp4", "-vn", "-c:a", "pcm_s16le", "-ac", "1", "-ar", "16000", "-y", "out.wav"]
        );
        assert_eq!(cmd.expected_output, Some(PathBuf::from("out.wav")));
    }

    #[test]
    fn test_burn_copies_audio_and_overwrites() {
        let cmd = builder().burn_subtitles(
            Path::new("in.mp4"),
            "subtitles=a.srt".to_string(),
            Path::new("out.mp4"),
            &["-preset".to_string(), "fast".to_string()],
        );
        assert_eq!(
            cmd.args,
            vec!["-i", "in.mp4", "-vf", "subtitles=a.srt", "-c:a", "copy", "-preset", "fast", "-y", "out.mp4"]
        );
        assert_eq!(cmd.operation, MediaOperation::BurnSubtitles);
    }

    #[test]
    fn test_compress_presets() {
        let cmd = builder().compress(Path::new("in.mp4"), CompressionQuality::from_name("HIGH"), Path::new("c.mp4"));
        assert!(cmd.args.windows(2).any(|w| w == ["-crf", "18"]));
        assert!(cmd.args.windows(2).any(|w| w == ["-preset", "slow"]));
        assert_eq!(CompressionQuality::from_name("whatever"), CompressionQuality::Medium);
    }

    #[test]
    fn test_probe_arguments() {
        let cmd = builder().probe("clip.mov");
        assert_eq!(cmd.binary_path, "ffprobe");
        assert_eq!(cmd.args.last().map(String::as_str), Some("clip.mov"));
        assert!(cmd.expected_output.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr() {
        let cmd = MediaCommand::new("sh", MediaOperation::BurnSubtitles)
            .args(["-c", "echo 'No such filter: subtitles' >&2; exit 3"]);

        match cmd.execute().await {
            Err(VidlocError::BurnFailed(message)) => {
                assert!(message.contains("exit code 3"));
                assert!(message.contains("No such filter: subtitles"));
            }
            other => panic!("expected BurnFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_without_output_is_output_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = MediaCommand::new("true", MediaOperation::ExtractAudio).output(dir.path().join("audio.wav"));

        assert!(matches!(cmd.execute().await, Err(VidlocError::OutputMissing(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_is_enforced() {
        let mut cmd = MediaCommand::new("sleep", MediaOperation::BurnSubtitles).arg("5");
        cmd.timeout = Duration::from_millis(100);

        assert!(matches!(cmd.execute().await, Err(VidlocError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_missing_binary_is_media_error() {
        let cmd = MediaCommand::new("definitely-not-a-real-binary-xyz", MediaOperation::Probe);
        assert!(matches!(cmd.execute().await, Err(VidlocError::Media(_))));
    }
}
