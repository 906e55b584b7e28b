//! ffprobe metadata.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, VidlocError};

/// Probed metadata for a file on local storage. Never mutated after probing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub filename: String,
    pub size_bytes: u64,
    /// Duration in seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    /// Frames per second, 0 when unknown
    pub fps: f64,
    pub format_name: String,
    pub video_codec: Option<String>,
    pub pixel_format: Option<String>,
    /// Bits per second, 0 when unknown
    pub bit_rate: u64,
    pub audio: Option<AudioStreamInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u32,
}

impl MediaAsset {
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }

    /// Build an asset from raw `ffprobe -print_format json` output.
    pub fn from_probe_json(path: &Path, json: &[u8]) -> Result<Self> {
        let probe: FfprobeOutput = serde_json::from_slice(json)
            .map_err(|e| VidlocError::ProbeFailed(format!("Unparseable probe output: {}", e)))?;

        let video_stream = probe.streams.iter().find(|s| s.codec_type.as_deref() == Some("video"));
        let audio_stream = probe.streams.iter().find(|s| s.codec_type.as_deref() == Some("audio"));
        let format = probe.format.unwrap_or_default();

        let audio = audio_stream.map(|s| AudioStreamInfo {
            codec: s.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
            sample_rate: s.sample_rate.as_deref().and_then(|r| r.parse().ok()).unwrap_or(0),
            channels: s.channels.unwrap_or(0),
        });

        Ok(Self {
            path: path.to_path_buf(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            size_bytes: format.size.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0),
            duration: format.duration.as_deref().and_then(|d| d.parse().ok()).unwrap_or(0.0),
            width: video_stream.and_then(|s| s.width).unwrap_or(0),
            height: video_stream.and_then(|s| s.height).unwrap_or(0),
            fps: video_stream
                .and_then(|s| s.r_frame_rate.as_deref())
                .map(parse_frame_rate)
                .unwrap_or(0.0),
            format_name: format.format_name.unwrap_or_else(|| "unknown".to_string()),
            video_codec: video_stream.and_then(|s| s.codec_name.clone()),
            pixel_format: video_stream.and_then(|s| s.pix_fmt.clone()),
            bit_rate: format.bit_rate.as_deref().and_then(|b| b.parse().ok()).unwrap_or(0),
            audio,
        })
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    pix_fmt: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
}

/// Parse a frame rate given as a `num/den` fraction or a plain number.
///
/// Anything unparseable, including a zero denominator, yields 0.
pub fn parse_frame_rate(rate: &str) -> f64 {
    let rate = rate.trim();
    match rate.split_once('/') {
        Some((num, den)) => match (num.trim().parse::<u64>(), den.trim().parse::<u64>()) {
            (Ok(num), Ok(den)) if den > 0 => num as f64 / den as f64,
            _ => 0.0,
        },
        None => rate.parse::<f64>().ok().filter(|r| r.is_finite() && *r >= 0.0).unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_PROBE: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
             "r_frame_rate": "30000/1001", "pix_fmt": "yuv420p"},
            {"index": 1, "codec_type": "audio", "codec_name": "aac", "sample_rate": "48000", "channels": 2}
        ],
        "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "10.000000",
                   "size": "1048576", "bit_rate": "838860"}
    }"#;

    #[test]
    fn test_full_probe_output() {
        let asset = MediaAsset::from_probe_json(Path::new("/videos/clip.mp4"), FULL_PROBE.as_bytes()).unwrap();

        assert_eq!(asset.filename, "clip.mp4");
        assert_eq!(asset.duration, 10.0);
        assert_eq!((asset.width, asset.height), (1920, 1080));
        assert!((asset.fps - 29.97).abs() < 0.01);
        assert_eq!(asset.video_codec.as_deref(), Some("h264"));
        assert_eq!(asset.size_bytes, 1_048_576);
        assert_eq!(asset.size_mb(), 1.0);
        assert_eq!(asset.bit_rate, 838_860);
        assert_eq!(
            asset.audio,
            Some(AudioStreamInfo { codec: "aac".to_string(), sample_rate: 48_000, channels: 2 })
        );
    }

    #[test]
    fn test_missing_audio_and_frame_rate_are_tolerated() {
        let json = r#"{"streams": [{"codec_type": "video", "codec_name": "vp9", "width": 640, "height": 360}],
                       "format": {"duration": "3.5"}}"#;
        let asset = MediaAsset::from_probe_json(Path::new("silent.webm"), json.as_bytes()).unwrap();

        assert!(!asset.has_audio());
        assert_eq!(asset.fps, 0.0);
        assert_eq!(asset.bit_rate, 0);
        assert_eq!(asset.format_name, "unknown");
    }

    #[test]
    fn test_unparseable_output_is_probe_failed() {
        assert!(matches!(
            MediaAsset::from_probe_json(Path::new("x.mp4"), b"not json"),
            Err(VidlocError::ProbeFailed(_))
        ));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), 30.0);
        assert!((parse_frame_rate("30000/1001") - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("25"), 25.0);
        assert_eq!(parse_frame_rate("0/0"), 0.0);
        assert_eq!(parse_frame_rate("1+1/2"), 0.0);
        assert_eq!(parse_frame_rate("__import__('os')"), 0.0);
    }
}
