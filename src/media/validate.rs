use serde::Serialize;
use std::path::Path;

use super::{MediaAsset, MediaProcessorTrait};

pub const MIN_VIDEO_BYTES: u64 = 100 * 1024;
pub const LARGE_VIDEO_BYTES: u64 = 500 * 1024 * 1024;
pub const LONG_VIDEO_SECS: f64 = 3600.0;
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "flv", "m4v"];

/// Outcome of a pre-flight check on an uploaded video.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn finish(mut self) -> Self {
        self.valid = self.errors.is_empty();
        self
    }
}

pub fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// File-level checks: existence, size bounds and extension.
///
/// Returns `false` when the file is unusable and probing should be skipped.
fn check_file(path: &Path, report: &mut ValidationReport) -> bool {
    let size = match std::fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(_) => {
            report.errors.push("Video file does not exist".to_string());
            return false;
        }
    };

    let size_mb = size as f64 / (1024.0 * 1024.0);
    if size > LARGE_VIDEO_BYTES {
        report.warnings.push(format!("Large file size: {:.1}MB", size_mb));
    } else if size < MIN_VIDEO_BYTES {
        report.errors.push("File too small to be a valid video".to_string());
        return false;
    }

    if !has_video_extension(path) {
        let ext = path.extension().map(|e| e.to_string_lossy().to_string()).unwrap_or_default();
        report.warnings.push(format!("Uncommon video format: .{}", ext));
    }

    true
}

/// Metadata checks on a probed asset.
pub fn assess_metadata(asset: &MediaAsset, report: &mut ValidationReport) {
    if asset.duration <= 0.0 {
        report.errors.push("Invalid or zero duration".to_string());
    } else if asset.duration > LONG_VIDEO_SECS {
        report.warnings.push(format!("Long video: {:.1} minutes", asset.duration / 60.0));
    }

    if asset.width == 0 || asset.height == 0 {
        report.errors.push("Invalid video resolution".to_string());
    }

    if !asset.has_audio() {
        report.errors.push("No audio track found - required for transcription".to_string());
    }
}

/// Pre-flight check combining file bounds with probed metadata.
pub async fn validate_video(media: &dyn MediaProcessorTrait, path: &Path) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !check_file(path, &mut report) {
        return report.finish();
    }

    match media.probe(path).await {
        Ok(asset) => assess_metadata(&asset, &mut report),
        Err(e) => report.errors.push(format!("Cannot read video file: {}", e)),
    }

    report.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::AudioStreamInfo;
    use std::path::PathBuf;

    fn asset(duration: f64, width: u32, height: u32, audio: bool) -> MediaAsset {
        MediaAsset {
            path: PathBuf::from("clip.mp4"),
            filename: "clip.mp4".to_string(),
            size_bytes: 1_000_000,
            duration,
            width,
            height,
            fps: 25.0,
            format_name: "mp4".to_string(),
            video_codec: Some("h264".to_string()),
            pixel_format: None,
            bit_rate: 0,
            audio: audio.then(|| AudioStreamInfo { codec: "aac".to_string(), sample_rate: 44_100, channels: 2 }),
        }
    }

    #[test]
    fn test_good_metadata_has_no_findings() {
        let mut report = ValidationReport::default();
        assess_metadata(&asset(10.0, 1280, 720, true), &mut report);
        let report = report.finish();

        assert!(report.valid);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_metadata_hard_errors() {
        let mut report = ValidationReport::default();
        assess_metadata(&asset(0.0, 0, 720, false), &mut report);
        let report = report.finish();

        assert!(!report.valid);
        assert_eq!(report.errors.len(), 3);
    }

    #[test]
    fn test_long_video_is_only_a_warning() {
        let mut report = ValidationReport::default();
        assess_metadata(&asset(7200.0, 1280, 720, true), &mut report);
        let report = report.finish();

        assert!(report.valid);
        assert_eq!(report.warnings, vec!["Long video: 120.0 minutes".to_string()]);
    }

    #[test]
    fn test_file_checks() {
        let dir = assert_fs::TempDir::new().unwrap();

        let mut report = ValidationReport::default();
        assert!(!check_file(&dir.path().join("missing.mp4"), &mut report));
        assert_eq!(report.errors, vec!["Video file does not exist".to_string()]);

        let tiny = dir.path().join("tiny.mp4");
        std::fs::write(&tiny, vec![0u8; 1024]).unwrap();
        let mut report = ValidationReport::default();
        assert!(!check_file(&tiny, &mut report));
        assert_eq!(report.errors, vec!["File too small to be a valid video".to_string()]);

        let odd = dir.path().join("clip.xyz");
        std::fs::write(&odd, vec![0u8; 200 * 1024]).unwrap();
        let mut report = ValidationReport::default();
        assert!(check_file(&odd, &mut report));
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings, vec!["Uncommon video format: .xyz".to_string()]);
    }
}
