// Transcription adapter
//
// The speech-to-text engine is an external capability reached through the
// TranscriberTrait seam:
// - OpenAI: OpenAI-compatible `audio/transcriptions` HTTP endpoint
//
// To add another service, implement TranscriberTrait and extend the factory.

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::TranscriberConfig;
use crate::error::{Result, VidlocError};
use crate::subtitle::{Cue, CueSet, Timestamp};

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "flac", "ogg"];

/// A raw timed segment returned by the speech-to-text service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Main trait for transcription operations
#[async_trait]
pub trait TranscriberTrait: Send + Sync {
    /// Transcribe audio into a cue set in the service's subtitle format
    async fn transcribe(&self, audio_path: &Path) -> Result<CueSet>;

    /// Transcribe audio into raw timed segments
    async fn transcribe_detailed(&self, audio_path: &Path) -> Result<Vec<TranscriptSegment>>;
}

/// Convert segments 1:1 into cues with dense 1-based indices.
pub fn segments_to_cue_set(segments: &[TranscriptSegment], language: &str) -> CueSet {
    let cues = segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            Cue::new(
                (i + 1) as u32,
                Timestamp::from_seconds(segment.start),
                Timestamp::from_seconds(segment.end),
                segment.text.trim(),
            )
        })
        .collect();

    CueSet::new(language, cues)
}

/// Check that an audio file can be sent for transcription.
///
/// Returns the file size in bytes.
pub async fn validate_audio_file(audio_path: &Path, max_bytes: u64) -> Result<u64> {
    let metadata = tokio::fs::metadata(audio_path)
        .await
        .map_err(|_| VidlocError::NotFound(audio_path.to_path_buf()))?;

    let size = metadata.len();
    if size > max_bytes {
        return Err(VidlocError::InputTooLarge { size, limit: max_bytes });
    }

    let extension = audio_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        return Err(VidlocError::UnsupportedFormat(format!(
            "audio extension '.{}' is not accepted for transcription",
            extension
        )));
    }

    Ok(size)
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    /// Create the default transcriber implementation
    pub fn create_default(config: TranscriberConfig, language: &str) -> Result<Box<dyn TranscriberTrait>> {
        Ok(Box::new(openai::OpenAITranscriber::new(config, language)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_to_cue_set() {
        let segments = vec![
            TranscriptSegment { start: 1.0, end: 3.0, text: " Hello world ".to_string() },
            TranscriptSegment { start: 3.25, end: 5.5, text: "Second".to_string() },
        ];

        let set = segments_to_cue_set(&segments, "en");

        assert_eq!(set.language, "en");
        assert_eq!(set.cues.iter().map(|c| c.index).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(set.cues[0].text, "Hello world");
        assert_eq!(set.cues[1].start.as_millis(), 3_250);
        assert_eq!(set.cues[1].end.as_millis(), 5_500);
    }

    #[test]
    fn test_no_segments_gives_empty_set() {
        assert!(segments_to_cue_set(&[], "en").is_empty());
    }

    #[tokio::test]
    async fn test_validate_audio_file() {
        let dir = assert_fs::TempDir::new().unwrap();

        let wav = dir.path().join("speech.wav");
        std::fs::write(&wav, vec![0u8; 2048]).unwrap();
        assert_eq!(validate_audio_file(&wav, 4096).await.unwrap(), 2048);

        assert!(matches!(
            validate_audio_file(&wav, 1024).await,
            Err(VidlocError::InputTooLarge { size: 2048, limit: 1024 })
        ));

        let txt = dir.path().join("speech.txt");
        std::fs::write(&txt, b"abc").unwrap();
        assert!(matches!(validate_audio_file(&txt, 4096).await, Err(VidlocError::UnsupportedFormat(_))));

        assert!(matches!(
            validate_audio_file(&dir.path().join("nope.wav"), 4096).await,
            Err(VidlocError::NotFound(_))
        ));
    }
}
