// OpenAI speech-to-text implementation
// Uploads audio to an OpenAI-compatible `audio/transcriptions` endpoint.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::TranscriberConfig;
use crate::error::{Result, VidlocError};
use crate::subtitle::{self, CueSet};
use super::{TranscriberTrait, TranscriptSegment, validate_audio_file};

/// `verbose_json` response body
#[derive(Debug, Deserialize)]
pub struct VerboseTranscription {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub segments: Vec<VerboseSegment>,
}

#[derive(Debug, Deserialize)]
pub struct VerboseSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl From<VerboseSegment> for TranscriptSegment {
    fn from(segment: VerboseSegment) -> Self {
        Self {
            start: segment.start,
            end: segment.end,
            text: segment.text,
        }
    }
}

pub struct OpenAITranscriber {
    client: Client,
    config: TranscriberConfig,
    language: String,
}

impl OpenAITranscriber {
    pub fn new(config: TranscriberConfig, language: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            language: language.to_string(),
        })
    }

    fn api_key(&self) -> Result<String> {
        std::env::var(&self.config.api_key_env).map_err(|_| {
            VidlocError::TranscriptionFailed(format!(
                "API key not found in environment variable {}",
                self.config.api_key_env
            ))
        })
    }

    /// Upload the audio and return the raw response body.
    async fn request(&self, audio_path: &Path, form_fields: &[(&'static str, &'static str)]) -> Result<String> {
        let size = validate_audio_file(audio_path, self.config.max_upload_bytes).await?;
        let api_key = self.api_key()?;

        let bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.wav".to_string());

        let mut form = Form::new()
            .text("model", self.config.model.clone())
            .part("file", Part::bytes(bytes).file_name(file_name));
        for (key, value) in form_fields {
            form = form.text(*key, *value);
        }

        debug!("Uploading {} bytes to {}", size, self.config.endpoint);

        let response = self.client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VidlocError::TranscriptionFailed(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VidlocError::TranscriptionFailed(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(VidlocError::TranscriptionFailed(format!(
                "Speech-to-text API error {}: {}", status, body
            )));
        }

        Ok(body)
    }
}

#[async_trait]
impl TranscriberTrait for OpenAITranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<CueSet> {
        info!("Transcribing {} with {}", audio_path.display(), self.config.model);

        let srt = self.request(audio_path, &[("response_format", "srt")]).await?;
        let cue_set = subtitle::parse(&srt, &self.language)?;

        info!("Transcription produced {} cues", cue_set.len());
        Ok(cue_set)
    }

    async fn transcribe_detailed(&self, audio_path: &Path) -> Result<Vec<TranscriptSegment>> {
        info!("Transcribing {} with segment timestamps", audio_path.display());

        let body = self
            .request(
                audio_path,
                &[
                    ("response_format", "verbose_json"),
                    ("timestamp_granularities[]", "segment"),
                ],
            )
            .await?;

        let parsed: VerboseTranscription = serde_json::from_str(&body)
            .map_err(|e| VidlocError::TranscriptionFailed(format!("Failed to parse response: {}", e)))?;

        if let Some(language) = &parsed.language {
            debug!("Detected language: {}", language);
        }

        Ok(parsed.segments.into_iter().map(TranscriptSegment::from).collect())
    }
}
