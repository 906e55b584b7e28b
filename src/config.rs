use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, VidlocError};
use crate::media::SubtitleStyle;

fn default_fallback_max_chars() -> usize {
    500
}

fn default_max_parallel_branches() -> usize {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub transcriber: TranscriberConfig,
    pub translate: TranslateConfig,
    pub media: MediaConfig,
    #[serde(default)]
    pub style: SubtitleStyle,
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Speech-to-text endpoint (OpenAI-compatible `audio/transcriptions`)
    pub endpoint: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Upload ceiling of the speech-to-text service, in bytes
    pub max_upload_bytes: u64,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Primary translation endpoint (LibreTranslate `/translate`)
    pub primary_endpoint: String,
    /// Optional LibreTranslate API key
    #[serde(default)]
    pub primary_api_key: Option<String>,
    /// Request timeout for the primary service in seconds
    pub primary_timeout_secs: u64,
    /// Fallback translation endpoint (MyMemory `/get`)
    pub fallback_endpoint: String,
    /// Request timeout for the fallback service in seconds
    pub fallback_timeout_secs: u64,
    /// The fallback service rejects long queries; text is truncated to this many characters
    #[serde(default = "default_fallback_max_chars")]
    pub fallback_max_chars: usize,
    /// Whether to use the fallback service at all
    pub enable_fallback: bool,
    /// Delay between successive translation calls, in milliseconds
    pub pacing_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Extra ffmpeg encoder arguments for burn-in, e.g. `["-crf", "23", "-pix_fmt", "yuv420p"]`
    pub subtitle_options: Vec<String>,
    pub probe_timeout_secs: u64,
    pub extract_timeout_secs: u64,
    /// Burn-in is the slowest stage; long or high-resolution video can take close to this
    pub burn_timeout_secs: u64,
    pub thumbnail_timeout_secs: u64,
    pub compress_timeout_secs: u64,
    pub preview_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Language of the transcript produced by the speech-to-text stage
    pub base_language: String,
    /// Directory under which per-job scratch directories are created (system temp dir if unset)
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,
    /// Upper bound on language branches processed at once; 1 processes them one by one
    #[serde(default = "default_max_parallel_branches")]
    pub max_parallel_branches: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transcriber: TranscriberConfig {
                endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
                model: "whisper-1".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                max_upload_bytes: 25 * 1024 * 1024,
                timeout_secs: 600,
            },
            translate: TranslateConfig {
                primary_endpoint: "https://libretranslate.de/translate".to_string(),
                primary_api_key: None,
                primary_timeout_secs: 30,
                fallback_endpoint: "https://api.mymemory.translated.net/get".to_string(),
                fallback_timeout_secs: 15,
                fallback_max_chars: default_fallback_max_chars(),
                enable_fallback: true,
                pacing_ms: 100,
            },
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
                subtitle_options: Vec::new(),
                probe_timeout_secs: 30,
                extract_timeout_secs: 600,
                burn_timeout_secs: 3600,
                thumbnail_timeout_secs: 30,
                compress_timeout_secs: 1800,
                preview_timeout_secs: 300,
            },
            style: SubtitleStyle::default(),
            workflow: WorkflowConfig {
                base_language: "en".to_string(),
                workspace_root: None,
                max_parallel_branches: default_max_parallel_branches(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VidlocError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| VidlocError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VidlocError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| VidlocError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.workflow.max_parallel_branches == 0 {
            return Err(VidlocError::Config(
                "workflow.max_parallel_branches must be at least 1".to_string(),
            ));
        }
        if let Some(advanced) = &self.style.advanced {
            if !(0.0..=1.0).contains(&advanced.opacity) {
                return Err(VidlocError::Config(format!(
                    "style.advanced.opacity must be between 0.0 and 1.0, got {}",
                    advanced.opacity
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vidloc.toml");

        Config::default().save_to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();

        assert_eq!(loaded.media.burn_timeout_secs, 3600);
        assert_eq!(loaded.transcriber.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(loaded.workflow.base_language, "en");
        assert_eq!(loaded.style, SubtitleStyle::default());
    }

    #[test]
    fn test_zero_parallel_branches_is_rejected() {
        let mut config = Config::default();
        config.workflow.max_parallel_branches = 0;
        assert!(matches!(config.validate(), Err(VidlocError::Config(_))));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        assert!(matches!(
            Config::from_file("/definitely/not/here.toml"),
            Err(VidlocError::Config(_))
        ));
    }
}
