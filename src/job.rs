use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, VidlocError};
use crate::manifest::Manifest;
use crate::media::{MediaAsset, SubtitleStyle};
use crate::workspace::Workspace;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Probe,
    ExtractAudio,
    Transcribe,
    Translate,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Probe => "probe",
            Self::ExtractAudio => "extract_audio",
            Self::Transcribe => "transcribe",
            Self::Translate => "translate",
            Self::Render => "render",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Created,
    AudioExtracted,
    Transcribed,
    Translating,
    Rendering,
    Completed,
    Failed { stage: Stage, reason: String },
}

impl JobState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AudioExtracted => "audio_extracted",
            Self::Transcribed => "transcribed",
            Self::Translating => "translating",
            Self::Rendering => "rendering",
            Self::Completed => "completed",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }

    /// Forward moves along the pipeline, or `Failed` from any non-terminal state.
    pub fn can_transition_to(&self, next: &JobState) -> bool {
        use JobState::*;

        match (self, next) {
            (current, Failed { .. }) => !current.is_terminal(),
            (Created, AudioExtracted)
            | (AudioExtracted, Transcribed)
            | (Transcribed, Translating)
            | (Translating, Rendering)
            | (Rendering, Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { stage, reason } => write!(f, "failed at {}: {}", stage, reason),
            other => f.write_str(other.name()),
        }
    }
}

/// One localization run over a single source video.
#[derive(Debug)]
pub struct Job {
    pub id: Uuid,
    pub source: PathBuf,
    /// Filled in by the probe stage
    pub asset: Option<MediaAsset>,
    pub target_languages: Vec<String>,
    pub style: SubtitleStyle,
    pub workspace: Workspace,
    pub manifest: Manifest,
    state: JobState,
}

impl Job {
    pub fn new<P: AsRef<Path>>(
        source: P,
        target_languages: Vec<String>,
        style: SubtitleStyle,
        workspace: Workspace,
    ) -> Self {
        let source = source.as_ref().to_path_buf();
        let manifest = Manifest::new(&source, &target_languages);

        Self {
            id: Uuid::new_v4(),
            source,
            asset: None,
            target_languages,
            style,
            workspace,
            manifest,
            state: JobState::Created,
        }
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn transition(&mut self, next: JobState) -> Result<()> {
        if !self.state.can_transition_to(&next) {
            return Err(VidlocError::InvalidTransition {
                from: self.state.name().to_string(),
                to: next.name().to_string(),
            });
        }

        debug!("Job {}: {} -> {}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }

    pub fn fail(&mut self, stage: Stage, reason: impl Into<String>) -> Result<()> {
        let reason = reason.into();
        warn!("Job {} failed at {}: {}", self.id, stage, reason);
        self.transition(JobState::Failed { stage, reason })
    }

    /// At least one subtitled video was produced.
    pub fn is_successful(&self) -> bool {
        self.manifest.produced_videos().next().is_some()
    }

    /// Stem of the source file name, used to name every artifact.
    pub fn source_stem(&self) -> String {
        self.source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string())
    }
}
