//! Per-language artifact bookkeeping and the JSON processing summary.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::job::Stage;

pub const SUMMARY_FILENAME: &str = "processing_summary.json";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A file produced by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub filename: String,
    pub size_bytes: u64,
}

impl Artifact {
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let size_bytes = tokio::fs::metadata(path).await?.len();

        Ok(Self {
            path: path.to_path_buf(),
            filename: file_name(path),
            size_bytes,
        })
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / BYTES_PER_MB
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    Produced(Artifact),
    Failed { stage: Stage, reason: String },
}

impl ArtifactOutcome {
    pub fn failed(stage: Stage, reason: impl Into<String>) -> Self {
        Self::Failed {
            stage,
            reason: reason.into(),
        }
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            Self::Produced(artifact) => Some(artifact),
            Self::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub created_at: DateTime<Local>,
    pub source: PathBuf,
    pub target_languages: Vec<String>,
    /// Keyed by language code, or `original` for the untranslated transcript
    pub subtitles: BTreeMap<String, ArtifactOutcome>,
    pub videos: BTreeMap<String, ArtifactOutcome>,
}

impl Manifest {
    pub fn new(source: &Path, target_languages: &[String]) -> Self {
        Self {
            created_at: Local::now(),
            source: source.to_path_buf(),
            target_languages: target_languages.to_vec(),
            subtitles: BTreeMap::new(),
            videos: BTreeMap::new(),
        }
    }

    pub fn record_subtitle(&mut self, language: &str, outcome: ArtifactOutcome) {
        self.subtitles.insert(language.to_string(), outcome);
    }

    pub fn record_video(&mut self, language: &str, outcome: ArtifactOutcome) {
        self.videos.insert(language.to_string(), outcome);
    }

    /// Mark both artifacts of a language as failed
    pub fn record_branch_failure(&mut self, language: &str, stage: Stage, reason: &str) {
        self.record_subtitle(language, ArtifactOutcome::failed(stage, reason));
        self.record_video(language, ArtifactOutcome::failed(stage, reason));
    }

    pub fn produced_videos(&self) -> impl Iterator<Item = (&String, &Artifact)> {
        produced(&self.videos)
    }

    pub fn produced_subtitles(&self) -> impl Iterator<Item = (&String, &Artifact)> {
        produced(&self.subtitles)
    }

    pub fn failures(&self) -> Vec<FailureSummary> {
        let subtitles = self.subtitles.iter().map(|entry| ("subtitles", entry));
        let videos = self.videos.iter().map(|entry| ("videos", entry));

        subtitles
            .chain(videos)
            .filter_map(|(kind, (language, outcome))| match outcome {
                ArtifactOutcome::Failed { stage, reason } => Some(FailureSummary {
                    kind: kind.to_string(),
                    language: language.clone(),
                    stage: *stage,
                    reason: reason.clone(),
                }),
                ArtifactOutcome::Produced(_) => None,
            })
            .collect()
    }

    /// Build the JSON summary with artifact paths relative to `base_dir`.
    pub fn summary(&self, source_size_bytes: u64, base_dir: &Path) -> ProcessingSummary {
        let subtitles = summarize(&self.subtitles, base_dir);
        let videos = summarize(&self.videos, base_dir);

        let total_bytes: u64 = self
            .produced_subtitles()
            .chain(self.produced_videos())
            .map(|(_, artifact)| artifact.size_bytes)
            .sum();

        ProcessingSummary {
            timestamp: self.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            original_video: FileSummary::new(&self.source, source_size_bytes, base_dir),
            target_languages: self.target_languages.clone(),
            total_files_created: subtitles.len() + videos.len(),
            total_output_size_mb: round_mb(total_bytes as f64 / BYTES_PER_MB),
            output_files: OutputFiles { subtitles, videos },
            failures: self.failures(),
        }
    }

    /// Write `processing_summary.json` into `dir`.
    pub async fn save_summary(&self, source_size_bytes: u64, dir: &Path) -> Result<PathBuf> {
        let summary = self.summary(source_size_bytes, dir);
        let path = dir.join(SUMMARY_FILENAME);

        let json = serde_json::to_string_pretty(&summary)?;
        tokio::fs::write(&path, json).await?;

        info!("Processing summary saved: {}", path.display());
        Ok(path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    pub path: PathBuf,
    pub filename: String,
    pub size_mb: f64,
}

impl FileSummary {
    fn new(path: &Path, size_bytes: u64, base_dir: &Path) -> Self {
        Self {
            path: pathdiff::diff_paths(path, base_dir).unwrap_or_else(|| path.to_path_buf()),
            filename: file_name(path),
            size_mb: round_mb(size_bytes as f64 / BYTES_PER_MB),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFiles {
    pub subtitles: BTreeMap<String, FileSummary>,
    pub videos: BTreeMap<String, FileSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureSummary {
    pub kind: String,
    pub language: String,
    pub stage: Stage,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSummary {
    pub timestamp: String,
    pub original_video: FileSummary,
    pub target_languages: Vec<String>,
    pub output_files: OutputFiles,
    pub failures: Vec<FailureSummary>,
    pub total_files_created: usize,
    pub total_output_size_mb: f64,
}

fn produced(entries: &BTreeMap<String, ArtifactOutcome>) -> impl Iterator<Item = (&String, &Artifact)> {
    entries
        .iter()
        .filter_map(|(language, outcome)| outcome.artifact().map(|artifact| (language, artifact)))
}

fn summarize(entries: &BTreeMap<String, ArtifactOutcome>, base_dir: &Path) -> BTreeMap<String, FileSummary> {
    produced(entries)
        .map(|(language, artifact)| {
            (language.clone(), FileSummary::new(&artifact.path, artifact.size_bytes, base_dir))
        })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn round_mb(mb: f64) -> f64 {
    (mb * 100.0).round() / 100.0
}
