use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Result, VidlocError};
use crate::job::{Job, JobState, Stage};
use crate::language;
use crate::manifest::{Artifact, ArtifactOutcome};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait, SubtitleStyle, has_video_extension};
use crate::subtitle::{CueSet, read_srt, write_srt};
use crate::transcribe::{TranscriberFactory, TranscriberTrait, segments_to_cue_set};
use crate::translate::{Translator, TranslatorFactory};
use crate::workspace::{Workspace, safe_filename};

/// Manifest key of the untranslated transcript branch
pub const ORIGINAL_BRANCH: &str = "original";

/// Manifest key prefix for target tags that name no supported language
pub const UNSUPPORTED_PREFIX: &str = "unsupported:";

const CANCELLED: &str = "cancelled";
const ABORTED: &str = "branch task aborted";

/// Set to `true` to stop a running job before its next stage or branch.
pub type CancelSignal = watch::Receiver<bool>;

/// Outcome of processing a directory of videos.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

pub struct Workflow {
    config: Config,
    media: Arc<dyn MediaProcessorTrait>,
    transcriber: Arc<dyn TranscriberTrait>,
    translator: Arc<Translator>,
    progress: Option<ProgressBar>,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let media: Arc<dyn MediaProcessorTrait> =
            Arc::from(MediaProcessorFactory::create_processor(config.media.clone()));
        let transcriber: Arc<dyn TranscriberTrait> = Arc::from(TranscriberFactory::create_default(
            config.transcriber.clone(),
            &config.workflow.base_language,
        )?);
        let translator = Arc::new(TranslatorFactory::create_translator(&config.translate)?);

        Ok(Self::with_components(config, media, transcriber, translator))
    }

    /// Assemble a workflow from explicit collaborators
    pub fn with_components(
        config: Config,
        media: Arc<dyn MediaProcessorTrait>,
        transcriber: Arc<dyn TranscriberTrait>,
        translator: Arc<Translator>,
    ) -> Self {
        Self {
            config,
            media,
            transcriber,
            translator,
            progress: None,
        }
    }

    /// Report stage changes on a progress spinner
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn media(&self) -> &dyn MediaProcessorTrait {
        self.media.as_ref()
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Fail early when ffmpeg or ffprobe cannot be executed
    pub async fn check_dependencies(&self) -> Result<()> {
        let status = self.media.check_availability().await;
        if !status.all_available() {
            return Err(VidlocError::Media(format!(
                "media tools unavailable (ffmpeg: {}, ffprobe: {})",
                status.ffmpeg, status.ffprobe
            )));
        }
        Ok(())
    }

    /// Create a job with its own scratch directory
    pub async fn create_job<P: AsRef<Path>>(
        &self,
        source: P,
        target_languages: Vec<String>,
        style: SubtitleStyle,
    ) -> Result<Job> {
        let workspace = Workspace::create(self.config.workflow.workspace_root.as_deref()).await?;
        Ok(Job::new(source, target_languages, style, workspace))
    }

    /// Drive a job through every stage.
    ///
    /// Probe, extraction and transcription failures abort the job and are
    /// returned. Per-language failures are recorded in the manifest and the
    /// job still completes.
    pub async fn run(&self, job: &mut Job, cancel: Option<CancelSignal>) -> Result<()> {
        let cancel = cancel.as_ref();
        let branches = branch_keys(&job.target_languages);
        let stem = job.source_stem();
        let work_dir = job.workspace.path().to_path_buf();

        info!("Starting job {} for {} ({} target languages)", job.id, job.source.display(), branches.len());

        // Step 1: Probe
        checkpoint(job, Stage::Probe, &branches, cancel)?;
        self.report("Probing video");
        let asset = self.media.probe(&job.source).await.map_err(|e| fatal(job, Stage::Probe, e))?;
        info!("Video: {:.1}s, {}x{}, audio: {}", asset.duration, asset.width, asset.height, asset.has_audio());
        job.asset = Some(asset);

        // Step 2: Extract audio
        checkpoint(job, Stage::ExtractAudio, &branches, cancel)?;
        self.report("Extracting audio");
        let audio_path = self
            .media
            .extract_audio(&job.source, &work_dir)
            .await
            .map_err(|e| fatal(job, Stage::ExtractAudio, e))?;
        job.transition(JobState::AudioExtracted)?;

        // Step 3: Transcribe
        checkpoint(job, Stage::Transcribe, &branches, cancel)?;
        self.report("Transcribing audio");
        let base = self
            .transcriber
            .transcribe(&audio_path)
            .await
            .and_then(|cue_set| cue_set.ensure_not_empty().map(|_| cue_set))
            .map_err(|e| fatal(job, Stage::Transcribe, e))?;
        info!("Transcription produced {} cues", base.len());

        let original_srt = work_dir.join(format!("{}_{}.srt", stem, ORIGINAL_BRANCH));
        match write_artifact(&base, &original_srt).await {
            Ok(artifact) => job.manifest.record_subtitle(ORIGINAL_BRANCH, ArtifactOutcome::Produced(artifact)),
            Err(e) => job.manifest.record_branch_failure(ORIGINAL_BRANCH, Stage::Transcribe, &e.to_string()),
        }
        job.transition(JobState::Transcribed)?;

        // Step 4: Translate every target language
        job.transition(JobState::Translating)?;
        self.report(&format!("Translating into {} languages", branches.len()));
        let cancelled = self.translate_phase(job, Arc::new(base), &branches, &stem, cancel).await;
        if cancelled {
            for language in pending_renders(job) {
                job.manifest.record_video(&language, ArtifactOutcome::failed(Stage::Render, CANCELLED));
            }
            job.fail(Stage::Translate, CANCELLED)?;
            return Err(VidlocError::Cancelled);
        }

        // Step 5: Burn subtitles for the original and each translation
        job.transition(JobState::Rendering)?;
        self.report("Burning subtitles");
        if self.render_phase(job, &stem, cancel).await {
            job.fail(Stage::Render, CANCELLED)?;
            return Err(VidlocError::Cancelled);
        }

        job.transition(JobState::Completed)?;
        let produced = job.manifest.produced_videos().count();
        if job.is_successful() {
            info!("Job {} completed: {} videos produced", job.id, produced);
        } else {
            warn!("Job {} completed without producing any video", job.id);
        }
        Ok(())
    }

    async fn translate_phase(
        &self,
        job: &mut Job,
        base: Arc<CueSet>,
        branches: &[(String, String)],
        stem: &str,
        cancel: Option<&CancelSignal>,
    ) -> bool {
        let semaphore = Arc::new(Semaphore::new(self.config.workflow.max_parallel_branches.max(1)));
        let mut tasks = JoinSet::new();

        for (key, tag) in branches {
            let branch = TranslateBranch {
                translator: self.translator.clone(),
                base: base.clone(),
                target: tag.clone(),
                output_dir: job.workspace.path().to_path_buf(),
                stem: stem.to_string(),
            };
            let semaphore = semaphore.clone();
            let cancel = cancel.cloned();
            let key = key.clone();

            tasks.spawn(async move {
                let outcome = branch.run(semaphore, cancel).await;
                (key, outcome)
            });
        }

        let mut cancelled = false;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, Ok(artifact))) => {
                    info!("Subtitles ready for {}: {}", key, artifact.path.display());
                    job.manifest.record_subtitle(&key, ArtifactOutcome::Produced(artifact));
                }
                Ok((key, Err(VidlocError::Cancelled))) => {
                    cancelled = true;
                    job.manifest.record_branch_failure(&key, Stage::Translate, CANCELLED);
                }
                Ok((key, Err(e))) => {
                    warn!("Translation to {} failed: {}", key, e);
                    job.manifest.record_branch_failure(&key, Stage::Translate, &e.to_string());
                }
                Err(e) => warn!("Translation task failed: {}", e),
            }
        }

        for (key, _) in branches {
            if !job.manifest.subtitles.contains_key(key) {
                job.manifest.record_branch_failure(key, Stage::Translate, ABORTED);
            }
        }

        cancelled || is_cancelled(cancel)
    }

    async fn render_phase(&self, job: &mut Job, stem: &str, cancel: Option<&CancelSignal>) -> bool {
        let pending: Vec<(String, PathBuf)> = job
            .manifest
            .produced_subtitles()
            .filter(|(key, _)| !job.manifest.videos.contains_key(*key))
            .map(|(key, artifact)| (key.clone(), artifact.path.clone()))
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.config.workflow.max_parallel_branches.max(1)));
        let source = Arc::new(job.source.clone());
        let style = Arc::new(job.style.clone());
        let mut tasks = JoinSet::new();

        for (key, subtitle_path) in &pending {
            let branch = RenderBranch {
                media: self.media.clone(),
                source: source.clone(),
                subtitle_path: subtitle_path.clone(),
                output_dir: job.workspace.path().to_path_buf(),
                filename: format!("{}_{}.mp4", stem, key),
                style: style.clone(),
            };
            let semaphore = semaphore.clone();
            let cancel = cancel.cloned();
            let key = key.clone();

            tasks.spawn(async move {
                let outcome = branch.run(semaphore, cancel).await;
                (key, outcome)
            });
        }

        let mut cancelled = false;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, Ok(artifact))) => {
                    info!("Video ready for {}: {}", key, artifact.path.display());
                    job.manifest.record_video(&key, ArtifactOutcome::Produced(artifact));
                }
                Ok((key, Err(VidlocError::Cancelled))) => {
                    cancelled = true;
                    job.manifest.record_video(&key, ArtifactOutcome::failed(Stage::Render, CANCELLED));
                }
                Ok((key, Err(e))) => {
                    warn!("Burning subtitles for {} failed: {}", key, e);
                    job.manifest.record_video(&key, ArtifactOutcome::failed(Stage::Render, e.to_string()));
                }
                Err(e) => warn!("Render task failed: {}", e),
            }
        }

        for (key, _) in &pending {
            if !job.manifest.videos.contains_key(key) {
                job.manifest.record_video(key, ArtifactOutcome::failed(Stage::Render, ABORTED));
            }
        }

        cancelled
    }

    /// Create, run and optionally export a job for one video.
    ///
    /// Stage failures are logged and left in the job state; the job is
    /// returned either way so its workspace can be inspected or cleaned up.
    /// Jobs that stopped before transcription finished export nothing.
    pub async fn process_video<P: AsRef<Path>>(
        &self,
        source: P,
        target_languages: &[String],
        style: &SubtitleStyle,
        output_dir: Option<&Path>,
        cancel: Option<CancelSignal>,
    ) -> Result<Job> {
        let source = source.as_ref();
        if !source.is_file() {
            return Err(VidlocError::NotFound(source.to_path_buf()));
        }

        let mut job = self.create_job(source, target_languages.to_vec(), style.clone()).await?;
        if let Err(e) = self.run(&mut job, cancel).await {
            warn!("Job {} did not complete: {}", job.id, e);
        }

        match (output_dir, job.state()) {
            (Some(_), JobState::Failed { stage: Stage::Probe | Stage::ExtractAudio | Stage::Transcribe, .. }) => {
                info!("Nothing to export for job {}: no transcript was produced", job.id);
            }
            (Some(dir), _) => {
                self.export(&job, dir).await?;
            }
            (None, _) => {}
        }

        Ok(job)
    }

    /// Process every video below `input_dir`, one job at a time.
    ///
    /// Results for each video go to `output_dir/<stem>` and the scratch
    /// directory is removed afterwards.
    pub async fn process_directory<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_dir: P,
        target_languages: &[String],
        style: &SubtitleStyle,
        output_dir: Q,
    ) -> Result<BatchReport> {
        let input_dir = input_dir.as_ref();
        let output_dir = output_dir.as_ref();
        info!("Processing directory: {}", input_dir.display());

        if !input_dir.is_dir() {
            return Err(VidlocError::Config("Input path is not a directory".to_string()));
        }

        let mut video_files: Vec<PathBuf> = WalkDir::new(input_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && has_video_extension(e.path()))
            .map(|e| e.into_path())
            .collect();
        video_files.sort();

        info!("Found {} video files to process", video_files.len());

        let mut report = BatchReport::default();
        for video_path in video_files {
            let stem = video_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let destination = output_dir.join(safe_filename(&stem));

            match self
                .process_video(&video_path, target_languages, style, Some(&destination), None)
                .await
            {
                Ok(job) => {
                    let successful = job.is_successful();
                    let state = job.state().to_string();
                    if let Err(e) = job.workspace.cleanup().await {
                        warn!("Failed to remove workspace: {}", e);
                    }

                    if successful {
                        info!("Successfully processed: {}", video_path.display());
                        report.succeeded.push(video_path);
                    } else {
                        warn!("Failed to process {}: {}", video_path.display(), state);
                        report.failed.push((video_path, state));
                    }
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", video_path.display(), e);
                    report.failed.push((video_path, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Copy produced artifacts into `dir` and write the processing summary there.
    pub async fn export(&self, job: &Job, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).await?;

        let mut exported = job.manifest.clone();
        for outcomes in [&mut exported.subtitles, &mut exported.videos] {
            for outcome in outcomes.values_mut() {
                if let ArtifactOutcome::Produced(artifact) = outcome {
                    let destination = dir.join(&artifact.filename);
                    fs::copy(&artifact.path, &destination).await?;
                    artifact.path = destination;
                }
            }
        }

        let source_size = job.asset.as_ref().map(|a| a.size_bytes).unwrap_or(0);
        exported.save_summary(source_size, dir).await
    }

    /// Transcribe an audio file straight to SRT
    pub async fn transcribe_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        audio_path: P,
        output_path: Q,
        detailed: bool,
    ) -> Result<CueSet> {
        let audio_path = audio_path.as_ref();

        let cue_set = if detailed {
            let segments = self.transcriber.transcribe_detailed(audio_path).await?;
            segments_to_cue_set(&segments, &self.config.workflow.base_language)
        } else {
            self.transcriber.transcribe(audio_path).await?
        };

        write_srt(&cue_set, output_path).await?;
        Ok(cue_set)
    }

    /// Translate an SRT file into `<stem>_<code>.srt` files under `output_dir`
    pub async fn translate_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        srt_path: P,
        target_languages: &[String],
        output_dir: Q,
    ) -> Result<BTreeMap<String, PathBuf>> {
        let srt_path = srt_path.as_ref();
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir).await?;

        let cue_set = read_srt(srt_path, &self.config.workflow.base_language).await?;
        let stem = srt_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "subtitles".to_string());

        let mut written = BTreeMap::new();
        for (code, translated) in self.translator.batch_translate(&cue_set, target_languages).await {
            let path = output_dir.join(format!("{}_{}.srt", stem, code));
            match write_srt(&translated, &path).await {
                Ok(()) => {
                    written.insert(code, path);
                }
                Err(e) => warn!("Failed to write {}: {}", path.display(), e),
            }
        }

        Ok(written)
    }

    fn report(&self, message: &str) {
        info!("{}", message);
        if let Some(progress) = &self.progress {
            progress.set_message(message.to_string());
        }
    }
}

struct TranslateBranch {
    translator: Arc<Translator>,
    base: Arc<CueSet>,
    target: String,
    output_dir: PathBuf,
    stem: String,
}

impl TranslateBranch {
    async fn run(self, semaphore: Arc<Semaphore>, cancel: Option<CancelSignal>) -> Result<Artifact> {
        let _permit = semaphore.acquire_owned().await.map_err(|_| VidlocError::Cancelled)?;
        if is_cancelled(cancel.as_ref()) {
            return Err(VidlocError::Cancelled);
        }

        let translated = self.translator.translate_cue_set(&self.base, &self.target).await?;
        let path = self.output_dir.join(format!("{}_{}.srt", self.stem, translated.language));
        write_artifact(&translated, &path).await
    }
}

struct RenderBranch {
    media: Arc<dyn MediaProcessorTrait>,
    source: Arc<PathBuf>,
    subtitle_path: PathBuf,
    output_dir: PathBuf,
    filename: String,
    style: Arc<SubtitleStyle>,
}

impl RenderBranch {
    async fn run(self, semaphore: Arc<Semaphore>, cancel: Option<CancelSignal>) -> Result<Artifact> {
        let _permit = semaphore.acquire_owned().await.map_err(|_| VidlocError::Cancelled)?;
        if is_cancelled(cancel.as_ref()) {
            return Err(VidlocError::Cancelled);
        }

        let path = self
            .media
            .burn_subtitles(&self.source, &self.subtitle_path, &self.output_dir, &self.filename, &self.style)
            .await?;
        Artifact::from_path(path).await
    }
}

/// Unique (manifest key, requested tag) pairs.
///
/// Supported tags are keyed by code. Unknown tags are keyed `unsupported:<tag>`
/// so they never share an entry with a language or with the original rendition.
fn branch_keys(target_languages: &[String]) -> Vec<(String, String)> {
    let mut branches: Vec<(String, String)> = Vec::new();

    for tag in target_languages {
        let key = language::resolve(tag)
            .map(|l| l.code.to_string())
            .unwrap_or_else(|_| format!("{}{}", UNSUPPORTED_PREFIX, tag.trim()));
        if !branches.iter().any(|(existing, _)| *existing == key) {
            branches.push((key, tag.clone()));
        }
    }

    branches
}

fn is_cancelled(cancel: Option<&CancelSignal>) -> bool {
    cancel.map(|rx| *rx.borrow()).unwrap_or(false)
}

/// Stop before `stage` when cancellation was requested; every branch is marked cancelled.
fn checkpoint(job: &mut Job, stage: Stage, branches: &[(String, String)], cancel: Option<&CancelSignal>) -> Result<()> {
    if !is_cancelled(cancel) {
        return Ok(());
    }

    job.manifest.record_branch_failure(ORIGINAL_BRANCH, stage, CANCELLED);
    for (key, _) in branches {
        job.manifest.record_branch_failure(key, stage, CANCELLED);
    }
    job.fail(stage, CANCELLED)?;
    Err(VidlocError::Cancelled)
}

/// Record a job-fatal error and hand it back to the caller.
fn fatal(job: &mut Job, stage: Stage, error: VidlocError) -> VidlocError {
    if let Err(e) = job.fail(stage, error.to_string()) {
        warn!("Could not record failure for job {}: {}", job.id, e);
    }
    error
}

/// Languages whose subtitles exist but whose video has not been attempted.
fn pending_renders(job: &Job) -> Vec<String> {
    job.manifest
        .produced_subtitles()
        .filter(|(key, _)| !job.manifest.videos.contains_key(*key))
        .map(|(key, _)| key.clone())
        .collect()
}

async fn write_artifact(cue_set: &CueSet, path: &Path) -> Result<Artifact> {
    write_srt(cue_set, path).await?;
    Artifact::from_path(path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_keys_resolve_and_dedupe() {
        let tags = vec![
            "Spanish".to_string(),
            "es".to_string(),
            "fr".to_string(),
            "Klingon".to_string(),
        ];

        assert_eq!(
            branch_keys(&tags),
            vec![
                ("es".to_string(), "Spanish".to_string()),
                ("fr".to_string(), "fr".to_string()),
                ("unsupported:Klingon".to_string(), "Klingon".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_tag_never_takes_the_original_key() {
        let tags = vec!["original".to_string(), "Original".to_string(), "es".to_string()];
        let keys: Vec<String> = branch_keys(&tags).into_iter().map(|(key, _)| key).collect();

        assert_eq!(keys, vec!["unsupported:original", "unsupported:Original", "es"]);
        assert!(!keys.iter().any(|key| key == ORIGINAL_BRANCH));
    }

    #[test]
    fn test_cancel_signal() {
        assert!(!is_cancelled(None));

        let (tx, rx) = watch::channel(false);
        assert!(!is_cancelled(Some(&rx)));
        tx.send(true).unwrap();
        assert!(is_cancelled(Some(&rx)));
    }
}
