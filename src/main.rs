//! vidloc - video localization pipeline
//!
//! Entry point for the command-line front end: transcribe a video's speech,
//! translate the subtitles and burn one rendition per language with ffmpeg.

use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{Level, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use vidloc::cli::{Args, Commands};
use vidloc::config::Config;
use vidloc::estimate::ProcessingEstimate;
use vidloc::job::Job;
use vidloc::language::{SUPPORTED_LANGUAGES, parse_language_list};
use vidloc::manifest::ArtifactOutcome;
use vidloc::media::{
    CompressionQuality, FfmpegProcessor, MediaProcessorFactory, MediaProcessorTrait, validate_video,
};
use vidloc::workflow::{CancelSignal, Workflow};
use vidloc::workspace::{WORKSPACE_PREFIX, Workspace};

const DEFAULT_CONFIG_FILE: &str = "vidloc.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    let _log_guard = setup_logging(args.verbose)?;
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Commands::Process { input, target_langs, output_dir, cleanup, style } => {
            info!("Processing video file: {}", input.display());

            let target_languages = parse_language_list(&target_langs);
            let style = style.apply(&config.style);
            let progress = spinner();

            let workflow = Workflow::new(config)?.with_progress(progress.clone());
            workflow.check_dependencies().await?;

            let job = workflow
                .process_video(&input, &target_languages, &style, output_dir.as_deref(), Some(cancel_on_ctrl_c()))
                .await?;
            progress.finish_and_clear();

            print_job_report(&job);
            let successful = job.is_successful();
            if cleanup {
                job.workspace.cleanup().await?;
            } else {
                println!("Scratch directory: {}", job.workspace.path().display());
            }

            if !successful {
                bail!("no subtitled video was produced for {}", input.display());
            }
        }
        Commands::Batch { input_dir, target_langs, output_dir, style } => {
            info!("Processing directory: {}", input_dir.display());

            let target_languages = parse_language_list(&target_langs);
            let style = style.apply(&config.style);
            let progress = spinner();

            let workflow = Workflow::new(config)?.with_progress(progress.clone());
            workflow.check_dependencies().await?;

            let report = workflow
                .process_directory(&input_dir, &target_languages, &style, &output_dir)
                .await?;
            progress.finish_and_clear();

            println!("Processed {} videos, {} failed", report.succeeded.len(), report.failed.len());
            for (path, reason) in &report.failed {
                println!("  {}: {}", path.display(), reason);
            }
        }
        Commands::Probe { input, languages } => {
            let media = MediaProcessorFactory::create_processor(config.media.clone());
            let asset = media.probe(&input).await?;
            println!("{}", serde_json::to_string_pretty(&asset)?);

            let estimate = ProcessingEstimate::new(asset.duration, languages);
            println!(
                "Estimated processing time for {} language(s): {}",
                languages,
                estimate.formatted_total()
            );
        }
        Commands::Validate { input } => {
            let media = MediaProcessorFactory::create_processor(config.media.clone());
            let report = validate_video(media.as_ref(), &input).await;

            for error in &report.errors {
                println!("error: {}", error);
            }
            for warning in &report.warnings {
                println!("warning: {}", warning);
            }

            if !report.valid {
                bail!("{} is not usable for localization", input.display());
            }
            println!("{} is valid", input.display());
        }
        Commands::Extract { input, output_dir } => {
            info!("Extracting audio from: {}", input.display());
            tokio::fs::create_dir_all(&output_dir).await?;

            let media = MediaProcessorFactory::create_processor(config.media.clone());
            let audio_path = media.extract_audio(&input, &output_dir).await?;
            println!("{}", audio_path.display());
        }
        Commands::Transcribe { input, output, detailed } => {
            info!("Transcribing audio: {}", input.display());

            let workflow = Workflow::new(config)?;
            let cue_set = workflow.transcribe_file(&input, &output, detailed).await?;
            println!("Wrote {} cues to {}", cue_set.len(), output.display());
        }
        Commands::Translate { input, output_dir, target_langs } => {
            info!("Translating subtitles: {}", input.display());

            let workflow = Workflow::new(config)?;
            let written = workflow
                .translate_file(&input, &parse_language_list(&target_langs), &output_dir)
                .await?;

            if written.is_empty() {
                bail!("no translation could be produced");
            }
            for (code, path) in written {
                println!("{}: {}", code, path.display());
            }
        }
        Commands::Burn { video, subtitles, output, style } => {
            info!("Burning subtitles into video: {}", video.display());

            let (output_dir, filename) = split_output(&output)?;
            let media = MediaProcessorFactory::create_processor(config.media.clone());
            let path = media
                .burn_subtitles(&video, &subtitles, &output_dir, &filename, &style.apply(&config.style))
                .await?;
            println!("{}", path.display());
        }
        Commands::Thumbnail { input, output_dir, timestamp } => {
            tokio::fs::create_dir_all(&output_dir).await?;
            let path = FfmpegProcessor::new(config.media.clone())
                .create_thumbnail(&input, &output_dir, &timestamp)
                .await?;
            println!("{}", path.display());
        }
        Commands::Compress { input, output_dir, quality } => {
            tokio::fs::create_dir_all(&output_dir).await?;
            let progress = spinner();
            progress.set_message(format!("Compressing {}", input.display()));

            let path = FfmpegProcessor::new(config.media.clone())
                .compress(&input, &output_dir, CompressionQuality::from_name(&quality))
                .await?;
            progress.finish_and_clear();
            println!("{}", path.display());
        }
        Commands::Preview { video, subtitles, output_dir, start, duration, style } => {
            tokio::fs::create_dir_all(&output_dir).await?;
            let path = FfmpegProcessor::new(config.media.clone())
                .create_preview(&video, &subtitles, &output_dir, start, duration, &style.apply(&config.style))
                .await?;
            println!("{}", path.display());
        }
        Commands::Languages => {
            println!("{:<12} {:<6}", "Language", "Code");
            println!("{}", "-".repeat(18));
            for language in SUPPORTED_LANGUAGES {
                println!("{:<12} {:<6}", language.name, language.code);
            }
        }
        Commands::Doctor => {
            let workflow = Workflow::new(config.clone())?;

            let tools = workflow.media().check_availability().await;
            println!("ffmpeg:       {}", availability(tools.ffmpeg));
            println!("ffprobe:      {}", availability(tools.ffprobe));

            let api_key = std::env::var(&config.transcriber.api_key_env).is_ok();
            println!("{:<13} {}", format!("{}:", config.transcriber.api_key_env), availability(api_key));

            let translation = workflow.translator().check_service().await;
            println!("translation:  {}", availability(translation));

            if !tools.all_available() {
                bail!("ffmpeg and ffprobe are required");
            }
        }
        Commands::InitConfig { output, force } => {
            if output.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", output.display());
            }
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
        Commands::Cleanup { workspace } => {
            let is_scratch_dir = workspace
                .file_name()
                .map(|name| name.to_string_lossy().starts_with(WORKSPACE_PREFIX))
                .unwrap_or(false);
            if !is_scratch_dir {
                bail!("{} is not a vidloc scratch directory", workspace.display());
            }

            Workspace::open(&workspace)?.cleanup().await?;
            println!("Removed {}", workspace.display());
        }
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".vidloc").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "vidloc.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}", log_level, log_dir.join("vidloc.log").display());

    Ok(guard)
}

/// `--config`, else `vidloc.toml` in the current directory, else defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
            Config::from_file(DEFAULT_CONFIG_FILE)?
        }
        None => Config::default(),
    };
    Ok(config)
}

fn spinner() -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}

/// Flip the cancel signal on Ctrl-C so the running job stops at its next stage.
fn cancel_on_ctrl_c() -> CancelSignal {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling remaining work");
            let _ = tx.send(true);
        }
    });
    rx
}

fn split_output(output: &Path) -> Result<(PathBuf, String)> {
    let filename = output
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .with_context(|| format!("{} has no file name", output.display()))?;
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, filename))
}

fn availability(ok: bool) -> &'static str {
    if ok { "ok" } else { "unavailable" }
}

fn print_job_report(job: &Job) {
    println!("Job {}: {}", job.id, job.state());

    for (kind, entries) in [("subtitles", &job.manifest.subtitles), ("video", &job.manifest.videos)] {
        for (language, outcome) in entries {
            match outcome {
                ArtifactOutcome::Produced(artifact) => {
                    println!("  {:<9} {:<9} {} ({:.1} MB)", kind, language, artifact.path.display(), artifact.size_mb());
                }
                ArtifactOutcome::Failed { stage, reason } => {
                    println!("  {:<9} {:<9} failed at {}: {}", kind, language, stage, reason);
                }
            }
        }
    }
}
