use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::media::{SubtitlePosition, SubtitleStyle};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcribe, translate and burn subtitles into a single video
    Process {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Target languages, by name or code (comma-separated)
        #[arg(short, long, default_value = "Spanish")]
        target_langs: String,

        /// Copy results and the processing summary here
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Remove the scratch directory once results are copied
        #[arg(long, requires = "output_dir")]
        cleanup: bool,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Process all video files in a directory
    Batch {
        /// Input directory containing video files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Target languages, by name or code (comma-separated)
        #[arg(short, long, default_value = "Spanish")]
        target_langs: String,

        /// Output directory; each video gets its own subdirectory
        #[arg(short, long)]
        output_dir: PathBuf,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Show probed metadata for a video
    Probe {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Estimate processing time for this many languages
        #[arg(short, long, default_value = "1")]
        languages: usize,
    },

    /// Check that a video is usable for localization
    Validate {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Extract mono 16 kHz audio from a video file
    Extract {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for the extracted `.wav`
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Transcribe audio to an SRT file
    Transcribe {
        /// Input audio file
        #[arg(short, long)]
        input: PathBuf,

        /// Output SRT file
        #[arg(short, long)]
        output: PathBuf,

        /// Request segment timestamps instead of service-formatted subtitles
        #[arg(long)]
        detailed: bool,
    },

    /// Translate an SRT file into one file per language
    Translate {
        /// Input SRT file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Target languages, by name or code (comma-separated)
        #[arg(short, long)]
        target_langs: String,
    },

    /// Burn subtitles into a video
    Burn {
        /// Input video file
        #[arg(short, long)]
        video: PathBuf,

        /// Subtitle file
        #[arg(short, long)]
        subtitles: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Save a single frame as a JPEG thumbnail
    Thumbnail {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Position of the frame (HH:MM:SS)
        #[arg(short, long, default_value = "00:00:01")]
        timestamp: String,
    },

    /// Re-encode a video at a smaller size
    Compress {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Quality preset: low, medium or high
        #[arg(short, long, default_value = "medium")]
        quality: String,
    },

    /// Render a short subtitled clip to check styling
    Preview {
        /// Input video file
        #[arg(short, long)]
        video: PathBuf,

        /// Subtitle file
        #[arg(short, long)]
        subtitles: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Start offset in seconds
        #[arg(long, default_value = "0")]
        start: u64,

        /// Clip length in seconds
        #[arg(long, default_value = "30")]
        duration: u64,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// List supported target languages
    Languages,

    /// Check media tools and translation services
    Doctor,

    /// Write the default configuration to a file
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "vidloc.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Remove a job scratch directory
    Cleanup {
        /// Scratch directory printed by `process`
        #[arg(short, long)]
        workspace: PathBuf,
    },
}

/// Subtitle style overrides; unset flags keep the configured style.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct StyleArgs {
    /// Font size
    #[arg(long)]
    pub font_size: Option<u32>,

    /// Font color: white, yellow, red, blue, green or black
    #[arg(long)]
    pub font_color: Option<String>,

    /// Position: bottom, top or center
    #[arg(long)]
    pub position: Option<String>,

    /// Font family (enables advanced styling)
    #[arg(long)]
    pub font_name: Option<String>,

    /// Outline color (enables advanced styling)
    #[arg(long)]
    pub outline_color: Option<String>,

    /// Outline width (enables advanced styling)
    #[arg(long)]
    pub outline_width: Option<u32>,

    /// Background opacity from 0.0 to 1.0 (enables advanced styling)
    #[arg(long)]
    pub opacity: Option<f64>,
}

impl StyleArgs {
    fn has_advanced(&self) -> bool {
        self.font_name.is_some()
            || self.outline_color.is_some()
            || self.outline_width.is_some()
            || self.opacity.is_some()
    }

    /// Layer the flags over `base`.
    pub fn apply(&self, base: &SubtitleStyle) -> SubtitleStyle {
        let mut style = base.clone();

        if let Some(size) = self.font_size {
            style.font_size = size;
        }
        if let Some(color) = &self.font_color {
            style.font_color = color.to_lowercase();
        }
        if let Some(position) = &self.position {
            style.position = SubtitlePosition::from_name(position);
        }

        if self.has_advanced() {
            let mut advanced = style.advanced.take().unwrap_or_default();
            if let Some(name) = &self.font_name {
                advanced.font_name = name.clone();
            }
            if let Some(color) = &self.outline_color {
                advanced.outline_color = color.to_lowercase();
            }
            if let Some(width) = self.outline_width {
                advanced.outline_width = width;
            }
            if let Some(opacity) = self.opacity {
                advanced.opacity = opacity;
            }
            style.advanced = Some(advanced);
        }

        style
    }
}
