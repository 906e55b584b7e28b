//! vidloc - video localization pipeline
//!
//! Extracts a video's audio, transcribes it into timed subtitle cues,
//! translates the cues into target languages and burns one subtitled
//! rendition per language using ffmpeg.

pub mod cli;
pub mod config;
pub mod error;
pub mod estimate;
pub mod job;
pub mod language;
pub mod manifest;
pub mod media;
pub mod subtitle;
pub mod transcribe;
pub mod translate;
pub mod workflow;
pub mod workspace;
