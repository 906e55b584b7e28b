use serde::Serialize;

// Rough ratios of stage wall time to video duration
const TRANSCRIPTION_RATIO: f64 = 0.1;
const TRANSLATION_RATIO_PER_LANGUAGE: f64 = 0.05;
const BURN_RATIO_PER_LANGUAGE: f64 = 0.3;

/// Expected processing time per stage, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProcessingEstimate {
    pub transcription: f64,
    pub translation: f64,
    pub burning: f64,
    pub total: f64,
}

impl ProcessingEstimate {
    pub fn new(duration_secs: f64, languages: usize) -> Self {
        let languages = languages as f64;
        let transcription = duration_secs * TRANSCRIPTION_RATIO;
        let translation = duration_secs * TRANSLATION_RATIO_PER_LANGUAGE * languages;
        let burning = duration_secs * BURN_RATIO_PER_LANGUAGE * languages;

        Self {
            transcription,
            translation,
            burning,
            total: transcription + translation + burning,
        }
    }

    pub fn formatted_total(&self) -> String {
        format_clock(self.total)
    }
}

/// `HH:MM:SS` when at least an hour, otherwise `MM:SS`.
pub fn format_clock(seconds: f64) -> String {
    if seconds.is_nan() || seconds < 0.0 {
        return "Invalid time".to_string();
    }

    let whole = seconds as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let secs = whole % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
