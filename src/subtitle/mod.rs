//! Timed subtitle cues and the SRT codec.

pub mod timestamp;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use tokio::fs;
use tracing::{debug, info};

pub use timestamp::{Timestamp, format_timestamp, parse_time_range, parse_timestamp};

use crate::error::{Result, VidlocError};

static BLOCK_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("block separator pattern is valid"));

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("markup pattern is valid"));

/// One subtitle entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    pub index: u32,
    pub start: Timestamp,
    pub end: Timestamp,
    pub text: String,
}

impl Cue {
    pub fn new(index: u32, start: Timestamp, end: Timestamp, text: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    pub fn timing_line(&self) -> String {
        format!("{} --> {}", self.start, self.end)
    }
}

/// Ordered cues for a single language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueSet {
    pub language: String,
    pub cues: Vec<Cue>,
}

impl CueSet {
    pub fn new(language: impl Into<String>, cues: Vec<Cue>) -> Self {
        Self {
            language: language.into(),
            cues,
        }
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Rejects empty sets; downstream stages must never emit an empty artifact.
    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(VidlocError::EmptyCueSet);
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cue> {
        self.cues.iter()
    }
}

/// Parse SRT text into a cue set.
///
/// Blocks that do not look like a cue (non-numeric index, bad timing line,
/// missing text) are skipped rather than failing the whole document.
pub fn parse(text: &str, language: &str) -> Result<CueSet> {
    let normalized = text.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let content = normalized.trim();

    let mut cues = Vec::new();
    if !content.is_empty() {
        for block in BLOCK_SEPARATOR.split(content) {
            match parse_block(block) {
                Some(cue) => cues.push(cue),
                None => debug!("Skipping malformed subtitle block: {:?}", block),
            }
        }
    }

    if cues.is_empty() {
        return Err(VidlocError::EmptyInput);
    }

    Ok(CueSet::new(language, cues))
}

fn parse_block(block: &str) -> Option<Cue> {
    let lines: Vec<&str> = block.trim().split('\n').collect();
    if lines.len() < 3 {
        return None;
    }

    let index = lines[0].trim().parse::<u32>().ok().filter(|i| *i > 0)?;
    let (start, end) = parse_time_range(lines[1]).ok()?;
    let text = lines[2..].join("\n");

    Some(Cue::new(index, start, end, text))
}

/// Serialize a cue set as SRT, keeping indices and order exactly as given.
pub fn serialize(cue_set: &CueSet) -> String {
    let mut out = String::new();

    for cue in cue_set.iter() {
        out.push_str(&format!("{}\n{}\n{}\n\n", cue.index, cue.timing_line(), cue.text));
    }

    out
}

/// Remove inline markup such as `<i>` or `<font color=...>`.
pub fn strip_markup(text: &str) -> String {
    MARKUP_TAG.replace_all(text, "").trim().to_string()
}

/// Read and parse an SRT file.
pub async fn read_srt<P: AsRef<Path>>(path: P, language: &str) -> Result<CueSet> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(VidlocError::NotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).await?;
    parse(&content, language)
}

/// Write a cue set to an SRT file (UTF-8).
pub async fn write_srt<P: AsRef<Path>>(cue_set: &CueSet, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating SRT file: {}", output_path.display());

    cue_set.ensure_not_empty()?;
    fs::write(output_path, serialize(cue_set)).await?;

    info!("SRT file generated with {} cues", cue_set.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(index: u32, start_ms: u64, end_ms: u64, text: &str) -> Cue {
        Cue::new(index, Timestamp::from_millis(start_ms), Timestamp::from_millis(end_ms), text)
    }

    #[test]
    fn test_parse_basic_document() {
        let srt = "1\n00:00:01,000 --> 00:00:03,000\nHello world\n\n2\n00:00:04,000 --> 00:00:06,500\nSecond line\nwraps here\n";
        let cues = parse(srt, "en").unwrap();

        assert_eq!(cues.language, "en");
        assert_eq!(cues.len(), 2);
        assert_eq!(cues.cues[0], cue(1, 1_000, 3_000, "Hello world"));
        assert_eq!(cues.cues[1].text, "Second line\nwraps here");
        assert_eq!(cues.cues[1].end.as_millis(), 6_500);
    }

    #[test]
    fn test_round_trip_preserves_cues() {
        let original = CueSet::new(
            "en",
            vec![
                cue(1, 0, 1_500, "<i>Hello</i> there"),
                cue(7, 1_500, 4_000, "Two\nlines"),
                cue(3, 3_600_000, 3_600_999, "Out of order index"),
            ],
        );

        let parsed = parse(&serialize(&original), "en").unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_serialize_does_not_renumber() {
        let set = CueSet::new("en", vec![cue(5, 0, 1_000, "a"), cue(2, 1_000, 2_000, "b")]);
        assert_eq!(
            serialize(&set),
            "5\n00:00:00,000 --> 00:00:01,000\na\n\n2\n00:00:01,000 --> 00:00:02,000\nb\n\n"
        );
    }

    #[test]
    fn test_malformed_block_is_skipped() {
        let srt = "1\n00:00:01,000 --> 00:00:02,000\nFirst\n\nabc\n00:00:02,000 --> 00:00:03,000\nBroken index\n\n3\n00:00:03,000 --> 00:00:04,000\nThird\n";
        let cues = parse(srt, "en").unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!(cues.cues[0].text, "First");
        assert_eq!(cues.cues[1].index, 3);
    }

    #[test]
    fn test_block_with_overflowing_timestamp_is_skipped() {
        let srt = "1\n99999999999999999:00:00,000 --> 99999999999999999:00:01,000\nBad\n\n2\n00:00:01,000 --> 00:00:02,000\nGood\n";
        let cues = parse(srt, "en").unwrap();

        assert_eq!(cues.len(), 1);
        assert_eq!(cues.cues[0].index, 2);
        assert_eq!(cues.cues[0].text, "Good");
    }

    #[test]
    fn test_blocks_without_timing_or_text_are_skipped() {
        let srt = "1\nnot a timing line\nText\n\n2\n00:00:01,000 --> 00:00:02,000\n\n3\n00:00:03,000 --> 00:00:04,000\nKept\n";
        let cues = parse(srt, "en").unwrap();

        assert_eq!(cues.len(), 1);
        assert_eq!(cues.cues[0].index, 3);
    }

    #[test]
    fn test_blank_input_is_empty_input() {
        assert!(matches!(parse("", "en"), Err(VidlocError::EmptyInput)));
        assert!(matches!(parse("  \n\t\n  ", "en"), Err(VidlocError::EmptyInput)));
        assert!(matches!(parse("garbage\nonly", "en"), Err(VidlocError::EmptyInput)));
    }

    #[test]
    fn test_crlf_and_bom_are_tolerated() {
        let srt = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,000\r\nHi\r\n\r\n \r\n2\r\n00:00:02,000 --> 00:00:03,000\r\nThere\r\n";
        let cues = parse(srt, "en").unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!(cues.cues[0].text, "Hi");
        assert_eq!(cues.cues[1].text, "There");
    }

    #[test]
    fn test_zero_index_is_rejected() {
        let srt = "0\n00:00:01,000 --> 00:00:02,000\nZero\n";
        assert!(matches!(parse(srt, "en"), Err(VidlocError::EmptyInput)));
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("<i>Hello</i> <font color=\"red\">world</font>"), "Hello world");
        assert_eq!(strip_markup("  plain  "), "plain");
        assert_eq!(strip_markup("<b></b>"), "");
    }

    #[test]
    fn test_empty_cue_set_is_rejected() {
        let set = CueSet::new("en", Vec::new());
        assert!(matches!(set.ensure_not_empty(), Err(VidlocError::EmptyCueSet)));
    }

    #[tokio::test]
    async fn test_write_and_read_srt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subs.srt");
        let set = CueSet::new("en", vec![cue(1, 1_000, 3_000, "Hello world")]);

        write_srt(&set, &path).await.unwrap();
        let read_back = read_srt(&path, "en").await.unwrap();

        assert_eq!(read_back, set);
        assert!(matches!(
            read_srt(dir.path().join("missing.srt"), "en").await,
            Err(VidlocError::NotFound(_))
        ));
    }
}
