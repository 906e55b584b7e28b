//! Languages the translation stage can target.

use serde::Serialize;

use crate::error::{Result, VidlocError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    pub name: &'static str,
    pub code: &'static str,
}

pub const SUPPORTED_LANGUAGES: &[Language] = &[
    Language { name: "Hebrew", code: "he" },
    Language { name: "Spanish", code: "es" },
    Language { name: "French", code: "fr" },
    Language { name: "German", code: "de" },
    Language { name: "Italian", code: "it" },
    Language { name: "Portuguese", code: "pt" },
    Language { name: "Arabic", code: "ar" },
    Language { name: "Russian", code: "ru" },
    Language { name: "Chinese", code: "zh" },
    Language { name: "Japanese", code: "ja" },
    Language { name: "Korean", code: "ko" },
    Language { name: "Dutch", code: "nl" },
    Language { name: "Swedish", code: "sv" },
    Language { name: "Norwegian", code: "no" },
    Language { name: "Danish", code: "da" },
];

/// Resolve a language by display name or code, ignoring case.
pub fn resolve(tag: &str) -> Result<&'static Language> {
    let tag = tag.trim();
    SUPPORTED_LANGUAGES
        .iter()
        .find(|lang| lang.code.eq_ignore_ascii_case(tag) || lang.name.eq_ignore_ascii_case(tag))
        .ok_or_else(|| VidlocError::UnsupportedLanguage(tag.to_string()))
}

pub fn is_supported(tag: &str) -> bool {
    resolve(tag).is_ok()
}

/// Split a comma-separated list of language tags, dropping blanks.
pub fn parse_language_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
