// Translation adapter
//
// Cue text is translated through a chain of TranslationBackend implementations:
// - LibreTranslate: primary service (POST form)
// - MyMemory: fallback used when the primary cannot be reached
//
// Translation never fails a cue: if every backend fails, the original text is kept.

pub mod libre;
pub mod mymemory;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::TranslateConfig;
use crate::error::Result;
use crate::language;
use crate::subtitle::{Cue, CueSet, strip_markup};

/// A single remote translation service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate plain text from `source` to `target` (language codes)
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String>;

    /// Short service name used in logs
    fn name(&self) -> &'static str;
}

/// Primary backend with an optional fallback and pacing between calls
pub struct Translator {
    primary: Box<dyn TranslationBackend>,
    fallback: Option<Box<dyn TranslationBackend>>,
    pacing: Duration,
}

impl Translator {
    pub fn new(
        primary: Box<dyn TranslationBackend>,
        fallback: Option<Box<dyn TranslationBackend>>,
        pacing: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            pacing,
        }
    }

    /// Translate a piece of text, degrading to the input on failure.
    pub async fn translate_text(&self, text: &str, target: &str, source: &str) -> String {
        match self.primary.translate(text, source, target).await {
            Ok(translated) => return translated,
            Err(e) if e.is_transport() => {
                warn!("{} failed: {}", self.primary.name(), e);
            }
            Err(e) => {
                warn!("Translation error from {}: {}", self.primary.name(), e);
                return text.to_string();
            }
        }

        if let Some(fallback) = &self.fallback {
            match fallback.translate(text, source, target).await {
                Ok(translated) => return translated,
                Err(e) => warn!("Fallback translation via {} failed: {}", fallback.name(), e),
            }
        }

        text.to_string()
    }

    /// Translate every cue of a set into `target`.
    ///
    /// Markup is stripped before translation and not re-applied. Cues whose
    /// text is empty once stripped are copied untranslated.
    pub async fn translate_cue_set(&self, cue_set: &CueSet, target: &str) -> Result<CueSet> {
        let language = language::resolve(target)?;
        cue_set.ensure_not_empty()?;

        info!("Translating {} cues from {} to {}", cue_set.len(), cue_set.language, language.name);

        let mut cues = Vec::with_capacity(cue_set.len());
        for cue in cue_set.iter() {
            let clean_text = strip_markup(&cue.text);

            let text = if clean_text.is_empty() {
                cue.text.clone()
            } else {
                let translated = self
                    .translate_text(&clean_text, language.code, &cue_set.language)
                    .await;
                if !self.pacing.is_zero() {
                    tokio::time::sleep(self.pacing).await;
                }
                translated
            };

            debug!("Cue {}: {:?} -> {:?}", cue.index, cue.text, text);
            cues.push(Cue::new(cue.index, cue.start, cue.end, text));
        }

        Ok(CueSet::new(language.code, cues))
    }

    /// Translate into several languages; languages that fail are logged and left out.
    pub async fn batch_translate(&self, cue_set: &CueSet, targets: &[String]) -> BTreeMap<String, CueSet> {
        let mut results = BTreeMap::new();

        for target in targets {
            match self.translate_cue_set(cue_set, target).await {
                Ok(translated) => {
                    results.insert(translated.language.clone(), translated);
                }
                Err(e) => warn!("Failed to translate to {}: {}", target, e),
            }
        }

        results
    }

    /// Probe the service chain with a known phrase.
    pub async fn check_service(&self) -> bool {
        let result = self.translate_text("Hello", "es", "en").await;
        let available = result != "Hello";
        info!("Translation service available: {} ({:?})", available, result);
        available
    }
}

/// Factory for creating translator instances
pub struct TranslatorFactory;

impl TranslatorFactory {
    /// LibreTranslate primary with an optional MyMemory fallback
    pub fn create_translator(config: &TranslateConfig) -> Result<Translator> {
        let primary: Box<dyn TranslationBackend> = Box::new(libre::LibreTranslate::new(
            &config.primary_endpoint,
            config.primary_api_key.clone(),
            config.primary_timeout_secs,
        )?);

        let fallback: Option<Box<dyn TranslationBackend>> = if config.enable_fallback {
            Some(Box::new(mymemory::MyMemory::new(
                &config.fallback_endpoint,
                config.fallback_max_chars,
                config.fallback_timeout_secs,
            )?))
        } else {
            None
        };

        Ok(Translator::new(primary, fallback, Duration::from_millis(config.pacing_ms)))
    }
}
