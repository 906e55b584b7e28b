use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, VidlocError};
use super::TranslationBackend;

#[derive(Debug, Deserialize)]
struct LibreResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

/// LibreTranslate `/translate` client
pub struct LibreTranslate {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl LibreTranslate {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }

    fn form<'a>(&'a self, text: &'a str, source: &'a str, target: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut form = vec![("q", text), ("source", source), ("target", target), ("format", "text")];
        if let Some(key) = &self.api_key {
            form.push(("api_key", key.as_str()));
        }
        form
    }
}

/// Extract `translatedText`, falling back to `original` when the field is absent.
///
/// An undecodable body counts as a failed exchange with the service.
fn translated_text(body: &str, original: &str) -> Result<String> {
    let response: LibreResponse = serde_json::from_str(body)
        .map_err(|e| VidlocError::Transport(format!("Unreadable LibreTranslate response: {}", e)))?;

    Ok(response.translated_text.unwrap_or_else(|| original.to_string()))
}

#[async_trait]
impl TranslationBackend for LibreTranslate {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        debug!("Sending translation request to: {}", self.endpoint);

        let response = self.client
            .post(&self.endpoint)
            .form(&self.form(text, source, target))
            .send()
            .await
            .map_err(|e| VidlocError::Transport(format!("HTTP request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| VidlocError::Transport(format!("LibreTranslate returned an error: {}", e)))?;

        let body = response
            .text()
            .await
            .map_err(|e| VidlocError::Transport(format!("Failed to read response: {}", e)))?;

        translated_text(&body, text)
    }

    fn name(&self) -> &'static str {
        "LibreTranslate"
    }
}
