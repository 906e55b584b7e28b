use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, VidlocError};
use super::TranslationBackend;

#[derive(Debug, Deserialize)]
struct MyMemoryResponse {
    // Sent as a number on success and sometimes as a string on errors
    #[serde(rename = "responseStatus", default)]
    response_status: Value,
    #[serde(rename = "responseData")]
    response_data: Option<MyMemoryData>,
}

#[derive(Debug, Deserialize)]
struct MyMemoryData {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

impl MyMemoryResponse {
    fn status(&self) -> Option<u64> {
        match &self.response_status {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn into_translation(self) -> Result<String> {
        let status = self.status();
        if status != Some(200) {
            return Err(VidlocError::Translation(format!(
                "MyMemory responded with status {}",
                self.response_status
            )));
        }

        self.response_data
            .and_then(|data| data.translated_text)
            .ok_or_else(|| VidlocError::Translation("MyMemory response has no translation".to_string()))
    }
}

/// MyMemory `/get` client
pub struct MyMemory {
    client: Client,
    endpoint: String,
    max_chars: usize,
}

impl MyMemory {
    pub fn new(endpoint: &str, max_chars: usize, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            max_chars,
        })
    }
}

/// First `max_chars` characters of `text`.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[async_trait]
impl TranslationBackend for MyMemory {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let query = truncate_chars(text, self.max_chars);
        let langpair = format!("{}|{}", source, target);
        debug!("Sending fallback translation request to: {}", self.endpoint);

        let response = self.client
            .get(&self.endpoint)
            .query(&[("q", query), ("langpair", langpair.as_str())])
            .send()
            .await
            .map_err(|e| VidlocError::Transport(format!("HTTP request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| VidlocError::Transport(format!("MyMemory returned an error: {}", e)))?;

        let body: MyMemoryResponse = response
            .json()
            .await
            .map_err(|e| VidlocError::Translation(format!("Failed to parse response: {}", e)))?;

        body.into_translation()
    }

    fn name(&self) -> &'static str {
        "MyMemory"
    }
}
