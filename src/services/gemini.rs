use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::config_service;
use super::prompt::Content;
use crate::error::ChatError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Reply returned instead of a completion when no API key is configured.
pub const MOCK_RESPONSE: &str =
    "Sorry, I'm having trouble connecting to the AI right now. Please try again later.";

// Keeps the thinking indicator visible long enough to read in mock mode.
const MOCK_DELAY: Duration = Duration::from_millis(1500);

/// Maps a human-readable model label to its API id, e.g.
/// "Gemini 2.5 Flash" -> "gemini-2.5-flash". Gemma models get the
/// instruction-tuned suffix when it is missing.
pub fn normalize_model_id(label: &str) -> String {
    let whitespace = Regex::new(r"\s+").unwrap();
    let mut id = whitespace
        .replace_all(label.trim().to_lowercase().as_str(), "-")
        .to_string();

    if id.contains("gemma") && !id.ends_with("-it") {
        id.push_str("-it");
    }

    id
}

/// One request/response exchange with the external completion service.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Returns the completion's plain text for the given turn list.
    /// An empty string is a valid completion.
    async fn complete(&self, contents: &[Content], model_label: &str)
        -> Result<String, ChatError>;
}

/// Generation model as reported by the listing endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: &'a [Content],
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

fn extract_text(response: &GenerateContentResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect()
        })
        .unwrap_or_default()
}

/// Client for the Gemini generative language API.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Creates a client. A `None` key puts the client in mock mode
    /// rather than failing.
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300)) // 5 minute timeout for long generations
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Creates a client from the app's configuration, falling back to
    /// the `GEMINI_API_KEY` environment variable for the key.
    pub fn from_config() -> Self {
        let config = config_service::load_config().unwrap_or_default();
        let api_key = config_service::effective_api_key(&config);
        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(&base_url, api_key)
    }

    /// Lists models that support content generation.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ChatError> {
        let api_key = self.api_key.as_ref().ok_or(ChatError::MissingApiKey)?;

        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let listing: ListModelsResponse = response
            .json()
            .await
            .map_err(|e| ChatError::MalformedResponse(format!("Failed to parse model list: {}", e)))?;

        Ok(listing
            .models
            .into_iter()
            .filter(|model| {
                model
                    .supported_generation_methods
                    .iter()
                    .any(|method| method == "generateContent")
            })
            .collect())
    }
}

#[async_trait]
impl CompletionGateway for GeminiClient {
    async fn complete(
        &self,
        contents: &[Content],
        model_label: &str,
    ) -> Result<String, ChatError> {
        let Some(api_key) = self.api_key.as_ref() else {
            warn!("No Gemini API key found. Using mock mode.");
            tokio::time::sleep(MOCK_DELAY).await;
            return Ok(MOCK_RESPONSE.to_string());
        };

        let model_id = normalize_model_id(model_label);
        let url = format!("{}/models/{}:generateContent", self.base_url, model_id);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&GenerateContentRequest { contents })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ChatError::MalformedResponse(format!("Failed to parse response: {}", e)))?;

        Ok(extract_text(&completion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_gemini_labels() {
        assert_eq!(normalize_model_id("Gemini 2.5 Flash"), "gemini-2.5-flash");
        assert_eq!(
            normalize_model_id("Gemini  2.5   Flash Lite"),
            "gemini-2.5-flash-lite"
        );
    }

    #[test]
    fn gemma_labels_get_instruction_tuned_suffix() {
        assert_eq!(normalize_model_id("Gemma 3 12B"), "gemma-3-12b-it");
        assert_eq!(normalize_model_id("gemma-3-12b-it"), "gemma-3-12b-it");
    }

    #[test]
    fn non_gemma_labels_are_not_suffixed() {
        assert_eq!(normalize_model_id("Gemini 3 Flash"), "gemini-3-flash");
    }

    #[test]
    fn extracts_concatenated_candidate_text() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "parts": [{ "text": "Hello " }, { "text": "world" }]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(extract_text(&response), "Hello world");
    }

    #[test]
    fn missing_text_is_an_empty_completion() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert_eq!(extract_text(&response), "");

        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [] } }]
        }))
        .unwrap();
        assert_eq!(extract_text(&response), "");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_key_falls_back_to_mock_response() {
        let client = GeminiClient::new(DEFAULT_BASE_URL, None);
        let text = client.complete(&[], "Gemini 2.5 Flash").await.unwrap();
        assert_eq!(text, MOCK_RESPONSE);
    }

    #[tokio::test]
    async fn listing_models_without_a_key_is_an_error() {
        let client = GeminiClient::new(DEFAULT_BASE_URL, None);
        assert!(matches!(
            client.list_models().await,
            Err(ChatError::MissingApiKey)
        ));
    }
}
