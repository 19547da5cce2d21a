//! Gemini hosted-model provider
//!
//! Single synchronous request/response call against the Generative
//! Language REST API. Image and mask inputs travel inline as base64
//! parts; the result comes back as an inline image part.

use crate::config::StudioConfig;
use crate::prompt::build_prompt;
use crate::provider::{GenerationProvider, ProviderStatus};
use forge_core::{ForgeError, GenerationOptions, Result};
use std::time::Duration;

const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const IMAGE_MODEL: &str = "gemini-2.5-flash-image";
const TEXT_MODEL: &str = "gemini-2.5-flash";
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Gemini provider for hosted image generation
pub struct GeminiProvider {
    api_key: String,
    api_url: String,
}

impl GeminiProvider {
    /// Create a provider from settings. Fails fast when no API key is
    /// configured, before any network call.
    pub fn from_config(config: &StudioConfig) -> Result<Self> {
        let api_key = config
            .api_key("gemini")
            .ok_or_else(|| ForgeError::MissingCredential {
                provider: "Gemini".to_string(),
            })?
            .to_string();

        let api_url = config
            .api_url("gemini")
            .unwrap_or(DEFAULT_GEMINI_URL)
            .to_string();

        Ok(Self { api_key, api_url })
    }

    /// Issue a minimal one-token text call to check that the key works
    pub fn verify_key(&self) -> Result<()> {
        let payload = serde_json::json!({
            "contents": [{ "parts": [{ "text": "ping" }] }],
            "generationConfig": { "maxOutputTokens": 1 }
        });
        self.call_model(TEXT_MODEL, &payload)?;
        Ok(())
    }

    fn call_model(&self, model: &str, payload: &serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("{}/models/{}:generateContent", self.api_url, model);
        let agent = build_agent();
        let response = agent
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .send_json(payload);

        match response {
            Ok(mut ok) => ok.body_mut().read_json().map_err(|e| {
                ForgeError::ServiceError(format!("Failed to parse Gemini response: {}", e))
            }),
            Err(ureq::Error::StatusCode(code)) => Err(ForgeError::ServiceError(format!(
                "Gemini API returned HTTP {}",
                code
            ))),
            Err(e) => Err(ForgeError::ServiceError(format!(
                "Gemini API request failed: {}",
                e
            ))),
        }
    }
}

fn build_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .build();
    config.into()
}

/// Extract the generated image from a generateContent response.
///
/// A `SAFETY` finish reason maps to the content-policy error; a response
/// with no inline image part is an empty result.
pub fn parse_image_response(response: &serde_json::Value) -> Result<String> {
    let candidate = response
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| {
            ForgeError::EmptyResult("the model returned no candidates".to_string())
        })?;

    if candidate.get("finishReason").and_then(|r| r.as_str()) == Some("SAFETY") {
        return Err(ForgeError::SafetyBlocked);
    }

    let parts = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array());

    if let Some(parts) = parts {
        for part in parts {
            if let Some(data) = part
                .get("inlineData")
                .and_then(|d| d.get("data"))
                .and_then(|d| d.as_str())
            {
                return Ok(data.to_string());
            }
        }
    }

    Err(ForgeError::EmptyResult(
        "no image data found in the response".to_string(),
    ))
}

impl GenerationProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn health_check(&self) -> Result<ProviderStatus> {
        if self.api_key.is_empty() {
            return Ok(ProviderStatus::NoCredential);
        }
        match self.verify_key() {
            Ok(()) => Ok(ProviderStatus::Available),
            Err(e) => Ok(ProviderStatus::Unavailable(e.to_string())),
        }
    }

    fn generate(&self, options: &GenerationOptions) -> Result<String> {
        let full_prompt = build_prompt(options);

        let mut generation_config = serde_json::json!({
            "responseModalities": ["IMAGE"]
        });
        if let Some(seed) = options.seed {
            generation_config["seed"] = serde_json::json!(seed);
        }

        let payload = serde_json::json!({
            "contents": [{ "parts": [{ "text": full_prompt }] }],
            "generationConfig": generation_config
        });

        let response = self.call_model(IMAGE_MODEL, &payload)?;
        parse_image_response(&response)
    }

    fn inpaint(&self, image_b64: &str, mask_b64: &str, prompt: &str) -> Result<String> {
        let payload = serde_json::json!({
            "contents": [{
                "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": image_b64 } },
                    { "inlineData": { "mimeType": "image/png", "data": mask_b64 } },
                    { "text": prompt }
                ]
            }],
            "generationConfig": { "responseModalities": ["IMAGE"] }
        });

        let response = self.call_model(IMAGE_MODEL, &payload)?;
        parse_image_response(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;

    #[test]
    fn test_missing_key_fails_without_network() {
        std::env::remove_var("FORGE_GEMINI_API_KEY");
        let config = StudioConfig {
            provider: ProviderKind::Gemini,
            providers: Default::default(),
        };
        let err = GeminiProvider::from_config(&config).err().unwrap();
        assert!(matches!(err, ForgeError::MissingCredential { .. }));
    }

    #[test]
    fn test_parse_image_response() {
        let response = serde_json::json!({
            "candidates": [{
                "finishReason": "STOP",
                "content": {
                    "parts": [
                        { "text": "here is your image" },
                        { "inlineData": { "mimeType": "image/png", "data": "aW1hZ2U=" } }
                    ]
                }
            }]
        });
        assert_eq!(parse_image_response(&response).unwrap(), "aW1hZ2U=");
    }

    #[test]
    fn test_parse_safety_block() {
        let response = serde_json::json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        });
        let err = parse_image_response(&response).err().unwrap();
        assert!(matches!(err, ForgeError::SafetyBlocked));
    }

    #[test]
    fn test_parse_empty_result() {
        let response = serde_json::json!({
            "candidates": [{
                "finishReason": "STOP",
                "content": { "parts": [{ "text": "sorry, nothing" }] }
            }]
        });
        let err = parse_image_response(&response).err().unwrap();
        assert!(matches!(err, ForgeError::EmptyResult(_)));
    }

    #[test]
    fn test_parse_no_candidates() {
        let response = serde_json::json!({ "candidates": [] });
        assert!(parse_image_response(&response).is_err());
    }
}
