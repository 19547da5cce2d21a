//! Mock provider for testing
//!
//! Produces small solid-color PNGs locally, without any network calls.
//! The color is derived from the prompt so different prompts are
//! visually distinguishable in the asset grid.

use crate::prompt::build_prompt;
use crate::provider::{GenerationProvider, ProviderStatus};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use forge_core::{ContentHash, ForgeError, GenerationOptions, Result};
use image::{ImageBuffer, Rgba};

const MOCK_SIZE: u32 = 64;

/// A provider that generates placeholder images locally
#[derive(Default)]
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }
}

fn solid_png_base64(color: Rgba<u8>) -> Result<String> {
    let image = ImageBuffer::from_pixel(MOCK_SIZE, MOCK_SIZE, color);
    let mut bytes = Vec::new();
    image
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .map_err(|e| ForgeError::ImageError(format!("Failed to encode mock image: {}", e)))?;
    Ok(BASE64.encode(bytes))
}

fn color_for(text: &str) -> Rgba<u8> {
    let hex = ContentHash::from_str(text).to_hex();
    let channel = |i: usize| u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).unwrap_or(0);
    Rgba([channel(0), channel(1), channel(2), 255])
}

impl GenerationProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn health_check(&self) -> Result<ProviderStatus> {
        Ok(ProviderStatus::Available)
    }

    fn generate(&self, options: &GenerationOptions) -> Result<String> {
        let full_prompt = build_prompt(options);
        solid_png_base64(color_for(&full_prompt))
    }

    fn inpaint(&self, _image_b64: &str, _mask_b64: &str, prompt: &str) -> Result<String> {
        solid_png_base64(color_for(prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_returns_decodable_png() {
        let provider = MockProvider::new();
        let b64 = provider
            .generate(&GenerationOptions::from_prompt("crate"))
            .unwrap();
        let bytes = BASE64.decode(b64).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), MOCK_SIZE);
    }

    #[test]
    fn test_different_prompts_different_payloads() {
        let provider = MockProvider::new();
        let a = provider
            .generate(&GenerationOptions::from_prompt("barrel"))
            .unwrap();
        let b = provider
            .generate(&GenerationOptions::from_prompt("lantern"))
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_same_prompt_deterministic() {
        let provider = MockProvider::new();
        let a = provider
            .generate(&GenerationOptions::from_prompt("barrel"))
            .unwrap();
        let b = provider
            .generate(&GenerationOptions::from_prompt("barrel"))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_health_check_always_available() {
        let provider = MockProvider::new();
        assert_eq!(provider.health_check().unwrap(), ProviderStatus::Available);
    }
}
