//! Provider registry
//!
//! Maps the configured provider to a concrete implementation.

pub mod comfyui;
pub mod gemini;
pub mod mock;

use crate::config::{ProviderKind, StudioConfig};
use crate::provider::GenerationProvider;
use forge_core::Result;

/// Create the provider selected by the settings
pub fn create_provider(
    kind: ProviderKind,
    config: &StudioConfig,
) -> Result<Box<dyn GenerationProvider>> {
    match kind {
        ProviderKind::Gemini => Ok(Box::new(gemini::GeminiProvider::from_config(config)?)),
        ProviderKind::Comfyui => Ok(Box::new(comfyui::ComfyUiProvider::from_config(config)?)),
        ProviderKind::Mock => Ok(Box::new(mock::MockProvider::new())),
    }
}

/// List all provider kinds
pub fn available_providers() -> Vec<ProviderKind> {
    vec![ProviderKind::Gemini, ProviderKind::Comfyui, ProviderKind::Mock]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_needs_no_config() {
        let config = StudioConfig::default();
        let provider = create_provider(ProviderKind::Mock, &config).unwrap();
        assert_eq!(provider.name(), "mock");
    }

    #[test]
    fn test_create_gemini_without_key_fails() {
        std::env::remove_var("FORGE_GEMINI_API_KEY");
        let config = StudioConfig::default();
        assert!(create_provider(ProviderKind::Gemini, &config).is_err());
    }
}
