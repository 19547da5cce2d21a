//! Generation provider trait

use forge_core::{GenerationOptions, Result};

/// Status returned by a provider health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Available,
    NoCredential,
    Unavailable(String),
}

/// Trait implemented by each generation backend (Gemini, ComfyUI, Mock).
///
/// Both operations return the generated image as base64-encoded PNG.
/// A missing credential fails at construction time, before any network
/// traffic happens.
pub trait GenerationProvider {
    /// Provider name (e.g. "gemini", "comfyui", "mock")
    fn name(&self) -> &str;

    /// Check whether the provider is usable (credential set, service reachable)
    fn health_check(&self) -> Result<ProviderStatus>;

    /// Generate an image from the given options (blocks until complete)
    fn generate(&self, options: &GenerationOptions) -> Result<String>;

    /// Regenerate the masked region of an image under a new prompt.
    ///
    /// Mask convention: opaque pixels mark the region to regenerate.
    fn inpaint(&self, image_b64: &str, mask_b64: &str, prompt: &str) -> Result<String>;
}
