//! Forge Gen - Pluggable image-generation backends
//!
//! Provides the provider trait, the layered studio settings, the shared
//! prompt builder, and the two real adapters: Gemini (hosted model,
//! synchronous HTTP) and ComfyUI (local server, workflow submission over
//! HTTP plus a per-request WebSocket). A mock provider covers tests and
//! offline use.

pub mod config;
pub mod prompt;
pub mod provider;
pub mod providers;

pub use config::{ProviderConfig, ProviderKind, StudioConfig};
pub use prompt::build_prompt;
pub use provider::{GenerationProvider, ProviderStatus};
pub use providers::{available_providers, create_provider};
