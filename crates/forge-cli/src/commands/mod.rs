//! CLI command implementations

pub mod asset;
pub mod config;
pub mod export;
pub mod generate;
pub mod init;
pub mod inpaint;
pub mod project;
pub mod status;

use anyhow::Result;
use forge_gen::{create_provider, GenerationProvider, ProviderKind, StudioConfig};
use forge_studio::Studio;

/// Project-local studio database path
pub const DB_PATH: &str = ".forge/studio.db";

/// Open the studio against the project-local database
pub fn open_studio() -> Result<Studio> {
    Ok(Studio::open(DB_PATH)?)
}

/// Resolve the provider to use: explicit flag, else configured default
pub fn resolve_provider(
    override_name: Option<&str>,
    config: &StudioConfig,
) -> Result<Box<dyn GenerationProvider>> {
    let kind: ProviderKind = match override_name {
        Some(name) => name.parse()?,
        None => config.provider,
    };
    Ok(create_provider(kind, config)?)
}
