//! Inpainting command

use crate::commands::{open_studio, resolve_provider};
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use forge_gen::StudioConfig;
use std::fs;

pub fn run(asset_id: &str, mask_path: &str, prompt: &str, provider_override: Option<&str>) -> Result<()> {
    let config = StudioConfig::load()?;
    let provider = resolve_provider(provider_override, &config)?;
    let mut studio = open_studio()?;

    let mask_bytes = fs::read(mask_path)
        .with_context(|| format!("Failed to read mask file '{}'", mask_path))?;
    let mask_b64 = BASE64.encode(mask_bytes);

    println!("Inpainting {} via {}...", asset_id, provider.name());
    let replacement = studio.inpaint(provider.as_ref(), asset_id, &mask_b64, prompt)?;

    println!("  Replaced with: {}", replacement.id);
    Ok(())
}
