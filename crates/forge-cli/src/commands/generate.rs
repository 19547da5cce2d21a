//! Generation commands

use crate::commands::{open_studio, resolve_provider};
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use forge_core::{ArtStyle, GenType, GenerationOptions, ViewAngle};
use forge_gen::{build_prompt, StudioConfig};
use std::fs;

pub struct GenerateArgs {
    pub prompt: String,
    pub gen_type: GenType,
    pub view: ViewAngle,
    pub style: ArtStyle,
    pub seed: Option<u64>,
    pub provider: Option<String>,
    pub save: bool,
    pub output: Option<String>,
}

pub fn run(args: GenerateArgs) -> Result<()> {
    let config = StudioConfig::load()?;
    let provider = resolve_provider(args.provider.as_deref(), &config)?;
    let mut studio = open_studio()?;

    let options = GenerationOptions {
        prompt: args.prompt,
        gen_type: args.gen_type,
        view: args.view,
        style: args.style,
        seed: args.seed,
        original_id: None,
    };

    println!("Generating via {}...", provider.name());
    println!("  Prompt: {}", build_prompt(&options));

    studio.generate(provider.as_ref(), options)?;
    let asset = studio
        .accept_generation()?
        .context("Generation produced no preview")?;

    println!("  Asset: {}", asset.id);

    if args.save {
        studio.save_to_library(&asset.id)?;
        let project = studio.active_project().context("No active project")?;
        println!("  Saved to project: {}", project.name);
    }

    if let Some(path) = args.output {
        fs::write(&path, BASE64.decode(&asset.image_data)?)?;
        println!("  Wrote: {}", path);
    }

    Ok(())
}

pub fn run_regenerate(asset_id: &str, provider_override: Option<&str>) -> Result<()> {
    let config = StudioConfig::load()?;
    let provider = resolve_provider(provider_override, &config)?;
    let mut studio = open_studio()?;

    println!("Regenerating {} via {}...", asset_id, provider.name());
    studio.regenerate(provider.as_ref(), asset_id)?;
    let asset = studio
        .accept_generation()?
        .context("Generation produced no preview")?;

    println!("  Asset: {}", asset.id);
    Ok(())
}
