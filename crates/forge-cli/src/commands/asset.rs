//! Asset management commands

use crate::commands::open_studio;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::Subcommand;
use forge_core::time::format_millis;
use forge_core::Asset;
use forge_export::slug;
use forge_gen::build_prompt;
use std::fs;

#[derive(Subcommand)]
pub enum AssetCommands {
    /// List assets in the session and the active project
    List,

    /// Show an asset's metadata
    Info {
        /// Asset id
        id: String,
    },

    /// Copy a session asset into the active project's library
    Save {
        /// Asset id
        id: String,
    },

    /// Delete assets from the session and the active project
    Delete {
        /// Asset ids
        ids: Vec<String>,
    },

    /// Write an asset's PNG to disk
    Show {
        /// Asset id
        id: String,

        /// Output path (defaults to <slug>.png)
        #[arg(short, long)]
        output: Option<String>,
    },
}

pub fn run(cmd: AssetCommands) -> Result<()> {
    match cmd {
        AssetCommands::List => run_list(),
        AssetCommands::Info { id } => run_info(&id),
        AssetCommands::Save { id } => run_save(&id),
        AssetCommands::Delete { ids } => run_delete(&ids),
        AssetCommands::Show { id, output } => run_show(&id, output.as_deref()),
    }
}

fn print_row(asset: &Asset) {
    println!(
        "  {}  {}  {}",
        asset.id,
        format_millis(asset.created_at),
        asset.prompt
    );
}

fn run_list() -> Result<()> {
    let studio = open_studio()?;

    println!("Session ({}):", studio.session_assets().len());
    for asset in studio.session_assets() {
        print_row(asset);
    }

    if let Some(project) = studio.active_project() {
        println!("Project '{}' ({}):", project.name, project.assets.len());
        for asset in &project.assets {
            print_row(asset);
        }
    }
    Ok(())
}

fn run_info(id: &str) -> Result<()> {
    let studio = open_studio()?;
    let asset = studio
        .find_asset(id)
        .with_context(|| format!("Asset '{}' not found", id))?;

    println!("Asset: {}", asset.id);
    println!("  Prompt:  {}", asset.prompt);
    println!("  Type:    {:?}", asset.options.gen_type);
    println!("  View:    {:?}", asset.options.view);
    println!("  Style:   {:?}", asset.options.style);
    if let Some(seed) = asset.options.seed {
        println!("  Seed:    {}", seed);
    }
    if let Some(ref original) = asset.options.original_id {
        println!("  Regenerated from: {}", original);
    }
    println!("  Created: {}", format_millis(asset.created_at));
    println!("  Full prompt: {}", build_prompt(&asset.options));
    Ok(())
}

fn run_save(id: &str) -> Result<()> {
    let mut studio = open_studio()?;
    studio.save_to_library(id)?;
    let project = studio.active_project().context("No active project")?;
    println!("Saved {} to project '{}'", id, project.name);
    Ok(())
}

fn run_delete(ids: &[String]) -> Result<()> {
    if ids.is_empty() {
        anyhow::bail!("No asset ids given");
    }
    let mut studio = open_studio()?;
    studio.delete_assets(ids)?;
    println!("Deleted {} asset(s)", ids.len());
    Ok(())
}

fn run_show(id: &str, output: Option<&str>) -> Result<()> {
    let studio = open_studio()?;
    let asset = studio
        .find_asset(id)
        .with_context(|| format!("Asset '{}' not found", id))?;

    let path = output
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}.png", slug(&asset.prompt)));
    fs::write(&path, BASE64.decode(&asset.image_data)?)?;
    println!("Wrote: {}", path);
    Ok(())
}
