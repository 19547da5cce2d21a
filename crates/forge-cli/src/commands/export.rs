//! Export commands

use crate::commands::open_studio;
use anyhow::{Context, Result};
use forge_core::Asset;
use forge_export::{archive_name, compose_sheet, export_assets, export_sheet, slug};
use forge_studio::Studio;
use std::fs;

/// Resolve explicit ids, or fall back to the active project's library
fn resolve_assets(studio: &Studio, ids: &[String]) -> Result<Vec<Asset>> {
    if ids.is_empty() {
        let project = studio.active_project().context("No active project")?;
        if project.assets.is_empty() {
            anyhow::bail!("Project '{}' has no assets to export", project.name);
        }
        return Ok(project.assets.clone());
    }

    ids.iter()
        .map(|id| {
            studio
                .find_asset(id)
                .cloned()
                .with_context(|| format!("Asset '{}' not found", id))
        })
        .collect()
}

pub fn run_export(ids: &[String], output: Option<&str>) -> Result<()> {
    let studio = open_studio()?;
    let assets = resolve_assets(&studio, ids)?;

    let bytes = export_assets(&assets)?;
    let path = output
        .map(str::to_string)
        .unwrap_or_else(|| archive_name(&assets));
    fs::write(&path, bytes)?;

    println!("Exported {} asset(s) to {}", assets.len(), path);
    Ok(())
}

pub fn run_sheet(
    ids: &[String],
    columns: u32,
    padding: u32,
    name: &str,
    output: Option<&str>,
) -> Result<()> {
    let studio = open_studio()?;
    let assets = resolve_assets(&studio, ids)?;

    let sheet = compose_sheet(&assets, columns, padding)?;
    let bytes = export_sheet(&sheet, name)?;
    let path = output
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}.zip", slug(name)));
    fs::write(&path, bytes)?;

    println!(
        "Composed {}x{} sheet from {} asset(s), exported to {}",
        sheet.layout.columns,
        sheet.layout.rows,
        assets.len(),
        path
    );
    Ok(())
}
