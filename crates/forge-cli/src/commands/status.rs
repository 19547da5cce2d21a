//! Workspace status command

use crate::commands::{open_studio, DB_PATH};
use anyhow::Result;
use forge_gen::{available_providers, create_provider, ProviderStatus, StudioConfig};
use std::path::Path;

pub fn run() -> Result<()> {
    let config = StudioConfig::load()?;

    println!("Configured provider: {}", config.provider);
    for kind in available_providers() {
        let marker = if kind == config.provider { "*" } else { " " };
        match create_provider(kind, &config) {
            Ok(provider) => match provider.health_check() {
                Ok(ProviderStatus::Available) => {
                    println!("{} {}: available", marker, kind)
                }
                Ok(ProviderStatus::NoCredential) => {
                    println!("{} {}: no credential configured", marker, kind)
                }
                Ok(ProviderStatus::Unavailable(reason)) => {
                    println!("{} {}: unavailable ({})", marker, kind, reason)
                }
                Err(e) => println!("{} {}: check failed ({})", marker, kind, e),
            },
            Err(e) => println!("{} {}: {}", marker, kind, e),
        }
    }

    if !Path::new(DB_PATH).exists() {
        println!("No workspace here yet (run `forge init`)");
        return Ok(());
    }

    let studio = open_studio()?;
    println!(
        "Workspace: {} project(s), {} session asset(s)",
        studio.projects().len(),
        studio.session_assets().len()
    );
    for project in studio.projects() {
        let marker = if studio.active_project().map(|p| p.id.as_str())
            == Some(project.id.as_str())
        {
            "*"
        } else {
            " "
        };
        println!(
            "{} {} ({} asset(s))",
            marker,
            project.name,
            project.assets.len()
        );
    }
    Ok(())
}
