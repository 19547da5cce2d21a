//! Settings commands

use crate::commands::resolve_provider;
use anyhow::{Context, Result};
use clap::Subcommand;
use forge_gen::{ProviderStatus, StudioConfig};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the resolved settings (global < project < env)
    Show,

    /// Set a settings value
    Set {
        /// Key to set (provider, gemini.api_key, comfyui.address)
        key: String,

        /// Value to store
        value: String,

        /// Write to ~/.forge/config.toml instead of .forge/config.toml
        #[arg(long)]
        global: bool,
    },

    /// Check that the configured provider is reachable
    Test {
        /// Provider override (gemini, comfyui, mock)
        #[arg(long)]
        provider: Option<String>,
    },
}

pub fn run(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show => run_show(),
        ConfigCommands::Set { key, value, global } => run_set(&key, &value, global),
        ConfigCommands::Test { provider } => run_test(provider.as_deref()),
    }
}

fn mask(key: &str) -> String {
    if key.len() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", &key[..4])
    }
}

fn run_show() -> Result<()> {
    let config = StudioConfig::load()?;

    println!("Provider: {}", config.provider);
    match config.api_key("gemini") {
        Some(key) => println!("  gemini.api_key: {}", mask(key)),
        None => println!("  gemini.api_key: (not set)"),
    }
    match config.address("comfyui") {
        Some(address) => println!("  comfyui.address: {}", address),
        None => println!("  comfyui.address: (default)"),
    }
    Ok(())
}

fn run_set(key: &str, value: &str, global: bool) -> Result<()> {
    let path: PathBuf = if global {
        StudioConfig::global_config_path().context("Could not determine home directory")?
    } else {
        StudioConfig::local_config_path()
    };

    let mut config = if path.exists() {
        StudioConfig::load_raw(&path)?
    } else {
        StudioConfig::default()
    };

    match key {
        "provider" => config.provider = value.parse()?,
        "gemini.api_key" => config.set_api_key("gemini", value),
        "comfyui.address" => config.set_address("comfyui", value),
        _ => anyhow::bail!(
            "Unknown key '{}'. Available: provider, gemini.api_key, comfyui.address",
            key
        ),
    }

    config.save_to_file(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn run_test(provider_override: Option<&str>) -> Result<()> {
    let config = StudioConfig::load()?;
    let provider = resolve_provider(provider_override, &config)?;

    print!("{}: ", provider.name());
    match provider.health_check()? {
        ProviderStatus::Available => println!("available"),
        ProviderStatus::NoCredential => println!("no credential configured"),
        ProviderStatus::Unavailable(reason) => println!("unavailable ({})", reason),
    }
    Ok(())
}
