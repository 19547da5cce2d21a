//! Workspace initialization command

use crate::commands::open_studio;
use anyhow::Result;
use forge_gen::StudioConfig;

pub fn run() -> Result<()> {
    let config_path = StudioConfig::local_config_path();
    if config_path.exists() {
        anyhow::bail!("Workspace already initialized ({})", config_path.display());
    }

    StudioConfig::default().save_to_file(&config_path)?;

    // Opening the studio creates the database and the default project
    let studio = open_studio()?;
    let project = studio.projects().first().map(|p| p.name.as_str()).unwrap_or("");

    println!("Initialized Forge workspace");
    println!("  Settings: {}", config_path.display());
    println!("  Project:  {}", project);
    println!();
    println!("Next steps:");
    println!("  forge config set gemini.api_key <key>");
    println!("  forge generate \"a wooden barrel\"");

    Ok(())
}
