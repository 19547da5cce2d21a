//! Project management commands

use crate::commands::open_studio;
use anyhow::Result;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a project and make it active
    Create {
        /// Project name
        name: String,
    },

    /// List projects
    List,

    /// Make a project active
    Switch {
        /// Project id
        id: String,
    },

    /// Delete a project (its unshared assets are garbage-collected)
    Delete {
        /// Project id
        id: String,
    },
}

pub fn run(cmd: ProjectCommands) -> Result<()> {
    match cmd {
        ProjectCommands::Create { name } => {
            let mut studio = open_studio()?;
            let project = studio.create_project(&name)?;
            println!("Created project '{}' ({})", project.name, project.id);
            Ok(())
        }
        ProjectCommands::List => {
            let studio = open_studio()?;
            let active_id = studio.active_project().map(|p| p.id.clone());
            for project in studio.projects() {
                let marker = if Some(&project.id) == active_id.as_ref() {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} {}  {}  ({} asset(s))",
                    marker,
                    project.id,
                    project.name,
                    project.assets.len()
                );
            }
            Ok(())
        }
        ProjectCommands::Switch { id } => {
            let mut studio = open_studio()?;
            studio.switch_project(&id)?;
            println!("Active project: {}", id);
            Ok(())
        }
        ProjectCommands::Delete { id } => {
            let mut studio = open_studio()?;
            studio.delete_project(&id)?;
            println!("Deleted project {}", id);
            Ok(())
        }
    }
}
