//! Forge CLI - Command-line interface for the Forge asset studio

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{asset, config, export, generate, init, inpaint, project, status};
use forge_core::{ArtStyle, GenType, ViewAngle};

#[derive(Parser)]
#[command(name = "forge")]
#[command(about = "AI asset studio for game developers", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a Forge workspace in the current directory
    Init,

    /// Generate an asset and add it to the session
    Generate {
        /// Description of the asset to generate
        prompt: String,

        /// What to generate (asset or background)
        #[arg(long = "type", default_value = "asset", value_parser = parse_gen_type)]
        gen_type: GenType,

        /// Camera angle (isometric, iso-n..iso-nw, top-down, front, side)
        #[arg(long, default_value = "isometric", value_parser = parse_view)]
        view: ViewAngle,

        /// Art style (none, illustration, vector, cartoon, hd, outline, b&w)
        #[arg(long, default_value = "none", value_parser = parse_style)]
        style: ArtStyle,

        /// Random seed for reproducibility (ComfyUI only)
        #[arg(long)]
        seed: Option<u64>,

        /// Provider override (gemini, comfyui, mock)
        #[arg(long)]
        provider: Option<String>,

        /// Also copy the result into the active project's library
        #[arg(long)]
        save: bool,

        /// Also write the generated PNG to this path
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Regenerate an existing asset with its original options
    Regenerate {
        /// Asset id to regenerate
        id: String,

        /// Provider override (gemini, comfyui, mock)
        #[arg(long)]
        provider: Option<String>,
    },

    /// Regenerate the masked region of an asset in place
    Inpaint {
        /// Asset id to edit
        id: String,

        /// Path to a PNG mask (opaque pixels mark the region to regenerate)
        #[arg(long)]
        mask: String,

        /// Description of what the masked region should become
        #[arg(long, short)]
        prompt: String,

        /// Provider override (gemini, comfyui, mock)
        #[arg(long)]
        provider: Option<String>,
    },

    /// Asset operations
    #[command(subcommand)]
    Asset(asset::AssetCommands),

    /// Project operations
    #[command(subcommand)]
    Project(project::ProjectCommands),

    /// Export assets as a Godot-ready zip archive
    Export {
        /// Asset ids to export (defaults to the active project's library)
        ids: Vec<String>,

        /// Output path for the archive
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Compose assets into a spritesheet and export it
    Sheet {
        /// Asset ids to compose (defaults to the active project's library)
        ids: Vec<String>,

        /// Number of grid columns
        #[arg(long, default_value = "4")]
        columns: u32,

        /// Transparent padding between cells, in pixels
        #[arg(long, default_value = "0")]
        padding: u32,

        /// Sheet name (used for filenames inside the archive)
        #[arg(long, default_value = "spritesheet")]
        name: String,

        /// Output path for the archive
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Settings operations
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Show provider health and workspace state
    Status,
}

fn parse_gen_type(s: &str) -> Result<GenType, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown type '{}'; valid values: asset, background", s))
}

fn parse_view(s: &str) -> Result<ViewAngle, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|_| {
        format!(
            "unknown view '{}'; valid values: isometric, iso-n, iso-ne, iso-e, iso-se, \
             iso-s, iso-sw, iso-w, iso-nw, top-down, front, side",
            s
        )
    })
}

fn parse_style(s: &str) -> Result<ArtStyle, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|_| {
        format!(
            "unknown style '{}'; valid values: none, illustration, vector, cartoon, hd, \
             outline, b&w",
            s
        )
    })
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => init::run(),
        Commands::Generate {
            prompt,
            gen_type,
            view,
            style,
            seed,
            provider,
            save,
            output,
        } => generate::run(generate::GenerateArgs {
            prompt,
            gen_type,
            view,
            style,
            seed,
            provider,
            save,
            output,
        }),
        Commands::Regenerate { id, provider } => generate::run_regenerate(&id, provider.as_deref()),
        Commands::Inpaint {
            id,
            mask,
            prompt,
            provider,
        } => inpaint::run(&id, &mask, &prompt, provider.as_deref()),
        Commands::Asset(cmd) => asset::run(cmd),
        Commands::Project(cmd) => project::run(cmd),
        Commands::Export { ids, output } => export::run_export(&ids, output.as_deref()),
        Commands::Sheet {
            ids,
            columns,
            padding,
            name,
            output,
        } => export::run_sheet(&ids, columns, padding, &name, output.as_deref()),
        Commands::Config(cmd) => config::run(cmd),
        Commands::Status => status::run(),
    }
}
