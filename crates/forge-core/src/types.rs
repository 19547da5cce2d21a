//! Shared data model for the Forge studio
//!
//! Assets, projects, and the generation options that describe how an
//! asset was produced. Image payloads travel as base64-encoded PNG so
//! they can live inside JSON/SQLite text columns unchanged.

use crate::time::now_millis;
use serde::{Deserialize, Serialize};

/// What kind of image is being generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenType {
    #[default]
    Asset,
    Background,
}

/// Camera angle baked into the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ViewAngle {
    #[default]
    Isometric,
    IsoN,
    IsoNe,
    IsoE,
    IsoSe,
    IsoS,
    IsoSw,
    IsoW,
    IsoNw,
    TopDown,
    Front,
    Side,
}

impl ViewAngle {
    /// Prompt fragment describing this view
    pub fn prompt_fragment(&self) -> &'static str {
        match self {
            ViewAngle::Isometric => "isometric",
            ViewAngle::IsoN => "isometric, from north",
            ViewAngle::IsoNe => "isometric, from north-east",
            ViewAngle::IsoE => "isometric, from east",
            ViewAngle::IsoSe => "isometric, from south-east",
            ViewAngle::IsoS => "isometric, from south",
            ViewAngle::IsoSw => "isometric, from south-west",
            ViewAngle::IsoW => "isometric, from west",
            ViewAngle::IsoNw => "isometric, from north-west",
            ViewAngle::TopDown => "top-down orthographic, 2d",
            ViewAngle::Front => "front view, orthographic, 2d",
            ViewAngle::Side => "side view, orthographic, 2d",
        }
    }
}

/// Art style baked into the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArtStyle {
    #[default]
    None,
    Illustration,
    Vector,
    Cartoon,
    Hd,
    Outline,
    #[serde(rename = "b&w")]
    BlackAndWhite,
}

impl ArtStyle {
    /// Prompt fragment for this style, or `None` for the neutral style
    pub fn prompt_fragment(&self) -> Option<&'static str> {
        match self {
            ArtStyle::None => None,
            ArtStyle::Illustration => Some("illustration style"),
            ArtStyle::Vector => Some("vector art style"),
            ArtStyle::Cartoon => Some("cartoon style"),
            ArtStyle::Hd => Some("hd, detailed, intricate"),
            ArtStyle::Outline => Some("thick outlines, cel shaded"),
            ArtStyle::BlackAndWhite => Some("black and white, grayscale"),
        }
    }
}

/// The full set of parameters a generation request was made with.
///
/// Kept on the asset so a generation can be repeated or tweaked later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub prompt: String,
    #[serde(default)]
    pub gen_type: GenType,
    #[serde(default)]
    pub view: ViewAngle,
    #[serde(default)]
    pub style: ArtStyle,
    /// Seed for reproducibility
    #[serde(default)]
    pub seed: Option<u64>,
    /// Id of the asset this regenerates, if any
    #[serde(default)]
    pub original_id: Option<String>,
}

impl GenerationOptions {
    /// Options with defaults for everything but the prompt
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            gen_type: GenType::Asset,
            view: ViewAngle::Isometric,
            style: ArtStyle::None,
            seed: None,
            original_id: None,
        }
    }
}

/// A generated image plus the metadata needed to manage it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique id (UUID)
    pub id: String,
    /// Base64-encoded PNG payload
    pub image_data: String,
    /// The user's original prompt text
    pub prompt: String,
    /// Parameters the image was generated with
    pub options: GenerationOptions,
    /// Unix milliseconds
    pub created_at: i64,
}

impl Asset {
    /// Create a new asset from a generation result
    pub fn new(image_data: String, options: GenerationOptions) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            image_data,
            prompt: options.prompt.clone(),
            options,
            created_at: now_millis(),
        }
    }
}

/// A named, ordered collection of assets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub assets: Vec<Asset>,
}

impl Project {
    /// Create a new empty project
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            assets: Vec::new(),
        }
    }

    /// Whether the project already contains the asset id
    pub fn contains(&self, asset_id: &str) -> bool {
        self.assets.iter().any(|a| a.id == asset_id)
    }
}
