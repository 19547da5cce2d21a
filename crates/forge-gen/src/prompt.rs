//! Prompt assembly shared by every provider
//!
//! Both backends receive the same enriched prompt so switching providers
//! does not change what gets asked for.

use forge_core::{GenType, GenerationOptions};

/// Build the full prompt text from the user's options.
///
/// Fragments are joined with `", "`: style, view, then either the
/// sprite-oriented suffix (assets) or the tileable suffix (backgrounds).
pub fn build_prompt(options: &GenerationOptions) -> String {
    let mut parts: Vec<&str> = Vec::new();

    if let Some(style) = options.style.prompt_fragment() {
        parts.push(style);
    }
    parts.push(options.view.prompt_fragment());

    match options.gen_type {
        GenType::Asset => {
            parts.push("game asset");
            parts.push(&options.prompt);
            parts.push("sprite");
            parts.push("transparent background");
        }
        GenType::Background => {
            parts.push("game background");
            parts.push(&options.prompt);
            parts.push("tileable");
            parts.push("seamless pattern");
        }
    }

    parts.retain(|p| !p.is_empty());
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::{ArtStyle, ViewAngle};

    #[test]
    fn test_asset_prompt() {
        let options = GenerationOptions::from_prompt("wooden barrel");
        let prompt = build_prompt(&options);
        assert_eq!(
            prompt,
            "isometric, game asset, wooden barrel, sprite, transparent background"
        );
    }

    #[test]
    fn test_background_prompt() {
        let mut options = GenerationOptions::from_prompt("mossy cobblestone");
        options.gen_type = GenType::Background;
        let prompt = build_prompt(&options);
        assert_eq!(
            prompt,
            "isometric, game background, mossy cobblestone, tileable, seamless pattern"
        );
    }

    #[test]
    fn test_style_and_view_fragments() {
        let mut options = GenerationOptions::from_prompt("tower");
        options.style = ArtStyle::Cartoon;
        options.view = ViewAngle::IsoNe;
        let prompt = build_prompt(&options);
        assert!(prompt.starts_with("cartoon style, isometric, from north-east, "));
    }

    #[test]
    fn test_none_style_adds_nothing() {
        let options = GenerationOptions::from_prompt("crate");
        let prompt = build_prompt(&options);
        assert!(!prompt.contains("style"));
    }
}
