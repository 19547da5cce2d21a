//! Godot project bundle export
//!
//! Packs selected assets (or a composed spritesheet) into a zip that can
//! be dropped into a Godot project: one PNG, one `.tscn` scene, and one
//! `.png.import` descriptor per asset or sheet.

use crate::sheet::{encode_png, SpriteSheet};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use forge_core::{Asset, ForgeError, Result};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const SLUG_MAX_LEN: usize = 40;
const FALLBACK_SLUG: &str = "forge_asset";

/// Sanitize prompt text into a filename-safe slug: non-alphanumerics
/// become underscores, truncated to 40 characters.
pub fn slug(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(SLUG_MAX_LEN)
        .collect();
    if cleaned.chars().all(|c| c == '_') {
        FALLBACK_SLUG.to_string()
    } else {
        cleaned
    }
}

/// Disambiguate a slug against names already used in the archive
fn unique_slug(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Texture import descriptor Godot expects next to each PNG
fn import_descriptor() -> &'static str {
    r#"[remap]

importer="texture"
type="Texture2D"
path="res://.godot/imported/image.png-hash.ctex"
metadata={
"vram_texture": false
}

[deps]

source_file="res://image.png"
dest_files=["res://.godot/imported/image.png-hash.ctex"]

[params]

compress/mode=0
compress/lossy_quality=0.7
compress/hdr_compression=1
compress/normal_map=0
compress/channel_pack=0
mipmaps/generate=false
mipmaps/limit=-1
roughness/map_mode=0
roughness/src_normal=""
process/fix_alpha_border=true
process/premultiply_alpha=false
process/normal_map_invert_y=false
process/hdr_as_srgb=false
process/hdr_clamp_exposure=false
process/size_limit=0
detect_3d/compress_to=0
"#
}

/// Scene file for a single asset: an unshaded Sprite3D billboard
fn sprite3d_scene(node_name: &str, texture_path: &str) -> String {
    format!(
        r#"[gd_scene load_steps=3 format=3]

[ext_resource type="Texture2D" path="{texture_path}" id="1_dgwqp"]

[sub_resource type="StandardMaterial3D" id="StandardMaterial3D_o3v8g"]
albedo_texture = ExtResource("1_dgwqp")
texture_filter = 0
shading_mode = 0
specular_mode = 2
albedo_color = Color(1, 1, 1, 1)
disable_ambient_light = true

[node name="{node_name}" type="Sprite3D"]
material_override = SubResource("StandardMaterial3D_o3v8g")
texture = ExtResource("1_dgwqp")
"#
    )
}

/// Scene file for a composed sheet: a Sprite2D with frame slicing
fn sprite2d_sheet_scene(node_name: &str, texture_path: &str, columns: u32, rows: u32) -> String {
    format!(
        r#"[gd_scene load_steps=2 format=3]

[ext_resource type="Texture2D" path="{texture_path}" id="1_abcde"]

[node name="{node_name}" type="Sprite2D"]
texture = ExtResource("1_abcde")
hframes = {columns}
vframes = {rows}
"#
    )
}

/// Bundle the given assets into an in-memory zip archive.
///
/// Per asset: `<slug>.png`, `<slug>.tscn`, `<slug>.png.import`. Slug
/// collisions get numeric suffixes so N assets always produce N triples.
pub fn export_assets(assets: &[Asset]) -> Result<Vec<u8>> {
    if assets.is_empty() {
        return Err(ForgeError::ExportError(
            "no assets selected for export".to_string(),
        ));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut used = HashSet::new();

    for asset in assets {
        let name = unique_slug(&slug(&asset.prompt), &mut used);
        let png_filename = format!("{}.png", name);
        let texture_path = format!("res://{}", png_filename);

        let image_bytes = BASE64.decode(&asset.image_data).map_err(|e| {
            ForgeError::ImageError(format!("Asset {} is not valid base64: {}", asset.id, e))
        })?;

        write_entry(&mut zip, &png_filename, &image_bytes, options)?;
        write_entry(
            &mut zip,
            &format!("{}.tscn", name),
            sprite3d_scene(&name, &texture_path).as_bytes(),
            options,
        )?;
        write_entry(
            &mut zip,
            &format!("{}.import", png_filename),
            import_descriptor().as_bytes(),
            options,
        )?;
    }

    finish(zip)
}

/// Bundle a composed spritesheet into an in-memory zip archive
pub fn export_sheet(sheet: &SpriteSheet, name: &str) -> Result<Vec<u8>> {
    let name = slug(name);
    let png_filename = format!("{}.png", name);
    let texture_path = format!("res://{}", png_filename);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    write_entry(&mut zip, &png_filename, &encode_png(&sheet.image)?, options)?;
    write_entry(
        &mut zip,
        &format!("{}.tscn", name),
        sprite2d_sheet_scene(&name, &texture_path, sheet.layout.columns, sheet.layout.rows)
            .as_bytes(),
        options,
    )?;
    write_entry(
        &mut zip,
        &format!("{}.import", png_filename),
        import_descriptor().as_bytes(),
        options,
    )?;

    finish(zip)
}

/// Default archive filename: the single asset's slug, or a generic name
/// for multi-asset exports
pub fn archive_name(assets: &[Asset]) -> String {
    if assets.len() == 1 {
        format!("{}.zip", slug(&assets[0].prompt))
    } else {
        "Forge_Export.zip".to_string()
    }
}

fn write_entry(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    bytes: &[u8],
    options: SimpleFileOptions,
) -> Result<()> {
    zip.start_file(name, options)
        .map_err(|e| ForgeError::ExportError(format!("Failed to add {} to archive: {}", name, e)))?;
    zip.write_all(bytes)?;
    Ok(())
}

fn finish(zip: ZipWriter<Cursor<Vec<u8>>>) -> Result<Vec<u8>> {
    let cursor = zip
        .finish()
        .map_err(|e| ForgeError::ExportError(format!("Failed to finalize archive: {}", e)))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::compose_sheet;
    use forge_core::GenerationOptions;
    use image::{Rgba, RgbaImage};
    use std::io::Read;

    fn sample_asset(prompt: &str) -> Asset {
        let image = RgbaImage::from_pixel(4, 4, Rgba([120, 40, 200, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        Asset::new(BASE64.encode(bytes), GenerationOptions::from_prompt(prompt))
    }

    fn archive_names(bytes: &[u8]) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_slug_sanitizes_and_truncates() {
        assert_eq!(slug("old oak barrel!"), "old_oak_barrel_");
        assert_eq!(slug(&"x".repeat(80)).len(), 40);
        assert_eq!(slug("!!!"), "forge_asset");
        assert_eq!(slug(""), "forge_asset");
    }

    #[test]
    fn test_export_contains_triple_per_asset() {
        let assets = vec![sample_asset("barrel"), sample_asset("lantern")];
        let bytes = export_assets(&assets).unwrap();
        let names = archive_names(&bytes);

        assert_eq!(names.len(), 6);
        for slug in ["barrel", "lantern"] {
            assert!(names.contains(&format!("{}.png", slug)));
            assert!(names.contains(&format!("{}.tscn", slug)));
            assert!(names.contains(&format!("{}.png.import", slug)));
        }
    }

    #[test]
    fn test_colliding_prompts_still_yield_n_triples() {
        let assets = vec![
            sample_asset("barrel"),
            sample_asset("barrel"),
            sample_asset("barrel"),
        ];
        let bytes = export_assets(&assets).unwrap();
        let names = archive_names(&bytes);

        assert_eq!(names.len(), 9);
        let pngs: Vec<_> = names.iter().filter(|n| n.ends_with(".png")).collect();
        assert_eq!(pngs.len(), 3);
        assert!(names.contains(&"barrel.png".to_string()));
        assert!(names.contains(&"barrel_2.png".to_string()));
        assert!(names.contains(&"barrel_3.png".to_string()));
    }

    #[test]
    fn test_image_bytes_pass_through_unchanged() {
        let asset = sample_asset("crate");
        let original = BASE64.decode(&asset.image_data).unwrap();

        let bytes = export_assets(std::slice::from_ref(&asset)).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name("crate.png").unwrap();
        let mut extracted = Vec::new();
        file.read_to_end(&mut extracted).unwrap();

        assert_eq!(extracted, original);
    }

    #[test]
    fn test_empty_export_rejected() {
        assert!(export_assets(&[]).is_err());
    }

    #[test]
    fn test_sheet_export_slices_frames() {
        let assets = vec![
            sample_asset("walk 1"),
            sample_asset("walk 2"),
            sample_asset("walk 3"),
        ];
        let sheet = compose_sheet(&assets, 2, 0).unwrap();
        let bytes = export_sheet(&sheet, "walk cycle").unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut scene = String::new();
        archive
            .by_name("walk_cycle.tscn")
            .unwrap()
            .read_to_string(&mut scene)
            .unwrap();
        assert!(scene.contains("hframes = 2"));
        assert!(scene.contains("vframes = 2"));
        assert!(scene.contains("Sprite2D"));
    }

    #[test]
    fn test_archive_name() {
        let single = vec![sample_asset("iron sword")];
        assert_eq!(archive_name(&single), "iron_sword.zip");
        let multi = vec![sample_asset("a"), sample_asset("b")];
        assert_eq!(archive_name(&multi), "Forge_Export.zip");
    }
}
