//! Spritesheet composition
//!
//! Lays selected assets out on a row-major grid. Every cell is sized to
//! the largest source image so Godot's `hframes`/`vframes` slicing lines
//! up regardless of individual sprite sizes.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use forge_core::{Asset, ForgeError, Result};
use image::{imageops, RgbaImage};

/// Grid geometry of a composed sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    pub columns: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
}

/// A composed spritesheet plus its layout
pub struct SpriteSheet {
    pub image: RgbaImage,
    pub layout: SheetLayout,
}

/// Decode an asset's base64 payload into pixels
pub fn decode_asset_image(asset: &Asset) -> Result<RgbaImage> {
    let bytes = BASE64
        .decode(&asset.image_data)
        .map_err(|e| ForgeError::ImageError(format!("Asset {} is not valid base64: {}", asset.id, e)))?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| ForgeError::ImageError(format!("Asset {} is not a decodable image: {}", asset.id, e)))?;
    Ok(image.to_rgba8())
}

/// Compose the given assets into a grid sheet.
///
/// `columns` is clamped to `1..=assets.len()`; rows follow from the
/// asset count. `padding` pixels of transparency separate cells.
pub fn compose_sheet(assets: &[Asset], columns: u32, padding: u32) -> Result<SpriteSheet> {
    if assets.is_empty() {
        return Err(ForgeError::ExportError(
            "no assets selected for the spritesheet".to_string(),
        ));
    }

    let images: Vec<RgbaImage> = assets
        .iter()
        .map(decode_asset_image)
        .collect::<Result<_>>()?;

    let columns = columns.clamp(1, assets.len() as u32);
    let rows = (assets.len() as u32).div_ceil(columns);
    let cell_width = images.iter().map(|i| i.width()).max().unwrap_or(1);
    let cell_height = images.iter().map(|i| i.height()).max().unwrap_or(1);

    let sheet_width = columns * cell_width + (columns - 1) * padding;
    let sheet_height = rows * cell_height + (rows - 1) * padding;
    let mut canvas = RgbaImage::new(sheet_width, sheet_height);

    for (index, source) in images.iter().enumerate() {
        let col = index as u32 % columns;
        let row = index as u32 / columns;
        let x = col * (cell_width + padding);
        let y = row * (cell_height + padding);
        imageops::overlay(&mut canvas, source, x as i64, y as i64);
    }

    log::debug!(
        "composed {}x{} sheet from {} asset(s)",
        sheet_width,
        sheet_height,
        assets.len()
    );

    Ok(SpriteSheet {
        image: canvas,
        layout: SheetLayout {
            columns,
            rows,
            cell_width,
            cell_height,
        },
    })
}

/// Encode a composed image to PNG bytes
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .map_err(|e| ForgeError::ImageError(format!("Failed to encode sheet PNG: {}", e)))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::GenerationOptions;
    use image::Rgba;

    fn asset_with_image(width: u32, height: u32, color: [u8; 4]) -> Asset {
        let image = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut bytes = Vec::new();
        image
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        Asset::new(BASE64.encode(bytes), GenerationOptions::from_prompt("cell"))
    }

    #[test]
    fn test_grid_dimensions() {
        let assets = vec![
            asset_with_image(16, 16, [255, 0, 0, 255]),
            asset_with_image(16, 16, [0, 255, 0, 255]),
            asset_with_image(16, 16, [0, 0, 255, 255]),
        ];
        let sheet = compose_sheet(&assets, 2, 2).unwrap();
        assert_eq!(sheet.layout.columns, 2);
        assert_eq!(sheet.layout.rows, 2);
        // 2 * 16 + 1 * 2 padding
        assert_eq!(sheet.image.width(), 34);
        assert_eq!(sheet.image.height(), 34);
    }

    #[test]
    fn test_cells_sized_to_largest_source() {
        let assets = vec![
            asset_with_image(8, 8, [255, 0, 0, 255]),
            asset_with_image(32, 16, [0, 255, 0, 255]),
        ];
        let sheet = compose_sheet(&assets, 2, 0).unwrap();
        assert_eq!(sheet.layout.cell_width, 32);
        assert_eq!(sheet.layout.cell_height, 16);
        assert_eq!(sheet.image.width(), 64);
    }

    #[test]
    fn test_pixels_land_in_cells() {
        let assets = vec![
            asset_with_image(4, 4, [255, 0, 0, 255]),
            asset_with_image(4, 4, [0, 255, 0, 255]),
        ];
        let sheet = compose_sheet(&assets, 2, 0).unwrap();
        assert_eq!(sheet.image.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(sheet.image.get_pixel(4, 0), &Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_columns_clamped() {
        let assets = vec![asset_with_image(4, 4, [1, 2, 3, 255])];
        let sheet = compose_sheet(&assets, 10, 0).unwrap();
        assert_eq!(sheet.layout.columns, 1);
        assert_eq!(sheet.layout.rows, 1);
    }

    #[test]
    fn test_empty_selection_rejected() {
        assert!(compose_sheet(&[], 2, 0).is_err());
    }

    #[test]
    fn test_bad_payload_rejected() {
        let asset = Asset::new(
            "definitely not base64 png!!".to_string(),
            GenerationOptions::from_prompt("broken"),
        );
        assert!(compose_sheet(&[asset], 1, 0).is_err());
    }
}
