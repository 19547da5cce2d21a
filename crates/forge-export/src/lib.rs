//! Forge Export - Packaging assets for a game engine
//!
//! Composes spritesheets and bundles assets into Godot-compatible zip
//! archives (PNG + scene + import descriptor per asset).

pub mod godot;
pub mod sheet;

pub use godot::{archive_name, export_assets, export_sheet, slug};
pub use sheet::{compose_sheet, decode_asset_image, encode_png, SheetLayout, SpriteSheet};
