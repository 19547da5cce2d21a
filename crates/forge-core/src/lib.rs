//! Forge Core - Foundational types for the Forge asset studio
//!
//! This crate provides the types every other Forge crate depends on:
//! - `Asset`, `Project`, `GenerationOptions` - the studio data model
//! - `ContentHash` - SHA-256 payload fingerprinting
//! - Error types and Result alias
//! - Timestamp helpers

mod error;
mod hash;
pub mod time;
mod types;

pub use error::{ForgeError, Result};
pub use hash::ContentHash;
pub use types::{ArtStyle, Asset, GenType, GenerationOptions, Project, ViewAngle};
