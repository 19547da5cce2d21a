//! Forge Store - Embedded persistence for the asset studio
//!
//! Wraps an SQLite database holding the normalized asset table, dehydrated
//! project records, and the small metadata records (active project id,
//! session asset ids). See [`StudioStore`] for the save/load contract.

mod db;

pub use db::{StoredState, StudioStore};
