//! Forge Studio - Application state and workflows
//!
//! Ties the store and the providers together: generation with a pending
//! preview, the session tray, project libraries, selection, and
//! inpaint-in-place.

pub mod session;

pub use session::{Studio, DEFAULT_PROJECT_NAME};
