//! Local file system side of the lifecycle.
//!
//! Finds descriptors in blackhole folders, moves finished downloads into
//! watch folders and removes spent artifacts. Moves are renames when
//! possible and fall back to copy + delete across file systems; removals
//! treat an already missing path as success.

mod error;
mod fs_relocator;

pub use error::RelocatorError;
pub use fs_relocator::{RelocationResult, Relocator};
