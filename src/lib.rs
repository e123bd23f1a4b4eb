//! This file is the root of the `spritefetch` crate.
//!
//! Its responsibilities are strictly limited to declaring the modules of the
//! library and re-exporting the handful of types the binary and benchmarks
//! drive it through. The decode path is: `catalog` (container parsing and
//! sprite selection) feeds `kernels` (bit cursor, Huffman trees, LZ77 raster
//! and palettes), `pipeline` orchestrates them, and `render` draws the result.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // Make macros available throughout the crate

pub mod catalog;
pub mod config;
pub mod error;
pub mod kernels;
pub mod pipeline;
pub mod render;
pub mod terminal;

#[cfg(test)]
mod testing;

//==================================================================================
// 2. Re-exports
//==================================================================================
pub use catalog::selection::{select_sprite, Selection, TerminalBounds};
pub use catalog::Catalog;
pub use config::SpriteConfig;
pub use error::SpriteError;
pub use pipeline::{render_catalog, render_random, RenderReport, SpriteDecoder};
