// In: src/error.rs

//! This module defines the single, unified error type for the entire spritefetch crate.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpriteError {
    // =========================================================================
    // === Decode Errors (Fatal for the current render)
    // =========================================================================
    /// A Huffman header, symbol stream or back-reference is malformed.
    #[error("Data corruption: {0}")]
    DataCorruption(String),

    /// The raster buffer could not be reserved.
    #[error("Failed to allocate a raster buffer of {0} bytes")]
    AllocationFailure(usize),

    #[error("No sprite fits a {columns}x{rows} terminal")]
    NoEligibleSprite { columns: u16, rows: u16 },

    /// A cursor tried to read past the end of its payload.
    #[error("Bit read out of bounds: offset {offset} exceeds payload of {limit} bits")]
    OutOfBounds { offset: usize, limit: usize },

    // =========================================================================
    // === Container & Configuration Errors
    // =========================================================================
    #[error("Catalog format error: {0}")]
    CatalogFormat(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the underlying I/O subsystem (stdout, catalog file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, raised while loading a config file.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

impl SpriteError {
    /// Shorthand used by the kernels, which build most corruption messages inline.
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        SpriteError::DataCorruption(msg.into())
    }
}
