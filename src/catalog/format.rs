//! Defines the binary container format of a sprite catalog.
//! This module is the single source of truth for the fixed header layout and
//! the little-endian field readers the catalog parser is built from.
//!
//! Layout, in order:
//! 1. Fixed header: magic `SPRC`, `u16` version, `u8` layout, `u8` palette
//!    encoding, `u8` flags, `u8` reserved, `u16` sprite count.
//! 2. One Huffman header per layout role, then the color header when palettes
//!    are coded. Each is `u16 shape_bits`, shape bytes, `u16 perm_len`, perm.
//! 3. `u8` stream count, then per stream a `u32` byte length and its bytes.
//! 4. Sprite table: `u16 width`, `u16 height`, one `u32` bit length per stream,
//!    then for packed palettes a `u8` count with that many normal and shiny
//!    `u16` words.

use std::io::{Cursor, Read};

use crate::error::SpriteError;
use crate::kernels::huffman::HuffmanHeader;
use crate::kernels::lz77::StreamLayout;

//==================================================================================
// Format Constants
//==================================================================================
pub const CATALOG_MAGIC: &[u8; 4] = b"SPRC";
pub const CATALOG_FORMAT_VERSION: u16 = 1;
/// Flags bit 0: every role shares one interleaved stream.
pub const FLAG_INTERLEAVED: u8 = 0b0000_0001;
/// Size of the fixed header in bytes.
pub const FIXED_HEADER_SIZE: usize = 12; // magic(4) + ver(2) + layout/palette/flags/reserved(4) + count(2)
/// Packed palettes hold at most this many words per variant (slot 0 is implicit).
pub const MAX_PACKED_COLORS: usize = 15;

//==================================================================================
// Header Types
//==================================================================================

/// Where a catalog keeps its palettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteEncoding {
    /// Huffman-coded 5-bit channels in a dedicated color stream.
    Coded,
    /// RGB555 words stored in the sprite table.
    Packed,
}

impl PaletteEncoding {
    pub fn tag(self) -> u8 {
        match self {
            PaletteEncoding::Coded => 0,
            PaletteEncoding::Packed => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, SpriteError> {
        match tag {
            0 => Ok(PaletteEncoding::Coded),
            1 => Ok(PaletteEncoding::Packed),
            other => Err(SpriteError::CatalogFormat(format!(
                "Unknown palette encoding tag {}",
                other
            ))),
        }
    }
}

/// The decoded fixed-size header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedHeader {
    pub layout: StreamLayout,
    pub palette: PaletteEncoding,
    pub interleaved: bool,
    pub sprite_count: u16,
}

impl FixedHeader {
    /// Number of payload streams a catalog with this header must carry.
    pub fn expected_streams(&self) -> usize {
        if self.interleaved {
            1
        } else {
            match self.palette {
                PaletteEncoding::Coded => self.layout.roles().len() + 1,
                PaletteEncoding::Packed => self.layout.roles().len(),
            }
        }
    }

    pub fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, SpriteError> {
        let remaining = (cursor.get_ref().len() as u64).saturating_sub(cursor.position());
        if remaining < FIXED_HEADER_SIZE as u64 {
            return Err(SpriteError::CatalogFormat(format!(
                "Catalog is too small to be valid. Minimum size: {}, got: {}",
                FIXED_HEADER_SIZE, remaining
            )));
        }

        let mut magic_buf = [0u8; 4];
        cursor.read_exact(&mut magic_buf).map_err(map_err)?;
        if magic_buf != *CATALOG_MAGIC {
            return Err(SpriteError::CatalogFormat(
                "Invalid catalog magic number".into(),
            ));
        }

        let version = read_u16(cursor)?;
        if version != CATALOG_FORMAT_VERSION {
            return Err(SpriteError::CatalogFormat(format!(
                "Unsupported catalog version: expected {}, got {}",
                CATALOG_FORMAT_VERSION, version
            )));
        }

        let layout = StreamLayout::from_tag(read_u8(cursor)?)?;
        let palette = PaletteEncoding::from_tag(read_u8(cursor)?)?;
        let flags = read_u8(cursor)?;
        if flags & !FLAG_INTERLEAVED != 0 {
            return Err(SpriteError::CatalogFormat(format!(
                "Unknown catalog flags 0x{:02x}",
                flags
            )));
        }
        let _reserved = read_u8(cursor)?;
        let sprite_count = read_u16(cursor)?;

        Ok(Self {
            layout,
            palette,
            interleaved: flags & FLAG_INTERLEAVED != 0,
            sprite_count,
        })
    }
}

//==================================================================================
// Field Readers
//==================================================================================

fn map_err(e: std::io::Error) -> SpriteError {
    SpriteError::CatalogFormat(format!("Catalog truncated: {}", e))
}

pub(crate) fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8, SpriteError> {
    let mut buf = [0u8; 1];
    cursor.read_exact(&mut buf).map_err(map_err)?;
    Ok(buf[0])
}

pub(crate) fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16, SpriteError> {
    let mut buf = [0u8; 2];
    cursor.read_exact(&mut buf).map_err(map_err)?;
    Ok(u16::from_le_bytes(buf))
}

pub(crate) fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32, SpriteError> {
    let mut buf = [0u8; 4];
    cursor.read_exact(&mut buf).map_err(map_err)?;
    Ok(u32::from_le_bytes(buf))
}

/// Borrows the next `len` bytes of the underlying buffer without copying.
pub(crate) fn read_slice<'a>(
    cursor: &mut Cursor<&'a [u8]>,
    len: usize,
) -> Result<&'a [u8], SpriteError> {
    let data: &'a [u8] = *cursor.get_ref();
    let start = cursor.position() as usize;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| {
            SpriteError::CatalogFormat(format!(
                "Catalog truncated: {} bytes requested at offset {} of {}",
                len,
                start,
                data.len()
            ))
        })?;
    cursor.set_position(end as u64);
    Ok(&data[start..end])
}

/// Reads one serialized Huffman header.
pub(crate) fn read_huffman_header<'a>(
    cursor: &mut Cursor<&'a [u8]>,
) -> Result<HuffmanHeader<'a>, SpriteError> {
    let shape_bits = read_u16(cursor)? as usize;
    let shape = read_slice(cursor, shape_bits.div_ceil(8))?;
    let perm_len = read_u16(cursor)? as usize;
    let permutation = read_slice(cursor, perm_len)?;
    HuffmanHeader::new(shape, shape_bits, permutation)
}
