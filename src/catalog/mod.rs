//! The sprite catalog: a parsed, borrowed view over one catalog blob.
//!
//! Parsing validates the container up front (stream counts, per-stream span
//! totals, palette word counts, trailing bytes) so the decode kernels only
//! ever see structurally sound headers and payloads. Sprite bit offsets are
//! never stored; they are running sums of the per-stream spans, computed by
//! whoever walks the table.

pub mod format;
pub mod selection;

use std::io::Cursor;

use crate::error::SpriteError;
use crate::kernels::huffman::HuffmanHeader;
use crate::kernels::lz77::StreamLayout;
use format::{
    read_huffman_header, read_slice, read_u16, read_u32, read_u8, FixedHeader, PaletteEncoding,
    MAX_PACKED_COLORS,
};

/// The catalog compiled into the binary.
pub static EMBEDDED_CATALOG: &[u8] = include_bytes!("../../assets/catalog.bin");

/// Parses the embedded catalog.
pub fn embedded() -> Result<Catalog<'static>, SpriteError> {
    Catalog::parse(EMBEDDED_CATALOG)
}

//==================================================================================
// 1. Sprite Table Entries
//==================================================================================

/// Normal and shiny RGB555 words for one sprite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedPalettes {
    pub normal: Vec<u16>,
    pub shiny: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteEntry {
    pub width: u16,
    pub height: u16,
    stream_bits: Vec<u32>,
    packed: Option<PackedPalettes>,
}

impl SpriteEntry {
    /// Bits this sprite occupies in each stream, in stream order.
    pub fn stream_bits(&self) -> &[u32] {
        &self.stream_bits
    }

    pub fn packed_palettes(&self) -> Option<&PackedPalettes> {
        self.packed.as_ref()
    }

    /// Terminal rows the sprite needs: two pixel rows per text row.
    pub fn text_rows(&self) -> u32 {
        (self.height as u32).div_ceil(2)
    }
}

//==================================================================================
// 2. The Catalog
//==================================================================================

#[derive(Debug, Clone)]
pub struct Catalog<'a> {
    header: FixedHeader,
    role_headers: Vec<HuffmanHeader<'a>>,
    color_header: Option<HuffmanHeader<'a>>,
    payloads: Vec<&'a [u8]>,
    sprites: Vec<SpriteEntry>,
}

impl<'a> Catalog<'a> {
    /// Parses and validates a catalog blob. Payloads and Huffman headers stay
    /// borrowed from `bytes`.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, SpriteError> {
        let mut cursor = Cursor::new(bytes);
        let header = FixedHeader::read(&mut cursor)?;

        let role_headers = header
            .layout
            .roles()
            .iter()
            .map(|_| read_huffman_header(&mut cursor))
            .collect::<Result<Vec<_>, _>>()?;
        let color_header = match header.palette {
            PaletteEncoding::Coded => Some(read_huffman_header(&mut cursor)?),
            PaletteEncoding::Packed => None,
        };

        let stream_count = read_u8(&mut cursor)? as usize;
        if stream_count != header.expected_streams() {
            return Err(SpriteError::CatalogFormat(format!(
                "Catalog declares {} streams, {:?}/{:?} (interleaved: {}) needs {}",
                stream_count,
                header.layout,
                header.palette,
                header.interleaved,
                header.expected_streams()
            )));
        }
        let mut payloads = Vec::with_capacity(stream_count);
        for _ in 0..stream_count {
            let len = read_u32(&mut cursor)? as usize;
            payloads.push(read_slice(&mut cursor, len)?);
        }

        let mut sprites = Vec::with_capacity(header.sprite_count as usize);
        let mut totals = vec![0u64; stream_count];
        for index in 0..header.sprite_count {
            let width = read_u16(&mut cursor)?;
            let height = read_u16(&mut cursor)?;
            let mut stream_bits = Vec::with_capacity(stream_count);
            for total in totals.iter_mut() {
                let bits = read_u32(&mut cursor)?;
                *total += bits as u64;
                stream_bits.push(bits);
            }
            let packed = match header.palette {
                PaletteEncoding::Packed => Some(read_packed_palettes(&mut cursor, index)?),
                PaletteEncoding::Coded => None,
            };
            sprites.push(SpriteEntry {
                width,
                height,
                stream_bits,
                packed,
            });
        }

        for (stream, (total, payload)) in totals.iter().zip(&payloads).enumerate() {
            let limit = payload.len() as u64 * 8;
            if *total > limit {
                return Err(SpriteError::CatalogFormat(format!(
                    "Sprite spans in stream {} total {} bits, payload holds {}",
                    stream, total, limit
                )));
            }
        }

        let consumed = cursor.position() as usize;
        if consumed != bytes.len() {
            return Err(SpriteError::CatalogFormat(format!(
                "Catalog has {} trailing bytes",
                bytes.len() - consumed
            )));
        }

        log::debug!(
            "Parsed catalog: {} sprites, {:?} layout, {:?} palettes, {} streams",
            sprites.len(),
            header.layout,
            header.palette,
            stream_count
        );

        Ok(Self {
            header,
            role_headers,
            color_header,
            payloads,
            sprites,
        })
    }

    pub fn layout(&self) -> StreamLayout {
        self.header.layout
    }

    pub fn palette_encoding(&self) -> PaletteEncoding {
        self.header.palette
    }

    pub fn is_interleaved(&self) -> bool {
        self.header.interleaved
    }

    pub fn role_headers(&self) -> &[HuffmanHeader<'a>] {
        &self.role_headers
    }

    pub fn color_header(&self) -> Option<&HuffmanHeader<'a>> {
        self.color_header.as_ref()
    }

    pub fn payloads(&self) -> &[&'a [u8]] {
        &self.payloads
    }

    /// Stream index carrying coded palettes. Interleaved catalogs resolve
    /// every index to their single stream.
    pub fn color_stream(&self) -> usize {
        self.header.layout.roles().len()
    }

    pub fn sprites(&self) -> &[SpriteEntry] {
        &self.sprites
    }

    pub fn sprite(&self, index: usize) -> Option<&SpriteEntry> {
        self.sprites.get(index)
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    /// Walks the table in order, yielding each sprite with its start offsets.
    pub fn entries_with_offsets(&self) -> impl Iterator<Item = (usize, &SpriteEntry, Vec<usize>)> {
        let mut running = vec![0usize; self.payloads.len()];
        self.sprites.iter().enumerate().map(move |(index, entry)| {
            let offsets = running.clone();
            for (offset, bits) in running.iter_mut().zip(entry.stream_bits()) {
                *offset += *bits as usize;
            }
            (index, entry, offsets)
        })
    }
}

fn read_packed_palettes(
    cursor: &mut Cursor<&[u8]>,
    index: u16,
) -> Result<PackedPalettes, SpriteError> {
    let count = read_u8(cursor)? as usize;
    if count > MAX_PACKED_COLORS {
        return Err(SpriteError::CatalogFormat(format!(
            "Sprite {} stores {} packed colors, at most {} allowed",
            index, count, MAX_PACKED_COLORS
        )));
    }
    let normal = (0..count)
        .map(|_| read_u16(cursor))
        .collect::<Result<Vec<_>, _>>()?;
    let shiny = (0..count)
        .map(|_| read_u16(cursor))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PackedPalettes { normal, shiny })
}
