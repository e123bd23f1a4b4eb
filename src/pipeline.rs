// In: src/pipeline.rs

//! This module is the orchestrator of the decode-and-render pipeline.
//!
//! It wires the pure kernels together: catalog selection yields a sprite and
//! its stream offsets, the raster decompressor and palette decoder read from
//! cursors placed at those offsets, and the renderer turns the result into
//! terminal output. A sprite is rendered into a buffer first and only written
//! out when every stage has succeeded.

use std::io::Write;

use rand::Rng;

use crate::catalog::format::PaletteEncoding;
use crate::catalog::selection::{select_sprite, TerminalBounds};
use crate::catalog::{Catalog, PackedPalettes, SpriteEntry};
use crate::config::SpriteConfig;
use crate::error::SpriteError;
use crate::kernels::bitstream::BitstreamCursor;
use crate::kernels::huffman::{HuffmanTree, SymbolDomain};
use crate::kernels::lz77::{RasterBuffer, RasterDecompressor, StreamCursors};
use crate::kernels::palette::{Palette, PaletteDecoder, PaletteVariant, PALETTE_SIZE};
use crate::render;

//==================================================================================
// 1. Decoded Output
//==================================================================================

/// One sprite ready to draw.
#[derive(Debug, Clone)]
pub struct DecodedSprite {
    pub index: usize,
    pub raster: RasterBuffer,
    pub palette: Palette,
    pub variant: PaletteVariant,
}

/// What a random render picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderReport {
    pub index: usize,
    pub width: u16,
    pub height: u16,
    pub variant: PaletteVariant,
    pub eligible: usize,
}

//==================================================================================
// 2. Sprite Decoder
//==================================================================================

/// Decodes sprites of one catalog. The Huffman trees are built once here and
/// shared by every sprite decoded through it.
#[derive(Debug)]
pub struct SpriteDecoder<'c, 'a> {
    catalog: &'c Catalog<'a>,
    role_trees: Vec<HuffmanTree>,
    color_tree: Option<HuffmanTree>,
}

impl<'c, 'a> SpriteDecoder<'c, 'a> {
    pub fn new(catalog: &'c Catalog<'a>) -> Result<Self, SpriteError> {
        let domain = catalog.layout().symbol_domain();
        let role_trees = catalog
            .role_headers()
            .iter()
            .map(|header| HuffmanTree::build(header, domain))
            .collect::<Result<Vec<_>, _>>()?;
        let color_tree = catalog
            .color_header()
            .map(|header| HuffmanTree::build(header, SymbolDomain::Byte))
            .transpose()?;

        for (role, tree) in catalog.layout().roles().iter().zip(&role_trees) {
            log_metric!("event" = "tree_built", "role" = role.name(), "leaves" = tree.leaf_count());
        }

        Ok(Self {
            catalog,
            role_trees,
            color_tree,
        })
    }

    /// Decodes sprite `index` with the palette for `variant`. `offsets` are
    /// the sprite's start bits in each stream.
    pub fn decode(
        &self,
        index: usize,
        offsets: &[usize],
        variant: PaletteVariant,
    ) -> Result<DecodedSprite, SpriteError> {
        let entry = self.entry(index)?;
        let mut cursors = self.cursors(offsets)?;
        let raster = self.decode_raster(entry, &mut cursors)?;
        let count = palette_count(&raster)?;

        let palette = match self.catalog.palette_encoding() {
            PaletteEncoding::Coded => {
                let cursor = cursors.cursor_mut(self.catalog.color_stream())?;
                PaletteDecoder::new(self.color_tree()?).decode(cursor, count, variant)?
            }
            PaletteEncoding::Packed => {
                let packed = packed_palettes(entry, index)?;
                match variant {
                    PaletteVariant::Normal => Palette::from_packed(&packed.normal)?,
                    PaletteVariant::Shiny => Palette::from_packed(&packed.shiny)?,
                }
            }
        };

        check_spans(index, entry, &cursors)?;
        Ok(DecodedSprite {
            index,
            raster,
            palette,
            variant,
        })
    }

    /// Decodes sprite `index` with both of its palettes, normal first.
    pub fn decode_both(
        &self,
        index: usize,
        offsets: &[usize],
    ) -> Result<(RasterBuffer, Palette, Palette), SpriteError> {
        let entry = self.entry(index)?;
        let mut cursors = self.cursors(offsets)?;
        let raster = self.decode_raster(entry, &mut cursors)?;
        let count = palette_count(&raster)?;

        let (normal, shiny) = match self.catalog.palette_encoding() {
            PaletteEncoding::Coded => {
                let decoder = PaletteDecoder::new(self.color_tree()?);
                let cursor = cursors.cursor_mut(self.catalog.color_stream())?;
                let normal = decoder.decode_one(cursor, count)?;
                let shiny = decoder.decode_one(cursor, count)?;
                (normal, shiny)
            }
            PaletteEncoding::Packed => {
                let packed = packed_palettes(entry, index)?;
                (
                    Palette::from_packed(&packed.normal)?,
                    Palette::from_packed(&packed.shiny)?,
                )
            }
        };

        check_spans(index, entry, &cursors)?;
        Ok((raster, normal, shiny))
    }

    fn entry(&self, index: usize) -> Result<&'c SpriteEntry, SpriteError> {
        self.catalog.sprite(index).ok_or_else(|| {
            SpriteError::CatalogFormat(format!(
                "Sprite {} requested from a catalog of {}",
                index,
                self.catalog.len()
            ))
        })
    }

    fn color_tree(&self) -> Result<&HuffmanTree, SpriteError> {
        self.color_tree.as_ref().ok_or_else(|| {
            SpriteError::CatalogFormat("Coded palettes require a color tree".to_string())
        })
    }

    fn cursors(&self, offsets: &[usize]) -> Result<StreamCursors<'a>, SpriteError> {
        let payloads = self.catalog.payloads();
        if offsets.len() != payloads.len() {
            return Err(SpriteError::CatalogFormat(format!(
                "Got {} stream offsets for {} streams",
                offsets.len(),
                payloads.len()
            )));
        }
        let mut cursors: Vec<BitstreamCursor<'a>> = payloads
            .iter()
            .zip(offsets)
            .map(|(&payload, &offset)| BitstreamCursor::at(payload, offset))
            .collect();
        if self.catalog.is_interleaved() {
            if let Some(cursor) = cursors.pop() {
                return Ok(StreamCursors::interleaved(cursor));
            }
        }
        Ok(StreamCursors::separate(cursors))
    }

    fn decode_raster(
        &self,
        entry: &SpriteEntry,
        cursors: &mut StreamCursors<'a>,
    ) -> Result<RasterBuffer, SpriteError> {
        RasterDecompressor::new(self.catalog.layout(), &self.role_trees)?.decompress(
            entry.width,
            entry.height,
            cursors,
        )
    }
}

/// Number of palette entries the raster needs: its highest index.
fn palette_count(raster: &RasterBuffer) -> Result<u8, SpriteError> {
    let max = raster.max_index();
    if max as usize >= PALETTE_SIZE {
        return Err(SpriteError::corrupt(format!(
            "Raster uses palette index {}, above the {}-entry palette",
            max,
            PALETTE_SIZE - 1
        )));
    }
    Ok(max)
}

fn packed_palettes(entry: &SpriteEntry, index: usize) -> Result<&PackedPalettes, SpriteError> {
    entry.packed_palettes().ok_or_else(|| {
        SpriteError::CatalogFormat(format!("Sprite {} has no packed palettes", index))
    })
}

/// Every cursor must stay within the bits the table assigns to the sprite.
fn check_spans(
    index: usize,
    entry: &SpriteEntry,
    cursors: &StreamCursors<'_>,
) -> Result<(), SpriteError> {
    for (stream, (&used, &declared)) in cursors
        .consumed()
        .iter()
        .zip(entry.stream_bits())
        .enumerate()
    {
        if used > declared as usize {
            return Err(SpriteError::corrupt(format!(
                "Sprite {} read {} bits from stream {}, table declares {}",
                index, used, stream, declared
            )));
        }
    }
    Ok(())
}

//==================================================================================
// 3. Entry Points
//==================================================================================

/// Picks a sprite that fits `bounds`, decodes it and writes it to `out`.
pub fn render_random<R: Rng + ?Sized, W: Write>(
    catalog: &Catalog<'_>,
    bounds: TerminalBounds,
    config: &SpriteConfig,
    rng: &mut R,
    out: &mut W,
) -> Result<RenderReport, SpriteError> {
    config.validate()?;
    let selection = select_sprite(catalog, bounds, config.row_margin, rng)?;
    let variant = PaletteVariant::choose(rng, config.shiny_odds);

    let decoder = SpriteDecoder::new(catalog)?;
    let sprite = decoder.decode(selection.index, &selection.offsets, variant)?;
    let rendered = render::render_to_vec(&sprite.raster, &sprite.palette)?;
    out.write_all(&rendered)?;

    log_metric!(
        "event" = "sprite_rendered",
        "index" = selection.index,
        "eligible" = selection.eligible,
        "width" = sprite.raster.width(),
        "height" = sprite.raster.height(),
        "shiny" = variant.is_shiny(),
        "bytes" = rendered.len()
    );
    if variant.is_shiny() {
        log::info!("Rendered shiny sprite {}", selection.index);
    }

    Ok(RenderReport {
        index: selection.index,
        width: sprite.raster.width(),
        height: sprite.raster.height(),
        variant,
        eligible: selection.eligible,
    })
}

/// Renders every sprite in catalog order, normal palette then shiny.
/// Returns the number of sprites drawn.
pub fn render_catalog<W: Write>(catalog: &Catalog<'_>, out: &mut W) -> Result<usize, SpriteError> {
    let decoder = SpriteDecoder::new(catalog)?;
    let mut drawn = 0;
    for (index, _, offsets) in catalog.entries_with_offsets() {
        let (raster, normal, shiny) = decoder.decode_both(index, &offsets)?;
        let mut rendered = render::render_to_vec(&raster, &normal)?;
        rendered.extend_from_slice(&render::render_to_vec(&raster, &shiny)?);
        out.write_all(&rendered)?;
        drawn += 1;
    }
    log::info!("Rendered {} catalog entries", drawn);
    Ok(drawn)
}
