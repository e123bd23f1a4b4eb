//! This module contains the 2-D LZ77 raster decompressor.
//!
//! A sprite raster is rebuilt from tuples of Huffman-coded symbols, one symbol
//! per role of the catalog's `StreamLayout`. Back-references may overlap the
//! bytes they produce, so copies run strictly byte-by-byte in increasing
//! order. Output is clamped to exactly `width * height` bytes: a trailing
//! literal that would overflow is dropped, while a copy that would overflow
//! is rejected as corruption.

use crate::error::SpriteError;
use crate::kernels::bitstream::BitstreamCursor;
use crate::kernels::huffman::{HuffmanTree, SymbolDomain};

/// Bias subtracted from a planar back-reference so `dx` can point left.
pub const DX_BIAS: isize = 128;

//==================================================================================
// 1. Stream Layouts
//==================================================================================

/// The symbol each stream of a layout carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    Dy,
    Dx,
    Delta,
    RunLength,
    Count,
    Value,
}

impl StreamRole {
    pub fn name(self) -> &'static str {
        match self {
            StreamRole::Dy => "dy",
            StreamRole::Dx => "dx",
            StreamRole::Delta => "delta",
            StreamRole::RunLength => "runlen",
            StreamRole::Count => "count",
            StreamRole::Value => "value",
        }
    }
}

/// How a catalog splits its raster tuples into symbol streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamLayout {
    /// `(dy, dx, runlen, value)`: a 2-D back-reference `width*dy + dx - 128`.
    Planar,
    /// `(delta, runlen, value)`: a plain linear back-reference.
    Delta,
    /// `(count, value)`: `count + 1` copies of a palette index.
    RunLength,
}

impl StreamLayout {
    /// Roles in the order their symbols are decoded for each tuple.
    pub fn roles(self) -> &'static [StreamRole] {
        match self {
            StreamLayout::Planar => &[
                StreamRole::Dy,
                StreamRole::Dx,
                StreamRole::RunLength,
                StreamRole::Value,
            ],
            StreamLayout::Delta => &[StreamRole::Delta, StreamRole::RunLength, StreamRole::Value],
            StreamLayout::RunLength => &[StreamRole::Count, StreamRole::Value],
        }
    }

    /// The domain every role tree of this layout must respect.
    pub fn symbol_domain(self) -> SymbolDomain {
        match self {
            StreamLayout::Planar | StreamLayout::Delta => SymbolDomain::Byte,
            StreamLayout::RunLength => SymbolDomain::Nibble,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            StreamLayout::Planar => 0,
            StreamLayout::Delta => 1,
            StreamLayout::RunLength => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, SpriteError> {
        match tag {
            0 => Ok(StreamLayout::Planar),
            1 => Ok(StreamLayout::Delta),
            2 => Ok(StreamLayout::RunLength),
            other => Err(SpriteError::CatalogFormat(format!(
                "Unknown stream layout tag {}",
                other
            ))),
        }
    }
}

//==================================================================================
// 2. Raster Buffer
//==================================================================================

/// A decoded sprite: row-major palette indices, exactly `width * height` long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u16,
    height: u16,
    pixels: Vec<u8>,
}

impl RasterBuffer {
    pub fn new(width: u16, height: u16, pixels: Vec<u8>) -> Result<Self, SpriteError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(SpriteError::corrupt(format!(
                "Raster of {}x{} needs {} pixels, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The palette index at column `x` of row `y`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width as usize + x]
    }

    /// The highest palette index present; the palette entry count follows from it.
    pub fn max_index(&self) -> u8 {
        self.pixels.iter().copied().max().unwrap_or(0)
    }
}

//==================================================================================
// 3. Stream Cursors
//==================================================================================

/// The per-stream read positions for one sprite.
///
/// An interleaved catalog stores every role in one shared stream, so all
/// stream indices resolve to the same cursor.
#[derive(Debug, Clone)]
pub struct StreamCursors<'a> {
    cursors: Vec<BitstreamCursor<'a>>,
    interleaved: bool,
}

impl<'a> StreamCursors<'a> {
    pub fn separate(cursors: Vec<BitstreamCursor<'a>>) -> Self {
        Self {
            cursors,
            interleaved: false,
        }
    }

    pub fn interleaved(cursor: BitstreamCursor<'a>) -> Self {
        Self {
            cursors: vec![cursor],
            interleaved: true,
        }
    }

    fn slot(&self, stream: usize) -> usize {
        if self.interleaved {
            0
        } else {
            stream
        }
    }

    pub fn cursor_mut(&mut self, stream: usize) -> Result<&mut BitstreamCursor<'a>, SpriteError> {
        let slot = self.slot(stream);
        let available = self.cursors.len();
        self.cursors.get_mut(slot).ok_or_else(|| {
            SpriteError::corrupt(format!(
                "No cursor for stream {} ({} available)",
                stream, available
            ))
        })
    }

    /// Bits consumed from each physical stream, in stream order.
    pub fn consumed(&self) -> Vec<usize> {
        self.cursors.iter().map(BitstreamCursor::consumed).collect()
    }
}

//==================================================================================
// 4. Decompressor
//==================================================================================

/// Rebuilds rasters for one layout from its per-role trees.
#[derive(Debug)]
pub struct RasterDecompressor<'t> {
    layout: StreamLayout,
    trees: &'t [HuffmanTree],
}

impl<'t> RasterDecompressor<'t> {
    pub fn new(layout: StreamLayout, trees: &'t [HuffmanTree]) -> Result<Self, SpriteError> {
        if trees.len() != layout.roles().len() {
            return Err(SpriteError::CatalogFormat(format!(
                "{:?} layout needs {} trees, got {}",
                layout,
                layout.roles().len(),
                trees.len()
            )));
        }
        Ok(Self { layout, trees })
    }

    /// Decodes tuples until the raster holds exactly `width * height` indices.
    /// Role `i` reads from stream `i` of `streams`.
    pub fn decompress(
        &self,
        width: u16,
        height: u16,
        streams: &mut StreamCursors<'_>,
    ) -> Result<RasterBuffer, SpriteError> {
        let size = width as usize * height as usize;
        let mut pixels: Vec<u8> = Vec::new();
        pixels
            .try_reserve_exact(size)
            .map_err(|_| SpriteError::AllocationFailure(size))?;

        let mut tuple = [0u8; 4];
        while pixels.len() < size {
            for (role, tree) in self.trees.iter().enumerate() {
                tuple[role] = tree.decode(streams.cursor_mut(role)?)?;
            }
            match self.layout {
                StreamLayout::Planar => {
                    let [dy, dx, run, value] = tuple;
                    let offset = width as isize * dy as isize + dx as isize - DX_BIAS;
                    apply_back_reference(&mut pixels, size, offset, run, value)?;
                }
                StreamLayout::Delta => {
                    let [delta, run, value, _] = tuple;
                    apply_back_reference(&mut pixels, size, delta as isize, run, value)?;
                }
                StreamLayout::RunLength => {
                    let [count, value, _, _] = tuple;
                    fill(&mut pixels, size, count as usize + 1, value)?;
                }
            }
        }

        RasterBuffer::new(width, height, pixels)
    }
}

/// Applies one `(offset, run, value)` step: copy `run` bytes from `offset`
/// back, then append the literal if room remains. Offset zero is a plain
/// fill of `max(run, 1)` literals.
pub(crate) fn apply_back_reference(
    pixels: &mut Vec<u8>,
    size: usize,
    offset: isize,
    run: u8,
    value: u8,
) -> Result<(), SpriteError> {
    if offset == 0 {
        return fill(pixels, size, run.max(1) as usize, value);
    }
    if offset < 0 || offset as usize > pixels.len() {
        return Err(SpriteError::corrupt(format!(
            "Back-reference offset {} at output position {} points outside the raster",
            offset,
            pixels.len()
        )));
    }
    let run = run as usize;
    if pixels.len() + run > size {
        return Err(SpriteError::corrupt(format!(
            "Copy of {} bytes at output position {} overruns the {}-byte raster",
            run,
            pixels.len(),
            size
        )));
    }

    // Byte-by-byte so an offset shorter than the run repeats the pattern.
    let start = pixels.len() - offset as usize;
    for i in 0..run {
        let byte = pixels[start + i];
        pixels.push(byte);
    }
    if pixels.len() < size {
        pixels.push(value);
    }
    Ok(())
}

fn fill(pixels: &mut Vec<u8>, size: usize, count: usize, value: u8) -> Result<(), SpriteError> {
    if pixels.len() + count > size {
        return Err(SpriteError::corrupt(format!(
            "Fill of {} bytes at output position {} overruns the {}-byte raster",
            count,
            pixels.len(),
            size
        )));
    }
    pixels.resize(pixels.len() + count, value);
    Ok(())
}

//==================================================================================
// 5. Unit Tests
//==================================================================================
