//! This module contains the palette kernel: channel scaling, the two palette
//! encodings a catalog may use, and the once-per-render normal/shiny choice.
//!
//! Index 0 is always transparent. Entries `1..=n` come from the catalog, where
//! `n` is the highest index the sprite's raster uses (coded palettes) or the
//! stored word count (packed palettes).

use rand::Rng;

use crate::error::SpriteError;
use crate::kernels::bitstream::BitstreamCursor;
use crate::kernels::huffman::HuffmanTree;

/// Number of palette slots, including the transparent slot 0.
pub const PALETTE_SIZE: usize = 16;
/// Bit 15 of a packed RGB555 word marks the entry as opaque.
pub const OPAQUE_BIT: u16 = 0x8000;
/// Largest 5-bit channel value.
pub const CHANNEL_MAX: u8 = 31;

//==================================================================================
// 1. Colors & Entries
//==================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    pub color: Rgb,
    pub transparent: bool,
}

impl PaletteEntry {
    pub const TRANSPARENT: PaletteEntry = PaletteEntry {
        color: Rgb { r: 0, g: 0, b: 0 },
        transparent: true,
    };

    pub fn opaque(color: Rgb) -> Self {
        Self {
            color,
            transparent: false,
        }
    }

    /// Builds an opaque entry from three 5-bit channels.
    pub fn from_channels(r: u8, g: u8, b: u8) -> Self {
        Self::opaque(Rgb::new(scale_channel(r), scale_channel(g), scale_channel(b)))
    }

    /// Unpacks an RGB555 word: red in bits 10-14, green 5-9, blue 0-4.
    pub fn from_packed(word: u16) -> Self {
        if word & OPAQUE_BIT == 0 {
            return Self::TRANSPARENT;
        }
        let r = ((word >> 10) & 0x1F) as u8;
        let g = ((word >> 5) & 0x1F) as u8;
        let b = (word & 0x1F) as u8;
        Self::from_channels(r, g, b)
    }
}

/// Expands a 5-bit channel to 8 bits: `v * 8 * 255 / 248`.
#[inline]
pub fn scale_channel(value: u8) -> u8 {
    let value = value.min(CHANNEL_MAX) as u32;
    (value * 8 * 255 / 248) as u8
}

//==================================================================================
// 2. Palette
//==================================================================================

/// Sixteen entries indexed by raster values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [PaletteEntry; PALETTE_SIZE],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            entries: [PaletteEntry::TRANSPARENT; PALETTE_SIZE],
        }
    }
}

impl Palette {
    /// Resolves a raster index. Slot 0 and unset slots are transparent.
    #[inline]
    pub fn get(&self, index: u8) -> PaletteEntry {
        self.entries
            .get(index as usize)
            .copied()
            .unwrap_or(PaletteEntry::TRANSPARENT)
    }

    /// Sets slot `index`; slot 0 stays transparent.
    pub fn set(&mut self, index: u8, entry: PaletteEntry) -> Result<(), SpriteError> {
        match index as usize {
            0 => Err(SpriteError::corrupt("Palette slot 0 is reserved for transparency")),
            i if i < PALETTE_SIZE => {
                self.entries[i] = entry;
                Ok(())
            }
            i => Err(SpriteError::corrupt(format!(
                "Palette index {} exceeds the {}-entry palette",
                i, PALETTE_SIZE
            ))),
        }
    }

    pub fn entries(&self) -> &[PaletteEntry; PALETTE_SIZE] {
        &self.entries
    }

    /// Builds a palette from packed words for slots `1..=words.len()`.
    pub fn from_packed(words: &[u16]) -> Result<Self, SpriteError> {
        let mut palette = Palette::default();
        for (slot, &word) in (1u8..).zip(words) {
            palette.set(slot, PaletteEntry::from_packed(word))?;
        }
        Ok(palette)
    }
}

//==================================================================================
// 3. Variant Choice
//==================================================================================

/// Which of a sprite's two palettes is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteVariant {
    Normal,
    Shiny,
}

impl PaletteVariant {
    /// Picks shiny with probability `1 / odds`. `odds` of 0 or 1 always
    /// picks shiny.
    pub fn choose<R: Rng + ?Sized>(rng: &mut R, odds: u32) -> Self {
        if odds <= 1 || rng.random_range(0..odds) == 0 {
            PaletteVariant::Shiny
        } else {
            PaletteVariant::Normal
        }
    }

    pub fn is_shiny(self) -> bool {
        self == PaletteVariant::Shiny
    }
}

//==================================================================================
// 4. Coded Palette Decoder
//==================================================================================

/// Reads Huffman-coded palettes from the catalog's color stream.
#[derive(Debug)]
pub struct PaletteDecoder<'t> {
    tree: &'t HuffmanTree,
}

impl<'t> PaletteDecoder<'t> {
    pub fn new(tree: &'t HuffmanTree) -> Self {
        Self { tree }
    }

    /// Decodes `count` entries (slots `1..=count`) of R, G, B channel symbols.
    pub fn decode_one(
        &self,
        cursor: &mut BitstreamCursor<'_>,
        count: u8,
    ) -> Result<Palette, SpriteError> {
        if count as usize >= PALETTE_SIZE {
            return Err(SpriteError::corrupt(format!(
                "Raster uses palette index {}, above the {}-entry palette",
                count,
                PALETTE_SIZE - 1
            )));
        }
        let mut palette = Palette::default();
        for slot in 1..=count {
            let r = self.channel(cursor)?;
            let g = self.channel(cursor)?;
            let b = self.channel(cursor)?;
            palette.set(slot, PaletteEntry::from_channels(r, g, b))?;
        }
        Ok(palette)
    }

    /// Decodes the palette for `variant`. The normal palette precedes the
    /// shiny one in the stream, so shiny decodes and discards it first.
    pub fn decode(
        &self,
        cursor: &mut BitstreamCursor<'_>,
        count: u8,
        variant: PaletteVariant,
    ) -> Result<Palette, SpriteError> {
        let normal = self.decode_one(cursor, count)?;
        match variant {
            PaletteVariant::Normal => Ok(normal),
            PaletteVariant::Shiny => self.decode_one(cursor, count),
        }
    }

    fn channel(&self, cursor: &mut BitstreamCursor<'_>) -> Result<u8, SpriteError> {
        let value = self.tree.decode(cursor)?;
        if value > CHANNEL_MAX {
            return Err(SpriteError::corrupt(format!(
                "Color channel symbol {} exceeds 5 bits",
                value
            )));
        }
        Ok(value)
    }
}

//==================================================================================
// 5. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::huffman::SymbolDomain;
    use crate::testing::{pack_bits, TestCode};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_channel_scaling() {
        assert_eq!(scale_channel(0), 0);
        assert_eq!(scale_channel(31), 255);
        assert_eq!(scale_channel(16), 131);
        assert_eq!(scale_channel(1), 8);
    }

    #[test]
    fn test_packed_word_unpacking() {
        let red = PaletteEntry::from_packed(OPAQUE_BIT | (31 << 10));
        assert_eq!(red, PaletteEntry::opaque(Rgb::new(255, 0, 0)));

        let blue_ish = PaletteEntry::from_packed(OPAQUE_BIT | (16 << 5) | 31);
        assert_eq!(blue_ish.color, Rgb::new(0, 131, 255));

        // Without the opaque bit the color is ignored.
        assert!(PaletteEntry::from_packed(0x7FFF).transparent);
    }

    #[test]
    fn test_slot_zero_is_always_transparent() {
        let palette = Palette::from_packed(&[OPAQUE_BIT | 0x7FFF, OPAQUE_BIT]).unwrap();
        assert!(palette.get(0).transparent);
        assert!(!palette.get(1).transparent);
        assert_eq!(palette.get(2), PaletteEntry::opaque(Rgb::default()));
        assert!(palette.get(3).transparent);

        let mut palette = Palette::default();
        assert!(palette.set(0, PaletteEntry::opaque(Rgb::default())).is_err());
        assert!(palette.set(16, PaletteEntry::opaque(Rgb::default())).is_err());
    }

    #[test]
    fn test_too_many_packed_words_is_corruption() {
        let words = [OPAQUE_BIT; 16];
        assert!(matches!(
            Palette::from_packed(&words),
            Err(SpriteError::DataCorruption(_))
        ));
    }

    fn coded_palette_stream(channels: &[u8]) -> (TestCode, Vec<u8>) {
        let code = TestCode::from_symbols(channels);
        let mut bits = Vec::new();
        for &value in channels {
            code.encode(value, &mut bits);
        }
        (code, pack_bits(&bits))
    }

    #[test]
    fn test_coded_palettes_decode_normal_then_shiny() {
        // Two entries per palette: normal = (31,0,0), (0,31,0); shiny = (0,0,31), (16,16,16).
        let channels = [31, 0, 0, 0, 31, 0, 0, 0, 31, 16, 16, 16];
        let (code, stream) = coded_palette_stream(&channels);
        let tree = HuffmanTree::build(&code.header.view(), SymbolDomain::Byte).unwrap();
        let decoder = PaletteDecoder::new(&tree);

        let mut cursor = BitstreamCursor::new(&stream);
        let normal = decoder.decode(&mut cursor, 2, PaletteVariant::Normal).unwrap();
        assert_eq!(normal.get(1).color, Rgb::new(255, 0, 0));
        assert_eq!(normal.get(2).color, Rgb::new(0, 255, 0));

        let mut cursor = BitstreamCursor::new(&stream);
        let shiny = decoder.decode(&mut cursor, 2, PaletteVariant::Shiny).unwrap();
        assert_eq!(shiny.get(1).color, Rgb::new(0, 0, 255));
        assert_eq!(shiny.get(2).color, Rgb::new(131, 131, 131));
        assert!(shiny.get(3).transparent);
    }

    #[test]
    fn test_wide_channel_symbol_is_corruption() {
        let channels = [40, 1, 2];
        let (code, stream) = coded_palette_stream(&channels);
        let tree = HuffmanTree::build(&code.header.view(), SymbolDomain::Byte).unwrap();
        let mut cursor = BitstreamCursor::new(&stream);
        let result = PaletteDecoder::new(&tree).decode_one(&mut cursor, 1);
        assert!(matches!(result, Err(SpriteError::DataCorruption(_))));
    }

    #[test]
    fn test_index_above_palette_is_corruption() {
        let (code, stream) = coded_palette_stream(&[1, 2, 3]);
        let tree = HuffmanTree::build(&code.header.view(), SymbolDomain::Byte).unwrap();
        let mut cursor = BitstreamCursor::new(&stream);
        let result = PaletteDecoder::new(&tree).decode_one(&mut cursor, 16);
        assert!(matches!(result, Err(SpriteError::DataCorruption(_))));
    }

    #[test]
    fn test_shiny_choice_frequency() {
        let mut rng = StdRng::seed_from_u64(7);
        let shiny = (0..16_000)
            .filter(|_| PaletteVariant::choose(&mut rng, 16).is_shiny())
            .count();
        // Expect ~1000; allow generous slack for a fixed seed.
        assert!((800..1200).contains(&shiny), "shiny count {}", shiny);

        assert!(PaletteVariant::choose(&mut rng, 1).is_shiny());
    }
}
