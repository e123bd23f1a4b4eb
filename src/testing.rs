//! Test-only encoders: frequency-built Huffman codes in the catalog's header
//! format, an MSB-first bit packer, and a builder that serialises synthetic
//! catalogs. Nothing here ships in the library.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use bitvec::prelude::*;

use crate::catalog::format::{
    PaletteEncoding, CATALOG_FORMAT_VERSION, CATALOG_MAGIC, FLAG_INTERLEAVED,
};
use crate::kernels::huffman::HuffmanHeader;
use crate::kernels::lz77::StreamLayout;
use crate::kernels::palette::OPAQUE_BIT;

//==================================================================================
// 1. Bits & Headers
//==================================================================================

/// Packs bits MSB-first, zero-padding the final byte.
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut packed: BitVec<u8, Msb0> = BitVec::repeat(false, bits.len());
    for (i, &bit) in bits.iter().enumerate() {
        packed.set(i, bit);
    }
    packed.into_vec()
}

/// An owned Huffman header that can lend out a `HuffmanHeader` view.
#[derive(Debug, Clone)]
pub struct OwnedHeader {
    pub shape: Vec<u8>,
    pub shape_bits: usize,
    pub permutation: Vec<u8>,
}

impl OwnedHeader {
    pub fn new(shape: &[bool], permutation: Vec<u8>) -> Self {
        Self {
            shape: pack_bits(shape),
            shape_bits: shape.len(),
            permutation,
        }
    }

    pub fn view(&self) -> HuffmanHeader<'_> {
        HuffmanHeader::new(&self.shape, self.shape_bits, &self.permutation).unwrap()
    }

    /// The serialised form used inside catalogs.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.shape_bits as u16).to_le_bytes());
        out.extend_from_slice(&self.shape);
        out.extend_from_slice(&(self.permutation.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.permutation);
    }
}

//==================================================================================
// 2. Frequency-Built Codes
//==================================================================================

enum Build {
    Leaf(u8),
    Pair(usize, usize),
}

/// A Huffman code over the symbols it was built from, with its header.
#[derive(Debug, Clone)]
pub struct TestCode {
    pub header: OwnedHeader,
    codes: HashMap<u8, Vec<bool>>,
}

impl TestCode {
    /// Builds a code from symbol frequencies. A single distinct symbol is
    /// padded with a zero-frequency sibling so every code is at least one bit.
    pub fn from_symbols(symbols: &[u8]) -> Self {
        let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
        for &symbol in symbols {
            *counts.entry(symbol).or_insert(0) += 1;
        }
        while counts.len() < 2 {
            let filler = (0u8..=255).find(|s| !counts.contains_key(s)).unwrap();
            counts.insert(filler, 0);
        }

        let mut arena: Vec<Build> = Vec::new();
        let mut heap = BinaryHeap::new();
        for (&symbol, &count) in &counts {
            heap.push(Reverse((count, arena.len())));
            arena.push(Build::Leaf(symbol));
        }
        while heap.len() > 1 {
            let Reverse((count_a, a)) = heap.pop().unwrap();
            let Reverse((count_b, b)) = heap.pop().unwrap();
            heap.push(Reverse((count_a + count_b, arena.len())));
            arena.push(Build::Pair(a, b));
        }
        let Reverse((_, root)) = heap.pop().unwrap();

        let mut shape = Vec::new();
        let mut permutation = Vec::new();
        let mut codes = HashMap::new();
        walk(&arena, root, &mut Vec::new(), &mut shape, &mut permutation, &mut codes);

        Self {
            header: OwnedHeader::new(&shape, permutation),
            codes,
        }
    }

    pub fn encode(&self, symbol: u8, out: &mut Vec<bool>) {
        let code = self
            .codes
            .get(&symbol)
            .unwrap_or_else(|| panic!("symbol {} is not in the code", symbol));
        out.extend_from_slice(code);
    }
}

fn walk(
    arena: &[Build],
    index: usize,
    prefix: &mut Vec<bool>,
    shape: &mut Vec<bool>,
    permutation: &mut Vec<u8>,
    codes: &mut HashMap<u8, Vec<bool>>,
) {
    match arena[index] {
        Build::Leaf(symbol) => {
            shape.push(true);
            permutation.push(symbol);
            codes.insert(symbol, prefix.clone());
        }
        Build::Pair(left, right) => {
            shape.push(false);
            prefix.push(false);
            walk(arena, left, prefix, shape, permutation, codes);
            prefix.pop();
            prefix.push(true);
            walk(arena, right, prefix, shape, permutation, codes);
            prefix.pop();
        }
    }
}

/// Encodes tuples into one packed stream per role.
pub fn encode_tuples(codes: &[TestCode], tuples: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let mut streams = vec![Vec::new(); codes.len()];
    for tuple in tuples {
        for (role, code) in codes.iter().enumerate() {
            code.encode(tuple[role], &mut streams[role]);
        }
    }
    streams.iter().map(|bits| pack_bits(bits)).collect()
}

/// Literal-only tuples for `pixels` under `layout`, collapsing equal runs.
pub fn literal_tuples(layout: StreamLayout, pixels: &[u8]) -> Vec<Vec<u8>> {
    let max_run = match layout {
        StreamLayout::RunLength => 16,
        StreamLayout::Planar | StreamLayout::Delta => 255,
    };
    let mut tuples = Vec::new();
    let mut i = 0;
    while i < pixels.len() {
        let value = pixels[i];
        let mut run = 1;
        while i + run < pixels.len() && pixels[i + run] == value && run < max_run {
            run += 1;
        }
        tuples.push(match layout {
            StreamLayout::Planar => vec![0, 128, run as u8, value],
            StreamLayout::Delta => vec![0, run as u8, value],
            StreamLayout::RunLength => vec![(run - 1) as u8, value],
        });
        i += run;
    }
    tuples
}

//==================================================================================
// 3. Synthetic Catalogs
//==================================================================================

/// One sprite for `CatalogBuilder`: its tuples plus 5-bit RGB palettes.
#[derive(Debug, Clone)]
pub struct TestSprite {
    pub width: u16,
    pub height: u16,
    pub tuples: Vec<Vec<u8>>,
    pub normal: Vec<[u8; 3]>,
    pub shiny: Vec<[u8; 3]>,
}

impl TestSprite {
    /// A sprite whose raster is `pixels`, encoded with literal runs.
    pub fn from_pixels(
        layout: StreamLayout,
        width: u16,
        height: u16,
        pixels: &[u8],
        normal: Vec<[u8; 3]>,
        shiny: Vec<[u8; 3]>,
    ) -> Self {
        assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            tuples: literal_tuples(layout, pixels),
            normal,
            shiny,
        }
    }
}

pub fn packed_word(rgb: [u8; 3]) -> u16 {
    OPAQUE_BIT | (rgb[0] as u16) << 10 | (rgb[1] as u16) << 5 | rgb[2] as u16
}

#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    layout: StreamLayout,
    palette: PaletteEncoding,
    interleaved: bool,
    sprites: Vec<TestSprite>,
    span_deltas: Vec<(usize, usize, i64)>,
}

impl CatalogBuilder {
    pub fn new(layout: StreamLayout, palette: PaletteEncoding) -> Self {
        Self {
            layout,
            palette,
            interleaved: false,
            sprites: Vec::new(),
            span_deltas: Vec::new(),
        }
    }

    pub fn interleaved(mut self, interleaved: bool) -> Self {
        self.interleaved = interleaved;
        self
    }

    pub fn sprite(mut self, sprite: TestSprite) -> Self {
        self.sprites.push(sprite);
        self
    }

    /// Misstates one sprite's span in one stream by `delta` bits.
    pub fn span_delta(mut self, sprite: usize, stream: usize, delta: i64) -> Self {
        self.span_deltas.push((sprite, stream, delta));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let roles = self.layout.roles().len();
        let coded = self.palette == PaletteEncoding::Coded;

        let role_codes: Vec<TestCode> = (0..roles)
            .map(|role| {
                let symbols: Vec<u8> = self
                    .sprites
                    .iter()
                    .flat_map(|s| s.tuples.iter().map(move |t| t[role]))
                    .collect();
                TestCode::from_symbols(&symbols)
            })
            .collect();
        let color_code = coded.then(|| {
            let channels: Vec<u8> = self
                .sprites
                .iter()
                .flat_map(|s| s.normal.iter().chain(&s.shiny))
                .flat_map(|rgb| rgb.iter().copied())
                .collect();
            TestCode::from_symbols(&channels)
        });

        let stream_count = match (self.interleaved, coded) {
            (true, _) => 1,
            (false, true) => roles + 1,
            (false, false) => roles,
        };
        let slot = |stream: usize| if self.interleaved { 0 } else { stream };

        let mut streams: Vec<Vec<bool>> = vec![Vec::new(); stream_count];
        let mut spans: Vec<Vec<i64>> = Vec::new();
        for sprite in &self.sprites {
            let before: Vec<usize> = streams.iter().map(Vec::len).collect();
            for tuple in &sprite.tuples {
                for (role, code) in role_codes.iter().enumerate() {
                    code.encode(tuple[role], &mut streams[slot(role)]);
                }
            }
            if let Some(code) = &color_code {
                for rgb in sprite.normal.iter().chain(&sprite.shiny) {
                    for &channel in rgb {
                        code.encode(channel, &mut streams[slot(roles)]);
                    }
                }
            }
            spans.push(
                streams
                    .iter()
                    .zip(&before)
                    .map(|(s, b)| (s.len() - b) as i64)
                    .collect(),
            );
        }
        for &(sprite, stream, delta) in &self.span_deltas {
            spans[sprite][stream] += delta;
        }

        let mut out = CATALOG_MAGIC.to_vec();
        out.extend_from_slice(&CATALOG_FORMAT_VERSION.to_le_bytes());
        out.push(self.layout.tag());
        out.push(self.palette.tag());
        out.push(if self.interleaved { FLAG_INTERLEAVED } else { 0 });
        out.push(0);
        out.extend_from_slice(&(self.sprites.len() as u16).to_le_bytes());

        for code in role_codes.iter().chain(&color_code) {
            code.header.write(&mut out);
        }

        out.push(stream_count as u8);
        for bits in &streams {
            let payload = pack_bits(bits);
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&payload);
        }

        for (sprite, span) in self.sprites.iter().zip(&spans) {
            out.extend_from_slice(&sprite.width.to_le_bytes());
            out.extend_from_slice(&sprite.height.to_le_bytes());
            for &bits in span {
                out.extend_from_slice(&(bits as u32).to_le_bytes());
            }
            if !coded {
                out.push(sprite.normal.len() as u8);
                for &rgb in sprite.normal.iter().chain(&sprite.shiny) {
                    out.extend_from_slice(&packed_word(rgb).to_le_bytes());
                }
            }
        }
        out
    }
}
