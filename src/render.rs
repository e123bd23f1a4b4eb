//! Half-block truecolor rendering.
//!
//! Each text row covers two pixel rows. The upper pixel maps to the `▀`
//! foreground or the background, the lower one to the `▄` foreground, so a
//! cell can show two colors, one color over the terminal background, or
//! nothing at all. Odd-height sprites treat the missing bottom row as
//! transparent.

use std::io::Write;

use crate::error::SpriteError;
use crate::kernels::lz77::RasterBuffer;
use crate::kernels::palette::{Palette, Rgb};

const UPPER_HALF: &str = "\u{2580}";
const LOWER_HALF: &str = "\u{2584}";
const RESET: &str = "\x1b[m";

/// Writes one cell for the `top`/`bottom` pixel pair.
fn write_cell<W: Write>(
    out: &mut W,
    top: Option<Rgb>,
    bottom: Option<Rgb>,
) -> std::io::Result<()> {
    match (top, bottom) {
        (Some(t), Some(b)) => write!(
            out,
            "\x1b[48;2;{};{};{}m\x1b[38;2;{};{};{}m{}",
            t.r, t.g, t.b, b.r, b.g, b.b, LOWER_HALF
        )?,
        (Some(t), None) => write!(out, "\x1b[38;2;{};{};{}m{}", t.r, t.g, t.b, UPPER_HALF)?,
        (None, Some(b)) => write!(out, "\x1b[38;2;{};{};{}m{}", b.r, b.g, b.b, LOWER_HALF)?,
        (None, None) => out.write_all(b" ")?,
    }
    out.write_all(RESET.as_bytes())
}

/// Streams the whole sprite into `out`, one `\n`-terminated line per text row.
pub fn render_to<W: Write>(
    raster: &RasterBuffer,
    palette: &Palette,
    out: &mut W,
) -> Result<(), SpriteError> {
    let width = raster.width() as usize;
    let height = raster.height() as usize;
    let opaque = |index: u8| {
        let entry = palette.get(index);
        (!entry.transparent).then_some(entry.color)
    };

    for y in (0..height).step_by(2) {
        for x in 0..width {
            let top = opaque(raster.get(x, y));
            let bottom = if y + 1 < height {
                opaque(raster.get(x, y + 1))
            } else {
                None
            };
            write_cell(out, top, bottom)?;
        }
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Renders into a fresh buffer so a failure leaves nothing half-written.
pub fn render_to_vec(raster: &RasterBuffer, palette: &Palette) -> Result<Vec<u8>, SpriteError> {
    let mut buf = Vec::with_capacity(raster.pixels().len() * 24);
    render_to(raster, palette, &mut buf)?;
    Ok(buf)
}
