//! Single-pass random selection of a sprite that fits the terminal.
//!
//! The table is walked once. Every sprite advances the running per-stream bit
//! offsets, eligible or not; the n-th eligible sprite replaces the current
//! pick with probability 1/n (reservoir sampling), and the offsets at that
//! moment are copied out as the pick's start positions.

use rand::Rng;

use crate::catalog::{Catalog, SpriteEntry};
use crate::error::SpriteError;

/// The drawable area of the terminal, in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalBounds {
    pub columns: u16,
    pub rows: u16,
}

impl TerminalBounds {
    pub fn new(columns: u16, rows: u16) -> Self {
        Self { columns, rows }
    }

    /// A sprite fits when its width fits the columns and its half-height
    /// plus `row_margin` fits the rows.
    pub fn fits(&self, entry: &SpriteEntry, row_margin: u16) -> bool {
        entry.width <= self.columns && entry.text_rows() + row_margin as u32 <= self.rows as u32
    }
}

/// The chosen sprite and the bit offset of its data in every stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub offsets: Vec<usize>,
    /// How many sprites were eligible.
    pub eligible: usize,
}

/// Picks one eligible sprite uniformly at random.
pub fn select_sprite<R: Rng + ?Sized>(
    catalog: &Catalog<'_>,
    bounds: TerminalBounds,
    row_margin: u16,
    rng: &mut R,
) -> Result<Selection, SpriteError> {
    let mut running = vec![0usize; catalog.payloads().len()];
    let mut pick: Option<(usize, Vec<usize>)> = None;
    let mut eligible = 0usize;

    for (index, entry) in catalog.sprites().iter().enumerate() {
        if bounds.fits(entry, row_margin) {
            eligible += 1;
            if rng.random_range(0..eligible) == 0 {
                match pick.as_mut() {
                    Some((chosen, offsets)) => {
                        *chosen = index;
                        offsets.copy_from_slice(&running);
                    }
                    None => pick = Some((index, running.clone())),
                }
            }
        }
        for (offset, bits) in running.iter_mut().zip(entry.stream_bits()) {
            *offset += *bits as usize;
        }
    }

    match pick {
        Some((index, offsets)) => {
            log::debug!(
                "Selected sprite {} of {} eligible for {}x{}",
                index,
                eligible,
                bounds.columns,
                bounds.rows
            );
            Ok(Selection {
                index,
                offsets,
                eligible,
            })
        }
        None => Err(SpriteError::NoEligibleSprite {
            columns: bounds.columns,
            rows: bounds.rows,
        }),
    }
}
