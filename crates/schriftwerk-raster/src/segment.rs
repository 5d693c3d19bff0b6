// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cell segmentation — slice the canonical frame into the template's cells,
// bind each to its character, and binarize the ink.

use std::collections::BTreeMap;

use image::{GrayImage, imageops};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use schriftwerk_core::types::GridTemplate;
use tracing::{debug, instrument, trace};

/// Slices a rectified frame into per-character binary ink masks.
///
/// Characters bind to cells in row-major reading order. Each cell is inset
/// symmetrically so the printed cell borders stay out of the mask, then
/// binarized (Otsu + inverse) so ink is foreground. Cells without ink are
/// dropped entirely — the character simply gets no glyph.
pub struct CellSegmenter {
    grid: GridTemplate,
    inset: f32,
    min_ink_pixels: u32,
}

impl CellSegmenter {
    pub fn new(grid: GridTemplate, inset: f32, min_ink_pixels: u32) -> Self {
        Self {
            grid,
            inset,
            min_ink_pixels,
        }
    }

    /// Extract the ink mask of every non-empty cell, keyed by character.
    ///
    /// The map is ordered by code point, which downstream stages rely on for
    /// deterministic glyph ordering.
    #[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
    pub fn segment(&self, frame: &GrayImage) -> BTreeMap<char, GrayImage> {
        let cell_w = frame.width() / self.grid.cols;
        let cell_h = frame.height() / self.grid.rows;
        let inset_x = (cell_w as f32 * self.inset) as u32;
        let inset_y = (cell_h as f32 * self.inset) as u32;
        let inner_w = cell_w.saturating_sub(2 * inset_x).max(1);
        let inner_h = cell_h.saturating_sub(2 * inset_y).max(1);

        let mut cells = BTreeMap::new();
        for (i, &ch) in self.grid.charset.iter().enumerate() {
            let (row, col) = self.grid.cell_position(i);
            let x = col * cell_w + inset_x;
            let y = row * cell_h + inset_y;

            let roi = imageops::crop_imm(frame, x, y, inner_w, inner_h).to_image();
            let mask = binarize_cell(&roi);

            let ink_pixels = mask.pixels().filter(|p| p.0[0] > 0).count() as u32;
            if ink_pixels <= self.min_ink_pixels {
                trace!(glyph = %ch, "Cell empty; skipped");
                continue;
            }
            trace!(glyph = %ch, ink_pixels, "Cell extracted");
            cells.insert(ch, mask);
        }

        debug!(
            cells = cells.len(),
            charset = self.grid.charset.len(),
            "Segmentation complete"
        );
        cells
    }
}

/// Binarize one cell with ink as foreground (255).
///
/// Inverse thresholding at the Otsu level handles varying pen darkness; a
/// uniform (inkless) cell produces an Otsu level of zero, so nothing becomes
/// foreground and the cell counts as empty.
fn binarize_cell(roi: &GrayImage) -> GrayImage {
    let level = otsu_level(roi);
    threshold(roi, level, ThresholdType::BinaryInverted)
}
