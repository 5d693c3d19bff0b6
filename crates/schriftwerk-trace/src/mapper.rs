// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Design-space mapping — image pixel coordinates to font design units.
//
// One global affine shared by every glyph: uniform scale, vertical flip, and
// a vertical offset that puts the top of a cell at the cap height and the
// bottom at the baseline. Deliberately no per-glyph auto-scaling or
// centering; uneven hand-drawn sizing is part of the look.

use kurbo::{Affine, BezPath};
use schriftwerk_core::config::PipelineConfig;

/// Maps traced outlines from pixel space (origin top-left, y down) into font
/// design space (origin on the baseline, y up).
pub struct DesignSpaceMapper {
    transform: Affine,
}

impl DesignSpaceMapper {
    /// `cap_height` in font units; `cell_inner_height_px` is the pixel height
    /// of the inset cell interior the ink lives in.
    pub fn new(cap_height: i16, cell_inner_height_px: u32) -> Self {
        let scale = cap_height as f64 / cell_inner_height_px.max(1) as f64;
        // x' = s*x ; y' = cap - s*y (flip plus offset).
        let transform = Affine::new([scale, 0.0, 0.0, -scale, 0.0, cap_height as f64]);
        Self { transform }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.font.cap_height, config.cell_inner_height())
    }

    /// Transform an outline into font design space.
    pub fn to_font_space(&self, outline: &BezPath) -> BezPath {
        let mut mapped = outline.clone();
        mapped.apply_affine(self.transform);
        mapped
    }
}
