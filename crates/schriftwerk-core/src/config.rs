// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::types::GridTemplate;

/// Complete configuration for one font pipeline instance.
///
/// The defaults describe the standard printed template: a 7.5in × 5.5in grid
/// scanned at 300 DPI, hence the 2250×1650 canonical frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Grid layout of the printed template.
    pub grid: GridTemplate,
    /// Width of the rectified canonical frame, in pixels.
    pub canonical_width: u32,
    /// Height of the rectified canonical frame, in pixels.
    pub canonical_height: u32,
    /// Symmetric cell inset (fraction of cell width/height) excluded to
    /// keep printed border strokes out of the ink mask.
    pub cell_inset: f32,
    /// Cells with at most this many foreground pixels are treated as empty.
    pub min_ink_pixels: u32,
    /// Optional ink-roughening stage; `None` disables it.
    pub stylize: Option<StylizeConfig>,
    pub trace: TraceConfig,
    pub font: FontConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            grid: GridTemplate::standard(),
            canonical_width: 2250,
            canonical_height: 1650,
            cell_inset: 0.10,
            min_ink_pixels: 0,
            stylize: None,
            trace: TraceConfig::default(),
            font: FontConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Pixel height of a cell's inset interior in the canonical frame —
    /// the source extent the coordinate mapper scales to the cap height.
    pub fn cell_inner_height(&self) -> u32 {
        let cell_h = self.canonical_height / self.grid.rows;
        let inset = (cell_h as f32 * self.cell_inset) as u32;
        cell_h.saturating_sub(2 * inset).max(1)
    }
}

/// Ink roughening parameters (the one deliberately non-deterministic stage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylizeConfig {
    /// Standard deviation of the per-pixel Gaussian noise. The blur that
    /// follows attenuates it heavily, so this is large relative to the
    /// 0-255 pixel range.
    pub noise_sigma: f32,
    /// Blur applied after the noise so the perturbation is spatially coherent.
    pub blur_sigma: f32,
    /// Explicit RNG seed. Identical mask + identical seed produce
    /// byte-identical output; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for StylizeConfig {
    fn default() -> Self {
        Self {
            noise_sigma: 100.0,
            blur_sigma: 2.0,
            seed: None,
        }
    }
}

/// Outline tracing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Turn angle (degrees) at a polygon vertex above which it is kept as a
    /// sharp corner rather than smoothed into a curve.
    pub corner_angle_deg: f64,
    /// Curve fitting accuracy in pixels; smaller is tighter but denser.
    pub fit_accuracy: f64,
    /// Boundaries enclosing less than this many square pixels are dropped
    /// as scanner speckle.
    pub min_speckle_area: f64,
    /// Laplacian smoothing passes applied to the boundary polygon before
    /// fitting, to remove pixel staircase noise.
    pub smooth_iterations: u32,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            corner_angle_deg: 75.0,
            fit_accuracy: 1.0,
            min_speckle_area: 4.0,
            smooth_iterations: 3,
        }
    }
}

/// Font-space geometry and identification defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    pub family_name: String,
    pub style_name: String,
    pub version: String,
    /// Design units per em square.
    pub units_per_em: u16,
    /// Font-space height the top of a cell maps to; ink sits between here
    /// and the baseline.
    pub cap_height: i16,
    pub ascent: i16,
    pub descent: i16,
    /// Fixed advance width shared by every glyph.
    pub advance_width: u16,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family_name: "Handwriting".to_string(),
            style_name: "Regular".to_string(),
            version: "Version 1.0".to_string(),
            units_per_em: 1000,
            cap_height: 750,
            ascent: 800,
            descent: -200,
            advance_width: 600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = PipelineConfig::default();
        cfg.grid.validate().expect("default grid must validate");
        assert_eq!(cfg.canonical_width, 2250);
        assert_eq!(cfg.canonical_height, 1650);
        assert!(cfg.cell_inset > 0.0 && cfg.cell_inset < 0.5);
    }

    #[test]
    fn cell_inner_height_excludes_both_insets() {
        let cfg = PipelineConfig::default();
        let cell_h = cfg.canonical_height / cfg.grid.rows; // 235
        let inner = cfg.cell_inner_height();
        assert!(inner < cell_h);
        // 10% off the top and bottom leaves roughly 80%.
        assert!((inner as f32) > cell_h as f32 * 0.75);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = PipelineConfig {
            stylize: Some(StylizeConfig {
                seed: Some(7),
                ..Default::default()
            }),
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.grid, cfg.grid);
        assert_eq!(back.stylize.unwrap().seed, Some(7));
    }
}
