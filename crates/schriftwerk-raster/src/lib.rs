// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// schriftwerk-raster — Raster-side stages of the font pipeline.
//
// Provides scan decoding (encoded images or single-page PDF wrappers), grid
// rectification into the canonical frame, per-character cell segmentation,
// and the optional ink-roughening stylizer.

pub mod decode;
pub mod rectify;
pub mod segment;
pub mod stylize;

pub use decode::decode_scan;
pub use rectify::GridRectifier;
pub use segment::CellSegmenter;
pub use stylize::InkStylizer;
