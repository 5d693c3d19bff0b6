// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job runner. Drives a scan through decode, rectification, segmentation,
// optional stylization, tracing, mapping, and font assembly, publishing
// status along the way.
//
// Per-cell failures are non-fatal: a cell that cannot be traced is logged
// and skipped, and the finished font simply lacks that glyph. Only stage
// failures that leave nothing to continue with (undecodable scan, assembly
// or storage errors) fail the job.

use std::collections::BTreeMap;
use std::sync::Arc;

use kurbo::BezPath;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, error, info, instrument, warn};

use schriftwerk_core::config::PipelineConfig;
use schriftwerk_core::error::Result;
use schriftwerk_core::types::{JobId, JobState, StatusRecord};
use schriftwerk_font::FontAssembler;
use schriftwerk_raster::{CellSegmenter, GridRectifier, InkStylizer, decode_scan};
use schriftwerk_trace::{DesignSpaceMapper, OutlineTracer};

use crate::diagnostics::DiagnosticSink;
use crate::status::StatusSink;
use crate::storage::FontStore;

/// End-to-end scan-to-font pipeline.
pub struct FontPipeline {
    config: PipelineConfig,
    store: FontStore,
    status: Arc<dyn StatusSink>,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

impl FontPipeline {
    /// Fails if the configured grid template is inconsistent; nothing built
    /// downstream can recover from a bad template.
    pub fn new(
        config: PipelineConfig,
        store: FontStore,
        status: Arc<dyn StatusSink>,
    ) -> Result<Self> {
        config.grid.validate()?;
        Ok(Self {
            config,
            store,
            status,
            diagnostics: None,
        })
    }

    /// Attach a sink for intermediate-image captures.
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Run one job to completion. Returns the store-relative path of the
    /// generated font. The terminal status record is always published before
    /// this returns, success or failure.
    #[instrument(skip(self, scan), fields(job_id = %job_id, bytes = scan.len()))]
    pub fn process(&self, job_id: &JobId, scan: &[u8]) -> Result<String> {
        self.status
            .update(job_id, &StatusRecord::new(JobState::Received));
        match self.run(job_id, scan) {
            Ok((path, warning)) => {
                self.status
                    .update(job_id, &StatusRecord::done(path.clone(), warning));
                Ok(path)
            }
            Err(e) => {
                error!(error = %e, "job failed");
                self.status
                    .update(job_id, &StatusRecord::failed(e.to_string()));
                Err(e)
            }
        }
    }

    fn run(&self, job_id: &JobId, scan: &[u8]) -> Result<(String, Option<String>)> {
        self.status
            .update(job_id, &StatusRecord::new(JobState::Tracing));

        let gray = decode_scan(scan)?;
        let rectifier = GridRectifier::new(self.config.canonical_width, self.config.canonical_height);
        let (frame, grid_found) = rectifier.rectify(&gray);
        let warning = if grid_found {
            None
        } else {
            warn!("grid boundary not found; continuing with resized scan");
            Some("grid boundary not found; used the scan as-is".to_string())
        };
        if let Some(sink) = &self.diagnostics {
            sink.capture(job_id, "rectified", &frame);
        }

        let segmenter = CellSegmenter::new(
            self.config.grid.clone(),
            self.config.cell_inset,
            self.config.min_ink_pixels,
        );
        let cells = segmenter.segment(&frame);
        info!(inked = cells.len(), total = self.config.grid.charset.len(), "cells segmented");

        let stylizer = self.config.stylize.as_ref().map(InkStylizer::from_config);
        let mut rng = match self.config.stylize.as_ref().and_then(|s| s.seed) {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let tracer = OutlineTracer::new(&self.config.trace);
        let mapper = DesignSpaceMapper::from_config(&self.config);

        let mut outlines: BTreeMap<char, BezPath> = BTreeMap::new();
        for (ch, mask) in &cells {
            let styled;
            let ink = match &stylizer {
                Some(s) => {
                    styled = s.roughen(mask, &mut rng);
                    &styled
                }
                None => mask,
            };
            if let Some(sink) = &self.diagnostics {
                sink.capture(job_id, &format!("cell-{ch}"), ink);
            }
            match tracer.trace(ink) {
                Ok(path) if !path.elements().is_empty() => {
                    outlines.insert(*ch, mapper.to_font_space(&path));
                }
                Ok(_) => debug!(glyph = %ch, "only speckle in cell; skipped"),
                Err(e) => warn!(glyph = %ch, error = %e, "cell trace failed; skipped"),
            }
        }

        self.status
            .update(job_id, &StatusRecord::new(JobState::Building));
        let assembler = FontAssembler::new(self.config.font.clone());
        let bytes = assembler.assemble(&outlines, job_id)?;
        let path = self.store.write_font(job_id, &bytes)?;
        info!(path, glyphs = outlines.len(), "font generated");
        Ok((path, warning))
    }
}
