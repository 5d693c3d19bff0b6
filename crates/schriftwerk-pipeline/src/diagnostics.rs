// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diagnostic captures. Optional hook for dumping intermediate rasters while
// tuning rectification or tracing parameters. Capture failures never affect
// the job.

use std::path::PathBuf;

use image::GrayImage;
use tracing::warn;

use schriftwerk_core::types::JobId;

/// Receives intermediate images from pipeline stages.
pub trait DiagnosticSink: Send + Sync {
    /// `stage` is a short slug such as `rectified` or `cell-A`.
    fn capture(&self, job_id: &JobId, stage: &str, image: &GrayImage);
}

/// Writes captures as PNGs under a directory, named `{job_id}-{stage}.png`.
#[derive(Debug, Clone)]
pub struct DirectoryDiagnostics {
    root: PathBuf,
}

impl DirectoryDiagnostics {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DiagnosticSink for DirectoryDiagnostics {
    fn capture(&self, job_id: &JobId, stage: &str, image: &GrayImage) {
        if let Err(e) = std::fs::create_dir_all(&self.root) {
            warn!(%job_id, stage, error = %e, "diagnostic directory unavailable");
            return;
        }
        let path = self.root.join(format!("{job_id}-{stage}.png"));
        if let Err(e) = image.save(&path) {
            warn!(%job_id, stage, error = %e, "diagnostic capture failed");
        }
    }
}
