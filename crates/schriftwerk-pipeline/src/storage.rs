// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font persistence. Finished fonts land in a flat directory, one file per
// job, named after the job id so repeated runs overwrite deterministically.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use schriftwerk_core::error::Result;
use schriftwerk_core::types::JobId;

/// Directory-backed store for generated fonts.
#[derive(Debug, Clone)]
pub struct FontStore {
    root: PathBuf,
}

impl FontStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Persist font bytes for a job. Returns the path relative to the store
    /// root; status records carry this relative form.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn write_font(&self, job_id: &JobId, bytes: &[u8]) -> Result<String> {
        std::fs::create_dir_all(&self.root)?;
        let file_name = format!("{job_id}.ttf");
        std::fs::write(self.root.join(&file_name), bytes)?;
        info!(file = %file_name, "font persisted");
        Ok(file_name)
    }

    /// Absolute location of a font previously returned by [`write_font`].
    ///
    /// [`write_font`]: FontStore::write_font
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
