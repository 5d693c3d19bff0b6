// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Schriftwerk font engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SchriftwerkError};

/// Unique identifier for a font-generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of a font-generation job.
///
/// States only ever advance; the status sink ignores regressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Scan bytes accepted, pipeline not yet started.
    Received,
    /// Rectifying, segmenting, and tracing cells.
    Tracing,
    /// Assembling and serializing the font document.
    Building,
    /// Font persisted — see the record's `path`.
    Done,
    /// Job aborted — see the record's `detail`.
    Failed,
}

impl JobState {
    /// Monotonic ordering rank. Terminal states share the highest rank.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Received => 0,
            Self::Tracing => 1,
            Self::Building => 2,
            Self::Done | Self::Failed => 3,
        }
    }

    /// Whether the job can make no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Small structured record written to the status sink, keyed by job id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub state: JobState,
    /// Relative path of the persisted font (present once `Done`).
    pub path: Option<String>,
    /// Human-readable detail: the failure reason on `Failed`, or a
    /// non-fatal warning (e.g. degraded rectification) on `Done`.
    pub detail: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StatusRecord {
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            path: None,
            detail: None,
            updated_at: Utc::now(),
        }
    }

    pub fn done(path: String, detail: Option<String>) -> Self {
        Self {
            state: JobState::Done,
            path: Some(path),
            detail,
            updated_at: Utc::now(),
        }
    }

    pub fn failed(reason: String) -> Self {
        Self {
            state: JobState::Failed,
            path: None,
            detail: Some(reason),
            updated_at: Utc::now(),
        }
    }
}

/// Fixed grid layout shared between the printed template and the pipeline.
///
/// Characters are assigned to cells in row-major reading order. The template
/// printed by the collaborating generator must use the same descriptor — a
/// mismatch silently misassigns characters, which is why this is a value
/// passed into the segmenter rather than a constant buried in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridTemplate {
    pub rows: u32,
    pub cols: u32,
    /// Characters in row-major order; `rows * cols >= charset.len()`.
    pub charset: Vec<char>,
}

impl GridTemplate {
    /// The standard handwriting template: 7 rows × 9 columns, A–Z a–z 0–9.
    pub fn standard() -> Self {
        Self {
            rows: 7,
            cols: 9,
            charset: ('A'..='Z').chain('a'..='z').chain('0'..='9').collect(),
        }
    }

    /// Validate capacity and code-point uniqueness.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(SchriftwerkError::InvalidTemplate(
                "rows and cols must be non-zero".to_string(),
            ));
        }
        let capacity = (self.rows as usize) * (self.cols as usize);
        if capacity < self.charset.len() {
            return Err(SchriftwerkError::InvalidTemplate(format!(
                "{} cells cannot hold {} characters",
                capacity,
                self.charset.len()
            )));
        }
        let mut seen = std::collections::BTreeSet::new();
        for &c in &self.charset {
            if !seen.insert(c) {
                return Err(SchriftwerkError::InvalidTemplate(format!(
                    "duplicate character '{c}' in charset"
                )));
            }
        }
        Ok(())
    }

    /// Grid position (row, col) of the character at row-major index `i`.
    pub fn cell_position(&self, i: usize) -> (u32, u32) {
        (i as u32 / self.cols, i as u32 % self.cols)
    }
}

impl Default for GridTemplate {
    fn default() -> Self {
        Self::standard()
    }
}
