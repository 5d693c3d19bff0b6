// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Schriftwerk.

use thiserror::Error;

/// Top-level error type for all Schriftwerk operations.
///
/// Only `Decode` and `Assembly` (plus I/O while persisting) abort a job.
/// Grid detection and per-cell tracing problems are handled in place by the
/// pipeline and never escalate past it.
#[derive(Debug, Error)]
pub enum SchriftwerkError {
    // -- Scan ingestion --
    #[error("could not decode scan: {0}")]
    Decode(String),

    // -- Rectification --
    #[error("grid boundary not found in scan")]
    GridNotFound,

    #[error("invalid grid template: {0}")]
    InvalidTemplate(String),

    // -- Tracing --
    #[error("cell tracing failed: {0}")]
    CellTrace(String),

    // -- Font assembly --
    #[error("font assembly failed: {0}")]
    Assembly(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SchriftwerkError>;
