// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// schriftwerk-pipeline — End-to-end orchestration.
//
// Wires the raster, trace, and font stages into a single job runner, reports
// progress through a pluggable status sink, and persists finished fonts.

pub mod diagnostics;
pub mod pipeline;
pub mod status;
pub mod storage;

pub use diagnostics::{DiagnosticSink, DirectoryDiagnostics};
pub use pipeline::FontPipeline;
pub use status::{MemoryStatusSink, NullStatusSink, StatusSink};
pub use storage::FontStore;
