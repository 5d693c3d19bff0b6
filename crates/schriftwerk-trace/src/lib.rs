// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// schriftwerk-trace — Outline tracing and coordinate mapping.
//
// Converts binary ink masks into closed vector subpaths (boundary following,
// corner detection, cubic Bezier fitting) and maps traced outlines from image
// pixel space into font design space.

pub mod mapper;
pub mod tracer;

pub use mapper::DesignSpaceMapper;
pub use tracer::{OutlineTracer, subpath_count};
