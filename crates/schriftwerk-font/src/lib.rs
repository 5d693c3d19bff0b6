// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// schriftwerk-font — TrueType assembly.
//
// Takes the per-character outlines produced by the tracing stage (already in
// font design space) and packs them into a complete, installable TTF.

pub mod assembler;

pub use assembler::FontAssembler;
