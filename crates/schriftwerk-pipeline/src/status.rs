// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Status reporting. The pipeline publishes fire-and-forget records as a job
// advances; callers poll whatever sink implementation they plugged in.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use schriftwerk_core::types::{JobId, StatusRecord};

/// Receives status updates as a job moves through the pipeline.
///
/// Updates are advisory: a sink must never fail the pipeline, so the trait
/// has no error channel. Implementations log and swallow their own problems.
pub trait StatusSink: Send + Sync {
    fn update(&self, job_id: &JobId, record: &StatusRecord);
}

/// Discards every update. Useful for one-shot invocations.
#[derive(Debug, Default)]
pub struct NullStatusSink;

impl StatusSink for NullStatusSink {
    fn update(&self, _job_id: &JobId, _record: &StatusRecord) {}
}

/// In-memory sink keeping the latest record per job.
///
/// Enforces the monotonic state contract: updates that would move a job
/// backwards, or past a terminal state, are ignored.
#[derive(Debug, Default)]
pub struct MemoryStatusSink {
    records: Mutex<HashMap<JobId, StatusRecord>>,
}

impl MemoryStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest record for a job, if any update has arrived.
    pub fn snapshot(&self, job_id: &JobId) -> Option<StatusRecord> {
        self.records
            .lock()
            .map(|map| map.get(job_id).cloned())
            .unwrap_or(None)
    }
}

impl StatusSink for MemoryStatusSink {
    fn update(&self, job_id: &JobId, record: &StatusRecord) {
        let Ok(mut map) = self.records.lock() else {
            return;
        };
        if let Some(existing) = map.get(job_id) {
            if existing.state.is_terminal() || existing.state.rank() > record.state.rank() {
                debug!(
                    %job_id,
                    current = ?existing.state,
                    rejected = ?record.state,
                    "ignoring out-of-order status update"
                );
                return;
            }
        }
        map.insert(*job_id, record.clone());
    }
}
