//! Export trigger state: guard held from click until the backend answers.

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use planner_core::export::{ExportGuard, ExportPipeline};

/// How long export waits for the map to settle before capturing anyway.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportPhase {
    Idle,
    AwaitingSettle {
        generation: u64,
        started: Instant,
        path: PathBuf,
    },
    AwaitingScreenshot {
        path: PathBuf,
    },
    Writing,
}

pub struct ExportFlow {
    pipeline: ExportPipeline,
    guard: Option<ExportGuard>,
    phase: ExportPhase,
}

impl ExportFlow {
    pub fn new(pipeline: ExportPipeline) -> Self {
        Self {
            pipeline,
            guard: None,
            phase: ExportPhase::Idle,
        }
    }

    pub fn phase(&self) -> &ExportPhase {
        &self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.guard.is_some()
    }

    /// Claims the pipeline. Returns false while another export holds it.
    pub fn begin(&mut self) -> bool {
        if self.guard.is_some() {
            return false;
        }
        self.guard = self.pipeline.try_begin();
        self.guard.is_some()
    }

    pub fn target(&mut self, path: PathBuf, generation: u64, now: Instant) {
        if self.guard.is_some() {
            self.phase = ExportPhase::AwaitingSettle {
                generation,
                started: now,
                path,
            };
        }
    }

    /// Moves to the capture step once `generation` has settled or the wait
    /// timed out. Returns true exactly when a screenshot should be requested.
    pub fn poll_settle(&mut self, settled: impl Fn(u64) -> bool, now: Instant) -> bool {
        let ExportPhase::AwaitingSettle {
            generation,
            started,
            path,
        } = &self.phase
        else {
            return false;
        };
        let timed_out = now.saturating_duration_since(*started) >= SETTLE_TIMEOUT;
        if !settled(*generation) && !timed_out {
            return false;
        }
        if timed_out {
            tracing::warn!(generation, "map did not settle before export; capturing anyway");
        }
        self.phase = ExportPhase::AwaitingScreenshot { path: path.clone() };
        true
    }

    /// Path the captured frame belongs to, if a capture was requested.
    pub fn take_capture_target(&mut self) -> Option<PathBuf> {
        match std::mem::replace(&mut self.phase, ExportPhase::Writing) {
            ExportPhase::AwaitingScreenshot { path } => Some(path),
            other => {
                self.phase = other;
                None
            }
        }
    }

    pub fn finish(&mut self) {
        self.phase = ExportPhase::Idle;
        self.guard = None;
    }
}
