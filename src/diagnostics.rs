//! Where soft failures go.
//!
//! The sampling operations never fail outright: a method that cannot be
//! resolved gets a placeholder record and a sample that cannot be taken comes
//! back empty. Each such event is reported to a [`DiagnosticSink`] so the
//! embedding profiler (or a test) can observe it.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Error;
use crate::handle::MethodHandle;
use crate::metadata::ResolutionStage;

/// Why a sample produced no data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// No frame buffer is allocated, usually because sampling was stopped
    /// while a sample was being requested.
    NoFrameBuffer,
    /// The runtime could not walk the thread's stack.
    StackWalkFailed,
    /// The all-threads capture failed.
    SnapshotFailed,
}

impl SkipReason {
    const COUNT: usize = 3;

    fn index(self) -> usize {
        match self {
            SkipReason::NoFrameBuffer => 0,
            SkipReason::StackWalkFailed => 1,
            SkipReason::SnapshotFailed => 2,
        }
    }
}

pub trait DiagnosticSink: Send + Sync {
    /// A method's metadata could not be resolved at `stage`.
    fn resolution_failed(&self, method: MethodHandle, stage: ResolutionStage, error: &Error);

    /// A sample produced no data. `error` is the runtime failure behind it,
    /// if there was one.
    fn sample_skipped(&self, _reason: SkipReason, _error: Option<&Error>) {}
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn resolution_failed(&self, method: MethodHandle, stage: ResolutionStage, error: &Error) {
        log::warn!("cannot resolve {method:?} at {stage}: {error}");
    }

    fn sample_skipped(&self, reason: SkipReason, error: Option<&Error>) {
        match (reason, error) {
            (SkipReason::NoFrameBuffer, _) => log::debug!("sample skipped: no frame buffer"),
            // threads routinely exit between being picked and being walked
            (SkipReason::StackWalkFailed, Some(error)) => log::debug!("stack walk failed: {error}"),
            (SkipReason::SnapshotFailed, Some(error)) => log::warn!("all-threads stack capture failed: {error}"),
            (reason, None) => log::warn!("sample skipped: {reason:?}"),
        }
    }
}

/// Counts diagnostics instead of printing them.
#[derive(Debug, Default)]
pub struct CountingSink {
    failures: [AtomicUsize; ResolutionStage::COUNT],
    skips: [AtomicUsize; SkipReason::COUNT],
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures_at(&self, stage: ResolutionStage) -> usize {
        self.failures[stage.index()].load(Ordering::Relaxed)
    }

    pub fn total_failures(&self) -> usize {
        self.failures.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    pub fn skips(&self, reason: SkipReason) -> usize {
        self.skips[reason.index()].load(Ordering::Relaxed)
    }
}

impl DiagnosticSink for CountingSink {
    fn resolution_failed(&self, _method: MethodHandle, stage: ResolutionStage, _error: &Error) {
        self.failures[stage.index()].fetch_add(1, Ordering::Relaxed);
    }

    fn sample_skipped(&self, reason: SkipReason, _error: Option<&Error>) {
        self.skips[reason.index()].fetch_add(1, Ordering::Relaxed);
    }
}
