//! Whole-process stack snapshots.

use crate::diagnostics::{DiagnosticSink, SkipReason};
use crate::handle::ThreadHandle;
use crate::runtime::{Runtime, ThreadStacks};
use crate::thread_state::ThreadStateMapper;

/// Deepest stack a snapshot records per thread.
pub const MAX_FRAMES: usize = 16384;

/// Three index-aligned sequences: entry `i` of each describes the same thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadSnapshotSet {
    pub threads: Vec<ThreadHandle>,
    /// Mapped state codes.
    pub states: Vec<i32>,
    /// Transport identifiers, innermost frame first.
    pub frames: Vec<Vec<i64>>,
}

impl ThreadSnapshotSet {
    fn with_capacity(count: usize) -> Self {
        ThreadSnapshotSet {
            threads: Vec::with_capacity(count),
            states: Vec::with_capacity(count),
            frames: Vec::with_capacity(count),
        }
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ThreadHandle, i32, &[i64])> + '_ {
        self.threads
            .iter()
            .zip(&self.states)
            .zip(&self.frames)
            .map(|((&thread, &state), frames)| (thread, state, frames.as_slice()))
    }
}

/// Captures every thread's stack in one atomic runtime call.
#[derive(Debug, Clone, Copy)]
pub struct AllStacksSnapshot {
    max_frames: usize,
}

impl Default for AllStacksSnapshot {
    fn default() -> Self {
        AllStacksSnapshot { max_frames: MAX_FRAMES }
    }
}

impl AllStacksSnapshot {
    pub fn new(max_frames: usize) -> Self {
        AllStacksSnapshot { max_frames }
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Takes the snapshot.
    ///
    /// A failed capture yields an empty set, never partial data. The
    /// runtime-owned result is released only after all three sequences are
    /// built.
    pub fn capture<R: Runtime>(
        &self,
        runtime: &R,
        mapper: &dyn ThreadStateMapper,
        sink: &dyn DiagnosticSink,
    ) -> ThreadSnapshotSet {
        let stacks = match runtime.all_stack_traces(self.max_frames) {
            Ok(stacks) => stacks,
            Err(err) => {
                sink.sample_skipped(SkipReason::SnapshotFailed, Some(&err));
                return ThreadSnapshotSet::default();
            }
        };

        let mut set = ThreadSnapshotSet::with_capacity(stacks.thread_count());
        for stack in stacks.iter() {
            set.threads.push(stack.thread);
            set.states.push(mapper.map_state(stack.state));
            set.frames
                .push(stack.frames.iter().map(|frame| frame.method.to_transport()).collect());
        }
        drop(stacks);

        log::trace!("captured stacks of {} threads", set.len());
        set
    }
}
