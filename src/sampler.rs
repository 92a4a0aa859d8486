//! Sampling one thread's stack into the reusable frame buffer.

use crate::diagnostics::{DiagnosticSink, SkipReason};
use crate::error::Result;
use crate::frame_buffer::FrameBufferManager;
use crate::handle::ThreadHandle;
use crate::runtime::Runtime;

pub struct SingleStackSampler<'a, R> {
    runtime: &'a R,
    sink: &'a dyn DiagnosticSink,
}

impl<'a, R: Runtime> SingleStackSampler<'a, R> {
    pub fn new(runtime: &'a R, sink: &'a dyn DiagnosticSink) -> Self {
        SingleStackSampler { runtime, sink }
    }

    /// Current number of frames on `thread`'s stack. Touches no buffer.
    pub fn stack_depth(&self, thread: ThreadHandle) -> Result<usize> {
        self.runtime.frame_count(thread)
    }

    /// Walks up to `max_depth` frames of `thread`, innermost first, and returns
    /// their transport identifiers as a view into the buffer.
    ///
    /// Without an allocated buffer nothing is written and the view is empty.
    /// `max_depth` is clamped to the buffer capacity.
    pub fn sample<'b>(&self, buffers: &'b mut FrameBufferManager, thread: ThreadHandle, max_depth: usize) -> &'b [i64] {
        let Some(buffer) = buffers.buffer_mut() else {
            self.sink.sample_skipped(SkipReason::NoFrameBuffer, None);
            return &[];
        };
        let depth = max_depth.min(buffer.capacity());
        let (frames, ids) = buffer.split_mut();

        let count = match self.runtime.stack_trace(thread, &mut frames[..depth]) {
            Ok(count) => count.min(depth),
            Err(err) => {
                self.sink.sample_skipped(SkipReason::StackWalkFailed, Some(&err));
                return &[];
            }
        };

        for (id, frame) in ids.iter_mut().zip(&frames[..count]) {
            *id = frame.method.to_transport();
        }
        &ids[..count]
    }

    /// Samples `thread` and copies the identifiers into `out`.
    ///
    /// Returns the number of identifiers written: 0 when no buffer is
    /// allocated (no writes happen then), otherwise at most
    /// `min(max_depth, capacity, out.len())`.
    pub fn capture_stack(
        &self,
        buffers: &mut FrameBufferManager,
        thread: ThreadHandle,
        max_depth: usize,
        out: &mut [i64],
    ) -> usize {
        let ids = self.sample(buffers, thread, max_depth.min(out.len()));
        out[..ids.len()].copy_from_slice(ids);
        ids.len()
    }
}
