//! The per-session context tying the sampling components together.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::diagnostics::{DiagnosticSink, LogSink};
use crate::frame_buffer::FrameBufferManager;
use crate::handle::{MethodHandle, ThreadHandle};
use crate::metadata::{MethodMetadataEncoder, PackedMetadataBlob};
use crate::runtime::Runtime;
use crate::sampler::SingleStackSampler;
use crate::snapshot::{AllStacksSnapshot, ThreadSnapshotSet, MAX_FRAMES};
use crate::thread_state::{JvmtiThreadStates, ThreadStateMapper};

/// Owns a frame buffer and the collaborators the six sampling operations need.
///
/// Every operation takes `&self`; the frame buffer sits behind a mutex, so a
/// session can be shared between threads. Independent sessions do not share
/// buffers.
///
/// ```rust,ignore
/// let session = SamplingSession::new(jvmti);
/// session.create_frame_buffer(1024);
/// let mut ids = [0i64; 1024];
/// let n = session.capture_stack(thread, 1024, &mut ids);
/// let names = session.resolve_method_metadata(&ids[..n]);
/// ```
pub struct SamplingSession<R> {
    runtime: R,
    buffers: Mutex<FrameBufferManager>,
    sink: Arc<dyn DiagnosticSink>,
    state_mapper: Arc<dyn ThreadStateMapper>,
    snapshot: AllStacksSnapshot,
}

impl<R: Runtime> SamplingSession<R> {
    pub fn new(runtime: R) -> Self {
        SamplingSession {
            runtime,
            buffers: Mutex::new(FrameBufferManager::new()),
            sink: Arc::new(LogSink),
            state_mapper: Arc::new(JvmtiThreadStates),
            snapshot: AllStacksSnapshot::new(MAX_FRAMES),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_state_mapper(mut self, mapper: Arc<dyn ThreadStateMapper>) -> Self {
        self.state_mapper = mapper;
        self
    }

    /// Depth bound for [`capture_all_stacks`](Self::capture_all_stacks).
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.snapshot = AllStacksSnapshot::new(max_frames);
        self
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn has_frame_buffer(&self) -> bool {
        self.buffers.lock().is_allocated()
    }

    /// getStackDepth: frames currently on `thread`'s stack, 0 on failure.
    pub fn get_stack_depth(&self, thread: ThreadHandle) -> i32 {
        match SingleStackSampler::new(&self.runtime, &*self.sink).stack_depth(thread) {
            Ok(depth) => i32::try_from(depth).unwrap_or(i32::MAX),
            Err(err) => {
                log::warn!("cannot read stack depth of {thread:?}: {err}");
                0
            }
        }
    }

    /// createFrameBuffer: replaces the frame buffer with one of `max_frames`.
    pub fn create_frame_buffer(&self, max_frames: usize) {
        self.buffers.lock().create(max_frames);
    }

    /// clearFrameBuffer: releases the frame buffer. Idempotent.
    pub fn clear_frame_buffer(&self) {
        self.buffers.lock().clear();
    }

    /// captureStack: writes up to `max_depth` identifiers of `thread`'s stack
    /// into `out` and returns how many were written.
    ///
    /// Returns 0 without touching `out` when no frame buffer is allocated.
    pub fn capture_stack(&self, thread: ThreadHandle, max_depth: usize, out: &mut [i64]) -> usize {
        let mut buffers = self.buffers.lock();
        SingleStackSampler::new(&self.runtime, &*self.sink).capture_stack(&mut buffers, thread, max_depth, out)
    }

    /// Like [`capture_stack`](Self::capture_stack), handing the identifiers to
    /// `f` while the buffer is locked instead of copying them out.
    pub fn with_stack_sample<T>(&self, thread: ThreadHandle, max_depth: usize, f: impl FnOnce(&[i64]) -> T) -> T {
        let mut buffers = self.buffers.lock();
        let ids = SingleStackSampler::new(&self.runtime, &*self.sink).sample(&mut buffers, thread, max_depth);
        f(ids)
    }

    /// resolveMethodMetadata: packs metadata for a batch of transport ids.
    pub fn resolve_method_metadata(&self, method_ids: &[i64]) -> PackedMetadataBlob {
        let methods: Vec<MethodHandle> = method_ids.iter().map(|&id| MethodHandle::from_transport(id)).collect();
        MethodMetadataEncoder::new(&self.runtime, &*self.sink).resolve_batch(&methods)
    }

    /// captureAllStacks: one consistent snapshot of every thread.
    pub fn capture_all_stacks(&self) -> ThreadSnapshotSet {
        self.snapshot.capture(&self.runtime, &*self.state_mapper, &*self.sink)
    }
}
