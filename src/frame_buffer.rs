//! The reusable frame buffer behind single-thread sampling.

use crate::handle::CallFrame;

/// A pair of equally sized arrays: raw frames as the VM writes them, and the
/// same frames converted to 64-bit transport identifiers.
#[derive(Debug)]
pub struct FrameBuffer {
    frames: Box<[CallFrame]>,
    ids: Box<[i64]>,
}

impl FrameBuffer {
    fn try_new(capacity: usize) -> Option<Self> {
        Some(FrameBuffer {
            frames: try_alloc(capacity)?,
            ids: try_alloc(capacity)?,
        })
    }

    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// Both arrays at once, for walking into one and converting into the other.
    pub fn split_mut(&mut self) -> (&mut [CallFrame], &mut [i64]) {
        (&mut self.frames[..], &mut self.ids[..])
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }
}

fn try_alloc<T: Copy + Default>(len: usize) -> Option<Box<[T]>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).ok()?;
    v.resize(len, T::default());
    Some(v.into_boxed_slice())
}

/// Owns at most one [`FrameBuffer`] for the lifetime of a sampling session.
#[derive(Debug, Default)]
pub struct FrameBufferManager {
    buffer: Option<FrameBuffer>,
}

impl FrameBufferManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any existing buffer with one holding `max_frames` frames.
    ///
    /// The old buffer is released first. If the new one cannot be allocated
    /// the manager is left without a buffer, which samplers treat as
    /// "sampling unavailable".
    pub fn create(&mut self, max_frames: usize) {
        self.clear();
        self.buffer = FrameBuffer::try_new(max_frames);
        match &self.buffer {
            Some(_) => log::debug!("allocated frame buffer for {max_frames} frames"),
            None => log::warn!("cannot allocate frame buffer for {max_frames} frames; sampling disabled"),
        }
    }

    /// Releases the buffer. Does nothing if none is allocated.
    pub fn clear(&mut self) {
        if self.buffer.take().is_some() {
            log::debug!("released frame buffer");
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    /// Frame capacity, or 0 without a buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.as_ref().map_or(0, FrameBuffer::capacity)
    }

    pub fn buffer_mut(&mut self) -> Option<&mut FrameBuffer> {
        self.buffer.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_clear() {
        let mut buffers = FrameBufferManager::new();
        assert!(!buffers.is_allocated());
        buffers.create(32);
        assert_eq!(buffers.capacity(), 32);
        buffers.clear();
        buffers.clear();
        assert!(!buffers.is_allocated());
        assert_eq!(buffers.capacity(), 0);
    }

    #[test]
    fn create_replaces_existing_buffer() {
        let mut buffers = FrameBufferManager::new();
        buffers.create(8);
        buffers.create(2);
        assert_eq!(buffers.capacity(), 2);
        let buffer = buffers.buffer_mut().unwrap();
        let (frames, ids) = buffer.split_mut();
        assert_eq!((frames.len(), ids.len()), (2, 2));
    }

    #[test]
    fn impossible_allocation_leaves_no_buffer() {
        let mut buffers = FrameBufferManager::new();
        buffers.create(4);
        buffers.create(usize::MAX / 2);
        assert!(!buffers.is_allocated());
    }
}
