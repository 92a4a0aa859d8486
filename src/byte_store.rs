//! Append-only byte buffer with doubling growth.

/// Accumulates variable-length fields back to back.
///
/// Capacity is tracked explicitly so the growth rule is deterministic: an
/// append that would overflow grows the store to `max(capacity * 2, len + n)`.
/// Previously written bytes are never moved out of order or lost.
#[derive(Debug, Clone, Default)]
pub struct GrowableByteStore {
    bytes: Vec<u8>,
    capacity: usize,
}

impl GrowableByteStore {
    pub fn with_capacity(capacity: usize) -> Self {
        GrowableByteStore {
            bytes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `data` and returns the offset it starts at.
    pub fn append(&mut self, data: &[u8]) -> usize {
        let offset = self.bytes.len();
        let needed = offset + data.len();
        if needed > self.capacity {
            let grown = self.capacity.saturating_mul(2).max(needed);
            self.bytes.reserve_exact(grown - offset);
            self.capacity = grown;
        }
        self.bytes.extend_from_slice(data);
        offset
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Logical capacity under the doubling rule.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The written bytes, trimmed to their length.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.bytes.shrink_to_fit();
        self.bytes
    }
}
