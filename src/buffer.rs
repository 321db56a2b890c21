//! Limited record buffer.

/// Buffer limited by record count.
///
/// Accumulates records until it reaches its limit; a full (or final, partially filled)
/// buffer is sorted and flushed out as one chunk file.
pub struct LimitedBuffer<T> {
    limit: usize,
    inner: Vec<T>,
}

impl<T: Ord> LimitedBuffer<T> {
    /// Creates an empty buffer accepting up to `limit` records.
    pub fn new(limit: usize) -> Self {
        LimitedBuffer {
            limit,
            inner: Vec::with_capacity(limit),
        }
    }

    /// Adds a record to the buffer.
    pub fn push(&mut self, item: T) {
        self.inner.push(item);
    }

    /// Returns buffer length.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Checks if the buffer reached its record limit.
    pub fn is_full(&self) -> bool {
        self.inner.len() >= self.limit
    }

    /// Sorts the buffered records ascending.
    pub fn sort(&mut self) {
        self.inner.sort_unstable();
    }

    /// Empties the buffer, yielding the records in their current order.
    /// The buffer's allocation is kept for reuse.
    pub fn drain(&mut self) -> std::vec::Drain<'_, T> {
        self.inner.drain(..)
    }
}
