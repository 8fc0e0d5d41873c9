//! Fixed-size ring buffers of recent hit/leak points, kept for visual
//! inspection rather than statistics.

use cgmath::Point3;

/// Capacity of the hit-point ring buffer.
pub const HIT_CACHE_SIZE: usize = 2048;
/// Capacity of the leak-point ring buffer.
pub const LEAK_CACHE_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy)]
pub struct HitCacheEntry {
    pub pos: Point3<f64>,
    pub facet_id: u32,
    pub kind: HitKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    Desorb,
    Bounce,
    Absorb,
    /// Flight truncated by a time-limit/decay cutoff rather than reaching a
    /// facet naturally.
    Last,
}

#[derive(Debug, Clone, Copy)]
pub struct LeakCacheEntry {
    pub pos: Point3<f64>,
    pub dir: cgmath::Vector3<f64>,
}

/// A ring buffer that overwrites the oldest entry once full.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    capacity: usize,
    entries: Vec<T>,
    next: usize,
}

impl<T> RingBuffer<T> {
    fn new(capacity: usize) -> Self {
        RingBuffer { capacity, entries: Vec::with_capacity(capacity), next: 0 }
    }

    pub fn push(&mut self, entry: T) {
        if self.entries.len() < self.capacity {
            self.entries.push(entry);
        } else {
            self.entries[self.next] = entry;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type HitCache = RingBuffer<HitCacheEntry>;
pub type LeakCache = RingBuffer<LeakCacheEntry>;

impl HitCache {
    pub fn with_default_capacity() -> Self {
        RingBuffer::new(HIT_CACHE_SIZE)
    }
}

impl LeakCache {
    pub fn with_default_capacity() -> Self {
        RingBuffer::new(LEAK_CACHE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_around_when_full() {
        let mut rb: RingBuffer<i32> = RingBuffer::new(3);
        rb.push(1);
        rb.push(2);
        rb.push(3);
        rb.push(4);
        assert_eq!(rb.entries(), &[4, 2, 3]);
        assert_eq!(rb.len(), 3);
    }
}
