//! Sweep ring buffers shared between ingestion and redraw
//!
//! A single writer (ingestion, serialized by the scope) advances the cursor;
//! any number of readers observe slot values without locking. A torn read
//! only ever shows a mix of one sweep's old and new samples.

use crossbeam::atomic::AtomicCell;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use sweepscope_core::ScopeError;

/// Position blanked ahead of the write head.
///
/// `ceil((pos + capacity / 100) % capacity)`, wrapped into range. `None`
/// when it would land on `pos` itself.
pub fn erase_ahead_position(pos: usize, capacity: usize) -> Option<usize> {
    if capacity == 0 {
        return None;
    }
    let cap = capacity as f64;
    let ahead = ((pos as f64 + cap / 100.0) % cap).ceil() as usize % capacity;
    (ahead != pos).then_some(ahead)
}

/// Fixed-capacity sweep trace of one display line
#[derive(Debug)]
pub struct SweepBuffer {
    slots: Box<[AtomicCell<f32>]>,
    cursor: AtomicUsize,
}

impl SweepBuffer {
    /// All slots start blank (NaN), so nothing stale is drawn.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| AtomicCell::new(f32::NAN)).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Next position to be written.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    fn slot(&self, pos: usize) -> &AtomicCell<f32> {
        let capacity = self.slots.len();
        debug_assert!(
            pos < capacity,
            "{}",
            ScopeError::BufferIndexFault {
                position: pos,
                capacity
            }
        );
        &self.slots[pos.min(capacity - 1)]
    }

    /// Write one sample at the cursor, blank the slot ahead and advance.
    ///
    /// Returns the position written. Callers must not write concurrently.
    pub fn write(&self, value: f32) -> usize {
        let capacity = self.slots.len();
        let pos = self.cursor.load(Ordering::Relaxed) % capacity;
        self.slot(pos).store(value);
        if let Some(ahead) = erase_ahead_position(pos, capacity) {
            self.slot(ahead).store(f32::NAN);
        }
        self.cursor.store((pos + 1) % capacity, Ordering::Release);
        pos
    }

    pub fn value_at(&self, pos: usize) -> Option<f32> {
        self.slots.get(pos).map(AtomicCell::load)
    }

    /// Cursor back to zero; contents stay until overwritten.
    pub fn rewind(&self) {
        self.cursor.store(0, Ordering::Release);
    }

    /// Copy of every slot, NaN marking blanks.
    pub fn snapshot(&self) -> Vec<f32> {
        self.slots.iter().map(AtomicCell::load).collect()
    }
}

/// One display line: the channel it shows and its trace
#[derive(Debug)]
pub struct SweepLine {
    pub channel: usize,
    pub buffer: SweepBuffer,
}

/// Every line's buffer for one configuration, replaced as a whole
#[derive(Debug)]
pub struct SweepBank {
    generation: u64,
    capacity: usize,
    lines: Vec<SweepLine>,
}

impl SweepBank {
    pub fn new(channels: &[usize], capacity: usize, generation: u64) -> Self {
        let capacity = capacity.max(1);
        Self {
            generation,
            capacity,
            lines: channels
                .iter()
                .map(|&channel| SweepLine {
                    channel,
                    buffer: SweepBuffer::new(capacity),
                })
                .collect(),
        }
    }

    /// Increments on every reallocation; renderers compare it to rebuild lines.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn lines(&self) -> &[SweepLine] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&SweepLine> {
        self.lines.get(index)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn channels(&self) -> Vec<usize> {
        self.lines.iter().map(|line| line.channel).collect()
    }

    /// Rewind every line together.
    pub fn rewind(&self) {
        for line in &self.lines {
            line.buffer.rewind();
        }
    }
}

/// Immutable value published by swapping an `Arc`.
///
/// The lock is held only for the pointer clone or swap, never while the
/// value is used.
#[derive(Debug)]
pub struct Snapshot<T> {
    current: RwLock<Arc<T>>,
}

impl<T> Snapshot<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
        }
    }

    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.current.read())
    }

    /// Publish `value`, returning the previous one.
    pub fn store(&self, value: T) -> Arc<T> {
        std::mem::replace(&mut *self.current.write(), Arc::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erase_ahead_positions() {
        assert_eq!(erase_ahead_position(0, 2000), Some(20));
        assert_eq!(erase_ahead_position(1990, 2000), Some(10));
        // fractional offset rounds up
        assert_eq!(erase_ahead_position(10, 250), Some(13));
        // lands exactly on capacity and wraps
        assert_eq!(erase_ahead_position(247, 250), Some(0));
        assert_eq!(erase_ahead_position(0, 1), None);
        assert_eq!(erase_ahead_position(3, 50), Some(4));
    }

    #[test]
    fn test_write_blanks_ahead() {
        let buffer = SweepBuffer::new(2000);
        for i in 0..100 {
            buffer.write(0.5);
            let pos = i % 2000;
            let ahead = erase_ahead_position(pos, 2000).unwrap();
            assert!(buffer.value_at(ahead).unwrap().is_nan());
            assert_eq!(buffer.value_at(pos), Some(0.5));
        }
    }

    #[test]
    fn test_wraparound() {
        let capacity = 40;
        let buffer = SweepBuffer::new(capacity);
        for i in 0..capacity {
            buffer.write(i as f32);
        }
        let k = 7;
        for i in 0..k {
            buffer.write(100.0 + i as f32);
        }
        assert_eq!(buffer.cursor(), k % capacity);
        for i in 0..k {
            assert_eq!(buffer.value_at(i), Some(100.0 + i as f32));
        }
        // capacity / 100 < 1, so only the slot right after the head is blanked
        assert!(buffer.value_at(k).unwrap().is_nan());
        for i in (k + 1)..capacity {
            assert_eq!(buffer.value_at(i), Some(i as f32));
        }
    }

    #[test]
    fn test_capacity_of_one_keeps_value() {
        let buffer = SweepBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.write(3.0), 0);
        assert_eq!(buffer.write(4.0), 0);
        assert_eq!(buffer.value_at(0), Some(4.0));
        assert_eq!(buffer.cursor(), 0);
    }

    #[test]
    fn test_bank_rewind_is_uniform() {
        let bank = SweepBank::new(&[0, 3, 5], 100, 1);
        for (i, line) in bank.lines().iter().enumerate() {
            for _ in 0..(10 + i) {
                line.buffer.write(1.0);
            }
        }
        bank.rewind();
        assert!(bank.lines().iter().all(|line| line.buffer.cursor() == 0));
        assert_eq!(bank.channels(), vec![0, 3, 5]);
        assert_eq!(bank.generation(), 1);
    }

    #[test]
    fn test_snapshot_swap() {
        let snapshot = Snapshot::new(SweepBank::new(&[0], 10, 0));
        let held = snapshot.load();
        let old = snapshot.store(SweepBank::new(&[0, 1], 20, 1));
        assert_eq!(old.generation(), 0);
        // readers holding the old bank are unaffected
        assert_eq!(held.capacity(), 10);
        assert_eq!(snapshot.load().capacity(), 20);
    }
}
