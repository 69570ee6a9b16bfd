//! Fixed-capacity accumulator for one batch of FIFO records.

use crate::error::GestureError;
use crate::regs::FIFO_CAPACITY;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuadrantSample {
    pub up: u8,
    pub down: u8,
    pub left: u8,
    pub right: u8,
}

impl QuadrantSample {
    pub fn new(up: u8, down: u8, left: u8, right: u8) -> Self {
        Self {
            up,
            down,
            left,
            right,
        }
    }

    /// Decode one FIFO record (U, D, L, R byte order).
    pub fn from_record(rec: &[u8; 4]) -> Self {
        Self::new(rec[0], rec[1], rec[2], rec[3])
    }

    pub fn all_above(&self, threshold: u8) -> bool {
        self.up > threshold
            && self.down > threshold
            && self.left > threshold
            && self.right > threshold
    }
}

#[derive(Debug, Clone)]
pub struct GestureBuffer {
    samples: [QuadrantSample; FIFO_CAPACITY],
    count: usize,
    write_index: usize,
}

impl Default for GestureBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureBuffer {
    pub fn new() -> Self {
        Self {
            samples: [QuadrantSample::default(); FIFO_CAPACITY],
            count: 0,
            write_index: 0,
        }
    }

    pub fn push(&mut self, sample: QuadrantSample) -> Result<(), GestureError> {
        if self.write_index >= FIFO_CAPACITY {
            return Err(GestureError::BufferOverflow {
                capacity: FIFO_CAPACITY,
            });
        }
        self.samples[self.write_index] = sample;
        self.write_index += 1;
        self.count += 1;
        Ok(())
    }

    /// Stale samples stay in place; `count` gates what is visible.
    pub fn clear(&mut self) {
        self.count = 0;
        self.write_index = 0;
    }

    pub fn snapshot(&self) -> &[QuadrantSample] {
        &self.samples[..self.count]
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn remaining(&self) -> usize {
        FIFO_CAPACITY - self.write_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_preserves_insertion_order() {
        let mut buf = GestureBuffer::new();
        buf.push(QuadrantSample::new(9, 9, 9, 9)).unwrap();
        buf.clear();
        for i in 0..5u8 {
            buf.push(QuadrantSample::new(i, i + 1, i + 2, i + 3)).unwrap();
        }
        let snap = buf.snapshot();
        assert_eq!(snap.len(), 5);
        assert_eq!(snap[0], QuadrantSample::new(0, 1, 2, 3));
        assert_eq!(snap[4], QuadrantSample::new(4, 5, 6, 7));
    }

    #[test]
    fn clear_hides_stale_samples() {
        let mut buf = GestureBuffer::new();
        buf.push(QuadrantSample::new(50, 50, 50, 50)).unwrap();
        buf.clear();
        assert!(buf.is_empty());
        assert!(buf.snapshot().is_empty());
        assert_eq!(buf.remaining(), FIFO_CAPACITY);
    }

    #[test]
    fn push_past_capacity_is_rejected() {
        let mut buf = GestureBuffer::new();
        for _ in 0..FIFO_CAPACITY {
            buf.push(QuadrantSample::default()).unwrap();
        }
        let err = buf.push(QuadrantSample::default()).unwrap_err();
        assert!(matches!(err, GestureError::BufferOverflow { capacity: 32 }));
        assert_eq!(buf.len(), FIFO_CAPACITY);
    }

    #[test]
    fn record_byte_order_is_udlr() {
        let s = QuadrantSample::from_record(&[1, 2, 3, 4]);
        assert_eq!((s.up, s.down, s.left, s.right), (1, 2, 3, 4));
    }
}
