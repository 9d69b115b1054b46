//! Fixed-size block accumulation
//!
//! Sits between push-based ingestion and the engine's pull of whole blocks.

/// Buffers engine samples until a full block is available
#[derive(Debug)]
pub struct BlockAccumulator {
    buffer: Vec<f32>,
    fill: usize,
}

impl BlockAccumulator {
    /// Create an accumulator for blocks of `capacity` samples (at least 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(1)],
            fill: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Samples currently waiting for the next block
    pub fn pending(&self) -> usize {
        self.fill
    }

    /// Append `samples`, calling `on_block` with every block that fills up
    ///
    /// Returns the number of blocks flushed by this call. `on_block` always
    /// receives exactly `capacity()` samples.
    pub fn push<F>(&mut self, samples: &[f32], mut on_block: F) -> usize
    where
        F: FnMut(&[f32]),
    {
        let capacity = self.buffer.len();
        let mut flushed = 0;
        let mut rest = samples;

        while !rest.is_empty() {
            let take = (capacity - self.fill).min(rest.len());
            self.buffer[self.fill..self.fill + take].copy_from_slice(&rest[..take]);
            self.fill += take;
            rest = &rest[take..];

            if self.fill == capacity {
                on_block(&self.buffer);
                self.fill = 0;
                flushed += 1;
            }
        }

        flushed
    }

    /// Discard any partially filled block
    pub fn clear(&mut self) {
        self.fill = 0;
    }
}
