//! Least-significant-digit radix sort producing ranks.
//!
//! The sorter never moves the caller's keys. It returns a permutation
//! (`ranks[i]` is the index of the i-th smallest key) and keeps its buffers
//! between calls, so a per-step caller allocates only when the input grows.
//!
//! The sort is stable: equal keys keep their input order. Passes whose
//! digit is identical for every key are skipped.
//!
//! # Example
//!
//! ```
//! use sim_collide::radix::RadixSorter;
//!
//! let mut sorter = RadixSorter::new();
//! let ranks = sorter.sort_f64(&[2.5, -1.0, 0.0, -7.25]);
//! assert_eq!(ranks, &[3, 1, 2, 0]);
//! ```

#![allow(clippy::cast_possible_truncation)]

/// Reusable radix sorter.
#[derive(Debug, Clone, Default)]
pub struct RadixSorter {
    ranks: Vec<u32>,
    scratch: Vec<u32>,
    float_keys: Vec<u64>,
}

impl RadixSorter {
    /// Create a sorter with empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sorter with room for `capacity` keys.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ranks: Vec::with_capacity(capacity),
            scratch: Vec::with_capacity(capacity),
            float_keys: Vec::new(),
        }
    }

    /// Sort 32-bit keys, returning ranks.
    pub fn sort_u32(&mut self, keys: &[u32]) -> &[u32] {
        self.sort_digits(keys.len(), 4, |i, pass| {
            ((keys[i] >> (pass * 8)) & 0xff) as usize
        });
        &self.ranks
    }

    /// Sort 64-bit keys, returning ranks.
    pub fn sort_u64(&mut self, keys: &[u64]) -> &[u32] {
        self.sort_digits(keys.len(), 8, |i, pass| {
            ((keys[i] >> (pass * 8)) & 0xff) as usize
        });
        &self.ranks
    }

    /// Sort floats (negative values included), returning ranks.
    ///
    /// Keys are mapped to unsigned integers with the same ordering: negative
    /// values have every bit flipped, positive values get the sign bit set.
    pub fn sort_f64(&mut self, keys: &[f64]) -> &[u32] {
        let mut mapped = std::mem::take(&mut self.float_keys);
        mapped.clear();
        mapped.extend(keys.iter().map(|&k| ordered_bits(k)));
        self.sort_digits(mapped.len(), 8, |i, pass| {
            ((mapped[i] >> (pass * 8)) & 0xff) as usize
        });
        self.float_keys = mapped;
        &self.ranks
    }

    /// Ranks from the last sort.
    #[must_use]
    pub fn ranks(&self) -> &[u32] {
        &self.ranks
    }

    /// Drop the contents of the buffers, keeping their capacity.
    pub fn clear(&mut self) {
        self.ranks.clear();
        self.scratch.clear();
        self.float_keys.clear();
    }

    fn sort_digits<F>(&mut self, len: usize, passes: usize, digit: F)
    where
        F: Fn(usize, usize) -> usize,
    {
        self.ranks.clear();
        self.ranks.extend(0..len as u32);
        self.scratch.clear();
        self.scratch.resize(len, 0);

        for pass in 0..passes {
            let mut counts = [0usize; 256];
            for i in 0..len {
                counts[digit(i, pass)] += 1;
            }
            if counts.iter().any(|&c| c == len) {
                continue;
            }

            let mut offsets = [0usize; 256];
            let mut running = 0;
            for (offset, count) in offsets.iter_mut().zip(counts.iter()) {
                *offset = running;
                running += count;
            }

            for &rank in &self.ranks {
                let d = digit(rank as usize, pass);
                self.scratch[offsets[d]] = rank;
                offsets[d] += 1;
            }
            std::mem::swap(&mut self.ranks, &mut self.scratch);
        }
    }
}

/// Map a float to an unsigned integer with the same total order.
#[must_use]
#[inline]
pub fn ordered_bits(value: f64) -> u64 {
    let bits = value.to_bits();
    if bits >> 63 == 1 {
        !bits
    } else {
        bits | (1 << 63)
    }
}
