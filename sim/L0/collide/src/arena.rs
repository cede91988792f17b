//! Per-step arena for transient collision data.
//!
//! Raw contacts only live for one simulation step. A [`StepArena`] stores
//! each pair's contacts as one contiguous [`ArenaSpan`] in a single growing
//! buffer and is reset once per step; the buffer keeps its capacity, so
//! after warm-up a step allocates nothing.
//!
//! Spans carry the generation they were issued in. Reading a span after
//! [`StepArena::reset`] is detected and yields `None`.

use std::marker::PhantomData;

/// A contiguous run of values allocated together.
#[derive(Debug)]
pub struct ArenaSpan<T> {
    start: u32,
    len: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ArenaSpan<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArenaSpan<T> {}

impl<T> ArenaSpan<T> {
    /// Number of values in the span.
    #[must_use]
    pub fn len(self) -> usize {
        self.len as usize
    }

    /// Whether the span is empty.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len == 0
    }
}

/// Bump-style typed arena, reset once per simulation step.
#[derive(Debug, Clone)]
pub struct StepArena<T> {
    items: Vec<T>,
    generation: u32,
}

impl<T> Default for StepArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StepArena<T> {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generation: 0,
        }
    }

    /// Store every value of an iterator contiguously.
    #[allow(clippy::cast_possible_truncation)]
    pub fn alloc_extend<I>(&mut self, values: I) -> ArenaSpan<T>
    where
        I: IntoIterator<Item = T>,
    {
        let start = self.items.len();
        self.items.extend(values);
        ArenaSpan {
            start: start as u32,
            len: (self.items.len() - start) as u32,
            generation: self.generation,
            _marker: PhantomData,
        }
    }

    /// The values of a span allocated during the current step.
    #[must_use]
    pub fn span(&self, span: ArenaSpan<T>) -> Option<&[T]> {
        if span.generation != self.generation {
            return None;
        }
        let start = span.start as usize;
        self.items.get(start..start + span.len as usize)
    }

    /// Number of values allocated this step.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing was allocated this step.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current buffer capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Release every value and invalidate outstanding spans.
    pub fn reset(&mut self) {
        self.items.clear();
        self.generation = self.generation.wrapping_add(1);
    }
}
