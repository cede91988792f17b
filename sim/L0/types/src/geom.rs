//! Geometry identifiers and broad-phase pairs.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique identifier for a collision geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeomId(pub u64);

impl GeomId {
    /// Create a new geometry ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for GeomId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for GeomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Geom({})", self.0)
    }
}

/// Two objects whose bounding boxes currently overlap.
///
/// Pairs are unordered: [`Pair::new`] stores the smaller id first, so
/// `Pair::new(a, b) == Pair::new(b, a)` and sets of pairs iterate in a
/// stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pair {
    /// The smaller of the two ids.
    pub a: u32,
    /// The larger of the two ids.
    pub b: u32,
}

impl Pair {
    /// Create a normalized pair.
    #[must_use]
    pub fn new(a: u32, b: u32) -> Self {
        if a <= b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }

    /// Whether `id` is one of the two members.
    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.a == id || self.b == id
    }

    /// The member that isn't `id`, if `id` belongs to the pair.
    #[must_use]
    pub fn other(&self, id: u32) -> Option<u32> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }
}

impl From<(u32, u32)> for Pair {
    fn from((a, b): (u32, u32)) -> Self {
        Self::new(a, b)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_geom_id() {
        let id = GeomId::new(7);
        assert_eq!(id.raw(), 7);
        assert_eq!(id.to_string(), "Geom(7)");

        let id2: GeomId = 7.into();
        assert_eq!(id, id2);
    }

    #[test]
    fn test_pair_is_unordered() {
        assert_eq!(Pair::new(3, 1), Pair::new(1, 3));
        let pair = Pair::new(5, 2);
        assert_eq!(pair.a, 2);
        assert_eq!(pair.b, 5);
        assert_eq!(pair.other(2), Some(5));
        assert_eq!(pair.other(9), None);
        assert!(pair.contains(5));
    }

    #[test]
    fn test_pair_ordering() {
        let mut pairs = vec![Pair::new(2, 3), Pair::new(0, 4), Pair::new(0, 1)];
        pairs.sort();
        assert_eq!(pairs, vec![Pair::new(0, 1), Pair::new(0, 4), Pair::new(2, 3)]);
    }
}
