//! Incremental sweep-and-prune.
//!
//! Each axis keeps a sorted list of box endpoints. When an object moves, its
//! endpoints are walked to their new rank with adjacent swaps, and every
//! swap that changes the overlap status of two intervals updates the pair
//! set. With temporal coherence an update costs O(k) in the number of rank
//! changes.
//!
//! Endpoints order by `(value, min before max, object id)`. Equal values
//! therefore sort deterministically and touching boxes count as overlapping,
//! the same closed-interval rule as [`Aabb::overlaps`].
//!
//! # Example
//!
//! ```
//! use sim_collide::broad_phase::SweepAndPrune;
//! use sim_collide::geometry::Aabb;
//! use nalgebra::{Point3, Vector3};
//!
//! let unit = Vector3::new(1.0, 1.0, 1.0);
//! let mut sap = SweepAndPrune::init(&[
//!     Aabb::from_center(Point3::new(0.0, 0.0, 0.0), unit),
//!     Aabb::from_center(Point3::new(5.0, 0.0, 0.0), unit),
//! ])?;
//! assert_eq!(sap.pair_count(), 0);
//!
//! sap.update_object(1, Aabb::from_center(Point3::new(1.5, 0.0, 0.0), unit))?;
//! assert!(sap.contains_pair(0, 1));
//! # Ok::<(), sim_types::CollisionError>(())
//! ```

#![allow(clippy::cast_possible_truncation)]

use std::cmp::Ordering;
use std::collections::BTreeSet;

use sim_types::{CollisionError, Pair, Result};
use tracing::debug;

use super::box_pruning;
use crate::geometry::{Aabb, Axis};

#[derive(Debug, Clone, Copy)]
struct Endpoint {
    value: f64,
    owner: u32,
    is_max: bool,
}

impl Endpoint {
    fn new(value: f64, owner: u32, is_max: bool) -> Self {
        // -0.0 and 0.0 must rank equal, as they do under `<=`.
        Self {
            value: value + 0.0,
            owner,
            is_max,
        }
    }

    fn cmp_key(&self, other: &Self) -> Ordering {
        self.value
            .total_cmp(&other.value)
            .then(self.is_max.cmp(&other.is_max))
            .then(self.owner.cmp(&other.owner))
    }
}

/// Which end of an interval is being moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Min,
    Max,
}

/// Sweep-and-prune broad phase with persistent state.
#[derive(Debug, Clone)]
pub struct SweepAndPrune {
    boxes: Vec<Aabb>,
    /// Sorted endpoints per axis.
    axes: [Vec<Endpoint>; 3],
    /// `ranks[object][axis] = [min position, max position]`.
    ranks: Vec<[[u32; 2]; 3]>,
    pairs: BTreeSet<Pair>,
}

impl SweepAndPrune {
    /// Build the structure for `boxes.len()` objects; object `i` gets box `i`.
    ///
    /// # Errors
    ///
    /// [`CollisionError::NoObjects`] for an empty slice and
    /// [`CollisionError::InvalidAabb`] for a box with min > max or a
    /// non-finite bound.
    pub fn init(boxes: &[Aabb]) -> Result<Self> {
        if boxes.is_empty() {
            return Err(CollisionError::NoObjects);
        }
        if u32::try_from(boxes.len()).is_err() {
            return Err(CollisionError::invalid_config(format!(
                "{} objects exceed the u32 id range",
                boxes.len()
            )));
        }
        for (index, aabb) in boxes.iter().enumerate() {
            aabb.validate(index)?;
        }

        let mut axes: [Vec<Endpoint>; 3] = Default::default();
        for axis in Axis::all() {
            let list = &mut axes[axis.index()];
            list.reserve(boxes.len() * 2);
            for (id, aabb) in boxes.iter().enumerate() {
                list.push(Endpoint::new(aabb.min_on_axis(axis), id as u32, false));
                list.push(Endpoint::new(aabb.max_on_axis(axis), id as u32, true));
            }
            list.sort_unstable_by(Endpoint::cmp_key);
        }

        let mut ranks = vec![[[0u32; 2]; 3]; boxes.len()];
        for (axis, list) in axes.iter().enumerate() {
            for (pos, ep) in list.iter().enumerate() {
                ranks[ep.owner as usize][axis][usize::from(ep.is_max)] = pos as u32;
            }
        }

        let pairs: BTreeSet<Pair> = box_pruning::complete(boxes).into_iter().collect();
        debug!(objects = boxes.len(), pairs = pairs.len(), "sweep-and-prune initialised");

        let sap = Self {
            boxes: boxes.to_vec(),
            axes,
            ranks,
            pairs,
        };
        sap.check_integrity();
        Ok(sap)
    }

    /// Move object `id` to `new_box`, updating the pair set.
    ///
    /// # Errors
    ///
    /// [`CollisionError::UnknownObject`] for an id outside `0..object_count()`
    /// and [`CollisionError::InvalidAabb`] for a malformed box. The structure
    /// is unchanged on error.
    ///
    /// # Panics
    ///
    /// If the rank table no longer points at the object's own endpoints.
    /// Debug builds also run [`SweepAndPrune::check_integrity`] afterwards.
    pub fn update_object(&mut self, id: usize, new_box: Aabb) -> Result<()> {
        if id >= self.boxes.len() {
            return Err(CollisionError::UnknownObject {
                id,
                count: self.boxes.len(),
            });
        }
        new_box.validate(id)?;

        let old_box = self.boxes[id];
        self.boxes[id] = new_box;

        for axis in Axis::all() {
            let new_min = new_box.min_on_axis(axis);
            let new_max = new_box.max_on_axis(axis);
            // Order the two moves so an object's min never passes its own max.
            if new_min < old_box.min_on_axis(axis) {
                self.move_endpoint(id, axis, End::Min, new_min);
                self.move_endpoint(id, axis, End::Max, new_max);
            } else {
                self.move_endpoint(id, axis, End::Max, new_max);
                self.move_endpoint(id, axis, End::Min, new_min);
            }
            let [lo, hi] = self.ranks[id][axis.index()];
            assert!(lo < hi, "object {id} inverted on {axis:?}");
        }

        #[cfg(debug_assertions)]
        self.check_integrity();
        Ok(())
    }

    fn move_endpoint(&mut self, id: usize, axis: Axis, end: End, value: f64) {
        let a = axis.index();
        let slot = usize::from(end == End::Max);
        let mut pos = self.ranks[id][a][slot] as usize;
        let current = self.axes[a][pos];
        assert!(
            current.owner as usize == id && current.is_max == (end == End::Max),
            "rank table of object {id} is stale on {axis:?}"
        );
        self.axes[a][pos] = Endpoint::new(value, id as u32, end == End::Max);

        // Leftward
        while pos > 0 {
            let moving = self.axes[a][pos];
            let neighbor = self.axes[a][pos - 1];
            if moving.cmp_key(&neighbor) != Ordering::Less {
                break;
            }
            if neighbor.owner != moving.owner {
                match (moving.is_max, neighbor.is_max) {
                    // min passes below a max: intervals start overlapping
                    (false, true) => self.add_if_overlapping(moving.owner, neighbor.owner),
                    // max passes below a min: intervals stop overlapping
                    (true, false) => self.remove_pair(moving.owner, neighbor.owner),
                    _ => {}
                }
            }
            self.swap(a, pos, pos - 1);
            pos -= 1;
        }

        // Rightward
        let len = self.axes[a].len();
        while pos + 1 < len {
            let moving = self.axes[a][pos];
            let neighbor = self.axes[a][pos + 1];
            if moving.cmp_key(&neighbor) != Ordering::Greater {
                break;
            }
            if neighbor.owner != moving.owner {
                match (moving.is_max, neighbor.is_max) {
                    (true, false) => self.add_if_overlapping(moving.owner, neighbor.owner),
                    (false, true) => self.remove_pair(moving.owner, neighbor.owner),
                    _ => {}
                }
            }
            self.swap(a, pos, pos + 1);
            pos += 1;
        }
    }

    fn swap(&mut self, axis: usize, i: usize, j: usize) {
        self.axes[axis].swap(i, j);
        for pos in [i, j] {
            let ep = self.axes[axis][pos];
            self.ranks[ep.owner as usize][axis][usize::from(ep.is_max)] = pos as u32;
        }
    }

    fn add_if_overlapping(&mut self, a: u32, b: u32) {
        if self.boxes[a as usize].overlaps(&self.boxes[b as usize]) {
            self.pairs.insert(Pair::new(a, b));
        }
    }

    fn remove_pair(&mut self, a: u32, b: u32) {
        self.pairs.remove(&Pair::new(a, b));
    }

    /// All current pairs in ascending order.
    #[must_use]
    pub fn pairs(&self) -> Vec<Pair> {
        self.pairs.iter().copied().collect()
    }

    /// Iterate current pairs in ascending order without allocating.
    pub fn iter_pairs(&self) -> impl Iterator<Item = Pair> + '_ {
        self.pairs.iter().copied()
    }

    /// Number of current pairs.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Whether objects `a` and `b` currently overlap.
    #[must_use]
    pub fn contains_pair(&self, a: u32, b: u32) -> bool {
        self.pairs.contains(&Pair::new(a, b))
    }

    /// Number of tracked objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.boxes.len()
    }

    /// Stored box of an object.
    #[must_use]
    pub fn aabb(&self, id: usize) -> Option<&Aabb> {
        self.boxes.get(id)
    }

    /// Verify the endpoint lists and rank table.
    ///
    /// Runs after [`SweepAndPrune::init`] in every build and after each
    /// [`SweepAndPrune::update_object`] in debug builds only, since a full
    /// walk per update would make a frame quadratic. Release updates still
    /// assert the moved object's own ranks.
    ///
    /// # Panics
    ///
    /// If any list is unsorted, has the wrong length, disagrees with the
    /// stored boxes, or the rank table points at the wrong endpoint.
    #[allow(clippy::float_cmp)]
    pub fn check_integrity(&self) {
        let n = self.boxes.len();
        assert_eq!(self.ranks.len(), n, "rank table size");
        for axis in Axis::all() {
            let a = axis.index();
            let list = &self.axes[a];
            assert_eq!(list.len(), 2 * n, "endpoint count on {axis:?}");
            for w in list.windows(2) {
                assert!(
                    w[0].cmp_key(&w[1]) == Ordering::Less,
                    "endpoints out of order on {axis:?}: {:?} then {:?}",
                    w[0],
                    w[1]
                );
            }
            for (id, rank) in self.ranks.iter().enumerate() {
                let lo = &list[rank[a][0] as usize];
                let hi = &list[rank[a][1] as usize];
                assert!(
                    lo.owner as usize == id && !lo.is_max,
                    "min rank of object {id} on {axis:?} is stale"
                );
                assert!(
                    hi.owner as usize == id && hi.is_max,
                    "max rank of object {id} on {axis:?} is stale"
                );
                assert!(rank[a][0] < rank[a][1], "object {id} inverted on {axis:?}");
                assert!(lo.value == self.boxes[id].min_on_axis(axis), "stale min value");
                assert!(hi.value == self.boxes[id].max_on_axis(axis), "stale max value");
            }
        }
        for pair in &self.pairs {
            assert!(pair.a != pair.b, "self pair {pair:?}");
        }
    }
}
