//! One-shot box pruning.
//!
//! Sorts boxes by their minimum on a sweep axis and walks the sorted list,
//! testing each box only against the boxes that start before it ends. The
//! survivors are confirmed on all three axes. Cost is a radix sort plus
//! O(n + k) for k overlaps on the sweep axis.
//!
//! # Example
//!
//! ```
//! use sim_collide::broad_phase::box_pruning;
//! use sim_collide::geometry::Aabb;
//! use nalgebra::{Point3, Vector3};
//!
//! let boxes = [
//!     Aabb::from_center(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0)),
//!     Aabb::from_center(Point3::new(1.5, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0)),
//!     Aabb::from_center(Point3::new(9.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0)),
//! ];
//! let pairs = box_pruning::complete(&boxes);
//! assert_eq!(pairs.len(), 1);
//! ```

#![allow(clippy::cast_possible_truncation)]

use sim_types::Pair;

use crate::geometry::{Aabb, Axis};
use crate::radix::RadixSorter;

/// All overlapping pairs within one set of boxes, in ascending order.
#[must_use]
pub fn complete(boxes: &[Aabb]) -> Vec<Pair> {
    let mut sorter = RadixSorter::with_capacity(boxes.len());
    complete_with(boxes, &mut sorter)
}

/// [`complete`] reusing a caller-owned sorter.
pub fn complete_with(boxes: &[Aabb], sorter: &mut RadixSorter) -> Vec<Pair> {
    let mut pairs = Vec::new();
    if boxes.len() < 2 {
        return pairs;
    }

    let axis = sweep_axis(boxes);
    let mins: Vec<f64> = boxes.iter().map(|b| b.min_on_axis(axis)).collect();
    let order = sorter.sort_f64(&mins);

    for (k, &i) in order.iter().enumerate() {
        let box_i = &boxes[i as usize];
        let max_i = box_i.max_on_axis(axis);
        for &j in &order[k + 1..] {
            if mins[j as usize] > max_i {
                break;
            }
            if box_i.overlaps(&boxes[j as usize]) {
                pairs.push(Pair::new(i, j));
            }
        }
    }

    pairs.sort_unstable();
    pairs
}

/// Overlaps between two distinct sets of boxes.
///
/// Returns `(index_in_a, index_in_b)` tuples sorted ascending. Boxes within
/// the same set are never tested against each other.
#[must_use]
pub fn bipartite(set_a: &[Aabb], set_b: &[Aabb]) -> Vec<(u32, u32)> {
    let mut pairs = Vec::new();
    if set_a.is_empty() || set_b.is_empty() {
        return pairs;
    }

    let axis = Axis::X;
    let mins_a: Vec<f64> = set_a.iter().map(|b| b.min_on_axis(axis)).collect();
    let mins_b: Vec<f64> = set_b.iter().map(|b| b.min_on_axis(axis)).collect();

    let mut sorter_a = RadixSorter::with_capacity(set_a.len());
    let mut sorter_b = RadixSorter::with_capacity(set_b.len());
    let order_a = sorter_a.sort_f64(&mins_a);
    let order_b = sorter_b.sort_f64(&mins_b);

    // Each pair is found exactly once: from the side whose min comes first
    // (ties go to set A).
    sweep_one_side(set_a, set_b, order_a, order_b, &mins_a, &mins_b, axis, true, &mut |a, b| {
        pairs.push((a, b));
    });
    sweep_one_side(set_b, set_a, order_b, order_a, &mins_b, &mins_a, axis, false, &mut |b, a| {
        pairs.push((a, b));
    });

    pairs.sort_unstable();
    pairs
}

#[allow(clippy::too_many_arguments)]
fn sweep_one_side(
    outer: &[Aabb],
    inner: &[Aabb],
    outer_order: &[u32],
    inner_order: &[u32],
    outer_mins: &[f64],
    inner_mins: &[f64],
    axis: Axis,
    ties_inclusive: bool,
    emit: &mut dyn FnMut(u32, u32),
) {
    let mut start = 0;
    for &i in outer_order {
        let min_i = outer_mins[i as usize];
        // Skip inner boxes that start before this one (they own the pair).
        while start < inner_order.len() {
            let m = inner_mins[inner_order[start] as usize];
            let before = if ties_inclusive { m < min_i } else { m <= min_i };
            if !before {
                break;
            }
            start += 1;
        }

        let box_i = &outer[i as usize];
        let max_i = box_i.max_on_axis(axis);
        for &j in &inner_order[start..] {
            if inner_mins[j as usize] > max_i {
                break;
            }
            if box_i.overlaps(&inner[j as usize]) {
                emit(i, j);
            }
        }
    }
}

/// Axis with the largest spread of box centers.
fn sweep_axis(boxes: &[Aabb]) -> Axis {
    let centers: Vec<_> = boxes.iter().map(Aabb::center).collect();
    Aabb::from_points(&centers).map_or(Axis::X, |spread| spread.largest_axis())
}
