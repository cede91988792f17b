//! Contact reduction.
//!
//! Narrow-phase tests report one contact per touching feature, so the same
//! physical touch often shows up several times (a sphere resting on a
//! shared edge touches both triangles). Contacts are reduced before they
//! reach a solver, with one of two explicit strategies:
//!
//! - [`MergeStrategy::KeepDeepest`]: contacts are bucketed by a quantized
//!   position key and the deepest of each bucket survives
//! - [`MergeStrategy::Average`]: everything collapses into one contact with
//!   a depth-weighted normal
//!
//! # Example
//!
//! ```
//! use sim_collide::merge::ContactMerger;
//! use sim_types::{Contact, MergeStrategy};
//! use nalgebra::{Point3, Vector3};
//!
//! let raw = [
//!     Contact::new(Point3::origin(), Vector3::z(), 0.0),
//!     Contact::new(Point3::origin(), Vector3::z(), 0.0),
//! ];
//! let mut merger = ContactMerger::new();
//! let manifold = merger.reduce(&raw, MergeStrategy::KeepDeepest, 4);
//! assert_eq!(manifold.len(), 1);
//! ```

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use nalgebra::{Point3, Vector3};
use sim_types::{Contact, ContactManifold, MergeStrategy};
use tracing::trace;

use crate::math::{sqrt, try_normalize};
use crate::radix::RadixSorter;
use crate::TOLERANCE;

/// Spatial sort key of a contact position.
///
/// Each coordinate is scaled by its own factor and truncated to `i32`; the
/// three results are combined with shifts and wrapping adds. Contacts in
/// the same small neighbourhood get the same key.
#[must_use]
pub fn contact_key(position: &Point3<f64>) -> u32 {
    let c0 = (position.x * 1000.0 + 1.0) as i32;
    let c1 = (position.y * 1333.0) as i32;
    let c2 = (position.z * 2133.0 + 3.0) as i32;
    (c0 as u32)
        .wrapping_add((c1 as u32) << 4)
        .wrapping_add((c2 as u32) << 8)
}

/// Keep the deepest contact of each key bucket. Output is in key order.
///
/// Equal depths keep the contact that came first in `raw`.
pub fn merge_keep_deepest(raw: &[Contact], merger: &mut ContactMerger) -> Vec<Contact> {
    merger.keep_deepest(raw)
}

/// Collapse contacts into one.
///
/// The position is the mean of all positions. The normal is the sum of
/// `depth * normal`, normalized; if that sum vanishes the first contact's
/// normal is kept. The depth is `sqrt(|sum|² / n)`. A single contact is
/// returned unchanged and an empty slice gives `None`.
#[must_use]
pub fn merge_average(raw: &[Contact]) -> Option<Contact> {
    let (first, rest) = raw.split_first()?;
    if rest.is_empty() {
        return Some(*first);
    }

    let mut position = first.position.coords;
    let mut weighted = first.normal * first.depth;
    for c in rest {
        position += c.position.coords;
        weighted += c.normal * c.depth;
    }
    let n = raw.len() as f64;
    let depth = sqrt(weighted.norm_squared() / n);
    let normal: Vector3<f64> = if weighted.norm() > TOLERANCE {
        try_normalize(&weighted).unwrap_or(first.normal)
    } else {
        first.normal
    };

    Some(Contact {
        position: Point3::from(position / n),
        normal,
        depth,
        ..*first
    })
}

/// Reusable merge buffers.
#[derive(Debug, Clone, Default)]
pub struct ContactMerger {
    sorter: RadixSorter,
    keys: Vec<u32>,
}

impl ContactMerger {
    /// Create a merger with empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`merge_keep_deepest`].
    pub fn keep_deepest(&mut self, raw: &[Contact]) -> Vec<Contact> {
        if raw.is_empty() {
            return Vec::new();
        }
        self.keys.clear();
        self.keys.extend(raw.iter().map(|c| contact_key(&c.position)));
        let ranks = self.sorter.sort_u32(&self.keys);

        let mut out: Vec<Contact> = Vec::with_capacity(raw.len());
        let mut last_key = None;
        for &rank in ranks {
            let key = self.keys[rank as usize];
            let contact = raw[rank as usize];
            if last_key == Some(key) {
                if let Some(kept) = out.last_mut() {
                    if contact.depth > kept.depth {
                        *kept = contact;
                    }
                }
            } else {
                out.push(contact);
                last_key = Some(key);
            }
        }
        out
    }

    /// Apply `strategy` and keep at most `capacity` contacts.
    ///
    /// When more buckets survive than fit, the deepest are kept, still in
    /// key order. The manifold takes its geometry ids from the first raw
    /// contact.
    pub fn reduce(
        &mut self,
        raw: &[Contact],
        strategy: MergeStrategy,
        capacity: usize,
    ) -> ContactManifold {
        let (geom_a, geom_b) = raw
            .first()
            .map(|c| (c.geom_a, c.geom_b))
            .unwrap_or_default();
        let mut manifold = ContactManifold::new(geom_a, geom_b, capacity);
        if raw.is_empty() {
            return manifold;
        }

        match strategy {
            MergeStrategy::KeepDeepest => {
                let merged = self.keep_deepest(raw);
                for contact in deepest_in_order(merged, capacity) {
                    manifold.push(contact);
                }
            }
            MergeStrategy::Average => {
                if let Some(contact) = merge_average(raw) {
                    manifold.push(contact);
                }
            }
        }
        trace!(raw = raw.len(), kept = manifold.len(), ?strategy, "contacts reduced");
        manifold
    }
}

/// The `capacity` deepest contacts, in their original order.
fn deepest_in_order(contacts: Vec<Contact>, capacity: usize) -> Vec<Contact> {
    if contacts.len() <= capacity {
        return contacts;
    }
    let mut order: Vec<usize> = (0..contacts.len()).collect();
    order.sort_by(|&a, &b| contacts[b].depth.total_cmp(&contacts[a].depth));
    order.truncate(capacity);
    order.sort_unstable();
    order.into_iter().map(|i| contacts[i]).collect()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::cast_precision_loss
)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sim_types::GeomId;

    fn at(x: f64, y: f64, z: f64, depth: f64) -> Contact {
        Contact::new(Point3::new(x, y, z), Vector3::z(), depth)
    }

    #[test]
    fn test_contact_key_values() {
        assert_eq!(contact_key(&Point3::origin()), 1 + (3 << 8));
        assert_eq!(contact_key(&Point3::new(0.001, 0.0, 0.0)), 2 + (3 << 8));
        // Negative coordinates wrap instead of overflowing.
        assert_eq!(
            contact_key(&Point3::new(-1.0, 0.0, 0.0)),
            (3_u32 << 8).wrapping_sub(999)
        );
        assert_eq!(contact_key(&Point3::new(0.0, 1.0, 0.0)), (1333 << 4) + 1 + (3 << 8));
    }

    #[test]
    fn test_keep_deepest_per_key() {
        let raw = [
            at(0.0, 0.0, 0.0, 0.1),
            at(5.0, 0.0, 0.0, 0.7),
            at(0.0, 0.0, 0.0, 0.3),
            at(0.0, 0.0, 0.0, 0.2),
        ];
        let mut merger = ContactMerger::new();
        let merged = merge_keep_deepest(&raw, &mut merger);
        assert_eq!(merged.len(), 2);
        // Key order: origin first.
        assert_eq!(merged[0].depth, 0.3);
        assert_eq!(merged[1].depth, 0.7);
    }

    #[test]
    fn test_keep_deepest_tie_keeps_first() {
        let raw = [
            at(1.0, 1.0, 1.0, 0.5).with_feature(4),
            at(1.0, 1.0, 1.0, 0.5).with_feature(9),
        ];
        let merged = ContactMerger::new().keep_deepest(&raw);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].feature, Some(4));
    }

    #[test]
    fn test_keep_deepest_preserves_zero_depth() {
        let raw = [at(0.0, 0.0, 0.0, 0.0), at(0.0, 0.0, 0.0, 0.0)];
        let merged = ContactMerger::new().keep_deepest(&raw);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].depth, 0.0);
    }

    #[test]
    fn test_average() {
        assert!(merge_average(&[]).is_none());

        let single = at(1.0, 2.0, 3.0, 0.25);
        assert_eq!(merge_average(&[single]), Some(single));

        let merged = merge_average(&[at(0.0, 0.0, 0.0, 1.0), at(2.0, 0.0, 0.0, 1.0)]).unwrap();
        assert_relative_eq!(merged.position, Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(merged.normal, Vector3::z());
        assert_relative_eq!(merged.depth, std::f64::consts::SQRT_2);
    }

    #[test]
    fn test_average_cancelling_normals() {
        let up = at(0.0, 0.0, 0.0, 0.5);
        let down = Contact::new(Point3::new(0.0, 0.0, 1.0), -Vector3::z(), 0.5);
        let merged = merge_average(&[up, down]).unwrap();
        assert_eq!(merged.normal, Vector3::z());
        assert_eq!(merged.depth, 0.0);
        assert_relative_eq!(merged.position.z, 0.5);
    }

    #[test]
    fn test_reduce_capacity_keeps_deepest_in_key_order() {
        let raw: Vec<Contact> = [0.1, 0.6, 0.3, 0.9, 0.2, 0.5]
            .iter()
            .enumerate()
            .map(|(i, &d)| at(i as f64, 0.0, 0.0, d))
            .collect();
        let mut merger = ContactMerger::new();
        let manifold = merger.reduce(&raw, MergeStrategy::KeepDeepest, 3);
        let depths: Vec<f64> = manifold.iter().map(|c| c.depth).collect();
        assert_eq!(depths, vec![0.6, 0.9, 0.5]);
    }

    #[test]
    fn test_reduce_strategies() {
        let a = GeomId::new(1);
        let b = GeomId::new(2);
        let raw = [
            at(0.0, 0.0, 0.0, 0.1).with_geoms(a, b),
            at(1.0, 0.0, 0.0, 0.1).with_geoms(a, b),
        ];
        let mut merger = ContactMerger::new();

        let deepest = merger.reduce(&raw, MergeStrategy::KeepDeepest, 4);
        assert_eq!(deepest.len(), 2);
        assert_eq!(deepest.geom_a, a);
        assert_eq!(deepest.geom_b, b);

        let average = merger.reduce(&raw, MergeStrategy::Average, 4);
        assert_eq!(average.len(), 1);

        let empty = merger.reduce(&[], MergeStrategy::Average, 4);
        assert!(empty.is_empty());
    }
}
