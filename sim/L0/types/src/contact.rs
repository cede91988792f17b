//! Contacts, contact manifolds, and per-query statistics.
//!
//! A [`Contact`] is one touch point reported by a narrow-phase test. Many raw
//! contacts can describe the same physical touch (for example one per triangle
//! sharing an edge), so they are reduced into a bounded [`ContactManifold`]
//! before being handed to a constraint solver.

use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

use crate::GeomId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Inline capacity of a manifold before it spills to the heap.
const INLINE_CONTACTS: usize = 4;

/// A single contact point between two geometries.
///
/// The normal points from `geom_b` toward `geom_a`: moving `geom_a` along
/// the normal by `depth` separates the shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Contact {
    /// Contact position in world space.
    pub position: Point3<f64>,
    /// Unit contact normal.
    pub normal: Vector3<f64>,
    /// Penetration depth. Zero means exactly touching, negative values are
    /// within the contact tolerance but not yet touching.
    pub depth: f64,
    /// First geometry.
    pub geom_a: GeomId,
    /// Second geometry.
    pub geom_b: GeomId,
    /// Feature (triangle index) on the mesh side, if any.
    pub feature: Option<u32>,
}

impl Contact {
    /// Create a contact with default geometry ids.
    #[must_use]
    pub fn new(position: Point3<f64>, normal: Vector3<f64>, depth: f64) -> Self {
        Self {
            position,
            normal,
            depth,
            geom_a: GeomId::default(),
            geom_b: GeomId::default(),
            feature: None,
        }
    }

    /// Set the two participating geometries.
    #[must_use]
    pub fn with_geoms(mut self, geom_a: GeomId, geom_b: GeomId) -> Self {
        self.geom_a = geom_a;
        self.geom_b = geom_b;
        self
    }

    /// Set the feature index (triangle) that produced this contact.
    #[must_use]
    pub fn with_feature(mut self, feature: u32) -> Self {
        self.feature = Some(feature);
        self
    }

    /// Whether the shapes actually overlap at this point.
    #[must_use]
    pub fn is_penetrating(&self) -> bool {
        self.depth > 0.0
    }

    /// The same contact seen from the other geometry.
    #[must_use]
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            geom_a: self.geom_b,
            geom_b: self.geom_a,
            ..*self
        }
    }
}

/// A bounded set of contacts between one pair of geometries.
///
/// The capacity is chosen by the caller; [`ContactManifold::push`] refuses
/// contacts once it is reached.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactManifold {
    /// First geometry of the pair.
    pub geom_a: GeomId,
    /// Second geometry of the pair.
    pub geom_b: GeomId,
    contacts: SmallVec<[Contact; INLINE_CONTACTS]>,
    capacity: usize,
}

impl ContactManifold {
    /// Create an empty manifold holding at most `capacity` contacts.
    #[must_use]
    pub fn new(geom_a: GeomId, geom_b: GeomId, capacity: usize) -> Self {
        Self {
            geom_a,
            geom_b,
            contacts: SmallVec::new(),
            capacity,
        }
    }

    /// Add a contact. Returns `false` if the manifold is already full.
    pub fn push(&mut self, contact: Contact) -> bool {
        if self.contacts.len() >= self.capacity {
            return false;
        }
        self.contacts.push(contact);
        true
    }

    /// The contacts, in merge order.
    #[must_use]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Iterate over the contacts.
    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.iter()
    }

    /// Number of contacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Whether there are no contacts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Maximum number of contacts.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether no further contacts fit.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.contacts.len() >= self.capacity
    }

    /// The contact with the greatest depth (earliest wins on ties).
    #[must_use]
    pub fn deepest(&self) -> Option<&Contact> {
        self.contacts
            .iter()
            .fold(None, |best: Option<&Contact>, c| match best {
                Some(b) if b.depth >= c.depth => Some(b),
                _ => Some(c),
            })
    }

    /// Remove all contacts, keeping the pair and capacity.
    pub fn clear(&mut self) {
        self.contacts.clear();
    }

    /// Consume the manifold, returning its contacts.
    #[must_use]
    pub fn into_contacts(self) -> Vec<Contact> {
        self.contacts.into_vec()
    }
}

impl<'a> IntoIterator for &'a ContactManifold {
    type Item = &'a Contact;
    type IntoIter = std::slice::Iter<'a, Contact>;

    fn into_iter(self) -> Self::IntoIter {
        self.contacts.iter()
    }
}

/// Counters gathered while running one collision query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactStats {
    /// Tree nodes whose bounds were tested.
    pub nodes_visited: usize,
    /// Exact primitive tests performed.
    pub primitive_tests: usize,
    /// Contacts produced before merging.
    pub contacts_emitted: usize,
}

impl ContactStats {
    /// Add another set of counters into this one.
    pub fn accumulate(&mut self, other: &Self) {
        self.nodes_visited += other.nodes_visited;
        self.primitive_tests += other.primitive_tests;
        self.contacts_emitted += other.contacts_emitted;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn contact_at(x: f64, depth: f64) -> Contact {
        Contact::new(Point3::new(x, 0.0, 0.0), Vector3::z(), depth)
    }

    #[test]
    fn test_contact_flipped() {
        let c = contact_at(1.0, 0.5).with_geoms(GeomId::new(1), GeomId::new(2));
        let f = c.flipped();
        assert_eq!(f.geom_a, GeomId::new(2));
        assert_eq!(f.geom_b, GeomId::new(1));
        assert_eq!(f.normal, -Vector3::z());
        assert_eq!(f.depth, 0.5);
    }

    #[test]
    fn test_zero_depth_is_not_penetrating() {
        assert!(!contact_at(0.0, 0.0).is_penetrating());
        assert!(contact_at(0.0, 1e-9).is_penetrating());
    }

    #[test]
    fn test_manifold_capacity() {
        let mut m = ContactManifold::new(GeomId::new(0), GeomId::new(1), 2);
        assert!(m.push(contact_at(0.0, 0.1)));
        assert!(m.push(contact_at(1.0, 0.2)));
        assert!(m.is_full());
        assert!(!m.push(contact_at(2.0, 0.3)));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_manifold_deepest_prefers_earliest_tie() {
        let mut m = ContactManifold::new(GeomId::new(0), GeomId::new(1), 4);
        m.push(contact_at(0.0, 0.3));
        m.push(contact_at(1.0, 0.3));
        m.push(contact_at(2.0, 0.1));
        assert_eq!(m.deepest().unwrap().position.x, 0.0);
    }

    #[test]
    fn test_stats_accumulate() {
        let mut total = ContactStats::default();
        total.accumulate(&ContactStats {
            nodes_visited: 3,
            primitive_tests: 2,
            contacts_emitted: 1,
        });
        total.accumulate(&ContactStats {
            nodes_visited: 1,
            primitive_tests: 1,
            contacts_emitted: 0,
        });
        assert_eq!(total.nodes_visited, 4);
        assert_eq!(total.primitive_tests, 3);
        assert_eq!(total.contacts_emitted, 1);
    }
}
