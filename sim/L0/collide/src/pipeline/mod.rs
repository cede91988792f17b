//! Per-step collision driver.
//!
//! A [`CollisionWorld`] owns a set of placed bodies. Each [`step`] runs the
//! broad phase over their world boxes, dispatches every candidate pair to
//! a contact routine, stores raw contacts in a per-step arena, and reduces
//! each pair's contacts to a [`ContactManifold`] with the configured merge
//! strategy.
//!
//! [`step`]: CollisionWorld::step
//!
//! # Example
//!
//! ```
//! use sim_collide::pipeline::{CollisionWorld, Shape};
//! use sim_types::{CollisionConfig, MergeStrategy};
//! use nalgebra::{IsometryMatrix3, Rotation3, Translation3};
//!
//! let mut world = CollisionWorld::new(CollisionConfig::new(MergeStrategy::KeepDeepest))?;
//! world.add(Shape::ground(), IsometryMatrix3::identity())?;
//! let ball = world.add(
//!     Shape::sphere(0.5),
//!     IsometryMatrix3::from_parts(Translation3::new(0.0, 0.0, 0.4), Rotation3::identity()),
//! )?;
//!
//! let manifolds = world.step()?;
//! assert_eq!(manifolds.len(), 1);
//! assert_eq!(manifolds[0].geom_b, ball);
//! # Ok::<(), sim_types::CollisionError>(())
//! ```

mod dispatch;
mod shape;

use hashbrown::HashSet;
use nalgebra::IsometryMatrix3;
use sim_types::{
    CollisionConfig, CollisionError, Contact, ContactManifold, ContactStats, GeomId, Pair, Result,
};
use tracing::{debug, trace};

use crate::arena::{ArenaSpan, StepArena};
use crate::broad_phase::BroadPhaseDetector;
use crate::geometry::Aabb;
use crate::merge::ContactMerger;

pub use dispatch::{
    box_plane, capsule_capsule, capsule_plane, sphere_box, sphere_capsule, sphere_plane,
    sphere_sphere, NarrowPhase,
};
pub use shape::{Body, Shape, ShapeKind, PLANE_EXTENT};

/// Counters for the last step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Candidate pairs from the broad phase.
    pub pairs: usize,
    /// Pairs skipped because no routine handles their shapes.
    pub unsupported: usize,
    /// Raw contacts before merging.
    pub raw_contacts: usize,
    /// Manifolds returned.
    pub manifolds: usize,
    /// Tree traversal counters from mesh queries.
    pub queries: ContactStats,
}

/// Bodies plus everything needed to collide them step after step.
#[derive(Debug)]
pub struct CollisionWorld {
    config: CollisionConfig,
    bodies: Vec<Body>,
    boxes: Vec<Aabb>,
    broad_phase: BroadPhaseDetector,
    narrow: NarrowPhase,
    arena: StepArena<Contact>,
    merger: ContactMerger,
    reported: HashSet<(ShapeKind, ShapeKind)>,
    stats: StepStats,
}

impl CollisionWorld {
    /// Create an empty world.
    ///
    /// # Errors
    ///
    /// [`CollisionError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: CollisionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            broad_phase: BroadPhaseDetector::new(config.broad_phase.clone()),
            narrow: NarrowPhase::new(config.collider),
            config,
            bodies: Vec::new(),
            boxes: Vec::new(),
            arena: StepArena::new(),
            merger: ContactMerger::new(),
            reported: HashSet::new(),
            stats: StepStats::default(),
        })
    }

    /// Configuration.
    #[must_use]
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// Add a body. Its id is its insertion index.
    ///
    /// # Errors
    ///
    /// [`CollisionError::InvalidShape`] if the shape does not validate.
    pub fn add(&mut self, shape: Shape, transform: IsometryMatrix3<f64>) -> Result<GeomId> {
        shape.validate()?;
        let id = GeomId::new(self.bodies.len() as u64);
        self.bodies.push(Body::new(id, shape, transform));
        Ok(id)
    }

    /// Move a body.
    ///
    /// # Errors
    ///
    /// [`CollisionError::UnknownObject`] if `id` was not returned by
    /// [`CollisionWorld::add`].
    pub fn set_transform(&mut self, id: GeomId, transform: IsometryMatrix3<f64>) -> Result<()> {
        let index = usize::try_from(id.raw()).unwrap_or(usize::MAX);
        let count = self.bodies.len();
        let body = self
            .bodies
            .get_mut(index)
            .ok_or(CollisionError::UnknownObject { id: index, count })?;
        body.set_transform(transform);
        Ok(())
    }

    /// Look up a body.
    #[must_use]
    pub fn body(&self, id: GeomId) -> Option<&Body> {
        usize::try_from(id.raw()).ok().and_then(|i| self.bodies.get(i))
    }

    /// All bodies, in id order.
    #[must_use]
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Number of bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the world has no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Counters of the last step.
    #[must_use]
    pub fn stats(&self) -> &StepStats {
        &self.stats
    }

    /// Run one collision step.
    ///
    /// Returns one manifold per candidate pair that produced contacts, in
    /// ascending pair order. Each manifold's `geom_a` is the lower body id
    /// and its normals point from `geom_b` toward `geom_a`.
    ///
    /// # Errors
    ///
    /// [`CollisionError::InvalidAabb`] if a body's world box is malformed,
    /// for example after a non-finite transform.
    pub fn step(&mut self) -> Result<Vec<ContactManifold>> {
        self.arena.reset();
        self.narrow.reset_stats();
        self.stats = StepStats::default();

        self.boxes.clear();
        self.boxes.extend(self.bodies.iter().map(Body::aabb));
        let pairs = self.broad_phase.find_pairs(&self.boxes)?;
        self.stats.pairs = pairs.len();

        let spans = self.narrow_phase(&pairs);

        let mut manifolds = Vec::new();
        for span in spans {
            let Some(raw) = self.arena.span(span) else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }
            let manifold = self
                .merger
                .reduce(raw, self.config.merge, self.config.manifold_capacity);
            manifolds.push(manifold);
        }

        self.stats.raw_contacts = self.arena.len();
        self.stats.manifolds = manifolds.len();
        self.stats.queries.accumulate(self.narrow.stats());
        trace!(
            bodies = self.bodies.len(),
            pairs = self.stats.pairs,
            raw = self.stats.raw_contacts,
            manifolds = self.stats.manifolds,
            "collision step"
        );
        Ok(manifolds)
    }

    #[cfg(not(feature = "parallel"))]
    fn narrow_phase(&mut self, pairs: &[Pair]) -> Vec<ArenaSpan<Contact>> {
        let mut scratch = Vec::new();
        let mut spans = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let (a, b) = (&self.bodies[pair.a as usize], &self.bodies[pair.b as usize]);
            scratch.clear();
            if self.narrow.collide(a, b, &mut scratch).is_none() {
                self.stats.unsupported += 1;
                report_unsupported(&mut self.reported, a, b);
                continue;
            }
            spans.push(self.arena.alloc_extend(scratch.drain(..)));
        }
        spans
    }

    /// Pairs are independent, so each worker runs its own dispatcher and
    /// the results are copied into the arena in pair order.
    #[cfg(feature = "parallel")]
    fn narrow_phase(&mut self, pairs: &[Pair]) -> Vec<ArenaSpan<Contact>> {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

        let bodies = &self.bodies;
        let collider = self.config.collider;
        let results: Vec<(Option<Vec<Contact>>, ContactStats)> = pairs
            .par_iter()
            .map_init(
                || NarrowPhase::new(collider),
                |narrow, pair| {
                    narrow.reset_stats();
                    let mut out = Vec::new();
                    let supported = narrow
                        .collide(&bodies[pair.a as usize], &bodies[pair.b as usize], &mut out)
                        .map(|_| out);
                    (supported, *narrow.stats())
                },
            )
            .collect();

        let mut spans = Vec::with_capacity(pairs.len());
        for (pair, (contacts, stats)) in pairs.iter().zip(results) {
            self.stats.queries.accumulate(&stats);
            match contacts {
                Some(contacts) => spans.push(self.arena.alloc_extend(contacts)),
                None => {
                    self.stats.unsupported += 1;
                    let (a, b) = (&self.bodies[pair.a as usize], &self.bodies[pair.b as usize]);
                    report_unsupported(&mut self.reported, a, b);
                }
            }
        }
        spans
    }
}

/// Log an unsupported shape combination the first time it shows up.
fn report_unsupported(reported: &mut HashSet<(ShapeKind, ShapeKind)>, a: &Body, b: &Body) {
    let (ka, kb) = (a.shape().kind(), b.shape().kind());
    let key = if ka <= kb { (ka, kb) } else { (kb, ka) };
    if reported.insert(key) {
        debug!(first = ?key.0, second = ?key.1, "no contact routine for shape pair");
    }
}
