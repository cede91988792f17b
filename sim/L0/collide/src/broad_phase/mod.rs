//! Broad-phase collision detection.
//!
//! Reduces the O(n²) set of object pairs to the pairs whose bounding boxes
//! overlap. Three algorithms share the [`BroadPhase`] trait:
//!
//! - [`SweepAndPrune`]: incremental, keeps sorted endpoint lists between
//!   calls and only pays for rank changes. Best for coherent motion.
//! - [`BoxPruning`]: one-shot sort and sweep, no state between calls.
//! - [`BruteForce`]: checks every pair. Reference implementation and the
//!   fastest choice for a handful of objects.
//!
//! [`BroadPhaseDetector`] picks one according to a [`BroadPhaseConfig`].

pub mod box_pruning;
mod sap;

pub use sap::SweepAndPrune;

use sim_types::{BroadPhaseAlgorithm, BroadPhaseConfig, CollisionError, Pair, Result};
use tracing::trace;

use crate::geometry::Aabb;

/// Trait for broad-phase collision detection algorithms.
pub trait BroadPhase {
    /// Find all pairs of objects whose boxes overlap.
    ///
    /// Object `i` is `boxes[i]`. Pairs come back in ascending order.
    ///
    /// # Errors
    ///
    /// [`CollisionError::InvalidAabb`] if any box is malformed.
    fn find_pairs(&mut self, boxes: &[Aabb]) -> Result<Vec<Pair>>;
}

fn validate_all(boxes: &[Aabb]) -> Result<()> {
    boxes
        .iter()
        .enumerate()
        .try_for_each(|(index, aabb)| aabb.validate(index))
}

/// Simple O(n²) brute-force broad phase for comparison and small scenes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForce;

impl BruteForce {
    /// Create a new brute-force broad phase.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BroadPhase for BruteForce {
    #[allow(clippy::cast_possible_truncation)]
    fn find_pairs(&mut self, boxes: &[Aabb]) -> Result<Vec<Pair>> {
        validate_all(boxes)?;
        let mut pairs = Vec::new();
        for (i, box_a) in boxes.iter().enumerate() {
            for (j, box_b) in boxes.iter().enumerate().skip(i + 1) {
                if box_a.overlaps(box_b) {
                    pairs.push(Pair::new(i as u32, j as u32));
                }
            }
        }
        Ok(pairs)
    }
}

/// Stateless sort-and-sweep; see [`box_pruning`].
#[derive(Debug, Clone, Default)]
pub struct BoxPruning {
    sorter: crate::radix::RadixSorter,
}

impl BoxPruning {
    /// Create a box pruner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BroadPhase for BoxPruning {
    fn find_pairs(&mut self, boxes: &[Aabb]) -> Result<Vec<Pair>> {
        validate_all(boxes)?;
        Ok(box_pruning::complete_with(boxes, &mut self.sorter))
    }
}

/// Incremental use: if the object count is unchanged every object is
/// updated in place, otherwise the structure is rebuilt.
impl BroadPhase for SweepAndPrune {
    fn find_pairs(&mut self, boxes: &[Aabb]) -> Result<Vec<Pair>> {
        if boxes.len() == self.object_count() {
            validate_all(boxes)?;
            for (id, aabb) in boxes.iter().enumerate() {
                self.update_object(id, *aabb)?;
            }
        } else {
            *self = Self::init(boxes)?;
        }
        Ok(self.pairs())
    }
}

/// Manager for broad-phase collision detection.
///
/// Wraps algorithm selection and the predictive margin, and keeps the
/// sweep-and-prune state alive between calls.
#[derive(Debug, Clone)]
pub struct BroadPhaseDetector {
    config: BroadPhaseConfig,
    sap: Option<SweepAndPrune>,
    brute: BruteForce,
    scratch: Vec<Aabb>,
}

impl Default for BroadPhaseDetector {
    fn default() -> Self {
        Self::new(BroadPhaseConfig::default())
    }
}

impl BroadPhaseDetector {
    /// Create a new broad-phase detector with the given configuration.
    #[must_use]
    pub fn new(config: BroadPhaseConfig) -> Self {
        Self {
            config,
            sap: None,
            brute: BruteForce::new(),
            scratch: Vec::new(),
        }
    }

    /// Find all potentially colliding pairs, in ascending order.
    ///
    /// Boxes are grown by the configured margin first. An empty scene has
    /// no pairs.
    ///
    /// # Errors
    ///
    /// [`CollisionError::InvalidAabb`] if any box is malformed.
    pub fn find_pairs(&mut self, boxes: &[Aabb]) -> Result<Vec<Pair>> {
        if boxes.is_empty() {
            return Ok(Vec::new());
        }

        self.scratch.clear();
        if self.config.margin > 0.0 {
            self.scratch
                .extend(boxes.iter().map(|b| b.expanded(self.config.margin)));
        } else {
            self.scratch.extend_from_slice(boxes);
        }

        let use_brute = match self.config.algorithm {
            BroadPhaseAlgorithm::Auto => boxes.len() < self.config.brute_force_threshold,
            BroadPhaseAlgorithm::BruteForce => true,
            BroadPhaseAlgorithm::SweepAndPrune => false,
        };

        let pairs = if use_brute {
            self.brute.find_pairs(&self.scratch)?
        } else {
            match &mut self.sap {
                Some(sap) => sap.find_pairs(&self.scratch)?,
                None => {
                    let sap = SweepAndPrune::init(&self.scratch)?;
                    let pairs = sap.pairs();
                    self.sap = Some(sap);
                    pairs
                }
            }
        };

        trace!(
            objects = boxes.len(),
            pairs = pairs.len(),
            brute_force = use_brute,
            "broad phase"
        );
        Ok(pairs)
    }

    /// Get the current configuration.
    #[must_use]
    pub fn config(&self) -> &BroadPhaseConfig {
        &self.config
    }

    /// Update the configuration. Incremental state is dropped.
    ///
    /// # Errors
    ///
    /// [`CollisionError::InvalidConfig`] if the configuration is invalid;
    /// the previous configuration stays in effect.
    pub fn set_config(&mut self, config: BroadPhaseConfig) -> Result<()> {
        config.validate()?;
        self.sap = None;
        self.config = config;
        Ok(())
    }
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
    use nalgebra::{Point3, Vector3};

    fn sphere_box(x: f64, y: f64, z: f64, radius: f64) -> Aabb {
        Aabb::from_center(Point3::new(x, y, z), Vector3::new(radius, radius, radius))
    }

    #[test]
    fn test_brute_force_matches_sap() {
        let boxes = vec![
            sphere_box(0.0, 0.0, 0.0, 1.0),
            sphere_box(1.5, 0.0, 0.0, 1.0),
            sphere_box(0.0, 1.5, 0.0, 1.0),
            sphere_box(5.0, 0.0, 0.0, 1.0),
        ];

        let mut sap = SweepAndPrune::init(&boxes).unwrap();
        let mut brute = BruteForce::new();
        let mut pruning = BoxPruning::new();

        let sap_pairs = sap.find_pairs(&boxes).unwrap();
        let brute_pairs = brute.find_pairs(&boxes).unwrap();
        let pruning_pairs = pruning.find_pairs(&boxes).unwrap();

        assert_eq!(sap_pairs, brute_pairs);
        assert_eq!(pruning_pairs, brute_pairs);
        assert_eq!(brute_pairs.len(), 3);
    }

    #[test]
    fn test_sap_trait_rebuilds_on_count_change() {
        let mut sap = SweepAndPrune::init(&[sphere_box(0.0, 0.0, 0.0, 1.0)]).unwrap();
        let pairs = sap
            .find_pairs(&[sphere_box(0.0, 0.0, 0.0, 1.0), sphere_box(0.5, 0.0, 0.0, 1.0)])
            .unwrap();
        assert_eq!(pairs, vec![Pair::new(0, 1)]);
        assert_eq!(sap.object_count(), 2);
    }

    #[test]
    fn test_invalid_box_reported() {
        let bad = Aabb::new(Point3::new(1.0, 1.0, 1.0), Point3::origin());
        let err = BruteForce::new().find_pairs(&[bad]).unwrap_err();
        assert!(matches!(err, CollisionError::InvalidAabb { index: 0, .. }));
    }

    #[test]
    fn test_broad_phase_detector_auto() {
        let mut detector = BroadPhaseDetector::default();

        // Small scene uses brute force
        let small: Vec<_> = (0..10)
            .map(|i| sphere_box(i as f64 * 1.5, 0.0, 0.0, 1.0))
            .collect();
        assert_eq!(detector.find_pairs(&small).unwrap().len(), 9);
        assert!(detector.sap.is_none());

        // Large scene uses SAP
        let large: Vec<_> = (0..100)
            .map(|i| sphere_box(i as f64 * 1.5, 0.0, 0.0, 1.0))
            .collect();
        assert_eq!(detector.find_pairs(&large).unwrap().len(), 99);
        assert!(detector.sap.is_some());

        // Coherent second step goes through incremental updates
        let shifted: Vec<_> = large
            .iter()
            .map(|b| Aabb::new(b.min + Vector3::x() * 0.1, b.max + Vector3::x() * 0.1))
            .collect();
        assert_eq!(detector.find_pairs(&shifted).unwrap().len(), 99);
    }

    #[test]
    fn test_empty_scene() {
        let mut detector = BroadPhaseDetector::new(BroadPhaseConfig::sweep_and_prune());
        assert!(detector.find_pairs(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_margin_expands_detection() {
        // Two spheres just barely not touching
        let boxes = vec![sphere_box(0.0, 0.0, 0.0, 1.0), sphere_box(2.1, 0.0, 0.0, 1.0)];

        let mut no_margin = BroadPhaseDetector::new(BroadPhaseConfig::sweep_and_prune());
        assert!(no_margin.find_pairs(&boxes).unwrap().is_empty());

        let mut with_margin =
            BroadPhaseDetector::new(BroadPhaseConfig::sweep_and_prune().with_margin(0.1));
        assert_eq!(with_margin.find_pairs(&boxes).unwrap().len(), 1);
    }

    #[test]
    fn test_set_config_validates() {
        let mut detector = BroadPhaseDetector::default();
        assert!(detector
            .set_config(BroadPhaseConfig::default().with_margin(-1.0))
            .is_err());
        assert_eq!(detector.config().margin, 0.0);
    }
}
