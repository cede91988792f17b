//! Configuration types for collision detection.
//!
//! This module provides the knobs that control the broad phase, mesh tree
//! construction, narrow-phase colliders and contact reduction.

use crate::{CollisionError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Shared numerical tolerance for every overlap decision.
///
/// Every collider reads it through [`ColliderConfig::tolerance`].
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Main configuration for a collision world.
///
/// Has no `Default`; the caller picks the contact reduction strategy.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionConfig {
    /// Broad-phase settings.
    pub broad_phase: BroadPhaseConfig,
    /// Mesh tree settings used when building meshes and heightfields.
    pub tree: TreeConfig,
    /// Narrow-phase settings.
    pub collider: ColliderConfig,
    /// How raw contacts are reduced into a manifold.
    pub merge: MergeStrategy,
    /// Maximum contacts per manifold.
    pub manifold_capacity: usize,
}

impl CollisionConfig {
    /// Create a configuration with the given merge strategy and defaults
    /// for everything else.
    #[must_use]
    pub fn new(merge: MergeStrategy) -> Self {
        Self {
            broad_phase: BroadPhaseConfig::default(),
            tree: TreeConfig::default(),
            collider: ColliderConfig::default(),
            merge,
            manifold_capacity: 4,
        }
    }

    /// Set the manifold capacity.
    #[must_use]
    pub fn with_manifold_capacity(mut self, capacity: usize) -> Self {
        self.manifold_capacity = capacity;
        self
    }

    /// Set the broad-phase configuration.
    #[must_use]
    pub fn with_broad_phase(mut self, broad_phase: BroadPhaseConfig) -> Self {
        self.broad_phase = broad_phase;
        self
    }

    /// Set the tree configuration.
    #[must_use]
    pub fn with_tree(mut self, tree: TreeConfig) -> Self {
        self.tree = tree;
        self
    }

    /// Set the collider configuration.
    #[must_use]
    pub fn with_collider(mut self, collider: ColliderConfig) -> Self {
        self.collider = collider;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.manifold_capacity == 0 {
            return Err(CollisionError::invalid_config(
                "manifold capacity must be at least 1",
            ));
        }
        self.broad_phase.validate()?;
        self.tree.validate()?;
        self.collider.validate()?;
        Ok(())
    }
}

/// Broad-phase algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BroadPhaseAlgorithm {
    /// Automatically choose based on object count.
    #[default]
    Auto,
    /// Always use brute force O(n²).
    BruteForce,
    /// Always use incremental sweep-and-prune.
    SweepAndPrune,
}

/// Configuration for broad-phase collision detection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BroadPhaseConfig {
    /// Algorithm to use.
    pub algorithm: BroadPhaseAlgorithm,
    /// Margin added to every box before it enters the broad phase.
    pub margin: f64,
    /// Object count below which `Auto` uses brute force.
    pub brute_force_threshold: usize,
}

impl Default for BroadPhaseConfig {
    fn default() -> Self {
        Self {
            algorithm: BroadPhaseAlgorithm::Auto,
            margin: 0.0,
            brute_force_threshold: 32,
        }
    }
}

impl BroadPhaseConfig {
    /// Always use sweep-and-prune.
    #[must_use]
    pub fn sweep_and_prune() -> Self {
        Self {
            algorithm: BroadPhaseAlgorithm::SweepAndPrune,
            ..Default::default()
        }
    }

    /// Always use brute force.
    #[must_use]
    pub fn brute_force() -> Self {
        Self {
            algorithm: BroadPhaseAlgorithm::BruteForce,
            ..Default::default()
        }
    }

    /// Set the predictive margin.
    #[must_use]
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(CollisionError::invalid_config(format!(
                "broad-phase margin must be finite and non-negative, got {}",
                self.margin
            )));
        }
        Ok(())
    }
}

/// Node encoding of a mesh tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LayoutKind {
    /// Exact boxes, explicit leaf nodes holding primitive ranges.
    Plain,
    /// Leaves folded into their parents; each child is a node or a primitive.
    NoLeaf,
    /// No-leaf topology with child boxes stored as 16-bit fixed point.
    #[default]
    Quantized,
}

/// How a node's primitives are partitioned between its two children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SplitRule {
    /// Sort centroids along the longest axis and split at the median.
    #[default]
    LargestAxisMedian,
    /// Split at the mean centroid along the longest axis.
    LargestAxisMean,
    /// Try the mean on every axis and keep the most even split.
    Balanced,
}

/// Configuration for building a mesh tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TreeConfig {
    /// Node encoding.
    pub layout: LayoutKind,
    /// Partitioning rule.
    pub split: SplitRule,
    /// Maximum primitives per leaf. Must be 1 for the no-leaf and quantized
    /// layouts.
    pub leaf_limit: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            layout: LayoutKind::default(),
            split: SplitRule::default(),
            leaf_limit: 1,
        }
    }
}

impl TreeConfig {
    /// Plain layout with one primitive per leaf.
    #[must_use]
    pub fn plain() -> Self {
        Self {
            layout: LayoutKind::Plain,
            ..Default::default()
        }
    }

    /// No-leaf layout.
    #[must_use]
    pub fn no_leaf() -> Self {
        Self {
            layout: LayoutKind::NoLeaf,
            ..Default::default()
        }
    }

    /// Quantized no-leaf layout.
    #[must_use]
    pub fn quantized() -> Self {
        Self {
            layout: LayoutKind::Quantized,
            ..Default::default()
        }
    }

    /// Set the split rule.
    #[must_use]
    pub fn with_split(mut self, split: SplitRule) -> Self {
        self.split = split;
        self
    }

    /// Set the leaf limit.
    #[must_use]
    pub fn with_leaf_limit(mut self, leaf_limit: usize) -> Self {
        self.leaf_limit = leaf_limit;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.leaf_limit == 0 {
            return Err(CollisionError::invalid_config(
                "leaf limit must be at least 1",
            ));
        }
        if self.layout != LayoutKind::Plain && self.leaf_limit != 1 {
            return Err(CollisionError::LayoutRequiresCompleteTree {
                leaf_limit: self.leaf_limit,
            });
        }
        Ok(())
    }
}

/// Configuration for narrow-phase colliders.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColliderConfig {
    /// Shared tolerance for all overlap decisions.
    pub tolerance: f64,
    /// Stop at the first touched primitive.
    pub first_contact: bool,
    /// Skip triangles whose front face points away from the query center.
    pub back_face_culling: bool,
}

impl Default for ColliderConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            first_contact: false,
            back_face_culling: false,
        }
    }
}

impl ColliderConfig {
    /// Stop after the first touched primitive (boolean queries).
    #[must_use]
    pub fn first_contact() -> Self {
        Self {
            first_contact: true,
            ..Default::default()
        }
    }

    /// Enable or disable back-face culling.
    #[must_use]
    pub fn with_back_face_culling(mut self, enabled: bool) -> Self {
        self.back_face_culling = enabled;
        self
    }

    /// Set the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(CollisionError::invalid_config(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// How raw contacts for one pair are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MergeStrategy {
    /// Bucket contacts by spatial key and keep the deepest of each bucket.
    KeepDeepest,
    /// Collapse every contact into one depth-weighted average.
    Average,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_config_defaults() {
        let config = CollisionConfig::new(MergeStrategy::KeepDeepest);
        assert_eq!(config.manifold_capacity, 4);
        assert_eq!(config.collider.tolerance, DEFAULT_TOLERANCE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = CollisionConfig::new(MergeStrategy::Average).with_manifold_capacity(0);
        assert!(config.validate().unwrap_err().is_config_error());
    }

    #[test]
    fn test_tree_config_validation() {
        assert!(TreeConfig::plain().with_leaf_limit(4).validate().is_ok());
        assert!(TreeConfig::plain().with_leaf_limit(0).validate().is_err());
        assert_eq!(
            TreeConfig::no_leaf().with_leaf_limit(2).validate(),
            Err(CollisionError::LayoutRequiresCompleteTree { leaf_limit: 2 })
        );
        assert!(TreeConfig::quantized().validate().is_ok());
    }

    #[test]
    fn test_negative_margin_rejected() {
        let config = BroadPhaseConfig::sweep_and_prune().with_margin(-0.1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nan_tolerance_rejected() {
        let config = ColliderConfig::default().with_tolerance(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_serde_roundtrip() {
        let config = CollisionConfig::new(MergeStrategy::KeepDeepest).with_tree(TreeConfig::plain());
        let json = serde_json::to_string(&config).unwrap();
        let back: CollisionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
