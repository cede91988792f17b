//! Top-down tree construction.
//!
//! The builder always produces the exact plain tree first. The no-leaf and
//! quantized layouts are derived from it, so every layout shares the same
//! topology for a given mesh and configuration.

#![allow(clippy::cast_possible_truncation)]

use nalgebra::Point3;
use sim_types::{CollisionError, LayoutKind, Result, SplitRule, TreeConfig};
use tracing::debug;

use super::layout::{NoLeafTree, PlainNode, PlainNodeKind, PlainTree, QuantizedTree, TreeLayout};
use super::MeshTree;
use crate::geometry::{Aabb, Axis};
use crate::mesh::{MeshInterface, TriangleMesh};

/// A primitive during construction.
#[derive(Debug, Clone, Copy)]
struct BuildPrimitive {
    index: u32,
    aabb: Aabb,
    centroid: Point3<f64>,
}

/// Pending subtree: primitives `start..end`, to be attached to `parent`.
#[derive(Debug, Clone, Copy)]
struct Task {
    start: usize,
    end: usize,
    parent: Option<(usize, Side)>,
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Builds [`MeshTree`]s according to a [`TreeConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeBuilder {
    config: TreeConfig,
}

impl TreeBuilder {
    /// Create a builder.
    #[must_use]
    pub fn new(config: TreeConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Build a tree over every non-degenerate triangle of `mesh`.
    ///
    /// # Errors
    ///
    /// [`CollisionError::InvalidConfig`] or
    /// [`CollisionError::LayoutRequiresCompleteTree`] for a bad
    /// configuration, and [`CollisionError::EmptyMesh`] when every triangle
    /// is degenerate.
    pub fn build(&self, mesh: TriangleMesh) -> Result<MeshTree> {
        self.config.validate()?;
        let (layout, primitive_count, skipped) = self.build_layout(&mesh)?;
        Ok(MeshTree::from_parts(mesh, self.config, layout, primitive_count, skipped))
    }

    /// Layout, primitive count and the ascending indices of the degenerate
    /// triangles left out.
    pub(super) fn build_layout(
        &self,
        mesh: &TriangleMesh,
    ) -> Result<(TreeLayout, usize, Vec<u32>)> {
        let mut primitives: Vec<BuildPrimitive> = Vec::with_capacity(mesh.triangle_count());
        let mut skipped = Vec::new();
        for i in 0..mesh.triangle_count() {
            match mesh.triangle(i) {
                Some(tri) if !mesh.is_degenerate(i) => primitives.push(BuildPrimitive {
                    index: i as u32,
                    aabb: tri.aabb(),
                    centroid: tri.centroid(),
                }),
                _ => skipped.push(i as u32),
            }
        }

        if primitives.is_empty() {
            return Err(CollisionError::EmptyMesh);
        }
        let primitive_count = primitives.len();

        let plain = build_plain(&mut primitives, &self.config);
        let layout = match self.config.layout {
            LayoutKind::Plain => TreeLayout::Plain(plain),
            LayoutKind::NoLeaf => TreeLayout::NoLeaf(NoLeafTree::from_plain(&plain)),
            LayoutKind::Quantized => {
                TreeLayout::Quantized(QuantizedTree::from_no_leaf(&NoLeafTree::from_plain(&plain)))
            }
        };

        debug!(
            primitives = primitive_count,
            skipped_degenerate = skipped.len(),
            nodes = layout.node_count(),
            layout = ?self.config.layout,
            "mesh tree built"
        );
        Ok((layout, primitive_count, skipped))
    }
}

fn build_plain(primitives: &mut [BuildPrimitive], config: &TreeConfig) -> PlainTree {
    let leaf_limit = config.leaf_limit.max(1);
    let mut nodes: Vec<PlainNode> = Vec::with_capacity(primitives.len() * 2);
    let mut tasks = vec![Task {
        start: 0,
        end: primitives.len(),
        parent: None,
    }];

    while let Some(task) = tasks.pop() {
        let slice = &mut primitives[task.start..task.end];
        let aabb = bounds(slice);
        let node_index = nodes.len();

        if let Some((parent, side)) = task.parent {
            if let PlainNodeKind::Internal { left, right } = &mut nodes[parent].kind {
                match side {
                    Side::Left => *left = node_index as u32,
                    Side::Right => *right = node_index as u32,
                }
            }
        }

        if slice.len() <= leaf_limit {
            nodes.push(PlainNode {
                aabb,
                kind: PlainNodeKind::Leaf {
                    first: task.start as u32,
                    count: slice.len() as u32,
                },
            });
            continue;
        }

        let mid = task.start + partition(slice, &aabb, config.split);
        nodes.push(PlainNode {
            aabb,
            kind: PlainNodeKind::Internal { left: 0, right: 0 },
        });

        // Right pushed first so the left subtree gets the next indices.
        tasks.push(Task {
            start: mid,
            end: task.end,
            parent: Some((node_index, Side::Right)),
        });
        tasks.push(Task {
            start: task.start,
            end: mid,
            parent: Some((node_index, Side::Left)),
        });
    }

    PlainTree {
        nodes,
        primitives: primitives.iter().map(|p| p.index).collect(),
    }
}

fn bounds(primitives: &[BuildPrimitive]) -> Aabb {
    primitives.iter().fold(Aabb::empty(), |acc, p| acc.merged(&p.aabb))
}

/// Reorder `slice` and return the size of the left half (always in `1..len`).
fn partition(slice: &mut [BuildPrimitive], aabb: &Aabb, rule: SplitRule) -> usize {
    match rule {
        SplitRule::LargestAxisMedian => median_split(slice, aabb.largest_axis()),
        SplitRule::LargestAxisMean => {
            let axis = aabb.largest_axis();
            mean_split(slice, axis).unwrap_or_else(|| median_split(slice, axis))
        }
        SplitRule::Balanced => {
            let half = slice.len() / 2;
            let best = Axis::all()
                .into_iter()
                .filter_map(|axis| {
                    let mean = mean_centroid(slice, axis);
                    let left = slice
                        .iter()
                        .filter(|p| p.centroid[axis.index()] < mean)
                        .count();
                    (left > 0 && left < slice.len()).then_some((axis, left.abs_diff(half)))
                })
                .min_by_key(|&(_, imbalance)| imbalance);
            match best {
                Some((axis, _)) => {
                    mean_split(slice, axis).unwrap_or_else(|| median_split(slice, axis))
                }
                None => median_split(slice, aabb.largest_axis()),
            }
        }
    }
}

fn median_split(slice: &mut [BuildPrimitive], axis: Axis) -> usize {
    let i = axis.index();
    slice.sort_by(|a, b| a.centroid[i].total_cmp(&b.centroid[i]));
    slice.len() / 2
}

#[allow(clippy::cast_precision_loss)]
fn mean_centroid(slice: &[BuildPrimitive], axis: Axis) -> f64 {
    let i = axis.index();
    slice.iter().map(|p| p.centroid[i]).sum::<f64>() / slice.len() as f64
}

/// Partition around the mean centroid; `None` if one side would be empty.
fn mean_split(slice: &mut [BuildPrimitive], axis: Axis) -> Option<usize> {
    let i = axis.index();
    let mean = mean_centroid(slice, axis);
    let mut left = 0;
    for k in 0..slice.len() {
        if slice[k].centroid[i] < mean {
            slice.swap(k, left);
            left += 1;
        }
    }
    (left > 0 && left < slice.len()).then_some(left)
}
