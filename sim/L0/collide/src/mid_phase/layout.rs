//! Node storage for the three tree layouts.
//!
//! - **Plain**: every node stores its own box; leaves reference a run of
//!   primitives. `2N - 1` nodes for `N` primitives at one per leaf.
//! - **No-leaf**: each node stores the boxes of its two children, and a
//!   child is either another node or a primitive. `N - 1` nodes.
//! - **Quantized**: the no-leaf topology with child boxes stored as 16-bit
//!   offsets inside the parent's decoded box. Decoded boxes always contain
//!   the exact box they encode.

#![allow(clippy::cast_possible_truncation)]

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::Aabb;
use crate::mesh::{MeshInterface, TriangleMesh};

/// Largest quantized coordinate.
pub const QUANT_MAX: u16 = u16::MAX;

/// Node of a plain tree.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlainNode {
    /// Box around everything below this node.
    pub aabb: Aabb,
    /// Internal or leaf.
    pub kind: PlainNodeKind,
}

/// Contents of a [`PlainNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PlainNodeKind {
    /// Two child node indices.
    Internal {
        /// Left child.
        left: u32,
        /// Right child.
        right: u32,
    },
    /// A run of entries in [`PlainTree::primitives`].
    Leaf {
        /// First entry.
        first: u32,
        /// Entry count.
        count: u32,
    },
}

/// Tree where every node carries its own exact box.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlainTree {
    /// Nodes in preorder; node 0 is the root.
    pub nodes: Vec<PlainNode>,
    /// Triangle indices referenced by leaves.
    pub primitives: Vec<u32>,
}

/// Child slot of a no-leaf or quantized node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Child {
    /// Index of another node.
    Node(u32),
    /// Triangle index.
    Primitive(u32),
}

/// Node of a no-leaf tree.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NoLeafNode {
    /// Exact boxes of the two children.
    pub boxes: [Aabb; 2],
    /// The two children.
    pub children: [Child; 2],
}

/// Tree without leaf nodes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NoLeafTree {
    /// Box of the root child.
    pub root_aabb: Aabb,
    /// The root. A single-triangle tree has a primitive root and no nodes.
    pub root: Child,
    /// Nodes in preorder.
    pub nodes: Vec<NoLeafNode>,
}

impl NoLeafTree {
    /// Convert a plain tree with one primitive per leaf.
    ///
    /// Leaves holding several primitives contribute only their first one, so
    /// callers must build with a leaf limit of 1.
    #[must_use]
    pub fn from_plain(plain: &PlainTree) -> Self {
        // Plain index -> no-leaf slot. Internal nodes keep their relative
        // preorder, so parents still precede children.
        let mut slot = vec![0_u32; plain.nodes.len()];
        let mut next = 0_u32;
        for (i, node) in plain.nodes.iter().enumerate() {
            if matches!(node.kind, PlainNodeKind::Internal { .. }) {
                slot[i] = next;
                next += 1;
            }
        }

        let child_of = |index: u32| -> Child {
            let node = &plain.nodes[index as usize];
            match node.kind {
                PlainNodeKind::Internal { .. } => Child::Node(slot[index as usize]),
                PlainNodeKind::Leaf { first, .. } => {
                    Child::Primitive(plain.primitives[first as usize])
                }
            }
        };

        let nodes = plain
            .nodes
            .iter()
            .filter_map(|node| match node.kind {
                PlainNodeKind::Internal { left, right } => Some(NoLeafNode {
                    boxes: [
                        plain.nodes[left as usize].aabb,
                        plain.nodes[right as usize].aabb,
                    ],
                    children: [child_of(left), child_of(right)],
                }),
                PlainNodeKind::Leaf { .. } => None,
            })
            .collect();

        let (root_aabb, root) = match plain.nodes.first() {
            Some(node) => (node.aabb, child_of(0)),
            None => (Aabb::default(), Child::Primitive(0)),
        };
        Self {
            root_aabb,
            root,
            nodes,
        }
    }

    /// Recompute every box bottom-up from current vertex positions.
    pub fn refit(&mut self, mesh: &TriangleMesh) {
        for i in (0..self.nodes.len()).rev() {
            for k in 0..2 {
                let aabb = match self.nodes[i].children[k] {
                    Child::Primitive(p) => primitive_aabb(mesh, p),
                    Child::Node(j) => union(&self.nodes[j as usize].boxes),
                };
                self.nodes[i].boxes[k] = aabb;
            }
        }
        self.root_aabb = match self.root {
            Child::Primitive(p) => primitive_aabb(mesh, p),
            Child::Node(j) => union(&self.nodes[j as usize].boxes),
        };
    }
}

/// A box stored as 16-bit fractions of an enclosing box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QuantizedBox {
    /// Quantized minimum corner.
    pub min: [u16; 3],
    /// Quantized maximum corner.
    pub max: [u16; 3],
}

impl QuantizedBox {
    /// Encode `aabb` relative to `parent`, rounding outward.
    ///
    /// `aabb` is expected to lie inside `parent`; coordinates outside are
    /// clamped to the parent's faces.
    #[must_use]
    pub fn encode(aabb: &Aabb, parent: &Aabb) -> Self {
        let mut out = Self::default();
        for i in 0..3 {
            let (lo, hi) = (parent.min[i], parent.max[i]);
            let extent = hi - lo;
            if extent <= 0.0 {
                out.min[i] = 0;
                out.max[i] = QUANT_MAX;
                continue;
            }
            let scale = extent / f64::from(QUANT_MAX);

            let mut qmin = to_quant(((aabb.min[i] - lo) / scale).floor());
            while qmin > 0 && decode_axis(qmin, lo, hi, scale) > aabb.min[i] {
                qmin -= 1;
            }
            let mut qmax = to_quant(((aabb.max[i] - lo) / scale).ceil());
            while qmax < QUANT_MAX && decode_axis(qmax, lo, hi, scale) < aabb.max[i] {
                qmax += 1;
            }
            out.min[i] = qmin;
            out.max[i] = qmax.max(qmin);
        }
        out
    }

    /// Decode relative to `parent`.
    #[must_use]
    pub fn decode(&self, parent: &Aabb) -> Aabb {
        let mut min = Point3::origin();
        let mut max = Point3::origin();
        for i in 0..3 {
            let (lo, hi) = (parent.min[i], parent.max[i]);
            let scale = (hi - lo) / f64::from(QUANT_MAX);
            min[i] = decode_axis(self.min[i], lo, hi, scale);
            max[i] = decode_axis(self.max[i], lo, hi, scale);
        }
        Aabb::new(min, max)
    }
}

#[allow(clippy::cast_sign_loss)]
fn to_quant(value: f64) -> u16 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= f64::from(QUANT_MAX) {
        QUANT_MAX
    } else {
        value as u16
    }
}

fn decode_axis(q: u16, lo: f64, hi: f64, scale: f64) -> f64 {
    match q {
        0 => lo,
        QUANT_MAX => hi,
        _ => (lo + f64::from(q) * scale).min(hi),
    }
}

/// Node of a quantized tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QuantizedNode {
    /// Child boxes, relative to this node's decoded box.
    pub boxes: [QuantizedBox; 2],
    /// The two children.
    pub children: [Child; 2],
}

/// No-leaf tree with quantized child boxes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QuantizedTree {
    /// Exact box of the root.
    pub root_aabb: Aabb,
    /// The root.
    pub root: Child,
    /// Nodes in preorder.
    pub nodes: Vec<QuantizedNode>,
}

impl QuantizedTree {
    /// Quantize a no-leaf tree top-down.
    #[must_use]
    pub fn from_no_leaf(tree: &NoLeafTree) -> Self {
        let exact: Vec<[Aabb; 2]> = tree.nodes.iter().map(|n| n.boxes).collect();
        let children: Vec<[Child; 2]> = tree.nodes.iter().map(|n| n.children).collect();
        Self {
            root_aabb: tree.root_aabb,
            root: tree.root,
            nodes: quantize(tree.root_aabb, tree.root, &exact, &children),
        }
    }

    /// Recompute exact boxes bottom-up, then re-quantize. Topology is kept.
    pub fn refit(&mut self, mesh: &TriangleMesh) {
        let children: Vec<[Child; 2]> = self.nodes.iter().map(|n| n.children).collect();
        let mut exact = vec![[Aabb::empty(); 2]; self.nodes.len()];
        for i in (0..children.len()).rev() {
            for k in 0..2 {
                exact[i][k] = match children[i][k] {
                    Child::Primitive(p) => primitive_aabb(mesh, p),
                    Child::Node(j) => union(&exact[j as usize]),
                };
            }
        }
        self.root_aabb = match self.root {
            Child::Primitive(p) => primitive_aabb(mesh, p),
            Child::Node(j) => union(&exact[j as usize]),
        };
        self.nodes = quantize(self.root_aabb, self.root, &exact, &children);
    }
}

fn quantize(
    root_aabb: Aabb,
    root: Child,
    exact: &[[Aabb; 2]],
    children: &[[Child; 2]],
) -> Vec<QuantizedNode> {
    let mut decoded = vec![Aabb::empty(); exact.len()];
    if let Child::Node(j) = root {
        decoded[j as usize] = root_aabb;
    }

    let mut nodes = Vec::with_capacity(exact.len());
    // Preorder: decoded[i] is known before node i is visited.
    for i in 0..exact.len() {
        let parent = decoded[i];
        let mut boxes = [QuantizedBox::default(); 2];
        for k in 0..2 {
            boxes[k] = QuantizedBox::encode(&exact[i][k], &parent);
            if let Child::Node(j) = children[i][k] {
                decoded[j as usize] = boxes[k].decode(&parent);
            }
        }
        nodes.push(QuantizedNode {
            boxes,
            children: children[i],
        });
    }
    nodes
}

/// Node storage of a [`super::MeshTree`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TreeLayout {
    /// Exact per-node boxes.
    Plain(PlainTree),
    /// Child boxes in parents, no leaf nodes.
    NoLeaf(NoLeafTree),
    /// Quantized child boxes.
    Quantized(QuantizedTree),
}

impl TreeLayout {
    /// Number of stored nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        match self {
            Self::Plain(t) => t.nodes.len(),
            Self::NoLeaf(t) => t.nodes.len(),
            Self::Quantized(t) => t.nodes.len(),
        }
    }

    /// Exact box of the whole tree.
    #[must_use]
    pub fn root_aabb(&self) -> Aabb {
        match self {
            Self::Plain(t) => t.nodes.first().map_or_else(Aabb::default, |n| n.aabb),
            Self::NoLeaf(t) => t.root_aabb,
            Self::Quantized(t) => t.root_aabb,
        }
    }

    /// Recompute boxes after vertices moved.
    pub fn refit(&mut self, mesh: &TriangleMesh) {
        match self {
            Self::Plain(t) => {
                for i in (0..t.nodes.len()).rev() {
                    t.nodes[i].aabb = match t.nodes[i].kind {
                        PlainNodeKind::Leaf { first, count } => t.primitives
                            [first as usize..(first + count) as usize]
                            .iter()
                            .fold(Aabb::empty(), |acc, &p| acc.merged(&primitive_aabb(mesh, p))),
                        PlainNodeKind::Internal { left, right } => t.nodes[left as usize]
                            .aabb
                            .merged(&t.nodes[right as usize].aabb),
                    };
                }
            }
            Self::NoLeaf(t) => t.refit(mesh),
            Self::Quantized(t) => t.refit(mesh),
        }
    }
}

fn primitive_aabb(mesh: &TriangleMesh, index: u32) -> Aabb {
    mesh.triangle(index as usize)
        .map_or_else(Aabb::empty, |tri| tri.aabb())
}

fn union(boxes: &[Aabb; 2]) -> Aabb {
    boxes[0].merged(&boxes[1])
}
