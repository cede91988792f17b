//! Layout-independent tree walking.
//!
//! Every layout is seen through [`Cursor`]s: a node or primitive together
//! with the box that bounds it. Queries implement [`TreeVisitor`] and never
//! look at node storage directly.

use std::ops::ControlFlow;

use smallvec::SmallVec;

use super::layout::{Child, PlainNodeKind, TreeLayout};
use super::MeshTree;
use crate::geometry::Aabb;
use crate::mesh::MeshInterface;

/// What a cursor points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// A stored node.
    Node(u32),
    /// A triangle index.
    Primitive(u32),
}

/// A position in the tree and its bounding box.
///
/// For quantized trees the box is the decoded, conservative one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    /// Node or primitive.
    pub entry: Entry,
    /// Bounding box.
    pub aabb: Aabb,
}

impl Cursor {
    /// Whether the cursor is on a primitive.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(self.entry, Entry::Primitive(_))
    }
}

/// Callbacks driving [`MeshTree::visit`].
///
/// `enter` tests a box and returns an ordering key, or `None` to skip the
/// whole subtree. Siblings are visited in ascending key order. Entries whose
/// key is pruned by the time they are popped are dropped without descending.
pub trait TreeVisitor {
    /// Test a node or primitive box.
    fn enter(&mut self, aabb: &Aabb) -> Option<f64>;

    /// Whether an entry queued with `key` is no longer worth visiting.
    fn is_pruned(&self, _key: f64) -> bool {
        false
    }

    /// Handle a triangle whose box passed `enter`. Break to stop the walk.
    fn visit_primitive(&mut self, index: u32) -> ControlFlow<()>;
}

impl MeshTree {
    /// The root cursor.
    #[must_use]
    pub fn root_cursor(&self) -> Cursor {
        match &self.layout {
            TreeLayout::Plain(t) => Cursor {
                entry: Entry::Node(0),
                aabb: t.nodes.first().map_or_else(Aabb::default, |n| n.aabb),
            },
            TreeLayout::NoLeaf(t) => Cursor {
                entry: entry_of(t.root),
                aabb: t.root_aabb,
            },
            TreeLayout::Quantized(t) => Cursor {
                entry: entry_of(t.root),
                aabb: t.root_aabb,
            },
        }
    }

    /// Push the children of `cursor` onto `out`. Primitives have none.
    pub fn expand(&self, cursor: &Cursor, out: &mut SmallVec<[Cursor; 4]>) {
        let Entry::Node(index) = cursor.entry else {
            return;
        };
        let index = index as usize;
        match &self.layout {
            TreeLayout::Plain(t) => match t.nodes[index].kind {
                PlainNodeKind::Internal { left, right } => {
                    for child in [left, right] {
                        out.push(Cursor {
                            entry: Entry::Node(child),
                            aabb: t.nodes[child as usize].aabb,
                        });
                    }
                }
                PlainNodeKind::Leaf { first, count } => {
                    for &p in &t.primitives[first as usize..(first + count) as usize] {
                        if let Some(tri) = self.mesh.triangle(p as usize) {
                            out.push(Cursor {
                                entry: Entry::Primitive(p),
                                aabb: tri.aabb(),
                            });
                        }
                    }
                }
            },
            TreeLayout::NoLeaf(t) => {
                let node = &t.nodes[index];
                for k in 0..2 {
                    out.push(Cursor {
                        entry: entry_of(node.children[k]),
                        aabb: node.boxes[k],
                    });
                }
            }
            TreeLayout::Quantized(t) => {
                let node = &t.nodes[index];
                for k in 0..2 {
                    out.push(Cursor {
                        entry: entry_of(node.children[k]),
                        aabb: node.boxes[k].decode(&cursor.aabb),
                    });
                }
            }
        }
    }

    /// Walk the tree depth-first, nearest key first.
    ///
    /// Returns `Break` if the visitor stopped the walk.
    pub fn visit<V: TreeVisitor + ?Sized>(&self, visitor: &mut V) -> ControlFlow<()> {
        let root = self.root_cursor();
        let Some(key) = visitor.enter(&root.aabb) else {
            return ControlFlow::Continue(());
        };

        let mut stack: Vec<(Cursor, f64)> = Vec::with_capacity(64);
        stack.push((root, key));
        let mut children: SmallVec<[Cursor; 4]> = SmallVec::new();
        let mut keyed: SmallVec<[(Cursor, f64); 4]> = SmallVec::new();

        while let Some((cursor, key)) = stack.pop() {
            if visitor.is_pruned(key) {
                continue;
            }
            match cursor.entry {
                Entry::Primitive(p) => visitor.visit_primitive(p)?,
                Entry::Node(_) => {
                    children.clear();
                    self.expand(&cursor, &mut children);
                    keyed.clear();
                    for child in &children {
                        if let Some(k) = visitor.enter(&child.aabb) {
                            keyed.push((*child, k));
                        }
                    }
                    keyed.sort_by(|a, b| a.1.total_cmp(&b.1));
                    stack.extend(keyed.drain(..).rev());
                }
            }
        }
        ControlFlow::Continue(())
    }

    /// Assert that every box contains the boxes below it and the exact box
    /// of every primitive it references.
    ///
    /// # Panics
    ///
    /// On the first violation found.
    pub fn check_bounds(&self) {
        let mut stack = vec![self.root_cursor()];
        let mut children: SmallVec<[Cursor; 4]> = SmallVec::new();
        while let Some(cursor) = stack.pop() {
            match cursor.entry {
                Entry::Primitive(p) => {
                    let exact = self
                        .mesh
                        .triangle(p as usize)
                        .map_or_else(Aabb::empty, |tri| tri.aabb());
                    assert!(
                        cursor.aabb.contains(&exact),
                        "primitive {p}: box {:?} does not contain {exact:?}",
                        cursor.aabb
                    );
                }
                Entry::Node(n) => {
                    children.clear();
                    self.expand(&cursor, &mut children);
                    for child in &children {
                        assert!(
                            cursor.aabb.contains(&child.aabb),
                            "node {n}: box {:?} does not contain child {:?}",
                            cursor.aabb,
                            child.aabb
                        );
                    }
                    stack.extend(children.drain(..));
                }
            }
        }
    }
}

fn entry_of(child: Child) -> Entry {
    match child {
        Child::Node(n) => Entry::Node(n),
        Child::Primitive(p) => Entry::Primitive(p),
    }
}
