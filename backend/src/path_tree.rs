//! Sparse, path-addressed document tree
//!
//! Nodes live in an arena and are reached either by handle or by a dotted,
//! one-based path such as `"2.3.1"`. Addressing a path that does not exist yet
//! materializes every missing ancestor as an empty node; sibling slots that
//! were never addressed stay as explicit holes.
//!
//! Every node keeps two sequences: organizational children and section
//! leaves. A section is addressed as `"2.3:5"`, the fifth section slot of
//! `"2.3"`, so a section never lands on a heading slot.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{ContentRef, HeadingDescriptor, Kind, SectionMeta, TreeError};

/// Separator between path segments
pub const PATH_DELIMITER: char = '.';

/// Separator between an organizational path and a section slot
pub const SECTION_DELIMITER: char = ':';

/// Stable reference to a node in a [`PathTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeHandle(usize);

impl NodeHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Ordered, one-based container that tolerates unfilled positions
///
/// Only filled positions take memory, so a slot number taken straight from a
/// source file costs nothing however large it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseSeq<T> {
    slots: BTreeMap<usize, T>,
}

impl<T> Default for SparseSeq<T> {
    fn default() -> Self {
        SparseSeq { slots: BTreeMap::new() }
    }
}

impl<T> SparseSeq<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of positions, holes included: the highest filled position
    pub fn len(&self) -> usize {
        self.slots.last_key_value().map(|(pos, _)| *pos).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Value at one-based `pos`; `None` for holes, position 0 and past the end
    pub fn get(&self, pos: usize) -> Option<&T> {
        self.slots.get(&pos)
    }

    /// Store `value` at one-based `pos`.
    ///
    /// Returns the value previously in the slot. Position 0 is refused and
    /// hands the value back.
    pub fn set(&mut self, pos: usize, value: T) -> Result<Option<T>, T> {
        if pos == 0 {
            return Err(value);
        }
        Ok(self.slots.insert(pos, value))
    }

    /// Filled slots with their one-based raw position, in position order
    pub fn filled(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots.iter().map(|(pos, v)| (*pos, v))
    }

    pub fn filled_count(&self) -> usize {
        self.slots.len()
    }
}

/// What a node stands for in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Materialized only because a deeper path passed through it
    Hole,
    /// Title, division, part, chapter, ...
    Organizational,
    /// Section leaf, kept in its parent's section sequence
    Section,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub role: NodeRole,
    pub descriptor: HeadingDescriptor,
    pub children: SparseSeq<NodeHandle>,
    pub sections: SparseSeq<NodeHandle>,
    pub leaf_content: Option<ContentRef>,
    pub section_meta: Option<SectionMeta>,
    parent: Option<NodeHandle>,
    position: usize,
}

impl Node {
    fn empty(parent: Option<NodeHandle>, position: usize) -> Self {
        Node {
            role: NodeRole::Hole,
            descriptor: HeadingDescriptor::default(),
            children: SparseSeq::new(),
            sections: SparseSeq::new(),
            leaf_content: None,
            section_meta: None,
            parent,
            position,
        }
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// One-based raw position under the parent (0 for the root)
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn kind(&self) -> Option<Kind> {
        self.descriptor.kind
    }
}

/// Result of [`PathTree::attach_leaf`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafSlot {
    /// Slot was empty or already held the same content
    Attached(NodeHandle),
    /// Slot held different content; overwritten
    Replaced {
        handle: NodeHandle,
        previous: ContentRef,
    },
}

impl LeafSlot {
    pub fn handle(&self) -> NodeHandle {
        match self {
            LeafSlot::Attached(handle) => *handle,
            LeafSlot::Replaced { handle, .. } => *handle,
        }
    }
}

/// Arena-backed tree addressed by dotted one-based paths
#[derive(Debug, Clone)]
pub struct PathTree {
    nodes: Vec<Node>,
}

impl PathTree {
    /// Create a tree whose root carries `root` as its heading
    pub fn new(root: HeadingDescriptor) -> Self {
        let mut node = Node::empty(None, 0);
        node.role = NodeRole::Organizational;
        node.descriptor = root;
        PathTree { nodes: vec![node] }
    }

    pub fn root(&self) -> NodeHandle {
        NodeHandle(0)
    }

    pub fn node(&self, handle: NodeHandle) -> &Node {
        &self.nodes[handle.0]
    }

    /// Total nodes, root and materialized ancestors included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Split a dotted path into one-based positions
    pub fn parse_path(path: &str) -> Result<Vec<usize>, TreeError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(TreeError::invalid_path(path, "empty path"));
        }

        trimmed
            .split(PATH_DELIMITER)
            .map(|segment| {
                let segment = segment.trim();
                match segment.parse::<usize>() {
                    Ok(0) => Err(TreeError::invalid_path(path, "zero segment")),
                    Ok(pos) => Ok(pos),
                    Err(_) => Err(TreeError::invalid_path(
                        path,
                        &format!("non-numeric segment '{}'", segment),
                    )),
                }
            })
            .collect()
    }

    /// Node at `path`, creating it and any missing ancestors.
    pub fn get_or_create(&mut self, path: &str) -> Result<NodeHandle, TreeError> {
        let positions = Self::parse_path(path)?;
        let mut current = self.root();
        for pos in positions {
            current = self.child_or_create(current, pos);
        }
        Ok(current)
    }

    /// Node at `path` if it was ever materialized; never creates.
    ///
    /// `"1.2:5"` finds the fifth section of `"1.2"`, `":5"` one under the root.
    pub fn find(&self, path: &str) -> Option<NodeHandle> {
        if let Some((org, slot)) = path.split_once(SECTION_DELIMITER) {
            let parent = if org.trim().is_empty() {
                self.root()
            } else {
                self.find(org)?
            };
            let pos: usize = slot.trim().parse().ok()?;
            return self.node(parent).sections.get(pos).copied();
        }

        let positions = Self::parse_path(path).ok()?;
        let mut current = self.root();
        for pos in positions {
            current = *self.node(current).children.get(pos)?;
        }
        Some(current)
    }

    /// Overwrite a node's classified fields, leaving its children alone.
    pub fn set_header(&mut self, handle: NodeHandle, descriptor: HeadingDescriptor) {
        let node = &mut self.nodes[handle.0];
        node.descriptor = descriptor;
        if node.role == NodeRole::Hole {
            node.role = NodeRole::Organizational;
        }
    }

    /// New child at the next position after the last slot of `handle`
    pub fn append_child_slot(&mut self, handle: NodeHandle) -> Result<NodeHandle, TreeError> {
        let Some(next) = self.node(handle).children.len().checked_add(1) else {
            let path = self.path_of(handle);
            return Err(TreeError::invalid_path(&path, "no child position left"));
        };
        Ok(self.child_or_create(handle, next))
    }

    /// Put `content_ref` in section slot `pos` under `handle`.
    ///
    /// Sections have their own sequence, so the organizational children of
    /// `handle` are never touched. Last write wins: a slot holding different
    /// content is overwritten and reported as [`LeafSlot::Replaced`].
    pub fn attach_leaf(
        &mut self,
        handle: NodeHandle,
        pos: usize,
        content_ref: ContentRef,
    ) -> Result<LeafSlot, TreeError> {
        if pos == 0 {
            let path = self.path_of(handle);
            return Err(TreeError::invalid_path(&path, "zero leaf position"));
        }

        let section = match self.node(handle).sections.get(pos) {
            Some(existing) => *existing,
            None => {
                let section = NodeHandle(self.nodes.len());
                let mut node = Node::empty(Some(handle), pos);
                node.role = NodeRole::Section;
                self.nodes.push(node);
                let _ = self.nodes[handle.0].sections.set(pos, section);
                section
            }
        };

        match self.nodes[section.0].leaf_content.replace(content_ref.clone()) {
            Some(previous) if previous != content_ref => Ok(LeafSlot::Replaced {
                handle: section,
                previous,
            }),
            _ => Ok(LeafSlot::Attached(section)),
        }
    }

    /// Body content of any node, organizational or not; returns what it held.
    pub fn set_content(&mut self, handle: NodeHandle, content_ref: ContentRef) -> Option<ContentRef> {
        self.nodes[handle.0].leaf_content.replace(content_ref)
    }

    pub fn set_section_meta(&mut self, handle: NodeHandle, meta: SectionMeta) {
        self.nodes[handle.0].section_meta = Some(meta);
    }

    /// Path of `handle` built from raw positions; empty for the root.
    ///
    /// Sections end in `:pos` after their parent's path.
    pub fn path_of(&self, handle: NodeHandle) -> String {
        let node = self.node(handle);
        if node.role == NodeRole::Section {
            if let Some(parent) = node.parent {
                return format!("{}{}{}", self.path_of(parent), SECTION_DELIMITER, node.position);
            }
        }

        let mut positions = Vec::new();
        let mut current = handle;
        while let Some(parent) = self.node(current).parent {
            positions.push(self.node(current).position.to_string());
            current = parent;
        }
        positions.reverse();
        positions.join(&PATH_DELIMITER.to_string())
    }

    /// Number of path segments from the root (root is 0)
    pub fn depth_of(&self, handle: NodeHandle) -> usize {
        let mut depth = 0;
        let mut current = handle;
        while let Some(parent) = self.node(current).parent {
            depth += 1;
            current = parent;
        }
        depth
    }

    fn child_or_create(&mut self, parent: NodeHandle, pos: usize) -> NodeHandle {
        if let Some(existing) = self.nodes[parent.0].children.get(pos) {
            return *existing;
        }

        let handle = NodeHandle(self.nodes.len());
        self.nodes.push(Node::empty(Some(parent), pos));
        // pos is never 0 here: parse_path rejects zero segments and
        // append_child_slot passes a checked len + 1
        let _ = self.nodes[parent.0].children.set(pos, handle);
        handle
    }
}
