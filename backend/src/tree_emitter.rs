//! Lazy, depth-first stream of structural facts over a finished tree
//!
//! Holes are invisible here: ordinals count filled slots only, so children at
//! raw positions 1 and 3 come out as ordinals 1 and 2. A node's organizational
//! children come first, then its sections, each sequence numbered on its own.

use std::collections::VecDeque;

use serde::Serialize;

use crate::path_tree::{NodeHandle, NodeRole, PathTree};
use crate::types::{ContentRef, HeadingDescriptor, SectionMeta};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "fact", rename_all = "snake_case")]
pub enum StructuralFact<'a> {
    NodeDeclared {
        handle: NodeHandle,
        path: String,
        role: NodeRole,
        descriptor: &'a HeadingDescriptor,
        #[serde(skip_serializing_if = "Option::is_none")]
        meta: Option<&'a SectionMeta>,
    },
    ChildOf {
        parent: NodeHandle,
        child: NodeHandle,
        ordinal: usize,
    },
    LeafAttached {
        parent: NodeHandle,
        child: NodeHandle,
        content_ref: &'a ContentRef,
        ordinal: usize,
    },
    /// Only for nodes with more than one filled child
    SiblingSequence {
        parent: NodeHandle,
        ordered_children: Vec<NodeHandle>,
    },
    /// Only for nodes with more than one filled section
    SectionSequence {
        parent: NodeHandle,
        ordered_sections: Vec<NodeHandle>,
    },
}

enum Step {
    Enter {
        handle: NodeHandle,
        parent: Option<NodeHandle>,
        ordinal: usize,
    },
    Exit(NodeHandle),
}

/// Iterator returned by [`emit`]
pub struct Facts<'a> {
    tree: &'a PathTree,
    stack: Vec<Step>,
    pending: VecDeque<StructuralFact<'a>>,
}

/// Walk `tree` in path order. Call again for a fresh traversal.
pub fn emit(tree: &PathTree) -> Facts<'_> {
    Facts {
        tree,
        stack: vec![Step::Enter {
            handle: tree.root(),
            parent: None,
            ordinal: 0,
        }],
        pending: VecDeque::new(),
    }
}

impl<'a> Facts<'a> {
    fn enter(&mut self, handle: NodeHandle, parent: Option<NodeHandle>, ordinal: usize) {
        let tree = self.tree;
        let node = tree.node(handle);

        self.pending.push_back(StructuralFact::NodeDeclared {
            handle,
            path: tree.path_of(handle),
            role: node.role,
            descriptor: &node.descriptor,
            meta: node.section_meta.as_ref(),
        });

        if let Some(parent) = parent {
            self.pending.push_back(StructuralFact::ChildOf {
                parent,
                child: handle,
                ordinal,
            });
            if let Some(content_ref) = &node.leaf_content {
                self.pending.push_back(StructuralFact::LeafAttached {
                    parent,
                    child: handle,
                    content_ref,
                    ordinal,
                });
            }
        }

        self.stack.push(Step::Exit(handle));

        // pushed in reverse so children pop first, then sections
        for seq in [&node.sections, &node.children] {
            let handles: Vec<NodeHandle> = seq.filled().map(|(_, h)| *h).collect();
            for (i, child) in handles.into_iter().enumerate().rev() {
                self.stack.push(Step::Enter {
                    handle: child,
                    parent: Some(handle),
                    ordinal: i + 1,
                });
            }
        }
    }

    fn exit(&mut self, handle: NodeHandle) {
        let node = self.tree.node(handle);
        if node.children.filled_count() > 1 {
            self.pending.push_back(StructuralFact::SiblingSequence {
                parent: handle,
                ordered_children: node.children.filled().map(|(_, child)| *child).collect(),
            });
        }
        if node.sections.filled_count() > 1 {
            self.pending.push_back(StructuralFact::SectionSequence {
                parent: handle,
                ordered_sections: node.sections.filled().map(|(_, s)| *s).collect(),
            });
        }
    }
}

impl<'a> Iterator for Facts<'a> {
    type Item = StructuralFact<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(fact) = self.pending.pop_front() {
                return Some(fact);
            }
            match self.stack.pop()? {
                Step::Enter {
                    handle,
                    parent,
                    ordinal,
                } => self.enter(handle, parent, ordinal),
                Step::Exit(handle) => self.exit(handle),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_hole() -> PathTree {
        let mut tree = PathTree::new(HeadingDescriptor::title_only("Code"));
        let part = tree.get_or_create("1").unwrap();
        tree.set_header(part, HeadingDescriptor::title_only("Part"));
        tree.attach_leaf(part, 1, ContentRef::new("s1.xml")).unwrap();
        tree.attach_leaf(part, 3, ContentRef::new("s3.xml")).unwrap();
        tree
    }

    #[test]
    fn test_hole_suppression() {
        let tree = tree_with_hole();
        let part = tree.find("1").unwrap();

        let sequences: Vec<_> = emit(&tree)
            .filter_map(|fact| match fact {
                StructuralFact::SectionSequence {
                    parent,
                    ordered_sections,
                } => Some((parent, ordered_sections)),
                _ => None,
            })
            .collect();
        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].0, part);
        assert_eq!(sequences[0].1.len(), 2);

        let ordinals: Vec<usize> = emit(&tree)
            .filter_map(|fact| match fact {
                StructuralFact::LeafAttached { ordinal, .. } => Some(ordinal),
                _ => None,
            })
            .collect();
        assert_eq!(ordinals, vec![1, 2]);
    }

    #[test]
    fn test_preorder_and_restart() {
        let tree = tree_with_hole();
        let paths: Vec<String> = emit(&tree)
            .filter_map(|fact| match fact {
                StructuralFact::NodeDeclared { path, .. } => Some(path),
                _ => None,
            })
            .collect();
        assert_eq!(paths, vec!["", "1", "1:1", "1:3"]);

        assert_eq!(emit(&tree).count(), emit(&tree).count());
    }

    #[test]
    fn test_sequence_follows_subtree() {
        let tree = tree_with_hole();
        let facts: Vec<_> = emit(&tree).collect();
        assert!(matches!(facts.last(), Some(StructuralFact::SectionSequence { .. })));
        // a single child gets no sequence
        let root_sequences = facts
            .iter()
            .filter(|f| matches!(f, StructuralFact::SiblingSequence { parent, .. } if *parent == tree.root()))
            .count();
        assert_eq!(root_sequences, 0);
    }

    #[test]
    fn test_children_before_sections() {
        let mut tree = tree_with_hole();
        let part = tree.find("1").unwrap();
        let article = tree.get_or_create("1.1").unwrap();
        tree.set_header(article, HeadingDescriptor::title_only("Article"));

        let paths: Vec<String> = emit(&tree)
            .filter_map(|fact| match fact {
                StructuralFact::NodeDeclared { path, .. } => Some(path),
                _ => None,
            })
            .collect();
        assert_eq!(paths, vec!["", "1", "1.1", "1:1", "1:3"]);

        // the article and the first section both have ordinal 1 under the part
        let ordinals: Vec<(NodeHandle, usize)> = emit(&tree)
            .filter_map(|fact| match fact {
                StructuralFact::ChildOf { parent, child, ordinal } if parent == part => {
                    Some((child, ordinal))
                }
                _ => None,
            })
            .collect();
        assert_eq!(ordinals.len(), 3);
        assert_eq!(ordinals[0], (article, 1));
        assert_eq!(ordinals[1].1, 1);
        assert_eq!(ordinals[2].1, 2);
    }
}
