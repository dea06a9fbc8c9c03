use std::collections::HashMap;

use crate::types::checklist::ChecklistItem;

/// Index of a node inside a [`ChecklistTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Clone, Debug)]
pub struct Node {
    pub item: ChecklistItem,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Explicit parent/child view of a flat indented checklist.
///
/// Nodes live in one arena in list order. The flat list remains the source of
/// truth; [`ChecklistTree::flatten`] turns the tree back into one.
#[derive(Clone, Debug, Default)]
pub struct ChecklistTree {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    by_id: HashMap<String, NodeId>,
}

impl ChecklistTree {
    pub fn from_items(items: &[ChecklistItem]) -> Self {
        let mut tree = Self::default();
        // (indent, node) for the chain of open ancestors
        let mut stack: Vec<(u32, NodeId)> = Vec::new();

        for item in items {
            while stack.last().is_some_and(|&(indent, _)| indent >= item.indent) {
                stack.pop();
            }
            let id = NodeId(tree.nodes.len());
            let parent = stack.last().map(|&(_, parent)| parent);
            match parent {
                Some(parent) => tree.nodes[parent.0].children.push(id),
                None => tree.roots.push(id),
            }
            tree.by_id.entry(item.id.clone()).or_insert(id);
            tree.nodes.push(Node {
                item: item.clone(),
                parent,
                children: Vec::new(),
            });
            stack.push((item.indent, id));
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(node.0)
    }

    /// First node carrying `id`.
    pub fn find(&self, id: &str) -> Option<NodeId> {
        self.by_id.get(id).copied()
    }

    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).and_then(|n| n.parent)
    }

    pub fn children_of(&self, node: NodeId) -> &[NodeId] {
        self.get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn depth(&self, node: NodeId) -> usize {
        std::iter::successors(self.parent_of(node), |&p| self.parent_of(p)).count()
    }

    /// Depth-first list in the original order with indents set to tree depth.
    /// Orphans come back as top-level items.
    pub fn flatten(&self) -> Vec<ChecklistItem> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut pending: Vec<(NodeId, u32)> = self.roots.iter().rev().map(|&r| (r, 0)).collect();
        while let Some((node, depth)) = pending.pop() {
            let n = &self.nodes[node.0];
            let mut item = n.item.clone();
            item.indent = depth;
            out.push(item);
            pending.extend(n.children.iter().rev().map(|&c| (c, depth + 1)));
        }
        out
    }
}
