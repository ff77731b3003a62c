use std::collections::VecDeque;
use std::fmt;
use std::ops::{Index, IndexMut};

use eframe::egui::Vec2;
use serde_json::{Map, Value};

use super::input::{Side, TreeValue};
use super::metrics::NodeMetrics;

/// Stable node identifier, assigned once in breadth-first order when a tree is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeShape {
    Circle,
    Rect,
}

/// Decides which depths render as circles and which as rectangles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShapePolicy {
    pub rect_from_depth: usize,
}

impl ShapePolicy {
    pub fn shape_for(self, depth: usize) -> NodeShape {
        if depth >= self.rect_from_depth {
            NodeShape::Rect
        } else {
            NodeShape::Circle
        }
    }
}

impl Default for ShapePolicy {
    fn default() -> Self {
        Self { rect_from_depth: 2 }
    }
}

#[derive(Clone, Debug)]
pub struct TreeNode {
    pub id: NodeId,
    pub name: String,
    pub content: Option<String>,
    pub data: Option<Map<String, Value>>,
    pub side: Option<Side>,
    pub depth: usize,
    pub parent: Option<NodeId>,
    pub shape: NodeShape,
    children: Vec<NodeId>,
    expanded: bool,
    /// Simulation-space position.
    pub position: Vec2,
    pub velocity: Vec2,
    /// Fixed position while dragged; the root keeps one permanently.
    pub pinned: Option<Vec2>,
    /// Position committed at the last visibility change.
    pub previous_position: Vec2,
    pub metrics: Option<NodeMetrics>,
}

impl TreeNode {
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            "Unnamed"
        } else {
            &self.name
        }
    }

    /// The full child set, fixed at build time.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn visible_children(&self) -> &[NodeId] {
        if self.expanded { &self.children } else { &[] }
    }

    pub fn hidden_children(&self) -> &[NodeId] {
        if self.expanded { &[] } else { &self.children }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_expanded(&self) -> bool {
        !self.visible_children().is_empty()
    }

    pub fn has_hidden_children(&self) -> bool {
        !self.hidden_children().is_empty()
    }

    pub(super) fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }

    /// Text exported as `content`: the explicit content, else the raw CSV row.
    pub fn export_content(&self) -> String {
        if let Some(content) = &self.content {
            return content.clone();
        }
        self.data
            .as_ref()
            .and_then(|data| serde_json::to_string(data).ok())
            .unwrap_or_default()
    }
}

/// Arena of every node in the loaded hierarchy, indexed by [`NodeId`].
#[derive(Clone, Debug)]
pub struct MindTree {
    nodes: Vec<TreeNode>,
    root: NodeId,
}

impl MindTree {
    /// Builds the arena with everything below the root collapsed.
    pub fn build(value: &TreeValue, policy: ShapePolicy) -> Self {
        let mut nodes: Vec<TreeNode> = Vec::with_capacity(value.node_count());
        let mut queue = VecDeque::new();
        queue.push_back((value, None::<NodeId>, 0usize));

        while let Some((record, parent, depth)) = queue.pop_front() {
            let id = NodeId(nodes.len() as u32);
            nodes.push(TreeNode {
                id,
                name: record.name.clone(),
                content: record.content.clone(),
                data: record.data.clone(),
                side: record.position,
                depth,
                parent,
                shape: policy.shape_for(depth),
                children: Vec::with_capacity(record.children.len()),
                expanded: parent.is_none(),
                position: Vec2::ZERO,
                velocity: Vec2::ZERO,
                pinned: None,
                previous_position: Vec2::ZERO,
                metrics: None,
            });

            if let Some(parent) = parent {
                nodes[parent.index()].children.push(id);
            }

            for child in &record.children {
                queue.push_back((child, Some(id), depth + 1));
            }
        }

        let root = NodeId(0);
        nodes[root.index()].pinned = Some(Vec2::ZERO);

        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    /// A node is visible when every ancestor is expanded.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let Some(mut node) = self.get(id) else {
            return false;
        };

        while let Some(parent) = node.parent {
            node = &self[parent];
            if !node.is_expanded() {
                return false;
            }
        }
        true
    }

    /// Visible nodes in breadth-first order starting at the root.
    pub fn visible_nodes(&self) -> Vec<NodeId> {
        let mut visible = Vec::new();
        let mut queue = VecDeque::from([self.root]);
        while let Some(id) = queue.pop_front() {
            visible.push(id);
            queue.extend(self[id].visible_children().iter().copied());
        }
        visible
    }

    /// One `(parent, child)` pair per visible non-root node.
    pub fn visible_edges(&self) -> Vec<(NodeId, NodeId)> {
        self.visible_nodes()
            .into_iter()
            .filter_map(|id| self[id].parent.map(|parent| (parent, id)))
            .collect()
    }

    pub fn siblings(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.get(id)
            .and_then(|node| node.parent)
            .map(|parent| self[parent].children())
            .unwrap_or(&[])
            .iter()
            .copied()
            .filter(move |&sibling| sibling != id)
    }

    /// Every descendant of `id`, visible or not.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = self[id].children().to_vec();
        while let Some(next) = stack.pop() {
            found.push(next);
            stack.extend(self[next].children().iter().copied());
        }
        found
    }

    /// Rebuilds the input hierarchy this arena was built from, without layout state.
    pub fn to_value(&self) -> TreeValue {
        self.value_at(self.root)
    }

    fn value_at(&self, id: NodeId) -> TreeValue {
        let node = &self[id];
        TreeValue {
            name: node.name.clone(),
            content: node.content.clone(),
            children: node
                .children()
                .iter()
                .map(|&child| self.value_at(child))
                .collect(),
            position: node.side,
            data: node.data.clone(),
        }
    }
}

impl Index<NodeId> for MindTree {
    type Output = TreeNode;

    fn index(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.index()]
    }
}

impl IndexMut<NodeId> for MindTree {
    fn index_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.index()]
    }
}
