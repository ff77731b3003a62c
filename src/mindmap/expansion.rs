use anyhow::{Result, anyhow};
use log::debug;

use super::tree::{MindTree, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpansionState {
    Leaf,
    Collapsed,
    Expanded,
}

/// What a click changed in the visibility partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    Unchanged,
    Expanded {
        node: NodeId,
        revealed: Vec<NodeId>,
        /// Nodes that disappeared because an expanded sibling was auto-collapsed.
        hidden: Vec<NodeId>,
    },
    Collapsed {
        node: NodeId,
        hidden: Vec<NodeId>,
    },
}

impl ToggleOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }

    pub fn hidden(&self) -> &[NodeId] {
        match self {
            Self::Unchanged => &[],
            Self::Expanded { hidden, .. } | Self::Collapsed { hidden, .. } => hidden,
        }
    }

    pub fn revealed(&self) -> &[NodeId] {
        match self {
            Self::Expanded { revealed, .. } => revealed,
            _ => &[],
        }
    }
}

impl MindTree {
    pub fn expansion_state(&self, id: NodeId) -> Option<ExpansionState> {
        let node = self.get(id)?;
        Some(if node.is_leaf() {
            ExpansionState::Leaf
        } else if node.is_expanded() {
            ExpansionState::Expanded
        } else {
            ExpansionState::Collapsed
        })
    }

    /// Collapses `id` and its whole subtree, returning the nodes that were visible below it.
    pub fn collapse(&mut self, id: NodeId) -> Vec<NodeId> {
        let mut hidden = Vec::new();
        let mut stack = self[id].visible_children().to_vec();
        while let Some(next) = stack.pop() {
            hidden.push(next);
            stack.extend(self[next].visible_children().iter().copied());
        }

        self[id].set_expanded(false);
        for descendant in self.descendants(id) {
            self[descendant].set_expanded(false);
        }

        hidden
    }

    /// Applies a click on `id`: collapse when expanded, expand one level when collapsed.
    ///
    /// Expanding first collapses every expanded sibling, so a parent never shows more
    /// than one open branch. Leaves and nodes that are not currently visible are left
    /// alone.
    pub fn toggle(&mut self, id: NodeId) -> Result<ToggleOutcome> {
        let state = self
            .expansion_state(id)
            .ok_or_else(|| anyhow!("unknown node {id}"))?;

        if !self.is_visible(id) {
            debug!("ignoring toggle of hidden {id}");
            return Ok(ToggleOutcome::Unchanged);
        }

        let outcome = match state {
            ExpansionState::Leaf => ToggleOutcome::Unchanged,
            ExpansionState::Expanded => {
                let hidden = self.collapse(id);
                ToggleOutcome::Collapsed { node: id, hidden }
            }
            ExpansionState::Collapsed => {
                let open_siblings = self
                    .siblings(id)
                    .filter(|&sibling| self[sibling].is_expanded())
                    .collect::<Vec<_>>();
                let mut hidden = Vec::new();
                for sibling in open_siblings {
                    hidden.extend(self.collapse(sibling));
                }

                self[id].set_expanded(true);
                ToggleOutcome::Expanded {
                    node: id,
                    revealed: self[id].visible_children().to_vec(),
                    hidden,
                }
            }
        };

        debug!(
            "toggle {id}: {state:?} -> revealed {}, hidden {}",
            outcome.revealed().len(),
            outcome.hidden().len()
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::mindmap::input::TreeValue;
    use crate::mindmap::tree::ShapePolicy;
    use crate::mindmap::tree::tests::{find, sample_value};

    fn build(value: &TreeValue) -> MindTree {
        MindTree::build(value, ShapePolicy::default())
    }

    fn assert_partition_invariants(tree: &MindTree) {
        for node in tree.nodes() {
            let visible = node.visible_children().iter().collect::<HashSet<_>>();
            let hidden = node.hidden_children().iter().collect::<HashSet<_>>();
            assert!(visible.is_disjoint(&hidden));
            let union = visible.union(&hidden).copied().collect::<HashSet<_>>();
            let all = node.children().iter().collect::<HashSet<_>>();
            assert_eq!(union, all);

            let open = node
                .visible_children()
                .iter()
                .filter(|&&child| tree[child].is_expanded())
                .count();
            assert!(open <= 1, "{} has {open} expanded children", node.id);
        }
    }

    #[test]
    fn leaves_are_no_ops() {
        let value = TreeValue::with_children(
            "Root",
            vec![TreeValue::leaf("A"), TreeValue::leaf("B")],
        );
        let mut tree = build(&value);
        let a = find(&tree, "A");
        assert_eq!(tree.expansion_state(a), Some(ExpansionState::Leaf));
        assert_eq!(tree.toggle(a).unwrap(), ToggleOutcome::Unchanged);
        assert_eq!(tree.visible_nodes().len(), 3);
    }

    #[test]
    fn expanding_a_sibling_collapses_the_open_one() {
        let value = TreeValue::with_children(
            "Root",
            vec![
                TreeValue::with_children("A", vec![TreeValue::leaf("A1")]),
                TreeValue::with_children("B", vec![TreeValue::leaf("B1")]),
            ],
        );
        let mut tree = build(&value);
        let (a, b, a1, b1) = (
            find(&tree, "A"),
            find(&tree, "B"),
            find(&tree, "A1"),
            find(&tree, "B1"),
        );

        let outcome = tree.toggle(a).unwrap();
        assert_eq!(outcome.revealed(), &[a1]);
        assert!(tree.is_visible(a1));

        let outcome = tree.toggle(b).unwrap();
        assert_eq!(
            outcome,
            ToggleOutcome::Expanded {
                node: b,
                revealed: vec![b1],
                hidden: vec![a1],
            }
        );
        assert_eq!(tree.expansion_state(a), Some(ExpansionState::Collapsed));
        assert!(!tree.is_visible(a1));
        assert!(tree.is_visible(b1));
    }

    #[test]
    fn collapse_is_recursive() {
        let mut tree = build(&sample_value());
        let (a, a1, a1a) = (find(&tree, "A"), find(&tree, "A1"), find(&tree, "A1a"));
        tree.toggle(a).unwrap();
        tree.toggle(a1).unwrap();
        assert!(tree.is_visible(a1a));

        let outcome = tree.toggle(a).unwrap();
        let hidden = outcome.hidden().iter().copied().collect::<HashSet<_>>();
        assert_eq!(hidden.len(), 3);
        assert!(hidden.contains(&a1a));
        for descendant in tree.descendants(a) {
            assert!(tree[descendant].visible_children().is_empty());
        }

        tree.toggle(a).unwrap();
        assert_eq!(tree.expansion_state(a1), Some(ExpansionState::Collapsed));
        assert!(!tree.is_visible(a1a));
    }

    #[test]
    fn expanding_reveals_one_level_only() {
        let mut tree = build(&sample_value());
        let a = find(&tree, "A");
        tree.toggle(a).unwrap();
        assert!(tree.is_visible(find(&tree, "A1")));
        assert!(!tree.is_visible(find(&tree, "A1a")));
    }

    #[test]
    fn root_can_collapse_and_reopen() {
        let mut tree = build(&sample_value());
        let root = tree.root();
        tree.toggle(find(&tree, "B")).unwrap();
        let outcome = tree.toggle(root).unwrap();
        assert_eq!(outcome.hidden().len(), 4);
        assert_eq!(tree.visible_nodes(), vec![root]);

        tree.toggle(root).unwrap();
        assert_eq!(tree.visible_nodes().len(), 4);
    }

    #[test]
    fn hidden_and_unknown_nodes() {
        let mut tree = build(&sample_value());
        let a1 = find(&tree, "A1");
        assert_eq!(tree.toggle(a1).unwrap(), ToggleOutcome::Unchanged);
        assert!(tree.toggle(NodeId(500)).is_err());
    }

    #[test]
    fn invariants_hold_across_click_sequences() {
        let mut tree = build(&sample_value());
        let mut seed = 0x2545_f491_u32;
        for _ in 0..400 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let id = NodeId((seed >> 16) % tree.len() as u32);
            tree.toggle(id).unwrap();
            assert_partition_invariants(&tree);

            for node in tree.nodes() {
                if node.parent.is_some_and(|parent| !tree[parent].is_expanded()) {
                    assert!(!node.is_expanded(), "hidden {} is still open", node.id);
                }
            }
        }
    }
}
