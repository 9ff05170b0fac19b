//! # Replay
//!
//! Applies a node change-set to the tree shape of the snapshot it was computed
//! from. The order is the canonical one of [`MutationInfo`] consumers:
//!
//! 1. Detach every Removed entry and every Mutated entry whose parent or index
//!    changed, per previous parent by descending `prev_index`, so indices not
//!    yet processed never shift.
//! 2. Attach every Added entry and every moved Mutated entry, per current
//!    parent by ascending `cur_index`.
//!
//! Nodes without an entry, and content-only Mutated entries, keep their
//! position throughout. For `info = compare(a, b)`,
//! `replay_layout(&a, info.nodes()) == b.layout()`.
//!
//! [`MutationInfo`]: crate::mutation_info::MutationInfo

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::document::{Document, Layout, Placement};
use crate::mutation_info::{ChangeSet, ChangeType};
use crate::node::{Node, NodeId};

/// Tree shape of `prev` after replaying `nodes`
pub fn replay_layout(prev: &Document, nodes: &ChangeSet<Arc<Node>>) -> Layout {
    let mut children: HashMap<NodeId, Vec<NodeId>> = prev
        .nodes()
        .map(|n| (n.id(), prev.children(n.id()).to_vec()))
        .collect();
    let mut root = Some(prev.root_id());

    let mut detach: Vec<(NodeId, usize, NodeId)> = Vec::new();
    let mut attach: Vec<(NodeId, usize, NodeId)> = Vec::new();
    let mut removed = HashSet::new();

    for change in nodes {
        let id = change.key();
        let leaves = change.kind == ChangeType::Removed || change.is_moved();
        let arrives = change.kind == ChangeType::Added || change.is_moved();

        if leaves {
            match (change.prev_parent_id(), change.prev_index) {
                (Some(parent), Some(index)) => detach.push((parent, index, id)),
                _ => root = None,
            }
        }
        if arrives {
            match (change.cur_parent_id(), change.cur_index) {
                (Some(parent), Some(index)) => attach.push((parent, index, id)),
                _ => root = Some(id),
            }
        }
        if change.kind == ChangeType::Removed {
            removed.insert(id);
        }
    }

    detach.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
    for (parent, index, id) in detach {
        if let Some(siblings) = children.get_mut(&parent) {
            match siblings.get(index) {
                Some(at) if *at == id => {
                    siblings.remove(index);
                }
                _ => siblings.retain(|c| *c != id),
            }
        }
    }
    for id in &removed {
        children.remove(id);
    }

    attach.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    for (parent, index, id) in attach {
        let siblings = children.entry(parent).or_default();
        siblings.insert(index.min(siblings.len()), id);
        children.entry(id).or_default();
    }

    let mut layout = Layout::new();
    let Some(root) = root else {
        return layout;
    };
    layout.insert(root, Placement { parent: None, index: 0 });
    let mut stack = vec![root];
    while let Some(parent) = stack.pop() {
        for (index, child) in children.get(&parent).into_iter().flatten().enumerate() {
            layout.insert(*child, Placement { parent: Some(parent), index });
            stack.push(*child);
        }
    }
    layout
}
