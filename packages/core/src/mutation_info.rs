//! # Mutation Info
//!
//! [`MutationInfo::compare`] reports the structural difference between two
//! document snapshots as four ordered change-sets: nodes, properties, local
//! connectors and connections.
//!
//! ## Matching
//!
//! Entities are matched by identity only: nodes by [`NodeId`], properties and
//! connectors by metadata id within a matched node pair, connections by their
//! endpoint tuple. Both snapshots are indexed once (id → node, parent, index)
//! so the whole pass is linear in the size of the two documents.
//!
//! ## Change kinds
//!
//! | present in      | kind      | positional fields                      |
//! |-----------------|-----------|----------------------------------------|
//! | `cur` only      | `Added`   | `cur_parent`, `cur_index`              |
//! | `prev` only     | `Removed` | `prev_parent`, `prev_index`            |
//! | both, changed   | `Mutated` | all four, even for pure moves          |
//!
//! A node pair that kept its content, parent and index is not reported.
//! Moves (reparenting, reordering) are Mutated entries whose parent or index
//! fields differ.
//!
//! ## Order
//!
//! Entries are sorted by (scope, index, kind, key): scope is the parent node
//! (the owning node for properties and connectors, none for connections),
//! index is `cur_index` when defined and `prev_index` otherwise, and kinds
//! rank Removed < Added < Mutated. See [`crate::replay`] for the replay order
//! this supports.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use nodegraph_common::Identifier;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connection::Connection;
use crate::document::{Document, Placement};
use crate::metadata::ConnectorMetadata;
use crate::node::{Node, NodeId};
use crate::property::Property;
use crate::visitor::{walk_node, Visitor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    Added,
    Removed,
    Mutated,
}

impl ChangeType {
    /// Tie-break rank at equal scope and index
    fn rank(self) -> u8 {
        match self {
            ChangeType::Removed => 0,
            ChangeType::Added => 1,
            ChangeType::Mutated => 2,
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            ChangeType::Added => ChangeType::Removed,
            ChangeType::Removed => ChangeType::Added,
            ChangeType::Mutated => ChangeType::Mutated,
        }
    }
}

/// Something that can be matched across snapshots by a stable key
pub trait Entity {
    type Key: Copy + Ord + Hash + Debug;

    fn key(&self) -> Self::Key;
}

impl Entity for Node {
    type Key = NodeId;

    fn key(&self) -> NodeId {
        self.id()
    }
}

impl Entity for Property {
    type Key = Identifier;

    fn key(&self) -> Identifier {
        self.id()
    }
}

impl Entity for ConnectorMetadata {
    type Key = Identifier;

    fn key(&self) -> Identifier {
        self.id()
    }
}

impl Entity for Connection {
    type Key = Connection;

    fn key(&self) -> Connection {
        *self
    }
}

impl<E: Entity> Entity for Arc<E> {
    type Key = E::Key;

    fn key(&self) -> E::Key {
        (**self).key()
    }
}

/// One entry of a change-set
///
/// `prev_parent`/`cur_parent` hold the parent node for node changes and the
/// owning node for property and connector changes; connection changes have
/// none. A `None` index means the entity is absent on that side.
#[derive(Debug, Clone)]
pub struct Change<T> {
    pub prev: Option<T>,
    pub cur: Option<T>,
    pub kind: ChangeType,
    pub prev_parent: Option<Arc<Node>>,
    pub cur_parent: Option<Arc<Node>>,
    pub prev_index: Option<usize>,
    pub cur_index: Option<usize>,
}

impl<T: Entity> Change<T> {
    pub fn added(cur: T, cur_parent: Option<Arc<Node>>, cur_index: usize) -> Self {
        Self {
            prev: None,
            cur: Some(cur),
            kind: ChangeType::Added,
            prev_parent: None,
            cur_parent,
            prev_index: None,
            cur_index: Some(cur_index),
        }
    }

    pub fn removed(prev: T, prev_parent: Option<Arc<Node>>, prev_index: usize) -> Self {
        Self {
            prev: Some(prev),
            cur: None,
            kind: ChangeType::Removed,
            prev_parent,
            cur_parent: None,
            prev_index: Some(prev_index),
            cur_index: None,
        }
    }

    pub fn mutated(
        prev: T,
        cur: T,
        (prev_parent, prev_index): (Option<Arc<Node>>, usize),
        (cur_parent, cur_index): (Option<Arc<Node>>, usize),
    ) -> Self {
        Self {
            prev: Some(prev),
            cur: Some(cur),
            kind: ChangeType::Mutated,
            prev_parent,
            cur_parent,
            prev_index: Some(prev_index),
            cur_index: Some(cur_index),
        }
    }

    /// The entity this change is about, preferring the current side
    pub fn entity(&self) -> &T {
        match (&self.cur, &self.prev) {
            (Some(cur), _) => cur,
            (None, Some(prev)) => prev,
            (None, None) => unreachable!("change entry without an entity"),
        }
    }

    pub fn key(&self) -> T::Key {
        self.entity().key()
    }

    pub fn prev_parent_id(&self) -> Option<NodeId> {
        self.prev_parent.as_ref().map(|n| n.id())
    }

    pub fn cur_parent_id(&self) -> Option<NodeId> {
        self.cur_parent.as_ref().map(|n| n.id())
    }

    /// Parent (or owner) the entry is ordered under
    pub fn scope(&self) -> Option<NodeId> {
        match self.kind {
            ChangeType::Removed => self.prev_parent_id(),
            ChangeType::Added | ChangeType::Mutated => self.cur_parent_id(),
        }
    }

    /// Index the entry is ordered by
    pub fn index(&self) -> Option<usize> {
        self.cur_index.or(self.prev_index)
    }

    /// Whether a Mutated entry changed parent or position
    pub fn is_moved(&self) -> bool {
        self.kind == ChangeType::Mutated
            && (self.prev_parent_id() != self.cur_parent_id() || self.prev_index != self.cur_index)
    }

    fn sort_key(&self) -> (Option<NodeId>, Option<usize>, u8, T::Key) {
        (self.scope(), self.index(), self.kind.rank(), self.key())
    }
}

impl<T: Clone> Change<T> {
    /// The entry `compare(cur, prev)` reports for the same entity
    pub fn inverse(&self) -> Self {
        Self {
            prev: self.cur.clone(),
            cur: self.prev.clone(),
            kind: self.kind.inverse(),
            prev_parent: self.cur_parent.clone(),
            cur_parent: self.prev_parent.clone(),
            prev_index: self.cur_index,
            cur_index: self.prev_index,
        }
    }
}

/// Ordered, immutable collection of changes to one kind of entity
#[derive(Debug, Clone)]
pub struct ChangeSet<T> {
    changes: Vec<Change<T>>,
}

impl<T> Default for ChangeSet<T> {
    fn default() -> Self {
        Self { changes: Vec::new() }
    }
}

impl<T: Entity> ChangeSet<T> {
    pub fn new(mut changes: Vec<Change<T>>) -> Self {
        changes.sort_by_key(|c| c.sort_key());
        Self { changes }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change<T>> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn contains(&self, key: T::Key) -> bool {
        self.find(key).is_some()
    }

    /// First entry for `key`; property and connector keys repeat across owners,
    /// see [`find_in`](Self::find_in)
    pub fn find(&self, key: T::Key) -> Option<&Change<T>> {
        self.changes.iter().find(|c| c.key() == key)
    }

    /// Entry for `key` under the parent or owning node `scope`
    pub fn find_in(&self, scope: NodeId, key: T::Key) -> Option<&Change<T>> {
        self.changes
            .iter()
            .find(|c| c.key() == key && (c.prev_parent_id() == Some(scope) || c.cur_parent_id() == Some(scope)))
    }

    pub fn added(&self) -> impl Iterator<Item = &Change<T>> + '_ {
        self.of_kind(ChangeType::Added)
    }

    pub fn removed(&self) -> impl Iterator<Item = &Change<T>> + '_ {
        self.of_kind(ChangeType::Removed)
    }

    pub fn mutated(&self) -> impl Iterator<Item = &Change<T>> + '_ {
        self.of_kind(ChangeType::Mutated)
    }

    fn of_kind(&self, kind: ChangeType) -> impl Iterator<Item = &Change<T>> + '_ {
        self.changes.iter().filter(move |c| c.kind == kind)
    }
}

impl<'a, T> IntoIterator for &'a ChangeSet<T> {
    type Item = &'a Change<T>;
    type IntoIter = std::slice::Iter<'a, Change<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// The difference between two document snapshots
#[derive(Debug, Clone)]
pub struct MutationInfo {
    nodes: ChangeSet<Arc<Node>>,
    properties: ChangeSet<Arc<Property>>,
    connectors: ChangeSet<Arc<ConnectorMetadata>>,
    connections: ChangeSet<Connection>,
    prev: Arc<Document>,
    cur: Arc<Document>,
}

impl MutationInfo {
    /// Compare two snapshots. Pure and deterministic; both documents are
    /// assumed to be internally consistent.
    pub fn compare(prev: Arc<Document>, cur: Arc<Document>) -> Self {
        let mut diff = Diff::default();

        if !Arc::ptr_eq(&prev, &cur) {
            let prev_index = NodeIndex::build(&prev);
            let cur_index = NodeIndex::build(&cur);
            diff.nodes(&prev_index, &cur_index);
            diff.connections(&prev, &cur);
        }

        let info = Self {
            nodes: ChangeSet::new(diff.nodes),
            properties: ChangeSet::new(diff.properties),
            connectors: ChangeSet::new(diff.connectors),
            connections: ChangeSet::new(diff.connections),
            prev,
            cur,
        };
        debug!(
            nodes = info.nodes.len(),
            properties = info.properties.len(),
            connectors = info.connectors.len(),
            connections = info.connections.len(),
            "Compared documents"
        );
        info
    }

    pub fn nodes(&self) -> &ChangeSet<Arc<Node>> {
        &self.nodes
    }

    pub fn properties(&self) -> &ChangeSet<Arc<Property>> {
        &self.properties
    }

    pub fn connectors(&self) -> &ChangeSet<Arc<ConnectorMetadata>> {
        &self.connectors
    }

    pub fn connections(&self) -> &ChangeSet<Connection> {
        &self.connections
    }

    pub fn prev(&self) -> &Arc<Document> {
        &self.prev
    }

    pub fn cur(&self) -> &Arc<Document> {
        &self.cur
    }

    /// No change in any of the four sets
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.properties.is_empty() && self.connectors.is_empty() && self.connections.is_empty()
    }
}

struct Indexed {
    node: Arc<Node>,
    parent: Option<Arc<Node>>,
    index: usize,
}

/// Identity index of one snapshot, in pre-order
#[derive(Default)]
struct NodeIndex {
    order: Vec<NodeId>,
    entries: HashMap<NodeId, Indexed>,
}

impl NodeIndex {
    fn build(document: &Document) -> Self {
        let mut index = Self::default();
        index.visit_document(document);
        index
    }
}

impl Visitor for NodeIndex {
    fn visit_node(&mut self, document: &Document, node: &Arc<Node>, placement: Placement) {
        let parent = placement.parent.and_then(|p| document.node(p).cloned());
        self.order.push(node.id());
        self.entries.insert(
            node.id(),
            Indexed {
                node: node.clone(),
                parent,
                index: placement.index,
            },
        );
        walk_node(self, document, node);
    }
}

#[derive(Default)]
struct Diff {
    nodes: Vec<Change<Arc<Node>>>,
    properties: Vec<Change<Arc<Property>>>,
    connectors: Vec<Change<Arc<ConnectorMetadata>>>,
    connections: Vec<Change<Connection>>,
}

impl Diff {
    fn nodes(&mut self, prev: &NodeIndex, cur: &NodeIndex) {
        for id in &cur.order {
            let after = &cur.entries[id];
            match prev.entries.get(id) {
                None => {
                    self.nodes
                        .push(Change::added(after.node.clone(), after.parent.clone(), after.index));
                    self.owned_entities(&after.node, ChangeType::Added);
                }
                Some(before) => self.matched(before, after),
            }
        }

        for id in &prev.order {
            if !cur.entries.contains_key(id) {
                let before = &prev.entries[id];
                self.nodes
                    .push(Change::removed(before.node.clone(), before.parent.clone(), before.index));
                self.owned_entities(&before.node, ChangeType::Removed);
            }
        }
    }

    fn matched(&mut self, before: &Indexed, after: &Indexed) {
        let content_changed = !Arc::ptr_eq(&before.node, &after.node) && before.node.content_differs(&after.node);
        let parent_id = |entry: &Indexed| entry.parent.as_ref().map(|p| p.id());
        let moved = parent_id(before) != parent_id(after) || before.index != after.index;

        if !content_changed && !moved {
            return;
        }

        self.nodes.push(Change::mutated(
            before.node.clone(),
            after.node.clone(),
            (before.parent.clone(), before.index),
            (after.parent.clone(), after.index),
        ));

        if content_changed {
            self.properties_of(&before.node, &after.node);
            self.connectors_of(&before.node, &after.node);
        }
    }

    /// Report every property and local connector of an added or removed node
    fn owned_entities(&mut self, node: &Arc<Node>, kind: ChangeType) {
        let owner = Some(node.clone());
        for (index, property) in node.properties().enumerate() {
            self.properties.push(match kind {
                ChangeType::Added => Change::added(property.clone(), owner.clone(), index),
                _ => Change::removed(property.clone(), owner.clone(), index),
            });
        }
        for (index, connector) in node.local_connectors().iter().enumerate() {
            self.connectors.push(match kind {
                ChangeType::Added => Change::added(connector.clone(), owner.clone(), index),
                _ => Change::removed(connector.clone(), owner.clone(), index),
            });
        }
    }

    fn properties_of(&mut self, before: &Arc<Node>, after: &Arc<Node>) {
        for (cur_index, property) in after.properties().enumerate() {
            match before.property(property.id()) {
                None => self
                    .properties
                    .push(Change::added(property.clone(), Some(after.clone()), cur_index)),
                Some(old) if !Arc::ptr_eq(old, property) && **old != **property => {
                    let prev_index = before.property_index(property.id()).unwrap_or(cur_index);
                    self.properties.push(Change::mutated(
                        old.clone(),
                        property.clone(),
                        (Some(before.clone()), prev_index),
                        (Some(after.clone()), cur_index),
                    ));
                }
                Some(_) => {}
            }
        }

        for (prev_index, property) in before.properties().enumerate() {
            if after.property(property.id()).is_none() {
                self.properties
                    .push(Change::removed(property.clone(), Some(before.clone()), prev_index));
            }
        }
    }

    fn connectors_of(&mut self, before: &Arc<Node>, after: &Arc<Node>) {
        let position = |node: &Node, id: Identifier| node.local_connectors().iter().position(|c| c.id() == id);

        for (cur_index, connector) in after.local_connectors().iter().enumerate() {
            match position(before, connector.id()) {
                None => self
                    .connectors
                    .push(Change::added(connector.clone(), Some(after.clone()), cur_index)),
                Some(prev_index) => {
                    let old = &before.local_connectors()[prev_index];
                    if !Arc::ptr_eq(old, connector) && **old != **connector {
                        self.connectors.push(Change::mutated(
                            old.clone(),
                            connector.clone(),
                            (Some(before.clone()), prev_index),
                            (Some(after.clone()), cur_index),
                        ));
                    }
                }
            }
        }

        for (prev_index, connector) in before.local_connectors().iter().enumerate() {
            if position(after, connector.id()).is_none() {
                self.connectors
                    .push(Change::removed(connector.clone(), Some(before.clone()), prev_index));
            }
        }
    }

    fn connections(&mut self, prev: &Document, cur: &Document) {
        for (index, connection) in cur.connections().enumerate() {
            if !prev.has_connection(connection) {
                self.connections.push(Change::added(*connection, None, index));
            }
        }
        for (index, connection) in prev.connections().enumerate() {
            if !cur.has_connection(connection) {
                self.connections.push(Change::removed(*connection, None, index));
            }
        }
    }
}
