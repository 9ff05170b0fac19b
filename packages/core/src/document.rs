//! # Documents
//!
//! A document is an immutable snapshot of a node tree plus the set of
//! connections between node pins. Nodes are stored by id together with their
//! parent and ordered child list, so lookups by identity never walk the tree.
//!
//! Snapshots are derived, never edited in place:
//!
//! ```rust,ignore
//! let mut builder = document.to_builder();
//! let child = builder.insert(document.root_id(), 0, Node::new(&metadata))?;
//! builder.edit_node(child, |node| {
//!     node.set_property(hash("Title"), "child");
//! })?;
//! let next = builder.build();
//! ```
//!
//! Every builder operation checks its preconditions and reports an
//! [`EditError`] instead of producing a malformed tree, so a built document
//! always satisfies [`Document::validate`].

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use nodegraph_common::Identifier;

use crate::connection::Connection;
use crate::errors::{EditError, IntegrityError};
use crate::node::{Node, NodeBuilder, NodeId};

#[derive(Debug, Clone)]
struct Entry {
    node: Arc<Node>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Where a node sits in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    /// `None` for the root
    pub parent: Option<NodeId>,
    /// Position among the parent's children; always 0 for the root
    pub index: usize,
}

/// Placement of every node in a document, keyed by id
pub type Layout = HashMap<NodeId, Placement>;

#[derive(Debug, Clone)]
pub struct Document {
    root: NodeId,
    entries: HashMap<NodeId, Entry>,
    connections: BTreeSet<Connection>,
}

impl Document {
    /// Document holding only `root`
    pub fn new(root: Node) -> Self {
        let root_id = root.id();
        let mut entries = HashMap::new();
        entries.insert(
            root_id,
            Entry {
                node: Arc::new(root),
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            root: root_id,
            entries,
            connections: BTreeSet::new(),
        }
    }

    /// Reassemble a document from stored parts.
    ///
    /// `nodes` lists every non-root node with its parent, siblings in child
    /// order. Parents may appear after their children. The result is checked
    /// with [`validate`](Self::validate).
    pub fn from_parts(
        root: Node,
        nodes: impl IntoIterator<Item = (NodeId, Node)>,
        connections: impl IntoIterator<Item = Connection>,
    ) -> Result<Self, IntegrityError> {
        let mut document = Self::new(root);
        let mut order = Vec::new();

        for (parent, node) in nodes {
            let id = node.id();
            if document.entries.contains_key(&id) {
                return Err(IntegrityError::DuplicateNode(id));
            }
            document.entries.insert(
                id,
                Entry {
                    node: Arc::new(node),
                    parent: Some(parent),
                    children: Vec::new(),
                },
            );
            order.push((parent, id));
        }

        for (parent, id) in order {
            let entry = document
                .entries
                .get_mut(&parent)
                .ok_or(IntegrityError::MissingParent { node: id, parent })?;
            entry.children.push(id);
        }

        document.connections = connections.into_iter().collect();
        document.validate()?;
        Ok(document)
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> &Arc<Node> {
        &self.entries[&self.root].node
    }

    pub fn node(&self, id: NodeId) -> Option<&Arc<Node>> {
        self.entries.get(&id).map(|e| &e.node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Parent of `id`; `None` for the root or an unknown id
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entries.get(&id).and_then(|e| e.parent)
    }

    /// Ordered children of `id`; empty for an unknown id
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.entries.get(&id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    /// Position of `id` among its siblings (0 for the root)
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let entry = self.entries.get(&id)?;
        match entry.parent {
            None => Some(0),
            Some(parent) => self.entries[&parent].children.iter().position(|c| *c == id),
        }
    }

    pub fn placement(&self, id: NodeId) -> Option<Placement> {
        Some(Placement {
            parent: self.entries.get(&id)?.parent,
            index: self.index_of(id)?,
        })
    }

    /// Whether `ancestor` is `id` or lies on the path from `id` to the root
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Number of nodes, root included; never zero
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// All nodes in pre-order, siblings in child order
    pub fn nodes(&self) -> Preorder<'_> {
        self.descendants(self.root)
    }

    /// `id` and everything below it in pre-order
    pub fn descendants(&self, id: NodeId) -> Preorder<'_> {
        let stack = if self.contains(id) { vec![id] } else { Vec::new() };
        Preorder { document: self, stack }
    }

    /// Connections in their canonical order
    pub fn connections(&self) -> impl ExactSizeIterator<Item = &Connection> + '_ {
        self.connections.iter()
    }

    pub fn connection_set(&self) -> &BTreeSet<Connection> {
        &self.connections
    }

    pub fn has_connection(&self, connection: &Connection) -> bool {
        self.connections.contains(connection)
    }

    /// Placement of every node
    pub fn layout(&self) -> Layout {
        let mut layout = HashMap::with_capacity(self.entries.len());
        layout.insert(self.root, Placement { parent: None, index: 0 });
        for (id, entry) in &self.entries {
            for (index, child) in entry.children.iter().enumerate() {
                layout.insert(*child, Placement { parent: Some(*id), index });
            }
        }
        layout
    }

    /// Check the structural invariants: a single tree reachable from the
    /// root, consistent parent links, and connections whose endpoints exist.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        let root = self
            .entries
            .get(&self.root)
            .ok_or(IntegrityError::MissingRoot(self.root))?;
        if root.parent.is_some() {
            return Err(IntegrityError::ParentMismatch {
                node: self.root,
                recorded: root.parent,
                actual: None,
            });
        }

        let mut seen = HashSet::with_capacity(self.entries.len());
        let mut stack = vec![self.root];
        seen.insert(self.root);

        while let Some(parent) = stack.pop() {
            for child in &self.entries[&parent].children {
                let entry = self.entries.get(child).ok_or(IntegrityError::DanglingChild {
                    parent,
                    child: *child,
                })?;
                if !seen.insert(*child) {
                    return Err(IntegrityError::DuplicateNode(*child));
                }
                if entry.parent != Some(parent) {
                    return Err(IntegrityError::ParentMismatch {
                        node: *child,
                        recorded: entry.parent,
                        actual: Some(parent),
                    });
                }
                stack.push(*child);
            }
        }

        if let Some(id) = self.entries.keys().find(|id| !seen.contains(id)) {
            return Err(IntegrityError::Unreachable(*id));
        }

        for connection in &self.connections {
            let source = self.node(connection.source_node);
            let dest = self.node(connection.dest_node);
            let ok = source.is_some_and(|n| n.has_connector(connection.source_connector))
                && dest.is_some_and(|n| n.has_connector(connection.dest_connector));
            if !ok {
                return Err(IntegrityError::DanglingConnection(*connection));
            }
        }

        Ok(())
    }

    /// Alias of [`to_builder`](Self::to_builder)
    pub fn builder(&self) -> DocumentBuilder {
        self.to_builder()
    }

    pub fn to_builder(&self) -> DocumentBuilder {
        DocumentBuilder {
            document: self.clone(),
        }
    }
}

/// Pre-order iterator over a document subtree
pub struct Preorder<'a> {
    document: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a Arc<Node>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let entry = &self.document.entries[&id];
        self.stack.extend(entry.children.iter().rev());
        Some(&entry.node)
    }
}

/// Derives a new [`Document`] from an existing one.
///
/// Nodes the builder does not touch stay shared with the source snapshot.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Read access to the state being built
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Insert `node` as a child of `parent` at `index` (clamped to the child count)
    pub fn insert(&mut self, parent: NodeId, index: usize, node: Node) -> Result<NodeId, EditError> {
        let id = node.id();
        if self.document.contains(id) {
            return Err(EditError::DuplicateNode(id));
        }
        let siblings = &mut self
            .document
            .entries
            .get_mut(&parent)
            .ok_or(EditError::ParentNotFound(parent))?
            .children;
        siblings.insert(index.min(siblings.len()), id);

        self.document.entries.insert(
            id,
            Entry {
                node: Arc::new(node),
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Remove `id` with its whole subtree and every connection touching it
    pub fn remove(&mut self, id: NodeId) -> Result<Arc<Node>, EditError> {
        self.detach(id)?;

        let removed: Vec<NodeId> = self.document.descendants(id).map(|n| n.id()).collect();
        let removed_set: HashSet<NodeId> = removed.iter().copied().collect();
        self.document
            .connections
            .retain(|c| !removed_set.contains(&c.source_node) && !removed_set.contains(&c.dest_node));

        let mut node = None;
        for child in removed {
            if let Some(entry) = self.document.entries.remove(&child) {
                if child == id {
                    node = Some(entry.node);
                }
            }
        }
        node.ok_or(EditError::NodeNotFound(id))
    }

    /// Replace a node's content through a [`NodeBuilder`].
    ///
    /// Connections to pins the node no longer has are dropped.
    pub fn edit_node(&mut self, id: NodeId, f: impl FnOnce(&mut NodeBuilder)) -> Result<&Arc<Node>, EditError> {
        let entry = self.document.entries.get(&id).ok_or(EditError::NodeNotFound(id))?;
        let mut builder = entry.node.to_builder();
        f(&mut builder);
        self.replace_node(builder.build())?;
        self.node(id)
    }

    /// Swap in a new value for the node with the same id
    pub fn replace_node(&mut self, node: Node) -> Result<(), EditError> {
        let id = node.id();
        let entry = self.document.entries.get_mut(&id).ok_or(EditError::NodeNotFound(id))?;
        entry.node = Arc::new(node);
        let node = entry.node.clone();

        self.document.connections.retain(|c| {
            (c.source_node != id || node.has_connector(c.source_connector))
                && (c.dest_node != id || node.has_connector(c.dest_connector))
        });
        Ok(())
    }

    /// Reparent or reorder `id`. `index` is clamped and is taken after the
    /// node has left its old position.
    pub fn move_node(&mut self, id: NodeId, new_parent: NodeId, index: usize) -> Result<(), EditError> {
        if id == self.document.root {
            return Err(EditError::RootImmutable);
        }
        if !self.document.contains(id) {
            return Err(EditError::NodeNotFound(id));
        }
        if !self.document.contains(new_parent) {
            return Err(EditError::ParentNotFound(new_parent));
        }
        if self.document.is_ancestor(id, new_parent) {
            return Err(EditError::CycleDetected);
        }

        self.detach(id)?;
        let parent_entry = self
            .document
            .entries
            .get_mut(&new_parent)
            .ok_or(EditError::ParentNotFound(new_parent))?;
        let index = index.min(parent_entry.children.len());
        parent_entry.children.insert(index, id);
        if let Some(entry) = self.document.entries.get_mut(&id) {
            entry.parent = Some(new_parent);
        }
        Ok(())
    }

    /// Add a connection between two existing pins
    pub fn connect(&mut self, connection: Connection) -> Result<(), EditError> {
        self.check_pin(connection.source_node, connection.source_connector)?;
        self.check_pin(connection.dest_node, connection.dest_connector)?;
        if !self.document.connections.insert(connection) {
            return Err(EditError::DuplicateConnection(connection));
        }
        Ok(())
    }

    pub fn disconnect(&mut self, connection: &Connection) -> Result<(), EditError> {
        if !self.document.connections.remove(connection) {
            return Err(EditError::ConnectionNotFound(*connection));
        }
        Ok(())
    }

    pub fn build(self) -> Document {
        self.document
    }

    fn node(&self, id: NodeId) -> Result<&Arc<Node>, EditError> {
        self.document.node(id).ok_or(EditError::NodeNotFound(id))
    }

    fn check_pin(&self, node: NodeId, connector: Identifier) -> Result<(), EditError> {
        if !self.node(node)?.has_connector(connector) {
            return Err(EditError::UnknownConnector { node, connector });
        }
        Ok(())
    }

    /// Unlink `id` from its parent's child list; returns the old parent
    fn detach(&mut self, id: NodeId) -> Result<NodeId, EditError> {
        if id == self.document.root {
            return Err(EditError::RootImmutable);
        }
        let parent = self
            .document
            .entries
            .get(&id)
            .ok_or(EditError::NodeNotFound(id))?
            .parent
            .ok_or(EditError::RootImmutable)?;
        if let Some(entry) = self.document.entries.get_mut(&parent) {
            entry.children.retain(|c| *c != id);
        }
        Ok(parent)
    }
}
