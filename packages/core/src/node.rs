//! # Nodes
//!
//! A node is an identity-bearing container of properties and connector
//! metadata. Its [`NodeId`] is assigned once at creation and survives every
//! edit: editing a node means deriving a new `Node` value with the same id
//! through a [`NodeBuilder`]. Unedited properties are shared (`Arc`) between the
//! old and the new value, so older document snapshots keep seeing their own
//! state.
//!
//! The combined connector list (schema connectors followed by the node's local
//! ones) and the content hash are computed lazily on first read.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use nodegraph_common::Identifier;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metadata::{ConnectorMetadata, ConnectorMetadataBuilder, Metadata, PropertyMetadata};
use crate::property::{Property, PropertyBuilder};
use crate::value::PropertyValue;

/// Globally unique node identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    node_type: Identifier,
    properties: IndexMap<Identifier, Arc<Property>>,
    schema_connectors: Arc<[Arc<ConnectorMetadata>]>,
    local_connectors: Vec<Arc<ConnectorMetadata>>,

    // cache
    combined_connectors: OnceLock<Vec<Arc<ConnectorMetadata>>>,
    content_hash: OnceLock<u64>,
}

impl Node {
    /// New node of the given type with a fresh id and default property values
    pub fn new(metadata: &Metadata) -> Self {
        Self::with_id(metadata, NodeId::new())
    }

    /// New node restoring a known id (deserializers, tests)
    pub fn with_id(metadata: &Metadata, id: NodeId) -> Self {
        let properties = metadata
            .properties()
            .iter()
            .map(|meta| (meta.id(), Arc::new(Property::new(meta.clone()))))
            .collect();

        Self {
            id,
            node_type: metadata.id(),
            properties,
            schema_connectors: metadata.connectors().clone(),
            local_connectors: Vec::new(),
            combined_connectors: OnceLock::new(),
            content_hash: OnceLock::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node_type(&self) -> Identifier {
        self.node_type
    }

    /// Properties in schema order
    pub fn properties(&self) -> impl ExactSizeIterator<Item = &Arc<Property>> + '_ {
        self.properties.values()
    }

    pub fn property(&self, id: Identifier) -> Option<&Arc<Property>> {
        self.properties.get(&id)
    }

    /// Schema-order position of a property
    pub fn property_index(&self, id: Identifier) -> Option<usize> {
        self.properties.get_index_of(&id)
    }

    pub fn value(&self, id: Identifier) -> Option<&PropertyValue> {
        self.property(id).map(|p| p.value())
    }

    pub fn schema_connectors(&self) -> &[Arc<ConnectorMetadata>] {
        &self.schema_connectors
    }

    pub fn local_connectors(&self) -> &[Arc<ConnectorMetadata>] {
        &self.local_connectors
    }

    /// Schema connectors followed by local ones
    pub fn connector_metadata(&self) -> &[Arc<ConnectorMetadata>] {
        self.combined_connectors.get_or_init(|| {
            self.schema_connectors
                .iter()
                .chain(self.local_connectors.iter())
                .cloned()
                .collect()
        })
    }

    pub fn connector(&self, id: Identifier) -> Option<&Arc<ConnectorMetadata>> {
        self.connector_metadata().iter().find(|c| c.id() == id)
    }

    pub fn has_connector(&self, id: Identifier) -> bool {
        self.connector(id).is_some()
    }

    /// Hash over type, properties and local connectors; position in a tree is not part of it
    pub fn content_hash(&self) -> u64 {
        *self.content_hash.get_or_init(|| {
            let mut hasher = DefaultHasher::new();
            self.node_type.hash(&mut hasher);
            for property in self.properties.values() {
                property.hash(&mut hasher);
            }
            for connector in &self.local_connectors {
                connector.hash(&mut hasher);
            }
            hasher.finish()
        })
    }

    /// Whether `other` holds different content (ignores identity)
    pub fn content_differs(&self, other: &Node) -> bool {
        if std::ptr::eq(self, other) {
            return false;
        }
        self.content_hash() != other.content_hash()
            || self.node_type != other.node_type
            || self.properties != other.properties
            || self.local_connectors != other.local_connectors
    }

    pub fn to_builder(&self) -> NodeBuilder {
        NodeBuilder::new(self)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && !self.content_differs(other)
    }
}

/// Copy-on-write editor for a [`Node`]
///
/// Snapshots the node on creation; [`build`](Self::build) yields a new node with
/// the same id. Unknown property or connector ids are programmer errors and
/// panic.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    node: Node,
}

impl NodeBuilder {
    pub fn new(node: &Node) -> Self {
        Self { node: node.clone() }
    }

    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// Read access to the state being built
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Edit one property in place of the old entry
    ///
    /// # Panics
    ///
    /// If the node has no property `id`.
    pub fn mutate_property(&mut self, id: Identifier, f: impl FnOnce(&mut PropertyBuilder)) -> &mut Self {
        let node_id = self.node.id;
        let slot = self
            .node
            .properties
            .get_mut(&id)
            .unwrap_or_else(|| panic!("node {} has no property {}", node_id, id));
        let mut builder = slot.to_builder();
        f(&mut builder);
        *slot = Arc::new(builder.build());
        self
    }

    /// Shorthand for a `mutate_property` that replaces the static value
    pub fn set_property(&mut self, id: Identifier, value: impl Into<PropertyValue>) -> &mut Self {
        let value = value.into();
        self.mutate_property(id, move |p| {
            p.set(value);
        })
    }

    /// Append a property beyond the node type's schema
    ///
    /// # Panics
    ///
    /// If a property with the same id already exists.
    pub fn add_property(&mut self, metadata: Arc<PropertyMetadata>) -> &mut Self {
        let id = metadata.id();
        assert!(
            !self.node.properties.contains_key(&id),
            "node {} already has property {}",
            self.node.id,
            id
        );
        self.node.properties.insert(id, Arc::new(Property::new(metadata)));
        self
    }

    /// Remove a property, keeping the order of the rest
    ///
    /// # Panics
    ///
    /// If the node has no property `id`.
    pub fn remove_property(&mut self, id: Identifier) -> Arc<Property> {
        let node_id = self.node.id;
        self.node
            .properties
            .shift_remove(&id)
            .unwrap_or_else(|| panic!("node {} has no property {}", node_id, id))
    }

    pub fn has_property(&self, id: Identifier) -> bool {
        self.node.properties.contains_key(&id)
    }

    /// Append a per-instance connector
    ///
    /// # Panics
    ///
    /// If the combined connector list already holds that id.
    pub fn add_connector(&mut self, connector: ConnectorMetadataBuilder) -> &mut Self {
        let connector = connector.build();
        let id = connector.id();
        let exists = self
            .node
            .schema_connectors
            .iter()
            .chain(self.node.local_connectors.iter())
            .any(|c| c.id() == id);
        assert!(!exists, "node {} already has connector {}", self.node.id, id);
        self.node.local_connectors.push(connector);
        self
    }

    /// Remove a per-instance connector; schema connectors cannot be removed
    ///
    /// # Panics
    ///
    /// If `id` is not a local connector of this node.
    pub fn remove_connector(&mut self, id: Identifier) -> Arc<ConnectorMetadata> {
        let node_id = self.node.id;
        let pos = self
            .node
            .local_connectors
            .iter()
            .position(|c| c.id() == id)
            .unwrap_or_else(|| panic!("node {} has no local connector {}", node_id, id));
        self.node.local_connectors.remove(pos)
    }

    pub fn build(self) -> Node {
        let mut node = self.node;
        node.combined_connectors = OnceLock::new();
        node.content_hash = OnceLock::new();
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ConnectorDirection, ConnectorMetadata, PropertyMetadata};
    use nodegraph_common::hash;

    fn metadata() -> Arc<Metadata> {
        Metadata::builder("Test")
            .property(PropertyMetadata::builder("Title").of_type::<String>())
            .property(PropertyMetadata::builder("int").of_type::<i64>())
            .connector(ConnectorMetadata::builder("In", ConnectorDirection::Input))
            .connector(ConnectorMetadata::builder("Out", ConnectorDirection::Output))
            .build()
    }

    #[test]
    fn test_new_node_follows_schema() {
        let node = Node::new(&metadata());
        assert_eq!(node.node_type(), hash("Test"));
        assert_eq!(node.properties().len(), 2);
        assert_eq!(node.property_index(hash("int")), Some(1));
        assert_eq!(node.connector_metadata().len(), 2);
        assert!(node.local_connectors().is_empty());
    }

    #[test]
    fn test_fresh_ids_are_unique() {
        let meta = metadata();
        assert_ne!(Node::new(&meta).id(), Node::new(&meta).id());
    }

    #[test]
    fn test_mutate_property_shares_untouched_properties() {
        let node = Node::new(&metadata());
        let mut builder = node.to_builder();
        builder.set_property(hash("int"), 2i64);
        let edited = builder.build();

        assert_eq!(edited.id(), node.id());
        assert_eq!(edited.value(hash("int")), Some(&PropertyValue::Int(2)));
        assert_eq!(node.value(hash("int")), Some(&PropertyValue::Int(0)));
        assert!(Arc::ptr_eq(
            node.property(hash("Title")).unwrap(),
            edited.property(hash("Title")).unwrap()
        ));
        assert!(node.content_differs(&edited));
    }

    #[test]
    fn test_unchanged_rebuild_has_same_content() {
        let node = Node::new(&metadata());
        let rebuilt = node.to_builder().build();
        assert!(!node.content_differs(&rebuilt));
        assert_eq!(node.content_hash(), rebuilt.content_hash());
        assert_eq!(node, rebuilt);
    }

    #[test]
    fn test_local_connectors_extend_combined_list() {
        let node = Node::new(&metadata());
        let mut builder = node.to_builder();
        builder.add_connector(ConnectorMetadata::builder("Foo", ConnectorDirection::Output));
        let edited = builder.build();

        let titles: Vec<_> = edited.connector_metadata().iter().map(|c| c.title().to_string()).collect();
        assert_eq!(titles, vec!["In", "Out", "Foo"]);
        assert_eq!(edited.local_connectors().len(), 1);
        assert!(node.content_differs(&edited));

        let mut builder = edited.to_builder();
        builder.remove_connector(hash("Foo"));
        let restored = builder.build();
        assert!(!restored.has_connector(hash("Foo")));
        assert!(!node.content_differs(&restored));
    }

    #[test]
    fn test_add_and_remove_property() {
        let node = Node::new(&metadata());
        let mut builder = node.to_builder();
        builder.add_property(PropertyMetadata::builder("extra").of_type::<bool>().build());
        let grown = builder.build();
        assert_eq!(grown.property_index(hash("extra")), Some(2));

        let mut builder = grown.to_builder();
        let removed = builder.remove_property(hash("extra"));
        assert_eq!(removed.id(), hash("extra"));
        assert_eq!(builder.build().properties().len(), 2);
    }

    #[test]
    #[should_panic(expected = "has no property")]
    fn test_mutate_unknown_property_panics() {
        let node = Node::new(&metadata());
        node.to_builder().mutate_property(hash("missing"), |_| {});
    }

    #[test]
    #[should_panic(expected = "already has connector")]
    fn test_duplicate_connector_panics() {
        let node = Node::new(&metadata());
        node.to_builder()
            .add_connector(ConnectorMetadata::builder("In", ConnectorDirection::Input));
    }

    #[test]
    #[should_panic(expected = "has no local connector")]
    fn test_schema_connector_cannot_be_removed() {
        let node = Node::new(&metadata());
        node.to_builder().remove_connector(hash("In"));
    }
}
