//! # Node Graph Mutations
//!
//! Semantic edit commands validated against the current document before any
//! builder is touched.
//!
//! ## Design Principles
//!
//! 1. **Intent-preserving**: each mutation is one user-level operation
//! 2. **Validated**: identifiers are checked against the current document, so
//!    an edit referencing a vanished entity reports an [`EditError`] instead of
//!    tripping a builder precondition
//! 3. **Serializable**: mutations cross process boundaries as plain data
//!
//! ## Mutation Semantics
//!
//! ### InsertNode
//! - Creates a node of a registered type with the given uuid, so replaying a
//!   recorded insert reproduces the same identity
//! - Index is clamped to the parent's child count
//!
//! ### RemoveNode
//! - Removes the node, its descendants and every connection touching them
//!
//! ### MoveNode
//! - Fails if the target is the node itself or one of its descendants
//! - Index is taken after the node left its old position
//!
//! ### RemoveConnector
//! - Only per-instance connectors; connections using it are dropped with it

use std::sync::Arc;

use nodegraph_common::Identifier;
use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::document::{Document, DocumentBuilder};
use crate::errors::EditError;
use crate::metadata::{ConnectorDirection, ConnectorMetadata};
use crate::node::{Node, NodeId};
use crate::property::Property;
use crate::registry::MetadataRegistry;
use crate::value::PropertyValue;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Mutation {
    /// Insert a new node of `node_type` under `parent` at `index`
    InsertNode {
        parent: NodeId,
        index: usize,
        node_type: Identifier,
        id: NodeId,
    },

    RemoveNode {
        node: NodeId,
    },

    MoveNode {
        node: NodeId,
        new_parent: NodeId,
        index: usize,
    },

    /// Replace a property's static value
    SetProperty {
        node: NodeId,
        property: Identifier,
        value: PropertyValue,
    },

    SetKeyframe {
        node: NodeId,
        property: Identifier,
        frame: u32,
        value: PropertyValue,
    },

    ClearKeyframes {
        node: NodeId,
        property: Identifier,
    },

    /// Add a per-instance connector
    AddConnector {
        node: NodeId,
        title: String,
        direction: ConnectorDirection,
    },

    RemoveConnector {
        node: NodeId,
        connector: Identifier,
    },

    Connect {
        connection: Connection,
    },

    Disconnect {
        connection: Connection,
    },
}

impl Mutation {
    /// `InsertNode` with a fresh uuid
    pub fn insert(parent: NodeId, index: usize, node_type: Identifier) -> Self {
        Mutation::InsertNode {
            parent,
            index,
            node_type,
            id: NodeId::new(),
        }
    }

    /// Short human-readable label, used as the undo description
    pub fn description(&self) -> &'static str {
        match self {
            Mutation::InsertNode { .. } => "Insert node",
            Mutation::RemoveNode { .. } => "Remove node",
            Mutation::MoveNode { .. } => "Move node",
            Mutation::SetProperty { .. } => "Set property",
            Mutation::SetKeyframe { .. } => "Set keyframe",
            Mutation::ClearKeyframes { .. } => "Clear keyframes",
            Mutation::AddConnector { .. } => "Add connector",
            Mutation::RemoveConnector { .. } => "Remove connector",
            Mutation::Connect { .. } => "Connect",
            Mutation::Disconnect { .. } => "Disconnect",
        }
    }

    /// Apply to a builder with validation
    pub fn apply(&self, builder: &mut DocumentBuilder, registry: &MetadataRegistry) -> Result<(), EditError> {
        self.validate(builder.document(), registry)?;

        match self {
            Mutation::InsertNode {
                parent,
                index,
                node_type,
                id,
            } => {
                let metadata = registry.get(*node_type).ok_or(EditError::UnknownNodeType(*node_type))?;
                builder.insert(*parent, *index, Node::with_id(metadata, *id))?;
            }

            Mutation::RemoveNode { node } => {
                builder.remove(*node)?;
            }

            Mutation::MoveNode { node, new_parent, index } => {
                builder.move_node(*node, *new_parent, *index)?;
            }

            Mutation::SetProperty { node, property, value } => {
                let value = value.clone();
                builder.edit_node(*node, |n| {
                    n.set_property(*property, value);
                })?;
            }

            Mutation::SetKeyframe {
                node,
                property,
                frame,
                value,
            } => {
                let value = value.clone();
                builder.edit_node(*node, |n| {
                    n.mutate_property(*property, |p| {
                        p.set_keyframe(*frame, value);
                    });
                })?;
            }

            Mutation::ClearKeyframes { node, property } => {
                builder.edit_node(*node, |n| {
                    n.mutate_property(*property, |p| {
                        p.clear_keyframes();
                    });
                })?;
            }

            Mutation::AddConnector { node, title, direction } => {
                let connector = ConnectorMetadata::builder(title.clone(), *direction);
                builder.edit_node(*node, |n| {
                    n.add_connector(connector);
                })?;
            }

            Mutation::RemoveConnector { node, connector } => {
                builder.edit_node(*node, |n| {
                    n.remove_connector(*connector);
                })?;
            }

            Mutation::Connect { connection } => builder.connect(*connection)?,

            Mutation::Disconnect { connection } => builder.disconnect(connection)?,
        }

        Ok(())
    }

    /// Validate without applying
    pub fn validate(&self, doc: &Document, registry: &MetadataRegistry) -> Result<(), EditError> {
        match self {
            Mutation::InsertNode {
                parent, node_type, id, ..
            } => {
                if !doc.contains(*parent) {
                    return Err(EditError::ParentNotFound(*parent));
                }
                if !registry.contains(*node_type) {
                    return Err(EditError::UnknownNodeType(*node_type));
                }
                if doc.contains(*id) {
                    return Err(EditError::DuplicateNode(*id));
                }
                Ok(())
            }

            Mutation::RemoveNode { node } => {
                Self::find_node(doc, *node)?;
                if *node == doc.root_id() {
                    return Err(EditError::RootImmutable);
                }
                Ok(())
            }

            Mutation::MoveNode { node, new_parent, .. } => {
                Self::find_node(doc, *node)?;
                if *node == doc.root_id() {
                    return Err(EditError::RootImmutable);
                }
                if !doc.contains(*new_parent) {
                    return Err(EditError::ParentNotFound(*new_parent));
                }
                if doc.is_ancestor(*node, *new_parent) {
                    return Err(EditError::CycleDetected);
                }
                Ok(())
            }

            Mutation::SetProperty { node, property, value }
            | Mutation::SetKeyframe {
                node, property, value, ..
            } => {
                let found = Self::find_property(doc, *node, *property)?;
                let expected = found.metadata().kind();
                if value.kind() != expected {
                    return Err(EditError::TypeMismatch {
                        property: *property,
                        expected,
                        found: value.kind(),
                    });
                }
                Ok(())
            }

            Mutation::ClearKeyframes { node, property } => {
                Self::find_property(doc, *node, *property)?;
                Ok(())
            }

            Mutation::AddConnector { node, title, .. } => {
                let connector = Identifier::from_title(title);
                if Self::find_node(doc, *node)?.has_connector(connector) {
                    return Err(EditError::DuplicateConnector {
                        node: *node,
                        connector,
                    });
                }
                Ok(())
            }

            Mutation::RemoveConnector { node, connector } => {
                let local = Self::find_node(doc, *node)?
                    .local_connectors()
                    .iter()
                    .any(|c| c.id() == *connector);
                if !local {
                    return Err(EditError::UnknownConnector {
                        node: *node,
                        connector: *connector,
                    });
                }
                Ok(())
            }

            Mutation::Connect { connection } => {
                for (node, connector) in [
                    (connection.source_node, connection.source_connector),
                    (connection.dest_node, connection.dest_connector),
                ] {
                    if !Self::find_node(doc, node)?.has_connector(connector) {
                        return Err(EditError::UnknownConnector { node, connector });
                    }
                }
                if doc.has_connection(connection) {
                    return Err(EditError::DuplicateConnection(*connection));
                }
                Ok(())
            }

            Mutation::Disconnect { connection } => {
                if !doc.has_connection(connection) {
                    return Err(EditError::ConnectionNotFound(*connection));
                }
                Ok(())
            }
        }
    }

    fn find_node(doc: &Document, id: NodeId) -> Result<&Arc<Node>, EditError> {
        doc.node(id).ok_or(EditError::NodeNotFound(id))
    }

    fn find_property(doc: &Document, node: NodeId, property: Identifier) -> Result<&Property, EditError> {
        Self::find_node(doc, node)?
            .property(property)
            .map(|p| p.as_ref())
            .ok_or(EditError::UnknownProperty { node, property })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Metadata, PropertyMetadata};
    use crate::value::ValueKind;
    use nodegraph_common::hash;

    fn registry() -> MetadataRegistry {
        MetadataRegistry::new()
            .with(
                Metadata::builder("Test")
                    .property(PropertyMetadata::builder("int").of_type::<i64>())
                    .connector(ConnectorMetadata::builder("In", ConnectorDirection::Input))
                    .connector(ConnectorMetadata::builder("Out", ConnectorDirection::Output))
                    .build(),
            )
            .unwrap()
    }

    fn document(registry: &MetadataRegistry) -> Document {
        let metadata: &Arc<Metadata> = registry.get(hash("Test")).unwrap();
        Document::new(Node::new(metadata))
    }

    #[test]
    fn test_mutation_serialization() {
        let mutation = Mutation::SetProperty {
            node: NodeId::new(),
            property: hash("int"),
            value: PropertyValue::Int(3),
        };

        let json = serde_json::to_string(&mutation).unwrap();
        let deserialized: Mutation = serde_json::from_str(&json).unwrap();

        assert_eq!(mutation, deserialized);
    }

    #[test]
    fn test_insert_keeps_requested_id() {
        let registry = registry();
        let doc = document(&registry);
        let id = NodeId::new();
        let mutation = Mutation::InsertNode {
            parent: doc.root_id(),
            index: 0,
            node_type: hash("Test"),
            id,
        };

        let mut builder = doc.to_builder();
        mutation.apply(&mut builder, &registry).unwrap();
        let doc = builder.build();
        assert_eq!(doc.children(doc.root_id()), &[id]);

        assert_eq!(mutation.validate(&doc, &registry), Err(EditError::DuplicateNode(id)));
    }

    #[test]
    fn test_validation_rejects_unknown_entities() {
        let registry = registry();
        let doc = document(&registry);
        let missing = NodeId::new();

        let remove = Mutation::RemoveNode { node: missing };
        assert_eq!(remove.validate(&doc, &registry), Err(EditError::NodeNotFound(missing)));

        let insert = Mutation::insert(doc.root_id(), 0, hash("Nope"));
        assert_eq!(
            insert.validate(&doc, &registry),
            Err(EditError::UnknownNodeType(hash("Nope")))
        );

        let set = Mutation::SetProperty {
            node: doc.root_id(),
            property: hash("missing"),
            value: PropertyValue::Int(1),
        };
        assert_eq!(
            set.validate(&doc, &registry),
            Err(EditError::UnknownProperty {
                node: doc.root_id(),
                property: hash("missing")
            })
        );
    }

    #[test]
    fn test_type_mismatch_is_reported_not_panicked() {
        let registry = registry();
        let doc = document(&registry);
        let mutation = Mutation::SetProperty {
            node: doc.root_id(),
            property: hash("int"),
            value: PropertyValue::String("two".into()),
        };

        let mut builder = doc.to_builder();
        assert_eq!(
            mutation.apply(&mut builder, &registry),
            Err(EditError::TypeMismatch {
                property: hash("int"),
                expected: ValueKind::Int,
                found: ValueKind::String,
            })
        );
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let registry = registry();
        let doc = document(&registry);
        let mutation = Mutation::RemoveNode { node: doc.root_id() };
        assert_eq!(mutation.validate(&doc, &registry), Err(EditError::RootImmutable));
    }

    #[test]
    fn test_schema_connectors_cannot_be_removed() {
        let registry = registry();
        let doc = document(&registry);
        let mutation = Mutation::RemoveConnector {
            node: doc.root_id(),
            connector: hash("In"),
        };
        assert!(matches!(
            mutation.validate(&doc, &registry),
            Err(EditError::UnknownConnector { .. })
        ));
    }
}
