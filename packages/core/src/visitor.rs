use std::sync::Arc;

use crate::connection::Connection;
use crate::document::{Document, Placement};
use crate::metadata::ConnectorMetadata;
use crate::node::Node;
use crate::property::Property;

/// Visitor pattern for traversing a document read-only
///
/// The default methods walk the whole tree in pre-order, children in index
/// order, then the connections in their canonical order. Override specific
/// visit_* methods to act on the entities of interest.
pub trait Visitor: Sized {
    fn visit_document(&mut self, document: &Document) {
        walk_document(self, document);
    }

    fn visit_node(&mut self, document: &Document, node: &Arc<Node>, _placement: Placement) {
        walk_node(self, document, node);
    }

    fn visit_property(&mut self, _owner: &Arc<Node>, _property: &Arc<Property>, _index: usize) {
        // Leaf, no children to walk
    }

    fn visit_connector(&mut self, _owner: &Arc<Node>, _connector: &Arc<ConnectorMetadata>, _index: usize) {
        // Leaf, no children to walk
    }

    fn visit_connection(&mut self, _connection: &Connection, _index: usize) {
        // Leaf, no children to walk
    }
}

pub fn walk_document<V: Visitor>(visitor: &mut V, document: &Document) {
    let root = document.root();
    visitor.visit_node(document, root, Placement { parent: None, index: 0 });

    for (index, connection) in document.connections().enumerate() {
        visitor.visit_connection(connection, index);
    }
}

/// Visits the node's properties, its local connectors, then its children
pub fn walk_node<V: Visitor>(visitor: &mut V, document: &Document, node: &Arc<Node>) {
    for (index, property) in node.properties().enumerate() {
        visitor.visit_property(node, property, index);
    }
    for (index, connector) in node.local_connectors().iter().enumerate() {
        visitor.visit_connector(node, connector, index);
    }

    for (index, child) in document.children(node.id()).iter().enumerate() {
        if let Some(child) = document.node(*child) {
            let placement = Placement {
                parent: Some(node.id()),
                index,
            };
            visitor.visit_node(document, child, placement);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ConnectorDirection, Metadata, PropertyMetadata};
    use crate::node::NodeId;
    use nodegraph_common::hash;

    #[derive(Default)]
    struct Recorder {
        nodes: Vec<(NodeId, Placement)>,
        properties: usize,
        connectors: usize,
        connections: usize,
    }

    impl Visitor for Recorder {
        fn visit_node(&mut self, document: &Document, node: &Arc<Node>, placement: Placement) {
            self.nodes.push((node.id(), placement));
            walk_node(self, document, node);
        }

        fn visit_property(&mut self, _owner: &Arc<Node>, _property: &Arc<Property>, _index: usize) {
            self.properties += 1;
        }

        fn visit_connector(&mut self, _owner: &Arc<Node>, _connector: &Arc<ConnectorMetadata>, _index: usize) {
            self.connectors += 1;
        }

        fn visit_connection(&mut self, _connection: &Connection, _index: usize) {
            self.connections += 1;
        }
    }

    #[test]
    fn test_walks_in_preorder() {
        let meta = Metadata::builder("Test")
            .property(PropertyMetadata::builder("Title").of_type::<String>())
            .connector(ConnectorMetadata::builder("In", ConnectorDirection::Input))
            .connector(ConnectorMetadata::builder("Out", ConnectorDirection::Output))
            .build();
        let document = Document::new(Node::new(&meta));
        let root = document.root_id();
        let mut builder = document.to_builder();
        let a = builder.insert(root, 0, Node::new(&meta)).unwrap();
        let b = builder.insert(root, 1, Node::new(&meta)).unwrap();
        let a1 = builder.insert(a, 0, Node::new(&meta)).unwrap();
        builder
            .edit_node(b, |n| {
                n.add_connector(ConnectorMetadata::builder("Extra", ConnectorDirection::Input));
            })
            .unwrap();
        builder.connect(Connection::new(a, hash("Out"), b, hash("Extra"))).unwrap();
        let document = builder.build();

        let mut recorder = Recorder::default();
        recorder.visit_document(&document);

        let ids: Vec<_> = recorder.nodes.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![root, a, a1, b]);
        assert_eq!(recorder.nodes[2].1, Placement { parent: Some(a), index: 0 });
        assert_eq!(recorder.nodes[3].1, Placement { parent: Some(root), index: 1 });
        assert_eq!(recorder.properties, 4);
        assert_eq!(recorder.connectors, 1);
        assert_eq!(recorder.connections, 1);
    }
}
