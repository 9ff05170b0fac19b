//! # Connections
//!
//! A connection links an output pin of one node to an input pin of another.
//! It carries no payload: its identity is the full endpoint tuple, so changing
//! any endpoint means removing one connection and adding another.

use std::fmt;

use nodegraph_common::Identifier;
use serde::{Deserialize, Serialize};

use crate::node::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub source_node: NodeId,
    pub source_connector: Identifier,
    pub dest_node: NodeId,
    pub dest_connector: Identifier,
}

impl Connection {
    pub fn new(
        source_node: NodeId,
        source_connector: Identifier,
        dest_node: NodeId,
        dest_connector: Identifier,
    ) -> Self {
        Self {
            source_node,
            source_connector,
            dest_node,
            dest_connector,
        }
    }

    /// Whether either endpoint sits on `node`
    pub fn touches(&self, node: NodeId) -> bool {
        self.source_node == node || self.dest_node == node
    }

    /// Whether either endpoint is the pin `connector` of `node`
    pub fn uses(&self, node: NodeId, connector: Identifier) -> bool {
        (self.source_node == node && self.source_connector == connector)
            || (self.dest_node == node && self.dest_connector == connector)
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.source_node, self.source_connector, self.dest_node, self.dest_connector
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodegraph_common::hash;

    #[test]
    fn test_identity_is_the_endpoint_tuple() {
        let (a, b) = (NodeId::new(), NodeId::new());
        let c1 = Connection::new(a, hash("Out"), b, hash("In"));
        let c2 = Connection::new(a, hash("Out"), b, hash("In"));
        let c3 = Connection::new(a, hash("Foo"), b, hash("In"));

        assert_eq!(c1, c2);
        assert_ne!(c1, c3);
    }

    #[test]
    fn test_touches_and_uses() {
        let (a, b, c) = (NodeId::new(), NodeId::new(), NodeId::new());
        let connection = Connection::new(a, hash("Out"), b, hash("In"));

        assert!(connection.touches(a));
        assert!(connection.touches(b));
        assert!(!connection.touches(c));
        assert!(connection.uses(a, hash("Out")));
        assert!(!connection.uses(a, hash("In")));
        assert!(connection.uses(b, hash("In")));
    }
}
