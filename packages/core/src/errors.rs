//! Error types for the core

use nodegraph_common::{CommonError, Identifier};
use thiserror::Error;

use crate::connection::Connection;
use crate::node::NodeId;
use crate::value::ValueKind;

/// Validation failures reported by the edit layer before a builder is touched
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Parent not found: {0}")]
    ParentNotFound(NodeId),

    #[error("Would create cycle")]
    CycleDetected,

    #[error("The root node cannot be removed or moved")]
    RootImmutable,

    #[error("Unknown node type: {0}")]
    UnknownNodeType(Identifier),

    #[error("Node {node} has no property {property}")]
    UnknownProperty { node: NodeId, property: Identifier },

    #[error("Node {node} has no connector {connector}")]
    UnknownConnector { node: NodeId, connector: Identifier },

    #[error("Property {property} holds {expected:?} values, got {found:?}")]
    TypeMismatch {
        property: Identifier,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("Node already exists: {0}")]
    DuplicateNode(NodeId),

    #[error("Node {node} already has connector {connector}")]
    DuplicateConnector { node: NodeId, connector: Identifier },

    #[error("Connection not found: {0}")]
    ConnectionNotFound(Connection),

    #[error("Connection already exists: {0}")]
    DuplicateConnection(Connection),
}

/// Structural invariant violations found by `Document::validate`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrityError {
    #[error("Root {0} is missing from the node table")]
    MissingRoot(NodeId),

    #[error("Node {0} appears more than once in the tree")]
    DuplicateNode(NodeId),

    #[error("Child {child} of {parent} is missing from the node table")]
    DanglingChild { parent: NodeId, child: NodeId },

    #[error("Node {node} records parent {recorded:?}, but is a child of {actual:?}")]
    ParentMismatch {
        node: NodeId,
        recorded: Option<NodeId>,
        actual: Option<NodeId>,
    },

    #[error("Node {0} is not reachable from the root")]
    Unreachable(NodeId),

    #[error("Node {node} names parent {parent}, which is not in the document")]
    MissingParent { node: NodeId, parent: NodeId },

    #[error("Connection {0} references a missing node or connector")]
    DanglingConnection(Connection),
}

/// Metadata registry lifecycle errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Node type already registered: {0}")]
    DuplicateType(Identifier),

    #[error("The global metadata registry is already installed")]
    AlreadyInstalled,
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Edit error: {0}")]
    Edit(#[from] EditError),

    #[error("Integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Config error: {0}")]
    Config(#[from] CommonError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodegraph_common::hash;

    fn install_twice() -> Result<(), CoreError> {
        let second: Result<(), RegistryError> = Err(RegistryError::AlreadyInstalled);
        second?;
        Ok(())
    }

    #[test]
    fn test_core_error_wraps_each_concern() {
        let err = install_twice().unwrap_err();
        assert!(matches!(err, CoreError::Registry(RegistryError::AlreadyInstalled)));

        let err: CoreError = EditError::UnknownNodeType(hash("Missing")).into();
        assert_eq!(err.to_string(), format!("Edit error: Unknown node type: {}", hash("Missing")));

        let err: CoreError = CommonError::from("bad config").into();
        assert_eq!(err.to_string(), "Config error: Generic error: bad config");
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = EditError::TypeMismatch {
            property: hash("int"),
            expected: ValueKind::Int,
            found: ValueKind::String,
        };
        assert!(err.to_string().ends_with("holds Int values, got String"));
    }
}
