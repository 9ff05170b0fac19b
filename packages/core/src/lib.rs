//! # Nodegraph Core
//!
//! Persistent document model and structural diff engine for a node-graph
//! editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ metadata + registry: per node-type schemas  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ property → node → document                  │
//! │  - Immutable snapshots shared through Arc   │
//! │  - Copy-on-write builders derive new values │
//! │  - Stable uuids survive every edit          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ project: linear history + undo cursor       │
//! │  - compare(prev, cur) after every move      │
//! │  - MutationInfo delivered to one callback   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Snapshots are immutable**: edits derive new values, old snapshots stay valid
//! 2. **Identity, not content**: entities are matched across snapshots by id
//! 3. **One shape for every transition**: undo, redo and new edits all yield a `MutationInfo`
//! 4. **Validate at the edge**: `Mutation` reports bad ids; builders assume valid input
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nodegraph_core::{Metadata, MetadataRegistry, Mutation, Project, PropertyMetadata};
//! use nodegraph_common::hash;
//!
//! let registry = MetadataRegistry::new().with(
//!     Metadata::builder("Group")
//!         .property(PropertyMetadata::builder("Title").of_type::<String>())
//!         .build(),
//! )?;
//! let mut project = Project::new(Arc::new(registry), hash("Group"))?;
//! project.set_mutation_callback(|info| {
//!     for change in info.nodes() {
//!         println!("{:?} {}", change.kind, change.key());
//!     }
//! });
//!
//! let root = project.current().root_id();
//! project.apply(&Mutation::insert(root, 0, hash("Group")))?;
//! project.undo();
//! ```

mod config;
mod connection;
mod document;
mod errors;
mod metadata;
mod mutation_info;
mod mutations;
mod node;
mod project;
mod property;
mod registry;
mod value;

pub mod replay;
pub mod visitor;

pub use config::{ProjectConfig, DEFAULT_CONFIG_NAME};
pub use connection::Connection;
pub use document::{Document, DocumentBuilder, Layout, Placement, Preorder};
pub use errors::{CoreError, EditError, IntegrityError, RegistryError};
pub use metadata::{
    ConnectorDirection, ConnectorMetadata, ConnectorMetadataBuilder, Metadata, MetadataBuilder, PropertyMetadata,
    PropertyMetadataBuilder,
};
pub use mutation_info::{Change, ChangeSet, ChangeType, Entity, MutationInfo};
pub use mutations::Mutation;
pub use node::{Node, NodeBuilder, NodeId};
pub use project::{MutationCallback, Project};
pub use property::{Property, PropertyBuilder};
pub use registry::MetadataRegistry;
pub use value::{Keyframe, PropertyType, PropertyValue, ValueKind};

// Re-export common types for convenience
pub use nodegraph_common::{hash, Identifier};
