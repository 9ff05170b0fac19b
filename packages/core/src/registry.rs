//! # Metadata Registry
//!
//! Maps node-type identifiers to their schemas. A registry is populated once at
//! startup (module registration) and is read-only afterwards. It can be shared
//! explicitly as an `Arc<MetadataRegistry>` or installed process-wide.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use nodegraph_common::Identifier;
use tracing::{debug, info};

use crate::errors::RegistryError;
use crate::metadata::Metadata;

static GLOBAL: OnceLock<MetadataRegistry> = OnceLock::new();

#[derive(Debug, Default)]
pub struct MetadataRegistry {
    types: HashMap<Identifier, Arc<Metadata>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type schema
    pub fn register(&mut self, metadata: Arc<Metadata>) -> Result<(), RegistryError> {
        if self.types.contains_key(&metadata.id()) {
            return Err(RegistryError::DuplicateType(metadata.id()));
        }
        debug!(node_type = %metadata.title(), id = %metadata.id(), "Registering node type");
        self.types.insert(metadata.id(), metadata);
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, metadata: Arc<Metadata>) -> Result<Self, RegistryError> {
        self.register(metadata)?;
        Ok(self)
    }

    pub fn get(&self, node_type: Identifier) -> Option<&Arc<Metadata>> {
        self.types.get(&node_type)
    }

    pub fn contains(&self, node_type: Identifier) -> bool {
        self.types.contains_key(&node_type)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Freeze this registry as the process-wide one
    pub fn install(self) -> Result<&'static MetadataRegistry, RegistryError> {
        let count = self.len();
        GLOBAL.set(self).map_err(|_| RegistryError::AlreadyInstalled)?;
        info!(node_types = count, "Installed global metadata registry");
        GLOBAL.get().ok_or(RegistryError::AlreadyInstalled)
    }

    /// The process-wide registry, if one was installed
    pub fn global() -> Option<&'static MetadataRegistry> {
        GLOBAL.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PropertyMetadata;
    use nodegraph_common::hash;

    fn node_type(title: &str) -> Arc<Metadata> {
        Metadata::builder(title)
            .property(PropertyMetadata::builder("Title").of_type::<String>())
            .build()
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = MetadataRegistry::new()
            .with(node_type("A"))
            .unwrap()
            .with(node_type("B"))
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(hash("A")).unwrap().title(), "A");
        assert!(registry.get(hash("C")).is_none());
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let mut registry = MetadataRegistry::new();
        registry.register(node_type("A")).unwrap();

        let result = registry.register(node_type("A"));
        assert_eq!(result, Err(RegistryError::DuplicateType(hash("A"))));
    }

    #[test]
    fn test_install_only_once() {
        let registry = MetadataRegistry::new().with(node_type("Global")).unwrap();
        let installed = registry.install().unwrap();
        assert!(installed.contains(hash("Global")));
        assert!(MetadataRegistry::global().is_some());

        let again = MetadataRegistry::new().install();
        assert_eq!(again.err(), Some(RegistryError::AlreadyInstalled));
    }
}
