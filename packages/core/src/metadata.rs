//! # Node Type Metadata
//!
//! Immutable per node-type schemas: an ordered list of property definitions and
//! an ordered list of connector (pin) definitions. Each definition is built once
//! through its builder and shared behind an `Arc` by every node of the type.
//!
//! ```rust,ignore
//! let metadata = Metadata::builder("Transform")
//!     .property(PropertyMetadata::builder("Title").of_type::<String>())
//!     .property(PropertyMetadata::builder("offset").of_type::<[f64; 2]>())
//!     .connector(ConnectorMetadata::builder("In", ConnectorDirection::Input))
//!     .connector(ConnectorMetadata::builder("Out", ConnectorDirection::Output))
//!     .build();
//! ```

use std::sync::Arc;

use nodegraph_common::Identifier;
use serde::{Deserialize, Serialize};

use crate::value::{PropertyType, PropertyValue, ValueKind};

/// Definition of one property within a node type's schema
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMetadata {
    id: Identifier,
    title: String,
    default_value: PropertyValue,
}

impl PropertyMetadata {
    pub fn builder(title: impl Into<String>) -> PropertyMetadataBuilder {
        PropertyMetadataBuilder::new(title)
    }

    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn default_value(&self) -> &PropertyValue {
        &self.default_value
    }

    pub fn kind(&self) -> ValueKind {
        self.default_value.kind()
    }
}

#[derive(Debug, Clone)]
pub struct PropertyMetadataBuilder {
    title: String,
    default_value: PropertyValue,
}

impl PropertyMetadataBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            default_value: PropertyValue::Int(0),
        }
    }

    /// Use the zero value of `T` as the default
    pub fn of_type<T: PropertyType>(mut self) -> Self {
        self.default_value = T::default_value();
        self
    }

    pub fn default_value(mut self, value: impl Into<PropertyValue>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn build(self) -> Arc<PropertyMetadata> {
        Arc::new(PropertyMetadata {
            id: Identifier::from_title(&self.title),
            title: self.title,
            default_value: self.default_value,
        })
    }
}

/// Direction of a connector pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorDirection {
    Input,
    Output,
}

/// Definition of one connector pin
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectorMetadata {
    id: Identifier,
    title: String,
    direction: ConnectorDirection,
}

impl ConnectorMetadata {
    pub fn builder(title: impl Into<String>, direction: ConnectorDirection) -> ConnectorMetadataBuilder {
        ConnectorMetadataBuilder::new(title, direction)
    }

    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn direction(&self) -> ConnectorDirection {
        self.direction
    }
}

#[derive(Debug, Clone)]
pub struct ConnectorMetadataBuilder {
    title: String,
    direction: ConnectorDirection,
}

impl ConnectorMetadataBuilder {
    pub fn new(title: impl Into<String>, direction: ConnectorDirection) -> Self {
        Self {
            title: title.into(),
            direction,
        }
    }

    pub fn build(self) -> Arc<ConnectorMetadata> {
        Arc::new(ConnectorMetadata {
            id: Identifier::from_title(&self.title),
            title: self.title,
            direction: self.direction,
        })
    }
}

/// Immutable schema of a node type
#[derive(Debug, PartialEq)]
pub struct Metadata {
    id: Identifier,
    title: String,
    properties: Vec<Arc<PropertyMetadata>>,
    connectors: Arc<[Arc<ConnectorMetadata>]>,
}

impl Metadata {
    pub fn builder(title: impl Into<String>) -> MetadataBuilder {
        MetadataBuilder {
            title: title.into(),
            properties: Vec::new(),
            connectors: Vec::new(),
        }
    }

    /// Node type identifier
    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn properties(&self) -> &[Arc<PropertyMetadata>] {
        &self.properties
    }

    pub fn connectors(&self) -> &Arc<[Arc<ConnectorMetadata>]> {
        &self.connectors
    }

    pub fn property(&self, id: Identifier) -> Option<&Arc<PropertyMetadata>> {
        self.properties.iter().find(|p| p.id() == id)
    }

    pub fn connector(&self, id: Identifier) -> Option<&Arc<ConnectorMetadata>> {
        self.connectors.iter().find(|c| c.id() == id)
    }
}

pub struct MetadataBuilder {
    title: String,
    properties: Vec<Arc<PropertyMetadata>>,
    connectors: Vec<Arc<ConnectorMetadata>>,
}

impl MetadataBuilder {
    /// Append a property definition; a repeated title replaces the earlier one in place
    pub fn property(mut self, property: PropertyMetadataBuilder) -> Self {
        let property = property.build();
        match self.properties.iter_mut().find(|p| p.id() == property.id()) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
        self
    }

    /// Append a connector definition; a repeated title replaces the earlier one in place
    pub fn connector(mut self, connector: ConnectorMetadataBuilder) -> Self {
        let connector = connector.build();
        match self.connectors.iter_mut().find(|c| c.id() == connector.id()) {
            Some(existing) => *existing = connector,
            None => self.connectors.push(connector),
        }
        self
    }

    pub fn build(self) -> Arc<Metadata> {
        Arc::new(Metadata {
            id: Identifier::from_title(&self.title),
            title: self.title,
            properties: self.properties,
            connectors: self.connectors.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodegraph_common::hash;

    fn transform() -> Arc<Metadata> {
        Metadata::builder("Transform")
            .property(PropertyMetadata::builder("Title").of_type::<String>())
            .property(PropertyMetadata::builder("scale").default_value(1.0))
            .connector(ConnectorMetadata::builder("In", ConnectorDirection::Input))
            .connector(ConnectorMetadata::builder("Out", ConnectorDirection::Output))
            .build()
    }

    #[test]
    fn test_ids_derive_from_titles() {
        let metadata = transform();
        assert_eq!(metadata.id(), hash("Transform"));
        assert_eq!(metadata.properties()[1].id(), hash("scale"));
        assert_eq!(metadata.connectors()[0].id(), hash("In"));
    }

    #[test]
    fn test_definition_order_is_kept() {
        let metadata = transform();
        let titles: Vec<_> = metadata.properties().iter().map(|p| p.title()).collect();
        assert_eq!(titles, vec!["Title", "scale"]);
    }

    #[test]
    fn test_default_value_sets_kind() {
        let metadata = transform();
        let scale = metadata.property(hash("scale")).unwrap();
        assert_eq!(scale.kind(), ValueKind::Double);
        assert_eq!(scale.default_value(), &PropertyValue::Double(1.0));
    }

    #[test]
    fn test_repeated_title_replaces_definition() {
        let metadata = Metadata::builder("T")
            .property(PropertyMetadata::builder("x").of_type::<i64>())
            .property(PropertyMetadata::builder("x").of_type::<f64>())
            .build();
        assert_eq!(metadata.properties().len(), 1);
        assert_eq!(metadata.properties()[0].kind(), ValueKind::Double);
    }

    #[test]
    fn test_connector_lookup() {
        let metadata = transform();
        let out = metadata.connector(hash("Out")).unwrap();
        assert_eq!(out.direction(), ConnectorDirection::Output);
        assert!(metadata.connector(hash("Missing")).is_none());
    }
}
