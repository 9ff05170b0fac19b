//! # Properties
//!
//! A property is a typed value cell bound to its [`PropertyMetadata`] for its
//! whole lifetime. Published properties are never mutated: edits go through a
//! [`PropertyBuilder`] seeded from the current value and produce a new
//! `Property`.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use nodegraph_common::Identifier;

use crate::metadata::PropertyMetadata;
use crate::value::{Keyframe, PropertyValue};

#[derive(Debug, Clone)]
pub struct Property {
    metadata: Arc<PropertyMetadata>,
    value: PropertyValue,
    keyframes: Vec<Keyframe>,
}

impl Property {
    /// New property holding the metadata's default value
    pub fn new(metadata: Arc<PropertyMetadata>) -> Self {
        Self {
            value: metadata.default_value().clone(),
            metadata,
            keyframes: Vec::new(),
        }
    }

    pub fn id(&self) -> Identifier {
        self.metadata.id()
    }

    pub fn metadata(&self) -> &Arc<PropertyMetadata> {
        &self.metadata
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// Keyframes ordered by frame
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn is_animated(&self) -> bool {
        !self.keyframes.is_empty()
    }

    /// Value at `frame`: the nearest keyframe at or before it, else the static value
    pub fn value_at(&self, frame: u32) -> &PropertyValue {
        self.keyframes
            .iter()
            .take_while(|k| k.frame <= frame)
            .last()
            .map(|k| &k.value)
            .unwrap_or(&self.value)
    }

    pub fn to_builder(&self) -> PropertyBuilder {
        PropertyBuilder {
            property: self.clone(),
        }
    }
}

// Identity is the metadata id; equality is value equality.
impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id() && self.value == other.value && self.keyframes == other.keyframes
    }
}

impl Hash for Property {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
        self.value.hash(state);
        self.keyframes.hash(state);
    }
}

/// Copy-on-write editor for a [`Property`]
#[derive(Debug, Clone)]
pub struct PropertyBuilder {
    property: Property,
}

impl PropertyBuilder {
    pub fn id(&self) -> Identifier {
        self.property.id()
    }

    pub fn value(&self) -> &PropertyValue {
        &self.property.value
    }

    /// Replace the static value.
    ///
    /// # Panics
    ///
    /// If `value` is of a different kind than the metadata default.
    pub fn set(&mut self, value: impl Into<PropertyValue>) -> &mut Self {
        let value = value.into();
        self.assert_kind(&value);
        self.property.value = value;
        self
    }

    /// Insert or replace the keyframe at `frame`
    ///
    /// # Panics
    ///
    /// If `value` is of a different kind than the metadata default.
    pub fn set_keyframe(&mut self, frame: u32, value: impl Into<PropertyValue>) -> &mut Self {
        let value = value.into();
        self.assert_kind(&value);
        let keyframes = &mut self.property.keyframes;
        match keyframes.binary_search_by_key(&frame, |k| k.frame) {
            Ok(pos) => keyframes[pos].value = value,
            Err(pos) => keyframes.insert(pos, Keyframe { frame, value }),
        }
        self
    }

    /// Remove the keyframe at `frame`; returns whether one existed
    pub fn remove_keyframe(&mut self, frame: u32) -> bool {
        let keyframes = &mut self.property.keyframes;
        match keyframes.binary_search_by_key(&frame, |k| k.frame) {
            Ok(pos) => {
                keyframes.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub fn clear_keyframes(&mut self) -> &mut Self {
        self.property.keyframes.clear();
        self
    }

    pub fn build(self) -> Property {
        self.property
    }

    fn assert_kind(&self, value: &PropertyValue) {
        let expected = self.property.metadata.kind();
        assert!(
            value.kind() == expected,
            "property '{}' holds {:?} values, got {:?}",
            self.property.metadata.title(),
            expected,
            value.kind()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PropertyMetadata;

    fn int_property() -> Property {
        Property::new(PropertyMetadata::builder("int").default_value(1i64).build())
    }

    #[test]
    fn test_new_property_uses_default() {
        let property = int_property();
        assert_eq!(property.value(), &PropertyValue::Int(1));
        assert!(!property.is_animated());
    }

    #[test]
    fn test_builder_leaves_original_untouched() {
        let original = int_property();
        let mut builder = original.to_builder();
        builder.set(2i64);
        let edited = builder.build();

        assert_eq!(original.value(), &PropertyValue::Int(1));
        assert_eq!(edited.value(), &PropertyValue::Int(2));
        assert_eq!(original.id(), edited.id());
        assert_ne!(original, edited);
    }

    #[test]
    fn test_keyframes_stay_sorted_and_unique() {
        let mut builder = int_property().to_builder();
        builder.set_keyframe(10, 3i64).set_keyframe(0, 1i64).set_keyframe(10, 4i64);
        let property = builder.build();

        let frames: Vec<_> = property.keyframes().iter().map(|k| k.frame).collect();
        assert_eq!(frames, vec![0, 10]);
        assert_eq!(property.value_at(5), &PropertyValue::Int(1));
        assert_eq!(property.value_at(12), &PropertyValue::Int(4));
        assert!(property.is_animated());
    }

    #[test]
    fn test_value_at_before_first_keyframe_uses_static_value() {
        let mut builder = int_property().to_builder();
        builder.set(7i64).set_keyframe(5, 9i64);
        assert_eq!(builder.build().value_at(2), &PropertyValue::Int(7));
    }

    #[test]
    fn test_remove_keyframe() {
        let mut builder = int_property().to_builder();
        builder.set_keyframe(3, 2i64);
        assert!(builder.remove_keyframe(3));
        assert!(!builder.remove_keyframe(3));
        assert!(!builder.build().is_animated());
    }

    #[test]
    #[should_panic(expected = "holds Int values")]
    fn test_wrong_kind_panics() {
        let mut builder = int_property().to_builder();
        builder.set("text");
    }
}
