//! # Property Values
//!
//! The closed set of value types a property can hold. A property's variant is
//! fixed by the default value in its metadata; edits may change the value but
//! never its kind.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Typed value held by a property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Vec2([f64; 2]),
    Vec3([f64; 3]),
    String(String),
}

/// Discriminant of a [`PropertyValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Int,
    Double,
    Vec2,
    Vec3,
    String,
}

impl PropertyValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Bool(_) => ValueKind::Bool,
            PropertyValue::Int(_) => ValueKind::Int,
            PropertyValue::Double(_) => ValueKind::Double,
            PropertyValue::Vec2(_) => ValueKind::Vec2,
            PropertyValue::Vec3(_) => ValueKind::Vec3,
            PropertyValue::String(_) => ValueKind::String,
        }
    }

    /// Extract the value as a concrete Rust type
    pub fn get<T: PropertyType>(&self) -> Option<T> {
        T::from_value(self)
    }
}

// Floats compare and hash by bit pattern, with both zeroes and every NaN
// folded together. A NaN value therefore equals itself.
fn float_bits(v: f64) -> u64 {
    if v == 0.0 {
        0
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

fn floats_eq(a: &[f64], b: &[f64]) -> bool {
    a.iter().zip(b).all(|(x, y)| float_bits(*x) == float_bits(*y))
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a == b,
            (PropertyValue::Int(a), PropertyValue::Int(b)) => a == b,
            (PropertyValue::Double(a), PropertyValue::Double(b)) => float_bits(*a) == float_bits(*b),
            (PropertyValue::Vec2(a), PropertyValue::Vec2(b)) => floats_eq(a, b),
            (PropertyValue::Vec3(a), PropertyValue::Vec3(b)) => floats_eq(a, b),
            (PropertyValue::String(a), PropertyValue::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PropertyValue {}

impl Hash for PropertyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            PropertyValue::Bool(v) => v.hash(state),
            PropertyValue::Int(v) => v.hash(state),
            PropertyValue::Double(v) => float_bits(*v).hash(state),
            PropertyValue::Vec2(v) => v.iter().for_each(|c| float_bits(*c).hash(state)),
            PropertyValue::Vec3(v) => v.iter().for_each(|c| float_bits(*c).hash(state)),
            PropertyValue::String(v) => v.hash(state),
        }
    }
}

/// Rust types that back a [`PropertyValue`] variant
pub trait PropertyType: Sized {
    const KIND: ValueKind;

    fn default_value() -> PropertyValue;

    fn from_value(value: &PropertyValue) -> Option<Self>;

    fn into_value(self) -> PropertyValue;
}

macro_rules! property_type {
    ($ty:ty, $variant:ident, $default:expr) => {
        impl PropertyType for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn default_value() -> PropertyValue {
                PropertyValue::$variant($default)
            }

            fn from_value(value: &PropertyValue) -> Option<Self> {
                match value {
                    PropertyValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }

            fn into_value(self) -> PropertyValue {
                PropertyValue::$variant(self)
            }
        }

        impl From<$ty> for PropertyValue {
            fn from(value: $ty) -> Self {
                PropertyValue::$variant(value)
            }
        }
    };
}

property_type!(bool, Bool, false);
property_type!(i64, Int, 0);
property_type!(f64, Double, 0.0);
property_type!([f64; 2], Vec2, [0.0; 2]);
property_type!([f64; 3], Vec3, [0.0; 3]);
property_type!(String, String, String::new());

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

/// A value pinned to a frame of an animated property
#[derive(Debug, Clone, PartialEq, Hash, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: u32,
    pub value: PropertyValue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(value: &PropertyValue) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_defaults_match_kind() {
        assert_eq!(i64::default_value(), PropertyValue::Int(0));
        assert_eq!(<[f64; 3]>::default_value().kind(), ValueKind::Vec3);
        assert_eq!(String::default_value(), PropertyValue::String(String::new()));
    }

    #[test]
    fn test_get_typed_value() {
        let value = PropertyValue::from(2.5);
        assert_eq!(value.get::<f64>(), Some(2.5));
        assert_eq!(value.get::<i64>(), None);
    }

    #[test]
    fn test_equal_values_hash_equal() {
        let a = PropertyValue::Vec2([1.0, 2.0]);
        let b = PropertyValue::Vec2([1.0, 2.0]);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(hash_of(&a), hash_of(&PropertyValue::Vec2([2.0, 1.0])));
    }

    #[test]
    fn test_signed_zeroes_hash_equal() {
        assert_eq!(
            hash_of(&PropertyValue::Double(0.0)),
            hash_of(&PropertyValue::Double(-0.0))
        );
    }

    #[test]
    fn test_nan_equals_itself() {
        let nan = PropertyValue::Double(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_eq!(PropertyValue::Vec3([1.0, f64::NAN, 0.0]), PropertyValue::Vec3([1.0, -f64::NAN, -0.0]));
        assert_eq!(hash_of(&nan), hash_of(&PropertyValue::Double(-f64::NAN)));
        assert_ne!(nan, PropertyValue::Double(0.0));
    }

    #[test]
    fn test_kind_participates_in_hash() {
        assert_ne!(
            hash_of(&PropertyValue::Int(0)),
            hash_of(&PropertyValue::Bool(false))
        );
    }
}
