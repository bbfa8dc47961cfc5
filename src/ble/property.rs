//! Remote property values.
//!
//! BlueZ exposes everything as D-Bus properties carried in variants. The bus
//! backend converts them into [`PropertyValue`], and the typed accessors on
//! the GATT clients turn that into plain Rust types through [`FromProperty`].

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use crate::ble::bus::ObjectBus;
use crate::ble::path::ObjectPath;
use crate::error::{Error, Result};

/// A dynamically typed property value read from the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// `b`
    Bool(bool),
    /// `y`
    Byte(u8),
    /// `n`
    Int16(i16),
    /// `q`
    UInt16(u16),
    /// `i`
    Int32(i32),
    /// `u`
    UInt32(u32),
    /// `x`
    Int64(i64),
    /// `t`
    UInt64(u64),
    /// `d`
    Double(f64),
    /// `s`
    Str(String),
    /// `o`
    ObjectPath(String),
    /// `a*`
    Array(Vec<PropertyValue>),
    /// `a{**}`, entries in bus order.
    Dict(Vec<(PropertyValue, PropertyValue)>),
}

impl PropertyValue {
    /// Short type name used in error messages.
    fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Byte(_) => "byte",
            Self::Int16(_) => "int16",
            Self::UInt16(_) => "uint16",
            Self::Int32(_) => "int32",
            Self::UInt32(_) => "uint32",
            Self::Int64(_) => "int64",
            Self::UInt64(_) => "uint64",
            Self::Double(_) => "double",
            Self::Str(_) => "string",
            Self::ObjectPath(_) => "object path",
            Self::Array(_) => "array",
            Self::Dict(_) => "dict",
        }
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::InvalidData {
            context: format!("expected {} property, got {}", expected, self.kind()),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Array(value.into_iter().map(Self::Byte).collect())
    }
}

/// Conversion from a [`PropertyValue`] into a concrete type.
pub trait FromProperty: Sized {
    /// Convert, failing with [`Error::InvalidData`] on a type mismatch.
    fn from_property(value: PropertyValue) -> Result<Self>;
}

impl FromProperty for PropertyValue {
    fn from_property(value: PropertyValue) -> Result<Self> {
        Ok(value)
    }
}

impl FromProperty for bool {
    fn from_property(value: PropertyValue) -> Result<Self> {
        match value {
            PropertyValue::Bool(b) => Ok(b),
            other => Err(other.mismatch("bool")),
        }
    }
}

impl FromProperty for u8 {
    fn from_property(value: PropertyValue) -> Result<Self> {
        match value {
            PropertyValue::Byte(b) => Ok(b),
            other => Err(other.mismatch("byte")),
        }
    }
}

impl FromProperty for i16 {
    fn from_property(value: PropertyValue) -> Result<Self> {
        match value {
            PropertyValue::Int16(v) => Ok(v),
            other => Err(other.mismatch("int16")),
        }
    }
}

impl FromProperty for u16 {
    fn from_property(value: PropertyValue) -> Result<Self> {
        match value {
            PropertyValue::UInt16(v) => Ok(v),
            other => Err(other.mismatch("uint16")),
        }
    }
}

impl FromProperty for u32 {
    fn from_property(value: PropertyValue) -> Result<Self> {
        match value {
            PropertyValue::UInt32(v) => Ok(v),
            other => Err(other.mismatch("uint32")),
        }
    }
}

impl FromProperty for String {
    fn from_property(value: PropertyValue) -> Result<Self> {
        match value {
            PropertyValue::Str(s) | PropertyValue::ObjectPath(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }
}

impl FromProperty for ObjectPath {
    fn from_property(value: PropertyValue) -> Result<Self> {
        match value {
            PropertyValue::ObjectPath(p) => Ok(ObjectPath::new(p)),
            other => Err(other.mismatch("object path")),
        }
    }
}

impl<T: FromProperty> FromProperty for Vec<T> {
    fn from_property(value: PropertyValue) -> Result<Self> {
        match value {
            PropertyValue::Array(items) => items.into_iter().map(T::from_property).collect(),
            other => Err(other.mismatch("array")),
        }
    }
}

impl<K, V> FromProperty for HashMap<K, V>
where
    K: FromProperty + Eq + Hash,
    V: FromProperty,
{
    fn from_property(value: PropertyValue) -> Result<Self> {
        match value {
            PropertyValue::Dict(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_property(k)?, V::from_property(v)?)))
                .collect(),
            other => Err(other.mismatch("dict")),
        }
    }
}

/// Read one property and convert it.
///
/// A property the object does not expose is `Ok(None)`.
pub(crate) async fn read_property<T: FromProperty>(
    bus: &Arc<dyn ObjectBus>,
    path: &ObjectPath,
    interface: &str,
    name: &str,
) -> Result<Option<T>> {
    bus.get_property(path, interface, name)
        .await?
        .map(T::from_property)
        .transpose()
}
