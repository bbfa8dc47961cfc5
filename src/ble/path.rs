//! Object paths in the BlueZ object tree.

use std::fmt;

/// Root of every object BlueZ exports on the system bus.
pub const BLUEZ_ROOT: &str = "/org/bluez";

/// Hierarchical address of a bus object (adapter, device, service, characteristic).
///
/// Child paths are always `{parent}/{segment}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Wrap an existing path string.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Path of a local adapter, e.g. `/org/bluez/hci0`.
    pub fn adapter(name: &str) -> Self {
        Self(format!("{}/{}", BLUEZ_ROOT, name))
    }

    /// Path of an immediate child node.
    pub fn child(&self, segment: &str) -> Self {
        Self(format!("{}/{}", self.0, segment))
    }

    /// Last segment of the path.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
