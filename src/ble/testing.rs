//! Scripted object trees for exercising the GATT clients without BlueZ.

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::ble::bus::{MockObjectBus, ObjectBus};
use crate::ble::property::PropertyValue;

/// A static BlueZ object tree served through a [`MockObjectBus`].
#[derive(Default)]
pub(crate) struct BusFixture {
    children: HashMap<String, Vec<String>>,
    properties: HashMap<(String, String), PropertyValue>,
}

impl BusFixture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a child node name under `parent`.
    pub(crate) fn node(mut self, parent: &str, name: &str) -> Self {
        self.children
            .entry(parent.to_string())
            .or_default()
            .push(name.to_string());
        self
    }

    /// Set a property on the object at `path`, whatever its interface.
    pub(crate) fn property(
        mut self,
        path: &str,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.properties
            .insert((path.to_string(), name.to_string()), value.into());
        self
    }

    /// Shorthand for the `UUID` property.
    pub(crate) fn uuid(self, path: &str, uuid: Uuid) -> Self {
        self.property(path, "UUID", uuid.to_string().as_str())
    }

    /// Install the tree on a mock. Further expectations can be added by the caller.
    pub(crate) fn into_mock(self) -> MockObjectBus {
        let mut bus = MockObjectBus::new();

        let children = self.children;
        bus.expect_child_nodes()
            .returning(move |path| Ok(children.get(path.as_str()).cloned().unwrap_or_default()));

        let properties = self.properties;
        bus.expect_get_property().returning(move |path, _, name| {
            Ok(properties
                .get(&(path.to_string(), name.to_string()))
                .cloned())
        });

        bus
    }

    pub(crate) fn into_bus(self) -> Arc<dyn ObjectBus> {
        Arc::new(self.into_mock())
    }
}
