//! System bus access.
//!
//! [`ObjectBus`] is the seam between the GATT clients and the bus: the
//! clients only ever need to list child nodes, read a property and invoke a
//! handful of BlueZ methods. [`DbusBus`] implements it over the system D-Bus
//! with zbus.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::trace;
use zbus::fdo::{IntrospectableProxy, PropertiesProxy};
use zbus::names::InterfaceName;
use zbus::zvariant::Value;
use zbus::Connection;

use crate::ble::path::ObjectPath;
use crate::ble::property::PropertyValue;
use crate::error::{Error, Result};

/// Well-known bus name of the Bluetooth daemon.
pub const BLUEZ_SERVICE: &str = "org.bluez";
/// Remote device interface.
pub const DEVICE_INTERFACE: &str = "org.bluez.Device1";
/// GATT service interface.
pub const GATT_SERVICE_INTERFACE: &str = "org.bluez.GattService1";
/// GATT characteristic interface.
pub const GATT_CHARACTERISTIC_INTERFACE: &str = "org.bluez.GattCharacteristic1";

/// Operations the GATT clients need from the system bus.
///
/// Implementations are shared read-only between every client created from
/// the same session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectBus: Send + Sync {
    /// Names of the immediate child nodes of `path`, in introspection order.
    async fn child_nodes(&self, path: &ObjectPath) -> Result<Vec<String>>;

    /// Read one property. `Ok(None)` when the object does not expose it.
    async fn get_property(
        &self,
        path: &ObjectPath,
        interface: &str,
        name: &str,
    ) -> Result<Option<PropertyValue>>;

    /// Invoke an argument-less method and wait for the reply.
    async fn call_method(&self, path: &ObjectPath, interface: &str, method: &str)
        -> Result<()>;

    /// `GattCharacteristic1.ReadValue` with no options.
    async fn read_value(&self, path: &ObjectPath) -> Result<Vec<u8>>;

    /// `GattCharacteristic1.WriteValue` with no options.
    async fn write_value(&self, path: &ObjectPath, value: &[u8]) -> Result<()>;
}

/// [`ObjectBus`] over a zbus connection to the system bus.
#[derive(Clone)]
pub struct DbusBus {
    connection: Connection,
}

impl DbusBus {
    /// Open a session on the system bus.
    ///
    /// # Errors
    ///
    /// Returns an error if the system bus is unreachable.
    pub async fn system() -> Result<Self> {
        let connection = Connection::system().await?;
        Ok(Self { connection })
    }

    /// Wrap an existing connection.
    pub fn with_connection(connection: Connection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl ObjectBus for DbusBus {
    async fn child_nodes(&self, path: &ObjectPath) -> Result<Vec<String>> {
        // Immediate children only; the ObjectManager is never queried.
        let proxy = IntrospectableProxy::builder(&self.connection)
            .destination(BLUEZ_SERVICE)?
            .path(path.as_str())?
            .build()
            .await?;

        let xml = proxy.introspect().await?;
        let nodes = parse_child_nodes(&xml)?;

        trace!("{} has {} child nodes", path, nodes.len());

        Ok(nodes)
    }

    async fn get_property(
        &self,
        path: &ObjectPath,
        interface: &str,
        name: &str,
    ) -> Result<Option<PropertyValue>> {
        let proxy = PropertiesProxy::builder(&self.connection)
            .destination(BLUEZ_SERVICE)?
            .path(path.as_str())?
            .build()
            .await?;

        let interface = InterfaceName::try_from(interface).map_err(zbus::Error::from)?;

        match proxy.get(interface, name).await {
            Ok(value) => Ok(Some(convert_value(&value))),
            // BlueZ answers InvalidArgs for a property the object does not carry.
            Err(zbus::fdo::Error::InvalidArgs(_)) => {
                trace!("{} has no property {}", path, name);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn call_method(
        &self,
        path: &ObjectPath,
        interface: &str,
        method: &str,
    ) -> Result<()> {
        self.connection
            .call_method(Some(BLUEZ_SERVICE), path.as_str(), Some(interface), method, &())
            .await?;
        Ok(())
    }

    async fn read_value(&self, path: &ObjectPath) -> Result<Vec<u8>> {
        let options: HashMap<&str, Value<'_>> = HashMap::new();
        let reply = self
            .connection
            .call_method(
                Some(BLUEZ_SERVICE),
                path.as_str(),
                Some(GATT_CHARACTERISTIC_INTERFACE),
                "ReadValue",
                &(options,),
            )
            .await?;

        let value: Vec<u8> = reply.body().deserialize()?;
        trace!("Read {} bytes from {}", value.len(), path);
        Ok(value)
    }

    async fn write_value(&self, path: &ObjectPath, value: &[u8]) -> Result<()> {
        let options: HashMap<&str, Value<'_>> = HashMap::new();
        self.connection
            .call_method(
                Some(BLUEZ_SERVICE),
                path.as_str(),
                Some(GATT_CHARACTERISTIC_INTERFACE),
                "WriteValue",
                &(value.to_vec(), options),
            )
            .await?;

        trace!("Wrote {} bytes to {}", value.len(), path);
        Ok(())
    }
}

/// Extract the child node names from an introspection document.
pub(crate) fn parse_child_nodes(xml: &str) -> Result<Vec<String>> {
    let node = zbus_xml::Node::from_reader(xml.as_bytes()).map_err(|e| Error::InvalidData {
        context: format!("introspection XML: {}", e),
    })?;

    Ok(node
        .nodes()
        .iter()
        .filter_map(|child| child.name().map(str::to_string))
        .collect())
}

/// Convert a bus variant into a [`PropertyValue`].
///
/// Variants nested inside variants are unwrapped; types BlueZ never uses for
/// the properties read here (signatures, structures, file descriptors) come
/// back as their string rendering.
fn convert_value(value: &Value<'_>) -> PropertyValue {
    match value {
        Value::Bool(b) => PropertyValue::Bool(*b),
        Value::U8(v) => PropertyValue::Byte(*v),
        Value::I16(v) => PropertyValue::Int16(*v),
        Value::U16(v) => PropertyValue::UInt16(*v),
        Value::I32(v) => PropertyValue::Int32(*v),
        Value::U32(v) => PropertyValue::UInt32(*v),
        Value::I64(v) => PropertyValue::Int64(*v),
        Value::U64(v) => PropertyValue::UInt64(*v),
        Value::F64(v) => PropertyValue::Double(*v),
        Value::Str(s) => PropertyValue::Str(s.as_str().to_string()),
        Value::ObjectPath(p) => PropertyValue::ObjectPath(p.as_str().to_string()),
        Value::Value(inner) => convert_value(inner),
        Value::Array(array) => PropertyValue::Array(array.iter().map(convert_value).collect()),
        Value::Dict(dict) => PropertyValue::Dict(
            dict.iter()
                .map(|(k, v)| (convert_value(k), convert_value(v)))
                .collect(),
        ),
        other => PropertyValue::Str(other.to_string()),
    }
}
