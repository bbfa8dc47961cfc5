//! GATT characteristic client.

use std::sync::{Arc, Weak};
use tracing::trace;
use uuid::Uuid;

use crate::ble::bus::{ObjectBus, GATT_CHARACTERISTIC_INTERFACE};
use crate::ble::path::ObjectPath;
use crate::ble::property::{read_property, FromProperty};
use crate::ble::service::BleService;
use crate::error::Result;

/// A characteristic of a remote GATT service.
///
/// Properties are read from the bus on every access.
pub struct BleCharacteristic {
    bus: Arc<dyn ObjectBus>,
    path: ObjectPath,
    uuid: Uuid,
    service: Weak<BleService>,
}

impl BleCharacteristic {
    pub(crate) fn new(
        bus: Arc<dyn ObjectBus>,
        path: ObjectPath,
        uuid: Uuid,
        service: Weak<BleService>,
    ) -> Arc<Self> {
        Arc::new(Self {
            bus,
            path,
            uuid,
            service,
        })
    }

    /// Bus object path of this characteristic.
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// UUID this characteristic was discovered under.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// The owning service, if it is still alive.
    pub fn service(&self) -> Option<Arc<BleService>> {
        self.service.upgrade()
    }

    /// Read the current value from the peripheral.
    pub async fn read_value(&self) -> Result<Vec<u8>> {
        let value = self.bus.read_value(&self.path).await?;
        trace!("{} read {:02X?}", self.uuid, value);
        Ok(value)
    }

    /// Write a new value to the peripheral.
    pub async fn write_value(&self, value: &[u8]) -> Result<()> {
        trace!("{} write {:02X?}", self.uuid, value);
        self.bus.write_value(&self.path, value).await
    }

    async fn property<T: FromProperty>(&self, name: &str) -> Result<Option<T>> {
        read_property(&self.bus, &self.path, GATT_CHARACTERISTIC_INTERFACE, name).await
    }

    /// `Service`: object path of the owning service.
    pub async fn service_path(&self) -> Result<Option<ObjectPath>> {
        self.property("Service").await
    }

    /// `Value`: last value cached by BlueZ.
    pub async fn value(&self) -> Result<Option<Vec<u8>>> {
        self.property("Value").await
    }

    /// `Notifying`
    pub async fn notifying(&self) -> Result<Option<bool>> {
        self.property("Notifying").await
    }

    /// `Flags`, e.g. `["read", "write-without-response"]`.
    pub async fn flags(&self) -> Result<Option<Vec<String>>> {
        self.property("Flags").await
    }

    /// `WriteAcquired`
    pub async fn write_acquired(&self) -> Result<Option<bool>> {
        self.property("WriteAcquired").await
    }

    /// `NotifyAcquired`
    pub async fn notify_acquired(&self) -> Result<Option<bool>> {
        self.property("NotifyAcquired").await
    }
}

impl std::fmt::Debug for BleCharacteristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleCharacteristic")
            .field("path", &self.path)
            .field("uuid", &self.uuid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::bus::MockObjectBus;
    use crate::ble::property::PropertyValue;
    use crate::ble::uuids::ALERT_LEVEL_UUID;
    use mockall::predicate::eq;

    const PATH: &str = "/org/bluez/hci0/dev_FF_FF_10_2E_4B_91/service000a/char000b";

    fn characteristic(bus: MockObjectBus) -> Arc<BleCharacteristic> {
        BleCharacteristic::new(
            Arc::new(bus),
            ObjectPath::new(PATH),
            ALERT_LEVEL_UUID,
            Weak::new(),
        )
    }

    #[tokio::test]
    async fn test_read_and_write_value() {
        let mut bus = MockObjectBus::new();
        bus.expect_write_value()
            .withf(|path, value| path.as_str() == PATH && value.to_vec() == vec![0x02])
            .times(1)
            .returning(|_, _| Ok(()));
        bus.expect_read_value()
            .with(eq(ObjectPath::new(PATH)))
            .times(1)
            .returning(|_| Ok(vec![0x02]));

        let chrc = characteristic(bus);
        chrc.write_value(&[0x02]).await.unwrap();
        assert_eq!(chrc.read_value().await.unwrap(), vec![0x02]);
    }

    #[tokio::test]
    async fn test_flags_and_missing_property() {
        let mut bus = MockObjectBus::new();
        bus.expect_get_property()
            .returning(|_, interface, name| {
                assert_eq!(interface, GATT_CHARACTERISTIC_INTERFACE);
                Ok(match name {
                    "Flags" => Some(PropertyValue::Array(vec![
                        PropertyValue::from("read"),
                        PropertyValue::from("write-without-response"),
                    ])),
                    _ => None,
                })
            });

        let chrc = characteristic(bus);
        assert_eq!(
            chrc.flags().await.unwrap(),
            Some(vec![
                "read".to_string(),
                "write-without-response".to_string()
            ])
        );
        assert_eq!(chrc.write_acquired().await.unwrap(), None);
        assert!(chrc.service().is_none());
    }
}
