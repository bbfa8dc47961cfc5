//! GATT service client.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use uuid::Uuid;

use crate::ble::bus::{ObjectBus, GATT_CHARACTERISTIC_INTERFACE, GATT_SERVICE_INTERFACE};
use crate::ble::cache::{discover_children, GattCache};
use crate::ble::characteristic::BleCharacteristic;
use crate::ble::device::BleDevice;
use crate::ble::path::ObjectPath;
use crate::ble::property::{read_property, FromProperty};
use crate::error::Result;

/// A primary or secondary service of a remote peripheral.
pub struct BleService {
    bus: Arc<dyn ObjectBus>,
    path: ObjectPath,
    uuid: Uuid,
    device: Weak<BleDevice>,
    characteristics: GattCache<BleCharacteristic>,
    this: Weak<BleService>,
}

impl BleService {
    pub(crate) fn new(
        bus: Arc<dyn ObjectBus>,
        path: ObjectPath,
        uuid: Uuid,
        device: Weak<BleDevice>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            bus,
            path,
            uuid,
            device,
            characteristics: GattCache::new(),
            this: this.clone(),
        })
    }

    /// Bus object path of this service.
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// UUID this service was discovered under.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// The owning device, if it is still alive.
    pub fn device(&self) -> Option<Arc<BleDevice>> {
        self.device.upgrade()
    }

    /// Look up a characteristic by UUID, discovering characteristics on first use.
    ///
    /// A UUID the service does not carry is `Ok(None)`.
    pub async fn characteristic(&self, uuid: &Uuid) -> Result<Option<Arc<BleCharacteristic>>> {
        Ok(self.characteristics().await?.get(uuid).cloned())
    }

    /// All characteristics of this service, discovering them on first use.
    pub async fn characteristics(&self) -> Result<&HashMap<Uuid, Arc<BleCharacteristic>>> {
        self.characteristics
            .get_or_discover(|| {
                discover_children(
                    &self.bus,
                    &self.path,
                    GATT_CHARACTERISTIC_INTERFACE,
                    |path, uuid| {
                        BleCharacteristic::new(self.bus.clone(), path, uuid, self.this.clone())
                    },
                )
            })
            .await
    }

    async fn property<T: FromProperty>(&self, name: &str) -> Result<Option<T>> {
        read_property(&self.bus, &self.path, GATT_SERVICE_INTERFACE, name).await
    }

    /// `Device`: object path of the owning device.
    pub async fn device_path(&self) -> Result<Option<ObjectPath>> {
        self.property("Device").await
    }

    /// `Primary`
    pub async fn primary(&self) -> Result<Option<bool>> {
        self.property("Primary").await
    }

    /// `Includes`: object paths of included services.
    pub async fn includes(&self) -> Result<Option<Vec<ObjectPath>>> {
        self.property("Includes").await
    }
}

impl std::fmt::Debug for BleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleService")
            .field("path", &self.path)
            .field("uuid", &self.uuid)
            .field("discovered", &self.characteristics.is_discovered())
            .finish()
    }
}
