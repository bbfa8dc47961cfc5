//! Remote BLE device client.
//!
//! A [`BleDevice`] represents one peripheral known to BlueZ and gives
//! UUID-keyed access to its GATT hierarchy. Services and characteristics are
//! discovered lazily, once, by walking the object tree under the device's
//! path. Device properties are never cached: each accessor is one bus round
//! trip, and a property the device does not expose reads as `None`.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ble::bus::{ObjectBus, DEVICE_INTERFACE, GATT_SERVICE_INTERFACE};
use crate::ble::cache::{discover_children, GattCache};
use crate::ble::path::ObjectPath;
use crate::ble::property::{read_property, FromProperty};
use crate::ble::service::BleService;
use crate::error::{Error, Result};

/// A remote BLE peripheral reachable through BlueZ.
pub struct BleDevice {
    bus: Arc<dyn ObjectBus>,
    path: ObjectPath,
    services: GattCache<BleService>,
    this: Weak<BleDevice>,
}

impl BleDevice {
    /// Create a client for the device object at `path`.
    ///
    /// Nothing is read from the bus until a service or property is requested.
    pub fn new(bus: Arc<dyn ObjectBus>, path: ObjectPath) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            bus,
            path,
            services: GattCache::new(),
            this: this.clone(),
        })
    }

    /// Bus object path of this device.
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// Look up a service by UUID, discovering services on first use.
    ///
    /// A UUID the device does not carry is `Ok(None)`.
    pub async fn service(&self, uuid: &Uuid) -> Result<Option<Arc<BleService>>> {
        Ok(self.services().await?.get(uuid).cloned())
    }

    /// All services of this device, discovering them on first use.
    ///
    /// Every call after the first returns the same mapping without touching the bus.
    pub async fn services(&self) -> Result<&HashMap<Uuid, Arc<BleService>>> {
        self.services
            .get_or_discover(|| {
                discover_children(
                    &self.bus,
                    &self.path,
                    GATT_SERVICE_INTERFACE,
                    |path, uuid| BleService::new(self.bus.clone(), path, uuid, self.this.clone()),
                )
            })
            .await
    }

    /// Connect to the peripheral and wait for BlueZ to answer.
    pub async fn connect(&self) -> Result<()> {
        debug!("Connecting to {}", self.path);
        self.bus
            .call_method(&self.path, DEVICE_INTERFACE, "Connect")
            .await?;
        info!("Connected to {}", self.path);
        Ok(())
    }

    /// Issue a connection request in the background.
    ///
    /// Exactly one of `on_success` and `on_error` is invoked once BlueZ
    /// answers. The request is not retried.
    ///
    /// The continuation runs on a task of the current Tokio runtime. On a
    /// current-thread runtime that is the caller's thread; on a multi-thread
    /// runtime it may be any worker, hence the `Send` bounds.
    pub fn connect_with<S, E>(&self, on_success: S, on_error: E) -> JoinHandle<()>
    where
        S: FnOnce() + Send + 'static,
        E: FnOnce(Error) + Send + 'static,
    {
        let bus = self.bus.clone();
        let path = self.path.clone();

        tokio::spawn(async move {
            match bus.call_method(&path, DEVICE_INTERFACE, "Connect").await {
                Ok(()) => on_success(),
                Err(e) => on_error(e),
            }
        })
    }

    /// Disconnect from the peripheral.
    pub async fn disconnect(&self) -> Result<()> {
        self.bus
            .call_method(&self.path, DEVICE_INTERFACE, "Disconnect")
            .await?;
        info!("Disconnected from {}", self.path);
        Ok(())
    }

    async fn property<T: FromProperty>(&self, name: &str) -> Result<Option<T>> {
        read_property(&self.bus, &self.path, DEVICE_INTERFACE, name).await
    }

    /// `Address`, e.g. `FF:FF:10:2E:4B:91`.
    pub async fn address(&self) -> Result<Option<String>> {
        self.property("Address").await
    }

    /// `AddressType`: `public` or `random`.
    pub async fn address_type(&self) -> Result<Option<String>> {
        self.property("AddressType").await
    }

    /// `Name` as advertised by the peripheral.
    pub async fn name(&self) -> Result<Option<String>> {
        self.property("Name").await
    }

    /// `Alias`
    pub async fn alias(&self) -> Result<Option<String>> {
        self.property("Alias").await
    }

    /// `Class` of device.
    pub async fn class(&self) -> Result<Option<u32>> {
        self.property("Class").await
    }

    /// `Appearance`
    pub async fn appearance(&self) -> Result<Option<u16>> {
        self.property("Appearance").await
    }

    /// `Icon`
    pub async fn icon(&self) -> Result<Option<String>> {
        self.property("Icon").await
    }

    /// `Paired`
    pub async fn paired(&self) -> Result<Option<bool>> {
        self.property("Paired").await
    }

    /// `Trusted`
    pub async fn trusted(&self) -> Result<Option<bool>> {
        self.property("Trusted").await
    }

    /// `Blocked`
    pub async fn blocked(&self) -> Result<Option<bool>> {
        self.property("Blocked").await
    }

    /// `LegacyPairing`
    pub async fn legacy_pairing(&self) -> Result<Option<bool>> {
        self.property("LegacyPairing").await
    }

    /// `RSSI` in dBm. Only present while the adapter is discovering.
    pub async fn rssi(&self) -> Result<Option<i16>> {
        self.property("RSSI").await
    }

    /// `Connected`
    pub async fn connected(&self) -> Result<Option<bool>> {
        self.property("Connected").await
    }

    /// `UUIDs` of the advertised services.
    pub async fn uuids(&self) -> Result<Option<Vec<String>>> {
        self.property("UUIDs").await
    }

    /// `Modalias`
    pub async fn modalias(&self) -> Result<Option<String>> {
        self.property("Modalias").await
    }

    /// `Adapter`: object path of the local adapter.
    pub async fn adapter(&self) -> Result<Option<ObjectPath>> {
        self.property("Adapter").await
    }

    /// `ManufacturerData` keyed by company identifier.
    pub async fn manufacturer_data(&self) -> Result<Option<HashMap<u16, Vec<u8>>>> {
        self.property("ManufacturerData").await
    }

    /// `ServiceData` keyed by service UUID.
    pub async fn service_data(&self) -> Result<Option<HashMap<String, Vec<u8>>>> {
        self.property("ServiceData").await
    }

    /// `TxPower` in dBm.
    pub async fn tx_power(&self) -> Result<Option<i16>> {
        self.property("TxPower").await
    }

    /// `ServicesResolved`
    pub async fn services_resolved(&self) -> Result<Option<bool>> {
        self.property("ServicesResolved").await
    }

    /// `AdvertisingFlags`
    pub async fn advertising_flags(&self) -> Result<Option<Vec<u8>>> {
        self.property("AdvertisingFlags").await
    }

    /// `AdvertisingData` keyed by AD type.
    pub async fn advertising_data(&self) -> Result<Option<HashMap<u8, Vec<u8>>>> {
        self.property("AdvertisingData").await
    }
}

impl std::fmt::Debug for BleDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleDevice")
            .field("path", &self.path)
            .field("discovered", &self.services.is_discovered())
            .finish()
    }
}
