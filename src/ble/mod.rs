//! BLE communication module.
//!
//! A thin client over the BlueZ object tree: devices, their GATT services and
//! characteristics, addressed by UUID instead of bus object path.

pub mod bus;
pub mod cache;
pub mod characteristic;
pub mod device;
pub mod enumerator;
pub mod path;
pub mod property;
pub mod scanner;
pub mod service;
pub mod uuids;

#[cfg(test)]
pub(crate) mod testing;

pub use bus::{DbusBus, ObjectBus};
pub use characteristic::BleCharacteristic;
pub use device::BleDevice;
pub use enumerator::{fetch_devices, AcceptAll, DeviceFilter, NameFilter, DEFAULT_ADAPTER};
pub use path::ObjectPath;
pub use property::PropertyValue;
pub use scanner::{AdapterScanner, DiscoveredPeripheral};
pub use service::BleService;
pub use uuids::*;
