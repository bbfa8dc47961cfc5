//! Enumerating the devices known to a local adapter.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::ble::bus::ObjectBus;
use crate::ble::device::BleDevice;
use crate::ble::path::ObjectPath;
use crate::error::Result;

/// Adapter used when none is given.
pub const DEFAULT_ADAPTER: &str = "hci0";

/// Predicate deciding which devices [`fetch_devices`] returns.
///
/// Filters may read remote properties; they are awaited one device at a time.
#[async_trait]
pub trait DeviceFilter: Send + Sync {
    /// Whether `device` should be returned.
    async fn matches(&self, device: &BleDevice) -> Result<bool>;
}

/// Accepts every device.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

#[async_trait]
impl DeviceFilter for AcceptAll {
    async fn matches(&self, _device: &BleDevice) -> Result<bool> {
        Ok(true)
    }
}

/// Accepts devices whose `Name` equals `name`, optionally only connected ones.
#[derive(Debug, Clone)]
pub struct NameFilter {
    /// Exact device name.
    pub name: String,
    /// Also require `Connected == true`.
    pub require_connected: bool,
}

impl NameFilter {
    /// Match on name only.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            require_connected: false,
        }
    }

    /// Match on name and require an established connection.
    pub fn connected(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            require_connected: true,
        }
    }
}

#[async_trait]
impl DeviceFilter for NameFilter {
    async fn matches(&self, device: &BleDevice) -> Result<bool> {
        if device.name().await?.as_deref() != Some(self.name.as_str()) {
            return Ok(false);
        }

        if self.require_connected {
            return Ok(device.connected().await?.unwrap_or(false));
        }

        Ok(true)
    }
}

/// List the devices under `/org/bluez/{adapter}` accepted by `filter`.
///
/// Every call re-reads the object tree; nothing is cached between calls.
pub async fn fetch_devices<F>(
    bus: &Arc<dyn ObjectBus>,
    filter: &F,
    adapter: &str,
) -> Result<Vec<Arc<BleDevice>>>
where
    F: DeviceFilter + ?Sized,
{
    let adapter_path = ObjectPath::adapter(adapter);
    let nodes = bus.child_nodes(&adapter_path).await?;

    let mut devices = Vec::new();
    for node in nodes {
        let device = BleDevice::new(bus.clone(), adapter_path.child(&node));

        if filter.matches(&device).await? {
            trace!("{} accepted", device.path());
            devices.push(device);
        }
    }

    debug!("{} devices matched on {}", devices.len(), adapter);

    Ok(devices)
}
