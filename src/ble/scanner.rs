//! Adapter discovery scan.
//!
//! BlueZ only exports device objects for peripherals it has seen. Running a
//! short discovery session on the adapter before enumerating makes a freshly
//! powered actuator show up under the adapter path.

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager};
use futures::stream::StreamExt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};

/// A peripheral seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPeripheral {
    /// Bluetooth address.
    pub address: String,
    /// Advertised local name, if any.
    pub local_name: Option<String>,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
}

/// Runs discovery sessions on one local adapter.
pub struct AdapterScanner {
    adapter: Adapter,
}

impl AdapterScanner {
    /// Open the adapter whose info string mentions `name` (e.g. `hci0`).
    ///
    /// Falls back to the first adapter when none matches.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new(name: &str) -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let mut fallback = None;
        for adapter in adapters {
            let info = adapter.adapter_info().await.unwrap_or_default();
            if info.contains(name) {
                info!("Using Bluetooth adapter: {}", info);
                return Ok(Self { adapter });
            }
            fallback.get_or_insert(adapter);
        }

        let adapter = fallback.ok_or(Error::BluetoothUnavailable)?;
        warn!("No adapter named {}, using the first one", name);
        Ok(Self { adapter })
    }

    /// Create a scanner for a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self { adapter }
    }

    /// Discover for `duration`, then report every peripheral the adapter knows.
    pub async fn scan_for(&self, duration: Duration) -> Result<Vec<DiscoveredPeripheral>> {
        info!("Scanning for {:?}", duration);

        let mut events = self.adapter.events().await.map_err(Error::Bluetooth)?;

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;

        let deadline = Instant::now() + duration;
        loop {
            tokio::select! {
                Some(event) = events.next() => {
                    if let CentralEvent::DeviceDiscovered(id) = event {
                        trace!("Device discovered: {:?}", id);
                    }
                }
                _ = tokio::time::sleep_until(deadline) => break,
            }
        }

        self.adapter.stop_scan().await.map_err(Error::Bluetooth)?;

        let mut found = Vec::new();
        for peripheral in self.adapter.peripherals().await.map_err(Error::Bluetooth)? {
            let properties = match peripheral.properties().await {
                Ok(Some(p)) => p,
                _ => continue,
            };

            found.push(DiscoveredPeripheral {
                address: properties.address.to_string(),
                local_name: properties.local_name,
                rssi: properties.rssi,
            });
        }

        debug!("Scan finished with {} peripherals", found.len());

        Ok(found)
    }
}
