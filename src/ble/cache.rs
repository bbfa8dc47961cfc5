//! Discover-once GATT child caches.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;
use uuid::Uuid;

use crate::ble::bus::ObjectBus;
use crate::ble::path::ObjectPath;
use crate::ble::property::read_property;
use crate::error::{Error, Result};

/// UUID-keyed children of a GATT object.
///
/// Starts out undiscovered; the first lookup populates it and every later
/// lookup reuses the same mapping. There is no way back to the undiscovered
/// state, so a topology change on the peripheral is only seen by a new client.
pub struct GattCache<T> {
    entries: OnceCell<HashMap<Uuid, Arc<T>>>,
}

impl<T> GattCache<T> {
    /// Create an undiscovered cache.
    pub fn new() -> Self {
        Self {
            entries: OnceCell::new(),
        }
    }

    /// Whether discovery has completed.
    pub fn is_discovered(&self) -> bool {
        self.entries.initialized()
    }

    /// Return the cached mapping, running `discover` first if needed.
    ///
    /// A failed discovery leaves the cache undiscovered.
    pub async fn get_or_discover<F, Fut>(&self, discover: F) -> Result<&HashMap<Uuid, Arc<T>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<HashMap<Uuid, Arc<T>>>>,
    {
        self.entries.get_or_try_init(discover).await
    }
}

impl<T> Default for GattCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Enumerate the children of `parent` and key them by their UUID property.
///
/// Children are visited in introspection order; on a UUID collision the one
/// visited last replaces the earlier entry.
pub(crate) async fn discover_children<T, F>(
    bus: &Arc<dyn ObjectBus>,
    parent: &ObjectPath,
    interface: &str,
    build: F,
) -> Result<HashMap<Uuid, Arc<T>>>
where
    F: Fn(ObjectPath, Uuid) -> Arc<T>,
{
    let mut children = HashMap::new();

    for node in bus.child_nodes(parent).await? {
        let path = parent.child(&node);

        let Some(uuid) = read_uuid(bus, &path, interface).await? else {
            debug!("Skipping {}: no UUID on {}", path, interface);
            continue;
        };

        if children.insert(uuid, build(path.clone(), uuid)).is_some() {
            debug!("Duplicate UUID {} under {}, keeping {}", uuid, parent, path);
        }
    }

    debug!("Discovered {} children under {}", children.len(), parent);

    Ok(children)
}

/// Read and parse the `UUID` property of a GATT object.
pub(crate) async fn read_uuid(
    bus: &Arc<dyn ObjectBus>,
    path: &ObjectPath,
    interface: &str,
) -> Result<Option<Uuid>> {
    let Some(raw) = read_property::<String>(bus, path, interface, "UUID").await? else {
        return Ok(None);
    };

    Uuid::parse_str(&raw)
        .map(Some)
        .map_err(|_| Error::InvalidData {
            context: format!("{} reports malformed UUID {:?}", path, raw),
        })
}
