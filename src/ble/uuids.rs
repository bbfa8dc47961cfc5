//! BLE Service and Characteristic UUIDs.
//!
//! Contains the UUID constants used to locate the alarm actuator, plus the
//! standard SIG assignments the inspection tool labels when dumping a GATT tree.

use uuid::Uuid;

// Immediate Alert Service (Standard BLE, used by ITAG key finders)
/// Standard BLE Immediate Alert Service UUID.
pub const IMMEDIATE_ALERT_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_1802_0000_1000_8000_00805f9b34fb);
/// Alert Level characteristic UUID (Write: 0 = off, 1 = mild, 2 = high).
pub const ALERT_LEVEL_UUID: Uuid = Uuid::from_u128(0x0000_2a06_0000_1000_8000_00805f9b34fb);

// Generic services present on most peripherals
/// Generic Access Service UUID.
pub const GENERIC_ACCESS_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_1800_0000_1000_8000_00805f9b34fb);
/// Generic Attribute Service UUID.
pub const GENERIC_ATTRIBUTE_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_1801_0000_1000_8000_00805f9b34fb);
/// Link Loss Service UUID.
pub const LINK_LOSS_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_1803_0000_1000_8000_00805f9b34fb);
/// Tx Power Service UUID.
pub const TX_POWER_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_1804_0000_1000_8000_00805f9b34fb);
/// Battery Service UUID.
pub const BATTERY_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_180f_0000_1000_8000_00805f9b34fb);
/// Battery Level characteristic UUID.
pub const BATTERY_LEVEL_UUID: Uuid = Uuid::from_u128(0x0000_2a19_0000_1000_8000_00805f9b34fb);

// Device Information Service (Standard BLE)
/// Standard BLE Device Information Service UUID.
pub const DEVICE_INFO_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_180a_0000_1000_8000_00805f9b34fb);
/// Manufacturer Name characteristic UUID.
pub const MANUFACTURER_NAME_UUID: Uuid = Uuid::from_u128(0x0000_2a29_0000_1000_8000_00805f9b34fb);
/// Model Number characteristic UUID.
pub const MODEL_NUMBER_UUID: Uuid = Uuid::from_u128(0x0000_2a24_0000_1000_8000_00805f9b34fb);
/// Firmware Revision characteristic UUID.
pub const FIRMWARE_REVISION_UUID: Uuid = Uuid::from_u128(0x0000_2a26_0000_1000_8000_00805f9b34fb);

/// Device name characteristic UUID.
pub const DEVICE_NAME_UUID: Uuid = Uuid::from_u128(0x0000_2a00_0000_1000_8000_00805f9b34fb);
/// Appearance characteristic UUID.
pub const APPEARANCE_UUID: Uuid = Uuid::from_u128(0x0000_2a01_0000_1000_8000_00805f9b34fb);

/// Human readable name of a well-known UUID, if this crate knows it.
pub fn describe(uuid: &Uuid) -> Option<&'static str> {
    let name = match *uuid {
        IMMEDIATE_ALERT_SERVICE_UUID => "Immediate Alert",
        ALERT_LEVEL_UUID => "Alert Level",
        GENERIC_ACCESS_SERVICE_UUID => "Generic Access",
        GENERIC_ATTRIBUTE_SERVICE_UUID => "Generic Attribute",
        LINK_LOSS_SERVICE_UUID => "Link Loss",
        TX_POWER_SERVICE_UUID => "Tx Power",
        BATTERY_SERVICE_UUID => "Battery",
        BATTERY_LEVEL_UUID => "Battery Level",
        DEVICE_INFO_SERVICE_UUID => "Device Information",
        MANUFACTURER_NAME_UUID => "Manufacturer Name",
        MODEL_NUMBER_UUID => "Model Number",
        FIRMWARE_REVISION_UUID => "Firmware Revision",
        DEVICE_NAME_UUID => "Device Name",
        APPEARANCE_UUID => "Appearance",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        // BlueZ reports UUIDs in canonical lowercase hyphenated form.
        assert_eq!(
            IMMEDIATE_ALERT_SERVICE_UUID.to_string(),
            "00001802-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            ALERT_LEVEL_UUID.to_string(),
            "00002a06-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_parse_roundtrip_from_bus_string() {
        let parsed = Uuid::parse_str("00002A06-0000-1000-8000-00805F9B34FB").unwrap();
        assert_eq!(parsed, ALERT_LEVEL_UUID);
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(&IMMEDIATE_ALERT_SERVICE_UUID), Some("Immediate Alert"));
        assert_eq!(describe(&BATTERY_LEVEL_UUID), Some("Battery Level"));
        assert_eq!(describe(&Uuid::nil()), None);
    }
}
