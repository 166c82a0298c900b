//! iOS companion app integration.
//!
//! The companion app reports each device's identity and battery status;
//! the [`DeviceStore`] keeps the latest report per device and publishes it
//! on `ios.<device id>`, where the battery [`sensor`] entities pick it up.

pub mod device;
pub mod icon;
pub mod sensor;
pub mod store;

pub use device::{Battery, BatteryState, DeviceDetails, DeviceRecord};
pub use sensor::{IosSensor, SENSOR_TYPES, SensorDescription, SensorKind, SensorValue, setup_entry};
pub use store::{DeviceStore, DeviceUpdates};

/// Integration domain; also the namespace of device identifiers and signals.
pub const DOMAIN: &str = "ios";

/// Manufacturer reported for every device.
pub const MANUFACTURER: &str = "Apple";

/// Signal carrying updated records for `device_id`.
pub fn device_signal(device_id: &str) -> String {
    format!("{DOMAIN}.{device_id}")
}
