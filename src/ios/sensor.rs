//! Battery sensors for iOS devices.
//!
//! Every known device gets two entities: battery level (percent) and
//! battery state. Both are push-driven: they cache the device's latest
//! record and refresh whenever the store publishes a new one.

use super::device::{BatteryState, DeviceRecord};
use super::icon::BatteryIcons;
use super::store::{DeviceStore, DeviceUpdates};
use super::{DOMAIN, MANUFACTURER};
use crate::error::Result;
use crate::hub::{AttachContext, Attributes, ConfigEntry, DeviceInfo, Entity, EntityPlatform};
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Weak};

/// Which battery field a sensor exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Level,
    State,
}

impl SensorKind {
    /// Key used in unique ids and display names.
    pub fn key(self) -> &'static str {
        match self {
            SensorKind::Level => "level",
            SensorKind::State => "state",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Static definition of one sensor kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorDescription {
    pub kind: SensorKind,
    pub name: &'static str,
    pub unit_of_measurement: Option<&'static str>,
}

pub const SENSOR_TYPES: [SensorDescription; 2] = [
    SensorDescription {
        kind: SensorKind::Level,
        name: "Battery Level",
        unit_of_measurement: Some("%"),
    },
    SensorDescription {
        kind: SensorKind::State,
        name: "Battery State",
        unit_of_measurement: None,
    },
];

/// Value shown by a battery sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorValue {
    Level(i32),
    State(BatteryState),
}

impl SensorValue {
    /// The battery field of `record` selected by `kind`.
    pub fn from_record(record: &DeviceRecord, kind: SensorKind) -> Self {
        match kind {
            SensorKind::Level => SensorValue::Level(record.battery.level),
            SensorKind::State => SensorValue::State(record.battery.state.clone()),
        }
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Level(level) => write!(f, "{level}"),
            SensorValue::State(state) => write!(f, "{state}"),
        }
    }
}

/// Cached record and the value derived from it; always replaced together.
struct Snapshot {
    device: DeviceRecord,
    /// Displayed value; set on attach and on every update.
    value: Option<SensorValue>,
}

/// Battery level or battery state of one iOS device.
pub struct IosSensor {
    description: SensorDescription,
    unique_id: String,
    name: String,
    device_id: String,
    /// Latest record for the device; replaced wholesale on update.
    snapshot: RwLock<Snapshot>,
    updates: Arc<dyn DeviceUpdates>,
}

impl IosSensor {
    pub fn new(
        device: DeviceRecord,
        description: SensorDescription,
        updates: Arc<dyn DeviceUpdates>,
    ) -> Self {
        let key = description.kind.key();
        Self {
            unique_id: format!("{key}_{}", device.device_id),
            name: format!("{} {key}", device.name()),
            device_id: device.device_id.clone(),
            description,
            snapshot: RwLock::new(Snapshot {
                device,
                value: None,
            }),
            updates,
        }
    }

    pub fn description(&self) -> &SensorDescription {
        &self.description
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Copy of the cached record.
    pub fn device(&self) -> DeviceRecord {
        self.snapshot.read().device.clone()
    }

    pub fn value(&self) -> Option<SensorValue> {
        self.snapshot.read().value.clone()
    }

    /// Replace the cached record and recompute the displayed value.
    pub fn handle_update(&self, device: DeviceRecord) {
        let value = SensorValue::from_record(&device, self.description.kind);
        debug!("[iOS] {} updated to {}", self.unique_id, value);
        *self.snapshot.write() = Snapshot {
            device,
            value: Some(value),
        };
    }

    fn refresh_value(&self) {
        let mut snapshot = self.snapshot.write();
        let value = SensorValue::from_record(&snapshot.device, self.description.kind);
        snapshot.value = Some(value);
    }
}

#[async_trait]
impl Entity for IosSensor {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        let snapshot = self.snapshot.read();
        let device = &snapshot.device;
        Some(DeviceInfo {
            identifiers: BTreeSet::from([(
                DOMAIN.to_string(),
                device.device.permanent_id.clone(),
            )]),
            name: device.device.name.clone(),
            manufacturer: MANUFACTURER.to_string(),
            model: device.device.device_type.clone(),
            sw_version: device.device.system_version.clone(),
        })
    }

    fn extra_state_attributes(&self) -> Attributes {
        let snapshot = self.snapshot.read();
        let device = &snapshot.device;
        Attributes::from([
            (
                "Battery State".to_string(),
                device.battery.state.as_str().into(),
            ),
            ("Battery Level".to_string(), device.battery.level.into()),
            (
                "Device Type".to_string(),
                device.device.device_type.clone().into(),
            ),
            ("Device Name".to_string(), device.device.name.clone().into()),
            (
                "Device Version".to_string(),
                device.device.system_version.clone().into(),
            ),
        ])
    }

    fn icon(&self) -> Option<String> {
        let icons = BatteryIcons::for_battery(&self.snapshot.read().device.battery);
        Some(match self.description.kind {
            SensorKind::State => icons.state_icon,
            SensorKind::Level => icons.level_icon(),
        })
    }

    fn state(&self) -> Option<String> {
        self.snapshot.read().value.as_ref().map(ToString::to_string)
    }

    fn unit_of_measurement(&self) -> Option<&str> {
        self.description.unit_of_measurement
    }

    fn should_poll(&self) -> bool {
        false
    }

    async fn added_to_hub(self: Arc<Self>, ctx: &mut AttachContext) -> Result<()> {
        self.refresh_value();

        let writer = ctx.state_writer();
        let sensor: Weak<Self> = Arc::downgrade(&self);
        let subscription = self.updates.subscribe(
            &self.device_id,
            Box::new(move |device: &DeviceRecord| {
                if let Some(sensor) = sensor.upgrade() {
                    sensor.handle_update(device.clone());
                    writer.write(sensor.as_ref());
                }
            }),
        );
        ctx.on_remove(subscription);
        Ok(())
    }
}

/// Build one sensor per known device and sensor type.
pub fn build_entities(
    devices: impl IntoIterator<Item = DeviceRecord>,
    updates: Arc<dyn DeviceUpdates>,
) -> Vec<Arc<IosSensor>> {
    devices
        .into_iter()
        .flat_map(|device| {
            let updates = updates.clone();
            SENSOR_TYPES.into_iter().map(move |description| {
                Arc::new(IosSensor::new(device.clone(), description, updates.clone()))
            })
        })
        .collect()
}

/// Set up the battery sensors for a config entry.
pub async fn setup_entry(
    store: &Arc<DeviceStore>,
    entry: &ConfigEntry,
    platform: &mut EntityPlatform,
) -> Result<()> {
    let updates: Arc<dyn DeviceUpdates> = store.clone();
    let entities: Vec<Arc<dyn Entity>> = build_entities(store.devices().into_values(), updates)
        .into_iter()
        .map(|sensor| sensor as Arc<dyn Entity>)
        .collect();

    info!(
        "[iOS] Setting up {} battery sensor(s) for {}",
        entities.len(),
        entry.title
    );
    platform.add_entities(entities, true).await
}
