//! Known iOS devices and their latest reports.
//!
//! The store is backed by the integration's JSON configuration file
//! (`{"devices": {"<device id>": <record>}}`). Every accepted report is
//! persisted and published on the device's signal.

use super::device::DeviceRecord;
use super::device_signal;
use crate::error::{IosError, Result};
use crate::hub::{Dispatcher, Subscription};
use log::{debug, info};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Source of per-device record updates.
///
/// Entities receive one of these at construction and subscribe to their
/// own device when attached.
pub trait DeviceUpdates: Send + Sync {
    /// Call `callback` with every new record for `device_id` until the
    /// returned subscription is dropped.
    fn subscribe(
        &self,
        device_id: &str,
        callback: Box<dyn Fn(&DeviceRecord) + Send + Sync>,
    ) -> Subscription;
}

/// On-disk layout of the configuration file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    devices: BTreeMap<String, serde_json::Value>,
}

/// Thread-safe device registry with optional file persistence.
pub struct DeviceStore {
    path: Option<PathBuf>,
    devices: RwLock<BTreeMap<String, DeviceRecord>>,
    dispatcher: Dispatcher<DeviceRecord>,
}

impl DeviceStore {
    /// Store without a backing file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            devices: RwLock::new(BTreeMap::new()),
            dispatcher: Dispatcher::new(),
        }
    }

    /// Load devices from `path`. A missing file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let devices = Self::read_devices(&path)?;
        Ok(Self {
            path: Some(path),
            devices: RwLock::new(devices),
            dispatcher: Dispatcher::new(),
        })
    }

    fn read_devices(path: &Path) -> Result<BTreeMap<String, DeviceRecord>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("[iOS] No device file at {:?} (first run)", path);
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        let file: ConfigFile =
            serde_json::from_slice(&bytes).map_err(|e| IosError::InvalidConfigFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut devices = BTreeMap::new();
        for (key, value) in file.devices {
            let record = DeviceRecord::from_value(&key, value)?;
            devices.insert(key, record);
        }
        info!("[iOS] Loaded {} device(s) from {:?}", devices.len(), path);
        Ok(devices)
    }

    /// Persist the current devices. No-op for in-memory stores.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let devices = self
            .devices
            .read()
            .iter()
            .map(|(key, record)| Ok((key.clone(), serde_json::to_value(record)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&ConfigFile { devices })?;
        fs::write(path, data)?;
        debug!("[iOS] Saved devices to {:?}", path);
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All known devices keyed by device id.
    pub fn devices(&self) -> BTreeMap<String, DeviceRecord> {
        self.devices.read().clone()
    }

    pub fn get(&self, device_id: &str) -> Option<DeviceRecord> {
        self.devices.read().get(device_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// Accept a raw report from a device.
    ///
    /// Decodes it, replaces the stored record, persists, and publishes it
    /// on the device's signal. Returns the number of listeners notified.
    pub fn identify(&self, raw: serde_json::Value) -> Result<usize> {
        let key = raw
            .get("deviceId")
            .and_then(|v| v.as_str())
            .unwrap_or("<unknown>")
            .to_string();
        let record = DeviceRecord::from_value(&key, raw)?;
        self.report(record)
    }

    /// Store an already decoded record and publish it.
    ///
    /// Listeners are notified before the file is written; a failed save is
    /// still returned as an error.
    pub fn report(&self, record: DeviceRecord) -> Result<usize> {
        let device_id = record.device_id.clone();
        let is_new = self
            .devices
            .write()
            .insert(device_id.clone(), record.clone())
            .is_none();

        if is_new {
            info!("[iOS] New device {} ({})", record.name(), device_id);
        }

        let notified = self.dispatcher.send(&device_signal(&device_id), &record);
        debug!(
            "[iOS] {} battery {}% {} -> {} listener(s)",
            device_id, record.battery.level, record.battery.state, notified
        );
        self.save().map(|()| notified)
    }

    /// Forget a device. Returns the removed record.
    pub fn remove(&self, device_id: &str) -> Result<Option<DeviceRecord>> {
        let removed = self.devices.write().remove(device_id);
        if removed.is_some() {
            self.save()?;
            info!("[iOS] Removed device {}", device_id);
        }
        Ok(removed)
    }
}

impl DeviceUpdates for DeviceStore {
    fn subscribe(
        &self,
        device_id: &str,
        callback: Box<dyn Fn(&DeviceRecord) + Send + Sync>,
    ) -> Subscription {
        self.dispatcher.connect(device_signal(device_id), callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ios::BatteryState;
    use crate::ios::device::fixtures::{raw_record, record};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = DeviceStore::load(dir.path().join(".ios.conf")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_identify_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(".ios.conf");

        let store = DeviceStore::load(&path).unwrap();
        store.identify(raw_record("abc", "Phone", 40, "Charging")).unwrap();
        store.identify(raw_record("def", "iPad", 90, "Full")).unwrap();

        let reloaded = DeviceStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("abc"), Some(record("abc", "Phone", 40, "Charging")));
        assert_eq!(
            reloaded.get("def").map(|r| r.battery.state),
            Some(BatteryState::Full)
        );
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ios.conf");
        fs::write(&path, b"{ not json").unwrap();

        let err = DeviceStore::load(&path).err().unwrap();
        assert!(matches!(err, IosError::InvalidConfigFile { .. }));
    }

    #[test]
    fn test_malformed_record_in_file_names_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ios.conf");
        let content = serde_json::json!({
            "devices": { "abc": { "deviceId": "abc", "battery": { "level": 1, "state": "Full" } } }
        });
        fs::write(&path, content.to_string()).unwrap();

        match DeviceStore::load(&path) {
            Err(IosError::DeviceDecode { key, .. }) => assert_eq!(key, "abc"),
            other => panic!("expected decode error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_identify_notifies_only_that_device() {
        let store = DeviceStore::in_memory();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let _sub = store.subscribe(
            "abc",
            Box::new(move |r: &DeviceRecord| sink.lock().push(r.battery.level)),
        );

        assert_eq!(store.identify(raw_record("abc", "Phone", 10, "Charging")).unwrap(), 1);
        assert_eq!(store.identify(raw_record("def", "iPad", 20, "Charging")).unwrap(), 0);
        assert_eq!(store.identify(raw_record("abc", "Phone", 11, "Charging")).unwrap(), 1);

        assert_eq!(*seen.lock(), vec![10, 11]);
    }

    #[test]
    fn test_identify_rejects_malformed_report_without_touching_store() {
        let store = DeviceStore::in_memory();
        store.identify(raw_record("abc", "Phone", 10, "Charging")).unwrap();

        let mut bad = raw_record("abc", "Phone", 99, "Full");
        bad.as_object_mut().unwrap().remove("battery");
        let err = store.identify(bad).unwrap_err();
        assert!(err.to_string().contains("battery"));

        assert_eq!(store.get("abc").unwrap().battery.level, 10);
    }

    #[test]
    fn test_failed_save_is_returned_after_publishing() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be written
        let path = dir.path().join(".ios.conf");
        fs::create_dir(&path).unwrap();
        let store = DeviceStore {
            path: Some(path),
            devices: RwLock::new(BTreeMap::new()),
            dispatcher: Dispatcher::new(),
        };

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = store.subscribe(
            "abc",
            Box::new(move |r: &DeviceRecord| sink.lock().push(r.battery.level)),
        );

        let err = store.identify(raw_record("abc", "Phone", 10, "Charging")).unwrap_err();
        assert!(matches!(err, IosError::IoError(_)), "{err}");
        assert_eq!(*seen.lock(), vec![10]);
        assert_eq!(store.get("abc").unwrap().battery.level, 10);
    }

    #[test]
    fn test_remove_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ios.conf");
        let store = DeviceStore::load(&path).unwrap();
        store.identify(raw_record("abc", "Phone", 10, "Charging")).unwrap();

        assert!(store.remove("abc").unwrap().is_some());
        assert!(store.remove("abc").unwrap().is_none());
        assert!(DeviceStore::load(&path).unwrap().is_empty());
    }
}
