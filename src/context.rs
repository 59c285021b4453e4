//! The simulation context: an explicit registry of per-device capability
//! stores behind one lock.
//!
//! One store exists per discovered device, created at discovery and removed
//! at teardown. The single mutex serializes discovery, profile loading, and
//! every query, so no caller can observe a partially populated store: it is
//! either pre-load (real values only) or fully loaded.

use crate::diag::Warning;
use crate::profile::load_profile;
use crate::store::{DeviceBaseline, DeviceCaps};
use crate::SimulationConfig;
use anyhow::{Result, bail};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Opaque handle identifying a discovered device.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DeviceHandle(pub u64);

/// Owns every per-device capability store for the process.
pub struct SimulationContext {
    config: SimulationConfig,
    devices: Mutex<BTreeMap<DeviceHandle, DeviceCaps>>,
}

impl SimulationContext {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            devices: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Create the store for a newly discovered device and apply every
    /// configured profile document to it.
    ///
    /// A document that fails to load is reported and contributes no
    /// overrides, unless `fail_on_error` is set, in which case the error
    /// propagates before the device is registered at all. Duplicate handles
    /// are rejected.
    pub fn register_device(
        &self,
        handle: DeviceHandle,
        baseline: DeviceBaseline,
    ) -> Result<Vec<Warning>> {
        let mut store = DeviceCaps::new(
            baseline,
            self.config.policies,
            self.config.emulate_portability,
        );
        let mut warnings = Vec::new();
        for path in &self.config.profile_paths {
            match load_profile(&mut store, path) {
                Ok(mut loaded) => warnings.append(&mut loaded),
                Err(err) if self.config.fail_on_error => return Err(err.into()),
                Err(err) => {
                    log::error!("{err}; device {} runs without this document", handle.0);
                }
            }
        }

        let mut devices = self.lock_devices();
        if devices.contains_key(&handle) {
            bail!("device {} is already registered", handle.0);
        }
        devices.insert(handle, store);
        Ok(warnings)
    }

    /// Overlay one more document onto an already-registered device.
    pub fn load_document(&self, handle: DeviceHandle, path: &Path) -> Result<Vec<Warning>> {
        let mut devices = self.lock_devices();
        let Some(store) = devices.get_mut(&handle) else {
            bail!("device {} is not registered", handle.0);
        };
        Ok(load_profile(store, path)?)
    }

    /// Run a query against a device's store under the context lock.
    pub fn with_device<R>(
        &self,
        handle: DeviceHandle,
        query: impl FnOnce(&DeviceCaps) -> R,
    ) -> Option<R> {
        let devices = self.lock_devices();
        devices.get(&handle).map(query)
    }

    /// Drop the store when the device handle is destroyed.
    pub fn unregister_device(&self, handle: DeviceHandle) -> bool {
        self.lock_devices().remove(&handle).is_some()
    }

    fn lock_devices(&self) -> std::sync::MutexGuard<'_, BTreeMap<DeviceHandle, DeviceCaps>> {
        // Store mutation is staged and committed whole, so the map is
        // consistent even if a panicking caller poisoned the lock.
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DeviceBaseline;

    #[test]
    fn duplicate_registration_is_rejected() {
        let context = SimulationContext::new(SimulationConfig::default());
        context
            .register_device(DeviceHandle(7), DeviceBaseline::default())
            .expect("first registration");
        assert!(
            context
                .register_device(DeviceHandle(7), DeviceBaseline::default())
                .is_err()
        );
    }

    #[test]
    fn unregister_removes_the_store() {
        let context = SimulationContext::new(SimulationConfig::default());
        context
            .register_device(DeviceHandle(1), DeviceBaseline::default())
            .expect("registration");
        assert!(context.with_device(DeviceHandle(1), |_| ()).is_some());
        assert!(context.unregister_device(DeviceHandle(1)));
        assert!(!context.unregister_device(DeviceHandle(1)));
        assert!(context.with_device(DeviceHandle(1), |_| ()).is_none());
    }

    #[test]
    fn missing_profile_degrades_without_fatal_flag() {
        let config = SimulationConfig {
            profile_paths: vec!["/nonexistent/profile.json".into()],
            ..Default::default()
        };
        let context = SimulationContext::new(config);
        let warnings = context
            .register_device(DeviceHandle(2), DeviceBaseline::default())
            .expect("missing document degrades to no overrides");
        assert!(warnings.is_empty());

        let fatal = SimulationConfig {
            profile_paths: vec!["/nonexistent/profile.json".into()],
            fail_on_error: true,
            ..Default::default()
        };
        let context = SimulationContext::new(fatal);
        assert!(
            context
                .register_device(DeviceHandle(3), DeviceBaseline::default())
                .is_err()
        );
    }
}
