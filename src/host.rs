//! Ownership of every resource a run touches.
//!
//! [`HostContext::acquire`] opens the mandatory memory source first, then
//! discovers and opens everything else best-effort. Handles are owned values,
//! so they are closed when the context is released or dropped, whichever
//! path the run takes.

use crate::collectors::battery::BatteryHandles;
use crate::collectors::wifi::{IwClient, WifiLink};
use crate::config::{Config, ConfigError};
use crate::handles::{open_each, open_many, OpenBatch, SensorHandle};
use crate::locator::{self, SensorLayout};
use regex::Regex;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("cannot open memory source {path}: {source}")]
    MandatorySource {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug)]
pub struct HostContext {
    pub meminfo: SensorHandle,
    pub layout: SensorLayout,
    pub cpu1_temps: OpenBatch,
    pub cpu2_temps: OpenBatch,
    pub drive_temps: OpenBatch,
    pub mobo_temps: OpenBatch,
    pub wifi: Option<WifiLink>,
    pub battery: Option<BatteryHandles>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    pub files: usize,
    pub wifi_clients: usize,
}

impl HostContext {
    pub fn acquire(cfg: &Config) -> Result<Self, SetupError> {
        let meminfo_path = cfg.paths.proc_root.join("meminfo");
        let meminfo =
            SensorHandle::open(&meminfo_path).map_err(|source| SetupError::MandatorySource {
                path: meminfo_path.display().to_string(),
                source,
            })?;

        let temp_re = cfg.sensors.temp_regex()?;
        let layout = locator::locate(cfg, &temp_re);
        let mut host = Self::open_layout(meminfo, layout, &temp_re);
        host.wifi = host.layout.wifi_iface.clone().map(|iface| WifiLink {
            iface,
            client: Box::new(IwClient::default()),
        });

        debug!(
            handles = host.open_file_count(),
            failures = host.open_failures(),
            "host resources acquired"
        );
        Ok(host)
    }

    /// Opens the handles for an already discovered layout. Wi-Fi is left
    /// unset.
    pub fn open_layout(meminfo: SensorHandle, layout: SensorLayout, temp_re: &Regex) -> Self {
        let open_dir = |dir: Option<&Path>| dir.map(|d| open_many(d, temp_re)).unwrap_or_default();

        let cpu1_temps = open_dir(layout.cpu1_hwmon.as_deref());
        let cpu2_temps = open_dir(layout.cpu2_hwmon.as_deref());

        let mut drive_temps = OpenBatch::default();
        for hwmon in &layout.drive_hwmons {
            drive_temps.append(open_many(hwmon, temp_re));
        }

        let mut mobo_temps = OpenBatch::default();
        for hwmon in &layout.mobo_hwmons {
            mobo_temps.append(open_many(hwmon, temp_re));
        }
        mobo_temps.append(open_each(&layout.i2c_mobo_temps));

        let battery = layout.battery.as_ref().map(BatteryHandles::open);

        Self {
            meminfo,
            layout,
            cpu1_temps,
            cpu2_temps,
            drive_temps,
            mobo_temps,
            wifi: None,
            battery,
        }
    }

    pub fn open_file_count(&self) -> usize {
        1 + self.cpu1_temps.len()
            + self.cpu2_temps.len()
            + self.drive_temps.len()
            + self.mobo_temps.len()
            + self.battery.as_ref().map_or(0, BatteryHandles::len)
    }

    pub fn open_failures(&self) -> usize {
        self.cpu1_temps.failures
            + self.cpu2_temps.failures
            + self.drive_temps.failures
            + self.mobo_temps.failures
            + self.battery.as_ref().map_or(0, |b| b.failures)
    }

    /// Closes every held handle. Consuming `self` makes a second release
    /// impossible.
    pub fn release(self) -> ReleaseReport {
        let report = ReleaseReport {
            files: self.open_file_count(),
            wifi_clients: usize::from(self.wifi.is_some()),
        };
        drop(self);
        debug!(
            files = report.files,
            wifi_clients = report.wifi_clients,
            "host resources released"
        );
        report
    }
}
