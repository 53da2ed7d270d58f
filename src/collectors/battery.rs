//! Battery level and time-remaining estimate.
//!
//! The kernel reports either energy (`energy_*`, `power_now`, in µWh/µW) or
//! charge (`charge_*`, `current_now`, in µAh/µA). The locator picks one
//! family, so the arithmetic below only ever mixes consistent units.

use crate::handles::{open_each, SensorHandle};
use crate::locator::BatteryPaths;
use crate::state::{BatteryInfo, BatteryStatus};
use std::path::Path;
use tracing::debug;

/// Open handles for whichever battery attributes exist.
#[derive(Debug, Default)]
pub struct BatteryHandles {
    pub capacity: Option<SensorHandle>,
    pub energy_now: Option<SensorHandle>,
    pub energy_full: Option<SensorHandle>,
    pub power_now: Option<SensorHandle>,
    pub status: Option<SensorHandle>,
    pub failures: usize,
}

/// Raw values read once from the battery handles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatteryReadings {
    pub capacity: Option<u64>,
    pub energy_now: Option<u64>,
    pub energy_full: Option<u64>,
    pub power_now: Option<u64>,
    pub status: BatteryStatus,
}

impl BatteryHandles {
    pub fn open(paths: &BatteryPaths) -> Self {
        let mut failures = 0;
        let mut open = |path: Option<&Path>| {
            let mut batch = open_each(path);
            failures += batch.failures;
            batch.handles.pop()
        };

        let capacity = open(paths.capacity.as_deref());
        let energy_now = open(paths.energy_now.as_deref());
        let energy_full = open(paths.energy_full.as_deref());
        let power_now = open(paths.power_now.as_deref());
        let status = open(paths.status.as_deref());

        Self {
            capacity,
            energy_now,
            energy_full,
            power_now,
            status,
            failures,
        }
    }

    pub fn len(&self) -> usize {
        [
            &self.capacity,
            &self.energy_now,
            &self.energy_full,
            &self.power_now,
            &self.status,
        ]
        .iter()
        .filter(|h| h.is_some())
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read(&mut self) -> BatteryReadings {
        BatteryReadings {
            capacity: read_value(self.capacity.as_mut()),
            energy_now: read_value(self.energy_now.as_mut()),
            energy_full: read_value(self.energy_full.as_mut()),
            power_now: read_value(self.power_now.as_mut()),
            status: self
                .status
                .as_mut()
                .and_then(|h| h.read_trimmed().ok())
                .map(|s| BatteryStatus::parse(&s))
                .unwrap_or_default(),
        }
    }
}

pub fn collect_battery(handles: Option<&mut BatteryHandles>) -> Option<BatteryInfo> {
    let handles = handles.filter(|h| !h.is_empty())?;
    let readings = handles.read();
    debug!(?readings, "battery readings");

    Some(BatteryInfo {
        level_percent: level_percent(&readings),
        status: readings.status,
        time_left: time_left(&readings),
    })
}

/// Direct capacity when reported, otherwise `round(100 * now / full)`.
pub fn level_percent(r: &BatteryReadings) -> Option<u64> {
    if let Some(capacity) = r.capacity {
        return Some(capacity);
    }
    let (now, full) = (r.energy_now?, r.energy_full?);
    if full == 0 {
        return None;
    }
    Some(div_round(100 * now as u128, full as u128) as u64)
}

pub fn time_left(r: &BatteryReadings) -> Option<String> {
    let power = r.power_now.filter(|p| *p > 0)?;
    let remaining = match r.status {
        BatteryStatus::Discharging => r.energy_now?,
        BatteryStatus::Charging => r.energy_full?.saturating_sub(r.energy_now?),
        _ => return None,
    };
    Some(format_hours_minutes(remaining, power))
}

/// Formats `energy / power` hours as `H:MM`. Total minutes are rounded
/// half-up before splitting, so 59.5 minutes and above shows as `1:00`.
pub fn format_hours_minutes(energy: u64, power: u64) -> String {
    let minutes = div_round(energy as u128 * 60, power as u128);
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

fn div_round(numer: u128, denom: u128) -> u128 {
    (2 * numer + denom) / (2 * denom)
}

fn read_value(handle: Option<&mut SensorHandle>) -> Option<u64> {
    let handle = handle?;
    match handle.read_u64() {
        Ok(v) => Some(v),
        Err(err) => {
            debug!(error = %err, "skipping battery attribute");
            None
        }
    }
}
