use std::time::Duration;

/// Everything one run reports. Built once by the collectors, read by the
/// presenter, then dropped.
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    pub uptime: Duration,
    pub loads: [f64; 3],
    pub procs: u64,
    pub mem: MemoryStats,

    pub cpu1_temps: Vec<String>,
    pub cpu2_temps: Vec<String>,
    pub drive_temps: Vec<String>,
    pub mobo_temps: Vec<String>,

    pub wifi_bss: Option<WifiBss>,
    pub wifi_station: Option<StationInfo>,

    pub battery: Option<BatteryInfo>,
}

/// Memory counters, all in KiB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub shared: u64,
    pub buffer: u64,
    pub cache: u64,
    pub avail: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WifiBss {
    pub bssid: Option<String>,
    pub ssid: Option<String>,
    pub frequency_mhz: Option<u32>,
    pub signal_dbm: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationInfo {
    pub signal_dbm: Option<i32>,
    pub rx_bitrate_mbps: Option<f64>,
    pub tx_bitrate_mbps: Option<f64>,
    pub connected: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatteryStatus {
    Charging,
    Discharging,
    Full,
    NotCharging,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatteryInfo {
    pub level_percent: Option<u64>,
    pub status: BatteryStatus,
    /// Formatted `H:MM`.
    pub time_left: Option<String>,
}

impl BatteryStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Charging" => Self::Charging,
            "Discharging" => Self::Discharging,
            "Full" => Self::Full,
            "Not charging" => Self::NotCharging,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Charging => "charging",
            Self::Discharging => "discharging",
            Self::Full => "full",
            Self::NotCharging => "not charging",
            Self::Unknown => "unknown",
        }
    }
}

impl BatteryInfo {
    pub fn is_empty(&self) -> bool {
        self.level_percent.is_none() && self.time_left.is_none()
    }
}
