//! Wi-Fi link information.
//!
//! The link is queried through the `iw` utility: `iw dev <iface> link` for
//! the associated BSS and `iw dev <iface> station dump` for per-station
//! statistics. The query sits behind [`WifiQuery`] so the collector does not
//! care where the data comes from.

use crate::state::{StationInfo, StatusSnapshot, WifiBss};
use regex::Regex;
use std::fmt;
use std::process::Command;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum WifiError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("interface {0} is not associated")]
    NotAssociated(String),
}

pub trait WifiQuery: fmt::Debug {
    fn bss(&self, iface: &str) -> Result<WifiBss, WifiError>;
    fn station_info(&self, iface: &str) -> Result<StationInfo, WifiError>;
}

/// The discovered wireless interface and the client used to query it.
#[derive(Debug)]
pub struct WifiLink {
    pub iface: String,
    pub client: Box<dyn WifiQuery>,
}

#[derive(Debug, Clone)]
pub struct IwClient {
    program: String,
}

impl Default for IwClient {
    fn default() -> Self {
        Self {
            program: "iw".to_string(),
        }
    }
}

impl IwClient {
    fn run(&self, iface: &str, args: &[&str]) -> Result<String, WifiError> {
        let output = Command::new(&self.program)
            .arg("dev")
            .arg(iface)
            .args(args)
            .output()
            .map_err(|source| WifiError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(WifiError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl WifiQuery for IwClient {
    fn bss(&self, iface: &str) -> Result<WifiBss, WifiError> {
        parse_link(&self.run(iface, &["link"])?, iface)
    }

    fn station_info(&self, iface: &str) -> Result<StationInfo, WifiError> {
        parse_station_dump(&self.run(iface, &["station", "dump"])?, iface)
    }
}

pub fn collect_wifi(link: Option<&WifiLink>, snapshot: &mut StatusSnapshot) {
    let Some(link) = link else {
        return;
    };

    // Not being associated is an ordinary state, not an error. Without a BSS
    // both fields stay empty.
    let bss = match link.client.bss(&link.iface) {
        Ok(bss) => bss,
        Err(err) => {
            debug!(iface = %link.iface, error = %err, "no wifi bss");
            return;
        }
    };
    let station = match link.client.station_info(&link.iface) {
        Ok(info) => info,
        Err(err) => {
            debug!(iface = %link.iface, error = %err, "no wifi station info");
            return;
        }
    };

    snapshot.wifi_bss = Some(bss);
    snapshot.wifi_station = Some(station);
}

static CONNECTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Connected to ([0-9a-fA-F:]{17})").expect("Invalid bssid regex"));
static SSID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*SSID: (.*)$").expect("Invalid ssid regex"));
static FREQ_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*freq: (\d+(?:\.\d+)?)").expect("Invalid freq regex"));
static LINK_SIGNAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*signal: (-?\d+)").expect("Invalid signal regex"));
static STATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Station ([0-9a-fA-F:]{17})").expect("Invalid station regex"));
static STATION_SIGNAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*signal:\s*(-?\d+)").expect("Invalid signal regex"));
static RX_RATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*rx bitrate:\s*([\d.]+) MBit/s").expect("Invalid rx bitrate regex")
});
static TX_RATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*tx bitrate:\s*([\d.]+) MBit/s").expect("Invalid tx bitrate regex")
});
static CONNECTED_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*connected time:\s*(\d+) seconds").expect("Invalid connected time regex")
});

/// Parses `iw dev <iface> link` output.
pub fn parse_link(output: &str, iface: &str) -> Result<WifiBss, WifiError> {
    let Some(bssid) = capture(&CONNECTED_RE, output) else {
        return Err(WifiError::NotAssociated(iface.to_string()));
    };

    Ok(WifiBss {
        bssid: Some(bssid.to_lowercase()),
        ssid: capture(&SSID_RE, output).map(|s| s.trim().to_string()),
        frequency_mhz: capture(&FREQ_RE, output)
            .and_then(|f| f.parse::<f64>().ok())
            .map(|f| f as u32),
        signal_dbm: capture(&LINK_SIGNAL_RE, output).and_then(|s| s.parse().ok()),
    })
}

/// Parses `iw dev <iface> station dump` output. Only the first station is
/// used; a managed interface has exactly one.
pub fn parse_station_dump(output: &str, iface: &str) -> Result<StationInfo, WifiError> {
    if capture(&STATION_RE, output).is_none() {
        return Err(WifiError::NotAssociated(iface.to_string()));
    }

    Ok(StationInfo {
        signal_dbm: capture(&STATION_SIGNAL_RE, output).and_then(|s| s.parse().ok()),
        rx_bitrate_mbps: capture(&RX_RATE_RE, output).and_then(|s| s.parse().ok()),
        tx_bitrate_mbps: capture(&TX_RATE_RE, output).and_then(|s| s.parse().ok()),
        connected: capture(&CONNECTED_TIME_RE, output)
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs),
    })
}

fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)?.get(1).map(|m| m.as_str())
}
