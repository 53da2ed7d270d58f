use crate::state::{BatteryInfo, MemoryStats, StationInfo, StatusSnapshot, WifiBss};
use std::time::Duration;

const NA: &str = "n/a";

/// Formats the whole report. Sections with nothing to show produce no lines.
pub fn render(snapshot: &StatusSnapshot) -> String {
    let mut out = vec![
        format!("uptime      {}", format_uptime(snapshot.uptime)),
        format!(
            "load        {:.2} {:.2} {:.2}",
            snapshot.loads[0], snapshot.loads[1], snapshot.loads[2]
        ),
        format!("procs       {}", snapshot.procs),
    ];
    out.extend(memory_lines(&snapshot.mem));

    for (label, temps) in [
        ("cpu1 temp", &snapshot.cpu1_temps),
        ("cpu2 temp", &snapshot.cpu2_temps),
        ("drive temp", &snapshot.drive_temps),
        ("mobo temp", &snapshot.mobo_temps),
    ] {
        out.extend(temps.iter().map(|t| format!("{label:<11} {t}°C")));
    }

    if snapshot.wifi_bss.is_some() || snapshot.wifi_station.is_some() {
        out.extend(wifi_lines(
            snapshot.wifi_bss.as_ref(),
            snapshot.wifi_station.as_ref(),
        ));
    }

    if let Some(battery) = snapshot.battery.as_ref().filter(|b| !b.is_empty()) {
        out.extend(battery_lines(battery));
    }

    let mut text = out.join("\n");
    text.push('\n');
    text
}

/// Whole seconds only; sub-second precision is noise in a status line.
fn format_uptime(uptime: Duration) -> String {
    humantime::format_duration(Duration::from_secs(uptime.as_secs())).to_string()
}

fn kib_to_mib(kib: u64) -> u64 {
    kib / 1024
}

fn memory_lines(mem: &MemoryStats) -> Vec<String> {
    vec![
        format!(
            "mem         {} / {} MiB used",
            kib_to_mib(mem.used),
            kib_to_mib(mem.total)
        ),
        format!(
            "            free {}  shared {}  buffer {}  cache {}  avail {} MiB",
            kib_to_mib(mem.free),
            kib_to_mib(mem.shared),
            kib_to_mib(mem.buffer),
            kib_to_mib(mem.cache),
            kib_to_mib(mem.avail)
        ),
    ]
}

fn wifi_lines(bss: Option<&WifiBss>, station: Option<&StationInfo>) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(bss) = bss {
        out.push(format!(
            "wifi        {} ({})",
            bss.ssid.as_deref().unwrap_or(NA),
            bss.bssid.as_deref().unwrap_or(NA)
        ));
        out.push(format!(
            "            freq {}  signal {}",
            bss.frequency_mhz
                .map(|f| format!("{f} MHz"))
                .unwrap_or_else(|| NA.to_string()),
            format_dbm(bss.signal_dbm)
        ));
    }

    if let Some(st) = station {
        let label = if bss.is_some() { "" } else { "wifi" };
        out.push(format!(
            "{label:<11} station signal {}  rx {}  tx {}  up {}",
            format_dbm(st.signal_dbm),
            format_rate(st.rx_bitrate_mbps),
            format_rate(st.tx_bitrate_mbps),
            st.connected
                .map(format_uptime)
                .unwrap_or_else(|| NA.to_string())
        ));
    }

    out
}

fn format_dbm(signal: Option<i32>) -> String {
    signal
        .map(|s| format!("{s} dBm"))
        .unwrap_or_else(|| NA.to_string())
}

fn format_rate(rate: Option<f64>) -> String {
    rate.map(|r| format!("{r:.1} Mbit/s"))
        .unwrap_or_else(|| NA.to_string())
}

fn battery_lines(battery: &BatteryInfo) -> Vec<String> {
    let level = battery
        .level_percent
        .map(|l| format!("{l}%"))
        .unwrap_or_else(|| NA.to_string());
    let mut line = format!("battery     {level} {}", battery.status.label());
    if let Some(left) = battery.time_left.as_deref() {
        line.push_str(&format!(", {left} left"));
    }
    vec![line]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::BatteryStatus;

    fn base_snapshot() -> StatusSnapshot {
        StatusSnapshot {
            uptime: Duration::from_millis(3_723_400),
            loads: [0.52, 0.48, 0.41],
            procs: 312,
            mem: MemoryStats {
                total: 16_000_000,
                used: 6_000_000,
                free: 8_000_000,
                shared: 0,
                buffer: 500_000,
                cache: 1_500_000,
                avail: 10_000_000,
            },
            ..StatusSnapshot::default()
        }
    }

    #[test]
    fn bare_snapshot_has_only_system_block() {
        let text = render(&base_snapshot());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "uptime      1h 2m 3s");
        assert_eq!(lines[1], "load        0.52 0.48 0.41");
        assert_eq!(lines[2], "procs       312");
        assert_eq!(lines[3], "mem         5859 / 15625 MiB used");
        assert!(!text.contains("temp"));
        assert!(!text.contains("wifi"));
        assert!(!text.contains("battery"));
    }

    #[test]
    fn one_line_per_temperature_in_order() {
        let mut snapshot = base_snapshot();
        snapshot.cpu1_temps = vec!["45".into(), "47".into()];
        snapshot.mobo_temps = vec!["30".into()];

        let text = render(&snapshot);
        let temps: Vec<&str> = text.lines().filter(|l| l.contains("temp")).collect();
        assert_eq!(
            temps,
            vec!["cpu1 temp   45°C", "cpu1 temp   47°C", "mobo temp   30°C"]
        );
    }

    #[test]
    fn wifi_block_shows_what_is_known() {
        let mut snapshot = base_snapshot();
        snapshot.wifi_bss = Some(WifiBss {
            bssid: Some("00:11:22:aa:bb:cc".into()),
            ssid: Some("home".into()),
            frequency_mhz: Some(5180),
            signal_dbm: None,
        });
        let text = render(&snapshot);
        assert!(text.contains("wifi        home (00:11:22:aa:bb:cc)"));
        assert!(text.contains("freq 5180 MHz  signal n/a"));
        assert!(!text.contains("station"));

        snapshot.wifi_bss = None;
        snapshot.wifi_station = Some(StationInfo {
            signal_dbm: Some(-54),
            rx_bitrate_mbps: Some(433.3),
            tx_bitrate_mbps: None,
            connected: Some(Duration::from_secs(60)),
        });
        let text = render(&snapshot);
        assert!(text.contains("wifi        station signal -54 dBm  rx 433.3 Mbit/s  tx n/a  up 1m"));
    }

    #[test]
    fn battery_block_needs_level_or_time() {
        let mut snapshot = base_snapshot();
        snapshot.battery = Some(BatteryInfo {
            level_percent: None,
            status: BatteryStatus::Full,
            time_left: None,
        });
        assert!(!render(&snapshot).contains("battery"));

        snapshot.battery = Some(BatteryInfo {
            level_percent: Some(60),
            status: BatteryStatus::Discharging,
            time_left: Some("3:00".into()),
        });
        assert!(render(&snapshot).contains("battery     60% discharging, 3:00 left"));
    }
}
