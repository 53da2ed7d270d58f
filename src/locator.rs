//! Sensor discovery.
//!
//! Maps the host's sysfs layout onto the handful of sources the report
//! needs. Nothing here opens a file for reading beyond the small `name` and
//! `type` attributes used for classification; a missing tree simply yields an
//! empty result for that sensor class.

use crate::config::{Config, SensorsConfig};
use regex::Regex;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const VIRTUAL_BLOCK_PREFIXES: [&str; 6] = ["loop", "ram", "zram", "dm-", "md", "sr"];

#[derive(Debug, Clone, Default)]
pub struct SensorLayout {
    pub cpu1_hwmon: Option<PathBuf>,
    pub cpu2_hwmon: Option<PathBuf>,
    pub drive_hwmons: Vec<PathBuf>,
    pub mobo_hwmons: Vec<PathBuf>,
    pub i2c_mobo_temps: Vec<PathBuf>,
    pub battery: Option<BatteryPaths>,
    pub wifi_iface: Option<String>,
}

/// Battery attribute files that exist on this host.
///
/// `energy_now`, `energy_full` and `power_now` fall back to the charge-based
/// `charge_now`, `charge_full` and `current_now` when the supply does not
/// report energy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatteryPaths {
    pub dir: PathBuf,
    pub capacity: Option<PathBuf>,
    pub energy_now: Option<PathBuf>,
    pub energy_full: Option<PathBuf>,
    pub power_now: Option<PathBuf>,
    pub status: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct HwmonDir {
    path: PathBuf,
    name: Option<String>,
}

pub fn locate(cfg: &Config, temp_re: &Regex) -> SensorLayout {
    let sys = cfg.paths.sys_root.as_path();
    let hwmons = class_hwmons(sys);

    let (cpu1_hwmon, cpu2_hwmon) = detect_cpu(&hwmons, &cfg.sensors);
    let drive_hwmons = detect_drives(sys, &hwmons, &cfg.sensors);
    let mobo_hwmons = named_hwmons(&hwmons, &cfg.sensors.mobo_hwmon_names);
    let i2c_mobo_temps = detect_i2c_temps(sys, &cfg.sensors.mobo_i2c_names, temp_re, &mobo_hwmons);
    let battery = detect_battery(sys);
    let wifi_iface = detect_wlan(sys);

    debug!(
        hwmon_dirs = hwmons.len(),
        cpu_sockets = cpu1_hwmon.iter().chain(cpu2_hwmon.iter()).count(),
        drives = drive_hwmons.len(),
        mobo_hwmons = mobo_hwmons.len(),
        i2c_temps = i2c_mobo_temps.len(),
        battery = battery.is_some(),
        wifi = wifi_iface.as_deref().unwrap_or("none"),
        "sensor discovery finished"
    );

    SensorLayout {
        cpu1_hwmon,
        cpu2_hwmon,
        drive_hwmons,
        mobo_hwmons,
        i2c_mobo_temps,
        battery,
        wifi_iface,
    }
}

fn class_hwmons(sys: &Path) -> Vec<HwmonDir> {
    sorted_entries(&sys.join("class/hwmon"))
        .into_iter()
        .map(|path| {
            let name = read_attr(&path.join("name"));
            HwmonDir { path, name }
        })
        .collect()
}

fn detect_cpu(hwmons: &[HwmonDir], sensors: &SensorsConfig) -> (Option<PathBuf>, Option<PathBuf>) {
    let mut cpus = named_hwmons(hwmons, &sensors.cpu_hwmon_names).into_iter();
    (cpus.next(), cpus.next())
}

fn named_hwmons(hwmons: &[HwmonDir], names: &[String]) -> Vec<PathBuf> {
    hwmons
        .iter()
        .filter(|h| h.name.as_ref().is_some_and(|n| names.iter().any(|m| m == n)))
        .map(|h| h.path.clone())
        .collect()
}

/// One hwmon per physical drive: first by walking the block devices, then by
/// driver name for anything the walk missed.
fn detect_drives(sys: &Path, hwmons: &[HwmonDir], sensors: &SensorsConfig) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for dev in sorted_entries(&sys.join("block")) {
        let Some(dev_name) = dev.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if VIRTUAL_BLOCK_PREFIXES.iter().any(|p| dev_name.starts_with(p)) {
            continue;
        }

        let device = dev.join("device");
        let mut candidates = sorted_entries(&device.join("hwmon"));
        candidates.extend(
            sorted_entries(&device)
                .into_iter()
                .filter(|p| file_name_starts_with(p, "hwmon") && p.file_name() != Some(OsStr::new("hwmon"))),
        );

        for hwmon in candidates {
            push_unique(&mut out, &mut seen, hwmon);
        }
    }

    for hwmon in named_hwmons(hwmons, &sensors.drive_hwmon_names) {
        push_unique(&mut out, &mut seen, hwmon);
    }

    out
}

fn detect_i2c_temps(
    sys: &Path,
    chip_names: &[String],
    temp_re: &Regex,
    mobo_hwmons: &[PathBuf],
) -> Vec<PathBuf> {
    let known: HashSet<PathBuf> = mobo_hwmons.iter().map(|p| canonical(p)).collect();
    let mut out = Vec::new();

    for dev in sorted_entries(&sys.join("bus/i2c/devices")) {
        let Some(name) = read_attr(&dev.join("name")) else {
            continue;
        };
        if !chip_names.iter().any(|c| *c == name) {
            continue;
        }

        let mut dirs = vec![dev.clone()];
        dirs.extend(sorted_entries(&dev.join("hwmon")));

        for dir in dirs {
            if known.contains(&canonical(&dir)) {
                continue;
            }
            out.extend(
                sorted_entries(&dir)
                    .into_iter()
                    .filter(|p| {
                        p.file_name()
                            .and_then(|n| n.to_str())
                            .is_some_and(|n| temp_re.is_match(n))
                    }),
            );
        }
    }

    out
}

fn detect_battery(sys: &Path) -> Option<BatteryPaths> {
    let supplies = sorted_entries(&sys.join("class/power_supply"));

    let dir = supplies
        .iter()
        .find(|p| read_attr(&p.join("type")).as_deref() == Some("Battery"))
        .or_else(|| supplies.iter().find(|p| file_name_starts_with(p, "BAT")))?
        .clone();

    let (now, full, rate) = if dir.join("energy_now").is_file() {
        ("energy_now", "energy_full", "power_now")
    } else {
        ("charge_now", "charge_full", "current_now")
    };

    let probe = |attr: &str| {
        let p = dir.join(attr);
        p.is_file().then_some(p)
    };

    Some(BatteryPaths {
        capacity: probe("capacity"),
        energy_now: probe(now),
        energy_full: probe(full),
        power_now: probe(rate),
        status: probe("status"),
        dir,
    })
}

fn detect_wlan(sys: &Path) -> Option<String> {
    sorted_entries(&sys.join("class/net"))
        .into_iter()
        .find(|p| p.join("wireless").exists() || p.join("phy80211").exists())
        .and_then(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
}

/// Directory entries ordered so that `hwmon2` sorts before `hwmon10`.
fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort_by_cached_key(|p| natural_key(p));
    paths
}

fn natural_key(path: &Path) -> (String, u64, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let number = name[stem.len()..].parse::<u64>().unwrap_or(0);
    (stem.to_string(), number, name)
}

fn read_attr(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn file_name_starts_with(path: &Path, prefix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(prefix))
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn push_unique(out: &mut Vec<PathBuf>, seen: &mut HashSet<PathBuf>, path: PathBuf) {
    if seen.insert(canonical(&path)) {
        out.push(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn config_for(sys: &Path) -> Config {
        let mut cfg = Config::default();
        cfg.paths.sys_root = sys.to_path_buf();
        cfg
    }

    fn locate_in(sys: &Path) -> SensorLayout {
        let cfg = config_for(sys);
        let re = cfg.sensors.temp_regex().unwrap();
        locate(&cfg, &re)
    }

    #[test]
    fn empty_tree_finds_nothing() {
        let sys = TempDir::new().unwrap();
        let layout = locate_in(sys.path());
        assert!(layout.cpu1_hwmon.is_none());
        assert!(layout.cpu2_hwmon.is_none());
        assert!(layout.drive_hwmons.is_empty());
        assert!(layout.mobo_hwmons.is_empty());
        assert!(layout.i2c_mobo_temps.is_empty());
        assert!(layout.battery.is_none());
        assert!(layout.wifi_iface.is_none());
    }

    #[test]
    fn two_cpu_packages_map_to_sockets_in_order() {
        let sys = TempDir::new().unwrap();
        let root = sys.path();
        write(root, "class/hwmon/hwmon10/name", "coretemp\n");
        write(root, "class/hwmon/hwmon2/name", "coretemp\n");
        write(root, "class/hwmon/hwmon0/name", "acpitz\n");
        write(root, "class/hwmon/hwmon11/name", "coretemp\n");

        let layout = locate_in(root);
        assert_eq!(layout.cpu1_hwmon, Some(root.join("class/hwmon/hwmon2")));
        assert_eq!(layout.cpu2_hwmon, Some(root.join("class/hwmon/hwmon10")));
        assert_eq!(layout.mobo_hwmons, vec![root.join("class/hwmon/hwmon0")]);
    }

    #[test]
    fn drives_come_from_block_walk_and_driver_names_without_duplicates() {
        let sys = TempDir::new().unwrap();
        let root = sys.path();
        write(root, "block/sda/device/hwmon/hwmon3/name", "drivetemp\n");
        write(root, "block/nvme0n1/device/hwmon4/name", "nvme\n");
        write(root, "block/loop0/device/hwmon/hwmon9/name", "bogus\n");
        write(root, "class/hwmon/hwmon5/name", "nvme\n");

        let layout = locate_in(root);
        assert_eq!(
            layout.drive_hwmons,
            vec![
                root.join("block/nvme0n1/device/hwmon4"),
                root.join("block/sda/device/hwmon/hwmon3"),
                root.join("class/hwmon/hwmon5"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn drive_reachable_both_ways_is_listed_once() {
        let sys = TempDir::new().unwrap();
        let root = sys.path();
        write(root, "devices/nvme0/hwmon1/name", "nvme\n");
        fs::create_dir_all(root.join("block/nvme0n1")).unwrap();
        fs::create_dir_all(root.join("class/hwmon")).unwrap();
        std::os::unix::fs::symlink(root.join("devices/nvme0"), root.join("block/nvme0n1/device"))
            .unwrap();
        std::os::unix::fs::symlink(
            root.join("devices/nvme0/hwmon1"),
            root.join("class/hwmon/hwmon1"),
        )
        .unwrap();

        let layout = locate_in(root);
        assert_eq!(layout.drive_hwmons, vec![root.join("block/nvme0n1/device/hwmon1")]);
    }

    #[test]
    fn i2c_chips_contribute_temperature_files() {
        let sys = TempDir::new().unwrap();
        let root = sys.path();
        write(root, "bus/i2c/devices/0-0018/name", "jc42\n");
        write(root, "bus/i2c/devices/0-0018/hwmon/hwmon7/temp1_input", "36000\n");
        write(root, "bus/i2c/devices/0-0048/name", "lm75\n");
        write(root, "bus/i2c/devices/0-0048/temp1_input", "31000\n");
        write(root, "bus/i2c/devices/0-0048/temp1_max", "80000\n");
        write(root, "bus/i2c/devices/0-0050/name", "ee1004\n");
        write(root, "bus/i2c/devices/0-0050/temp1_input", "1\n");

        let layout = locate_in(root);
        assert_eq!(
            layout.i2c_mobo_temps,
            vec![
                root.join("bus/i2c/devices/0-0018/hwmon/hwmon7/temp1_input"),
                root.join("bus/i2c/devices/0-0048/temp1_input"),
            ]
        );
    }

    #[test]
    fn battery_prefers_energy_attributes() {
        let sys = TempDir::new().unwrap();
        let root = sys.path();
        write(root, "class/power_supply/AC/type", "Mains\n");
        write(root, "class/power_supply/BAT0/type", "Battery\n");
        write(root, "class/power_supply/BAT0/energy_now", "30000000\n");
        write(root, "class/power_supply/BAT0/energy_full", "50000000\n");
        write(root, "class/power_supply/BAT0/power_now", "10000000\n");
        write(root, "class/power_supply/BAT0/status", "Discharging\n");

        let bat = locate_in(root).battery.expect("battery");
        let dir = root.join("class/power_supply/BAT0");
        assert_eq!(bat.capacity, None);
        assert_eq!(bat.energy_now, Some(dir.join("energy_now")));
        assert_eq!(bat.energy_full, Some(dir.join("energy_full")));
        assert_eq!(bat.power_now, Some(dir.join("power_now")));
        assert_eq!(bat.status, Some(dir.join("status")));
    }

    #[test]
    fn battery_falls_back_to_charge_attributes() {
        let sys = TempDir::new().unwrap();
        let root = sys.path();
        write(root, "class/power_supply/BAT1/capacity", "77\n");
        write(root, "class/power_supply/BAT1/charge_now", "3000000\n");
        write(root, "class/power_supply/BAT1/charge_full", "4000000\n");
        write(root, "class/power_supply/BAT1/current_now", "1000000\n");

        let bat = locate_in(root).battery.expect("battery");
        let dir = root.join("class/power_supply/BAT1");
        assert_eq!(bat.capacity, Some(dir.join("capacity")));
        assert_eq!(bat.energy_now, Some(dir.join("charge_now")));
        assert_eq!(bat.energy_full, Some(dir.join("charge_full")));
        assert_eq!(bat.power_now, Some(dir.join("current_now")));
        assert_eq!(bat.status, None);
    }

    #[test]
    fn first_wireless_interface_wins() {
        let sys = TempDir::new().unwrap();
        let root = sys.path();
        fs::create_dir_all(root.join("class/net/eth0")).unwrap();
        fs::create_dir_all(root.join("class/net/wlp3s0/wireless")).unwrap();
        fs::create_dir_all(root.join("class/net/wlan1/phy80211")).unwrap();

        assert_eq!(locate_in(root).wifi_iface.as_deref(), Some("wlan1"));
    }

    #[test]
    fn natural_key_orders_numeric_suffixes() {
        let mut names = vec![
            PathBuf::from("hwmon10"),
            PathBuf::from("hwmon2"),
            PathBuf::from("hwmon1"),
        ];
        names.sort_by_cached_key(|p| natural_key(p));
        assert_eq!(
            names,
            vec![
                PathBuf::from("hwmon1"),
                PathBuf::from("hwmon2"),
                PathBuf::from("hwmon10")
            ]
        );
    }
}
