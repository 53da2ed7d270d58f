use crate::handles::SensorHandle;
use crate::state::MemoryStats;
use std::time::Duration;
use sysinfo::{System, SystemExt};
use tracing::warn;

/// Uptime, load and process count as reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemCounters {
    pub uptime: Duration,
    pub loads: [f64; 3],
    pub procs: u64,
}

impl SystemCounters {
    pub fn read(system: &mut System) -> Self {
        system.refresh_processes();
        let load = system.load_average();
        Self {
            uptime: Duration::from_secs(system.uptime()),
            loads: [load.one, load.five, load.fifteen],
            procs: system.processes().len() as u64,
        }
    }
}

pub fn collect_memory(meminfo: &mut SensorHandle) -> MemoryStats {
    match meminfo.read_trimmed() {
        Ok(content) => parse_meminfo(&content),
        Err(err) => {
            warn!(error = %err, "memory source opened but could not be read");
            MemoryStats::default()
        }
    }
}

/// Parses `Key:   value kB` lines. Counters that are missing or unparseable
/// count as zero.
pub fn parse_meminfo(content: &str) -> MemoryStats {
    let mut total = 0;
    let mut free = 0;
    let mut avail = None;
    let mut buffer = 0;
    let mut cached = 0;
    let mut reclaimable = 0;
    let mut shared = 0;

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(value) = rest.split_whitespace().next().and_then(|v| v.parse::<u64>().ok())
        else {
            continue;
        };
        match key.trim() {
            "MemTotal" => total = value,
            "MemFree" => free = value,
            "MemAvailable" => avail = Some(value),
            "Buffers" => buffer = value,
            "Cached" => cached = value,
            "SReclaimable" => reclaimable = value,
            "Shmem" => shared = value,
            _ => {}
        }
    }

    let cache = cached + reclaimable;
    let used = total
        .saturating_sub(free)
        .saturating_sub(buffer)
        .saturating_sub(cache);

    MemoryStats {
        total,
        used,
        free,
        shared,
        buffer,
        cache,
        avail: avail.unwrap_or(free + buffer + cache),
    }
}
