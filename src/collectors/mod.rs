pub mod battery;
pub mod system;
pub mod temps;
pub mod wifi;

use crate::host::HostContext;
use crate::state::StatusSnapshot;
use sysinfo::System;
use system::SystemCounters;

pub fn collect_status(host: &mut HostContext, system: &mut System) -> StatusSnapshot {
    collect_with_counters(host, SystemCounters::read(system))
}

/// Runs every sub-collector once against the host's open handles. Memory and
/// platform counters go first; the rest never fail.
pub fn collect_with_counters(host: &mut HostContext, counters: SystemCounters) -> StatusSnapshot {
    let mut snapshot = StatusSnapshot {
        uptime: counters.uptime,
        loads: counters.loads,
        procs: counters.procs,
        mem: system::collect_memory(&mut host.meminfo),
        ..StatusSnapshot::default()
    };

    snapshot.cpu1_temps = temps::read_temps(&mut host.cpu1_temps);
    snapshot.cpu2_temps = temps::read_temps(&mut host.cpu2_temps);
    snapshot.drive_temps = temps::read_temps(&mut host.drive_temps);
    snapshot.mobo_temps = temps::read_temps(&mut host.mobo_temps);

    wifi::collect_wifi(host.wifi.as_ref(), &mut snapshot);
    snapshot.battery = battery::collect_battery(host.battery.as_mut());

    snapshot
}
