mod bench;
mod collectors;
mod config;
mod handles;
mod host;
mod locator;
mod render;
mod state;

use clap::Parser;
use collectors::collect_status;
use config::Config;
use host::HostContext;
use std::io::Write;
use sysinfo::{System, SystemExt};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stts")]
#[command(version, about = "Print a one-shot system status report")]
struct Cli {
    /// Run a CPU benchmark after the report
    #[arg(short = 'b', long = "bench")]
    bench: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let mut cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };
    cfg.bench.enabled = cli.bench;
    if let Err(err) = cfg.validate() {
        error!(error = %err, "invalid configuration");
        std::process::exit(1);
    }

    let mut host = match HostContext::acquire(&cfg) {
        Ok(host) => host,
        Err(err) => {
            error!(error = %err, "failed to set up status sources");
            std::process::exit(1);
        }
    };

    let mut system = System::new();
    let snapshot = collect_status(&mut host, &mut system);

    let mut stdout = std::io::stdout().lock();
    if let Err(err) = stdout.write_all(render::render(&snapshot).as_bytes()) {
        error!(error = %err, "failed to write report");
    }

    if cfg.bench.enabled {
        match bench::run(&cfg.bench).await {
            Ok(report) => {
                if let Err(err) = writeln!(stdout, "{}", report.summary()) {
                    error!(error = %err, "failed to write benchmark result");
                }
            }
            Err(err) => error!(error = %err, "benchmark worker failed"),
        }
    }
    if let Err(err) = stdout.flush() {
        error!(error = %err, "failed to flush report");
    }

    let released = host.release();
    debug!(files = released.files, wifi_clients = released.wifi_clients, "run finished");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
