use regex::Regex;
use std::path::PathBuf;
use thiserror::Error;

pub const PROC_ROOT_ENV: &str = "STTS_PROC_ROOT";
pub const SYS_ROOT_ENV: &str = "STTS_SYS_ROOT";
pub const BENCH_WORKERS_ENV: &str = "STTS_BENCH_WORKERS";
pub const BENCH_LIMIT_ENV: &str = "STTS_BENCH_LIMIT";

/// Upper bound on benchmark workers, explicit or detected.
pub const MAX_BENCH_WORKERS: usize = 1024;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub paths: PathsConfig,
    pub sensors: SensorsConfig,
    pub bench: BenchConfig,
}

#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub proc_root: PathBuf,
    pub sys_root: PathBuf,
}

/// Driver and chip names used to classify hwmon and i2c devices.
#[derive(Debug, Clone)]
pub struct SensorsConfig {
    pub temp_file_pattern: String,
    pub cpu_hwmon_names: Vec<String>,
    pub drive_hwmon_names: Vec<String>,
    pub mobo_hwmon_names: Vec<String>,
    pub mobo_i2c_names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub enabled: bool,
    /// `None` means one worker per logical CPU.
    pub workers: Option<usize>,
    pub prime_limit: u64,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            sys_root: PathBuf::from("/sys"),
        }
    }
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            temp_file_pattern: default_temp_file_pattern(),
            cpu_hwmon_names: names(&["coretemp", "k10temp", "zenpower", "cpu_thermal"]),
            drive_hwmon_names: names(&["drivetemp", "nvme"]),
            mobo_hwmon_names: names(&[
                "nct6775",
                "nct6779",
                "nct6683",
                "nct6687",
                "it87",
                "it8686",
                "it8688",
                "it8792",
                "w83627ehf",
                "w83795",
                "f71882fg",
                "f71869a",
                "asus_wmi_sensors",
                "asusec",
                "acpitz",
            ]),
            mobo_i2c_names: names(&["jc42", "lm75", "lm92", "tmp102", "tmp421", "emc1403"]),
        }
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            workers: None,
            prime_limit: default_prime_limit(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} in {name}: {reason}")]
    Env {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid temperature file pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from defaults, overridden by whatever `lookup` returns
    /// for the `STTS_*` variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();

        if let Some(v) = lookup(PROC_ROOT_ENV) {
            cfg.paths.proc_root = non_empty_path(PROC_ROOT_ENV, v)?;
        }
        if let Some(v) = lookup(SYS_ROOT_ENV) {
            cfg.paths.sys_root = non_empty_path(SYS_ROOT_ENV, v)?;
        }
        if let Some(v) = lookup(BENCH_WORKERS_ENV) {
            let workers = parse_env_number(BENCH_WORKERS_ENV, &v)?;
            let workers = usize::try_from(workers).map_err(|err| ConfigError::Env {
                name: BENCH_WORKERS_ENV,
                value: v,
                reason: err.to_string(),
            })?;
            cfg.bench.workers = Some(workers);
        }
        if let Some(v) = lookup(BENCH_LIMIT_ENV) {
            cfg.bench.prime_limit = parse_env_number(BENCH_LIMIT_ENV, &v)?;
        }

        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sensors.temp_regex()?;

        if self.bench.prime_limit < 2 {
            return Err(ConfigError::Validation(
                "bench prime limit must be >= 2".to_string(),
            ));
        }
        if let Some(workers) = self.bench.workers {
            if workers == 0 {
                return Err(ConfigError::Validation(
                    "bench workers must be >= 1".to_string(),
                ));
            }
            if workers > MAX_BENCH_WORKERS {
                return Err(ConfigError::Validation(format!(
                    "bench workers must be <= {MAX_BENCH_WORKERS}, got {workers}"
                )));
            }
            if workers as u64 > self.bench.prime_limit {
                return Err(ConfigError::Validation(format!(
                    "bench workers ({workers}) must not exceed the prime limit ({})",
                    self.bench.prime_limit
                )));
            }
        }

        Ok(())
    }
}

impl SensorsConfig {
    pub fn temp_regex(&self) -> Result<Regex, ConfigError> {
        Regex::new(&self.temp_file_pattern).map_err(|source| ConfigError::Pattern {
            pattern: self.temp_file_pattern.clone(),
            source,
        })
    }
}

impl BenchConfig {
    /// Explicit count, or one per logical CPU. Never zero, never more
    /// workers than numbers to test.
    pub fn resolve_workers(&self) -> usize {
        let wanted = self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        let by_limit = usize::try_from(self.prime_limit).unwrap_or(usize::MAX);
        wanted.min(MAX_BENCH_WORKERS).min(by_limit).max(1)
    }
}

fn non_empty_path(name: &'static str, value: String) -> Result<PathBuf, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Env {
            name,
            value,
            reason: "path must not be empty".to_string(),
        });
    }
    Ok(PathBuf::from(value))
}

fn parse_env_number(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|err| ConfigError::Env {
        name,
        value: value.to_string(),
        reason: err.to_string(),
    })
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn default_temp_file_pattern() -> String {
    r"^temp\d+_input$".to_string()
}

const fn default_prime_limit() -> u64 {
    5_000_000
}
