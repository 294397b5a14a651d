use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use sysinfo::{Disks, ProcessesToUpdate, System};
use tracing::debug;

/// Rendered in place of any metric the platform could not report.
pub const UNAVAILABLE: &str = "N/A";

const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

pub trait MetricsProvider {
    /// Every field degrades independently; a snapshot is always produced.
    fn snapshot(&mut self, cpu_sample_interval: Duration) -> SystemSnapshot;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Usage {
    pub percent: f64,
    pub used: u64,
    pub total: u64,
}

impl Usage {
    pub fn new(used: u64, total: u64) -> Option<Self> {
        if total == 0 {
            return None;
        }
        Some(Self {
            percent: used as f64 / total as f64 * 100.0,
            used,
            total,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Battery {
    pub percent: f64,
    pub charging: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemSnapshot {
    pub os: String,
    pub runtime_version: String,
    pub uptime: Option<Duration>,
    pub cpu_percent: Option<f32>,
    pub ram: Option<Usage>,
    pub disk: Option<Usage>,
    pub battery: Option<Battery>,
    pub process_count: Option<usize>,
}

impl SystemSnapshot {
    pub fn unavailable(os: String, runtime_version: String) -> Self {
        Self {
            os,
            runtime_version,
            uptime: None,
            cpu_percent: None,
            ram: None,
            disk: None,
            battery: None,
            process_count: None,
        }
    }

    /// One `Label: value` line per metric, in dashboard order.
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("OS: {}", self.os),
            format!("Runtime: {}", self.runtime_version),
            format!("Uptime: {}", or_unavailable(self.uptime.map(format_uptime))),
            format!(
                "CPU: {}",
                or_unavailable(self.cpu_percent.map(|cpu| format!("{cpu:.1}%")))
            ),
            format!("RAM: {}", or_unavailable(self.ram.map(format_usage))),
            format!("Disk: {}", or_unavailable(self.disk.map(format_usage))),
            format!("Battery: {}", or_unavailable(self.battery.map(format_battery))),
            format!(
                "Processes: {}",
                or_unavailable(self.process_count.map(|count| count.to_string()))
            ),
        ]
    }
}

fn or_unavailable(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNAVAILABLE.to_string())
}

fn format_usage(usage: Usage) -> String {
    format!(
        "{:.1}% ({} / {})",
        usage.percent,
        human_bytes(usage.used),
        human_bytes(usage.total)
    )
}

fn format_battery(battery: Battery) -> String {
    let charging = if battery.charging { " (charging)" } else { "" };
    format!("{:.1}%{charging}", battery.percent)
}

pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
}

pub fn human_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if value < 1024.0 {
            return format!("{value:.1} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1} PB")
}

/// Live metrics from `sysinfo`. The `System` is kept between snapshots so a
/// zero sample interval reports usage since the previous snapshot.
pub struct SysinfoProvider {
    system: System,
    home: Option<PathBuf>,
    power_supply_dir: PathBuf,
}

impl Default for SysinfoProvider {
    fn default() -> Self {
        Self::new(dirs::home_dir(), PathBuf::from(POWER_SUPPLY_DIR))
    }
}

impl SysinfoProvider {
    pub fn new(home: Option<PathBuf>, power_supply_dir: PathBuf) -> Self {
        Self {
            system: System::new(),
            home,
            power_supply_dir,
        }
    }

    fn cpu_percent(&mut self, sample_interval: Duration) -> Option<f32> {
        self.system.refresh_cpu_usage();
        if !sample_interval.is_zero() {
            thread::sleep(sample_interval.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
            self.system.refresh_cpu_usage();
        }
        let usage = self.system.global_cpu_usage();
        usage.is_finite().then_some(usage)
    }

    fn ram(&mut self) -> Option<Usage> {
        self.system.refresh_memory();
        Usage::new(self.system.used_memory(), self.system.total_memory())
    }

    fn disk(&self) -> Option<Usage> {
        let home = self.home.as_deref()?;
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .filter(|disk| home.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())?;
        let total = disk.total_space();
        Usage::new(total.saturating_sub(disk.available_space()), total)
    }

    fn process_count(&mut self) -> Option<usize> {
        self.system.refresh_processes(ProcessesToUpdate::All, true);
        match self.system.processes().len() {
            0 => None,
            count => Some(count),
        }
    }
}

impl MetricsProvider for SysinfoProvider {
    fn snapshot(&mut self, cpu_sample_interval: Duration) -> SystemSnapshot {
        let mut snapshot = SystemSnapshot::unavailable(os_description(), runtime_version());
        snapshot.battery = read_battery(&self.power_supply_dir);

        if !sysinfo::IS_SUPPORTED_SYSTEM {
            debug!(event = "metrics.unsupported_platform");
            return snapshot;
        }

        snapshot.uptime = match System::uptime() {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        snapshot.cpu_percent = self.cpu_percent(cpu_sample_interval);
        snapshot.ram = self.ram();
        snapshot.disk = self.disk();
        snapshot.process_count = self.process_count();
        snapshot
    }
}

fn os_description() -> String {
    let name = System::name().unwrap_or_else(|| std::env::consts::OS.to_string());
    match System::kernel_version() {
        Some(release) => format!("{name} {release}"),
        None => name,
    }
}

fn runtime_version() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// First battery under a Linux power-supply class directory.
fn read_battery(power_supply_dir: &Path) -> Option<Battery> {
    let entries = fs::read_dir(power_supply_dir).ok()?;
    entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|supply| read_trimmed(&supply.join("type")).as_deref() == Some("Battery"))
        .find_map(|supply| {
            let percent = read_trimmed(&supply.join("capacity"))?.parse::<f64>().ok()?;
            let status = read_trimmed(&supply.join("status")).unwrap_or_default();
            Some(Battery {
                percent,
                charging: matches!(status.as_str(), "Charging" | "Full"),
            })
        })
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|raw| raw.trim().to_string())
}
