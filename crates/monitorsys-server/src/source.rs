/// Raw metric sources.
///
/// `MetricSource` is the seam between the collector and the OS. The real
/// implementation (`SystemSource`) uses `sysinfo` for CPU, memory and
/// network, and `/proc/diskstats` for aggregate disk I/O on Linux.
/// Every read is fallible so the collector can degrade one section at a
/// time instead of dropping the whole snapshot.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use sysinfo::{Networks, System};

use monitorsys_protocol::snapshot::RamMetrics;

/// Per-core utilization plus current clock speed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuReading {
    pub cores: Vec<f32>,
    pub frequency_mhz: u64,
}

/// Cumulative counters for one network interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

/// Cumulative aggregate disk counters (all physical devices).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

pub trait MetricSource: Send {
    /// Warm up any internal baseline (CPU usage needs two refreshes).
    fn prime(&mut self) {}
    fn cpu(&mut self) -> anyhow::Result<CpuReading>;
    fn memory(&mut self) -> anyhow::Result<RamMetrics>;
    fn network(&mut self) -> anyhow::Result<HashMap<String, NetCounters>>;
    fn disk(&mut self) -> anyhow::Result<DiskCounters>;
}

/// Host metrics through `sysinfo` (and procfs for disk on Linux).
pub struct SystemSource {
    sys: System,
    networks: Networks,
}

impl SystemSource {
    pub fn new() -> Self {
        Self {
            sys: System::new_all(),
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for SystemSource {
    fn prime(&mut self) {
        // sysinfo needs two refresh calls to produce meaningful CPU usage
        self.sys.refresh_cpu_usage();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL.max(Duration::from_millis(200)));
        self.sys.refresh_cpu_usage();
    }

    fn cpu(&mut self) -> anyhow::Result<CpuReading> {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_cpu_frequency();

        let cpus = self.sys.cpus();
        Ok(CpuReading {
            cores: cpus.iter().map(|c| c.cpu_usage()).collect(),
            frequency_mhz: cpus.first().map(|c| c.frequency()).unwrap_or(0),
        })
    }

    fn memory(&mut self) -> anyhow::Result<RamMetrics> {
        self.sys.refresh_memory();

        let total = self.sys.total_memory();
        if total == 0 {
            anyhow::bail!("memory totals unavailable");
        }
        let used = self.sys.used_memory();
        Ok(RamMetrics {
            total,
            used,
            available: self.sys.available_memory(),
            percent: (used as f64 / total as f64 * 100.0) as f32,
        })
    }

    fn network(&mut self) -> anyhow::Result<HashMap<String, NetCounters>> {
        self.networks.refresh_list();

        Ok(self
            .networks
            .iter()
            .map(|(name, data)| {
                (
                    name.to_string(),
                    NetCounters {
                        bytes_sent: data.total_transmitted(),
                        bytes_recv: data.total_received(),
                    },
                )
            })
            .collect())
    }

    #[cfg(target_os = "linux")]
    fn disk(&mut self) -> anyhow::Result<DiskCounters> {
        let stats = std::fs::read_to_string("/proc/diskstats").context("reading /proc/diskstats")?;
        Ok(parse_diskstats(&stats, |dev| {
            std::path::Path::new("/sys/block").join(dev).exists()
        }))
    }

    #[cfg(not(target_os = "linux"))]
    fn disk(&mut self) -> anyhow::Result<DiskCounters> {
        anyhow::bail!("aggregate disk counters are only available on Linux")
    }
}

/// Sector size used by /proc/diskstats regardless of the device's real one.
const DISKSTATS_SECTOR_BYTES: u64 = 512;

/// Sum read/written bytes over whole devices in a /proc/diskstats dump.
///
/// Line layout: `major minor name reads merged sectors_read ms writes merged
/// sectors_written ...`. Partitions are excluded by `is_whole_device` so
/// their I/O is not counted twice; loop and ram devices are skipped.
pub fn parse_diskstats(stats: &str, is_whole_device: impl Fn(&str) -> bool) -> DiskCounters {
    let mut total = DiskCounters::default();

    for line in stats.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 {
            continue;
        }
        let name = fields[2];
        if name.starts_with("loop") || name.starts_with("ram") || !is_whole_device(name) {
            continue;
        }
        let sectors_read: u64 = fields[5].parse().unwrap_or(0);
        let sectors_written: u64 = fields[9].parse().unwrap_or(0);

        total.read_bytes = total
            .read_bytes
            .saturating_add(sectors_read.saturating_mul(DISKSTATS_SECTOR_BYTES));
        total.write_bytes = total
            .write_bytes
            .saturating_add(sectors_written.saturating_mul(DISKSTATS_SECTOR_BYTES));
    }

    total
}
