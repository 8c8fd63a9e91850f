/// Snapshot collection with delta-based rates.
///
/// The collector keeps the previous network and disk counters and the time
/// they were read. Each `collect()` reads current counters, computes rates
/// against the stored values using one elapsed interval for both
/// subsystems, then overwrites the stored state and the sample time once.
///
/// Collection never fails: a source error is logged and only that section
/// is degraded for the cycle.

use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use monitorsys_protocol::rates::{elapsed_secs, rate};
use monitorsys_protocol::snapshot::{
    CpuMetrics, DiskMetrics, InterfaceMetrics, NetworkMetrics, RamMetrics, Snapshot,
};

use crate::gpu::GpuMonitor;
use crate::source::{DiskCounters, MetricSource, NetCounters};

/// Previous-sample state used for delta rates.
#[derive(Debug, Default)]
struct CollectorState {
    prev_network_counters: HashMap<String, NetCounters>,
    prev_disk_counters: Option<DiskCounters>,
    prev_sample_time: f64,
}

pub struct MetricsCollector {
    source: Box<dyn MetricSource>,
    gpu: GpuMonitor,
    state: CollectorState,
}

impl MetricsCollector {
    /// Create a collector, reading the initial counters as the baseline.
    pub fn new(source: Box<dyn MetricSource>, gpu: GpuMonitor) -> Self {
        Self::new_at(source, gpu, unix_now())
    }

    pub fn new_at(mut source: Box<dyn MetricSource>, gpu: GpuMonitor, now: f64) -> Self {
        let prev_network_counters = source.network().unwrap_or_else(|e| {
            warn!(error = %e, "Initial network counter read failed");
            HashMap::new()
        });
        let prev_disk_counters = source
            .disk()
            .map_err(|e| warn!(error = %e, "Initial disk counter read failed"))
            .ok();

        Self {
            source,
            gpu,
            state: CollectorState {
                prev_network_counters,
                prev_disk_counters,
                prev_sample_time: now,
            },
        }
    }

    /// Discard the first CPU reading, which has no baseline.
    pub fn prime(&mut self) {
        self.source.prime();
    }

    pub fn gpu_available(&self) -> bool {
        self.gpu.is_available()
    }

    pub fn collect(&mut self) -> Snapshot {
        self.collect_at(unix_now())
    }

    /// Collect with an explicit sample time (seconds since epoch).
    pub fn collect_at(&mut self, now: f64) -> Snapshot {
        let elapsed = elapsed_secs(self.state.prev_sample_time, now);

        let cpu = self.cpu_metrics();
        let ram = self.ram_metrics();
        let network = self.network_metrics(elapsed);
        let disk = self.disk_metrics(elapsed);
        let gpu = self.gpu.sample();

        self.state.prev_sample_time = now;

        debug!(
            elapsed = %elapsed,
            cpu = %cpu.average,
            interfaces = network.interfaces.len(),
            gpu = gpu.is_some(),
            "snapshot collected"
        );

        Snapshot {
            timestamp: now,
            cpu,
            ram,
            network,
            disk,
            gpu,
        }
    }

    /// Release the GPU capability.
    pub fn shutdown(&mut self) {
        self.gpu.release();
    }

    fn cpu_metrics(&mut self) -> CpuMetrics {
        match self.source.cpu() {
            Ok(reading) => CpuMetrics::from_cores(reading.cores, reading.frequency_mhz),
            Err(e) => {
                warn!(error = %e, "CPU read failed");
                CpuMetrics::default()
            }
        }
    }

    fn ram_metrics(&mut self) -> RamMetrics {
        self.source.memory().unwrap_or_else(|e| {
            warn!(error = %e, "Memory read failed");
            RamMetrics::default()
        })
    }

    fn network_metrics(&mut self, elapsed: f64) -> NetworkMetrics {
        let current = match self.source.network() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Network read failed");
                return NetworkMetrics::default();
            }
        };

        let interfaces: BTreeMap<String, InterfaceMetrics> = current
            .iter()
            .map(|(name, counters)| {
                let (speed_up, speed_down) = match self.state.prev_network_counters.get(name) {
                    Some(prev) => (
                        rate(counters.bytes_sent, prev.bytes_sent, elapsed),
                        rate(counters.bytes_recv, prev.bytes_recv, elapsed),
                    ),
                    None => (0.0, 0.0),
                };
                (
                    name.clone(),
                    InterfaceMetrics {
                        bytes_sent: counters.bytes_sent,
                        bytes_recv: counters.bytes_recv,
                        speed_up,
                        speed_down,
                    },
                )
            })
            .collect();

        self.state.prev_network_counters = current;
        NetworkMetrics { interfaces }
    }

    fn disk_metrics(&mut self, elapsed: f64) -> DiskMetrics {
        let current = match self.source.disk() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Disk read failed");
                return DiskMetrics::default();
            }
        };

        let (read_speed, write_speed) = match self.state.prev_disk_counters {
            Some(prev) => (
                rate(current.read_bytes, prev.read_bytes, elapsed),
                rate(current.write_bytes, prev.write_bytes, elapsed),
            ),
            None => (0.0, 0.0),
        };

        self.state.prev_disk_counters = Some(current);
        DiskMetrics {
            read_bytes: current.read_bytes,
            write_bytes: current.write_bytes,
            read_speed,
            write_speed,
        }
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
