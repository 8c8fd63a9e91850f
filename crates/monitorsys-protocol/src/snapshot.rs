/// Snapshot types streamed to dashboard clients.
///
/// One `Snapshot` is produced per tick and serialized as JSON. Field names
/// and units are part of the client contract and must stay stable:
///   bytes, bytes/sec, percent (0–100), MHz, MB, °C.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One complete point-in-time measurement of all tracked resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    pub cpu: CpuMetrics,
    pub ram: RamMetrics,
    pub network: NetworkMetrics,
    pub disk: DiskMetrics,
    /// Absent (`null`) when no GPU is monitored or the last query failed
    pub gpu: Option<GpuMetrics>,
}

impl Snapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CpuMetrics {
    /// Per-core utilization, in core order
    pub cores: Vec<f32>,
    /// Arithmetic mean of `cores` (0 when there are none)
    pub average: f32,
    /// Current clock speed in MHz, 0 if unavailable
    pub frequency: u64,
}

impl CpuMetrics {
    pub fn from_cores(cores: Vec<f32>, frequency: u64) -> Self {
        let average = crate::rates::mean(&cores);
        Self {
            cores,
            average,
            frequency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RamMetrics {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub percent: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub interfaces: BTreeMap<String, InterfaceMetrics>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InterfaceMetrics {
    /// Cumulative bytes transmitted
    pub bytes_sent: u64,
    /// Cumulative bytes received
    pub bytes_recv: u64,
    /// Upload rate in bytes/sec
    pub speed_up: f64,
    /// Download rate in bytes/sec
    pub speed_down: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiskMetrics {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_speed: f64,
    pub write_speed: f64,
}

/// GPU section. The wire names are the short ones the dashboard reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuMetrics {
    pub name: String,
    #[serde(rename = "utilization")]
    pub utilization_percent: f32,
    #[serde(rename = "memory_total")]
    pub memory_total_mb: f64,
    #[serde(rename = "memory_used")]
    pub memory_used_mb: f64,
    pub memory_percent: f64,
    #[serde(rename = "temperature")]
    pub temperature_celsius: f32,
}

impl GpuMetrics {
    /// Build from raw byte counts as reported by the driver.
    pub fn from_bytes(
        name: String,
        utilization_percent: f32,
        memory_total_bytes: u64,
        memory_used_bytes: u64,
        temperature_celsius: f32,
    ) -> Self {
        let memory_percent = if memory_total_bytes == 0 {
            0.0
        } else {
            memory_used_bytes as f64 / memory_total_bytes as f64 * 100.0
        };
        Self {
            name,
            utilization_percent,
            memory_total_mb: memory_total_bytes as f64 / crate::BYTES_PER_MB,
            memory_used_mb: memory_used_bytes as f64 / crate::BYTES_PER_MB,
            memory_percent,
            temperature_celsius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_average_is_mean_of_cores() {
        let cpu = CpuMetrics::from_cores(vec![10.0, 20.0, 30.0, 40.0], 2400);
        assert!((cpu.average - 25.0).abs() < 1e-6);
        assert_eq!(cpu.frequency, 2400);
    }

    #[test]
    fn cpu_average_empty_is_zero() {
        let cpu = CpuMetrics::from_cores(Vec::new(), 0);
        assert_eq!(cpu.average, 0.0);
    }

    #[test]
    fn gpu_memory_converted_to_mb() {
        let gpu = GpuMetrics::from_bytes("Radeon".into(), 42.0, 8 * 1024 * 1024 * 1024, 2 * 1024 * 1024 * 1024, 61.0);
        assert_eq!(gpu.memory_total_mb, 8192.0);
        assert_eq!(gpu.memory_used_mb, 2048.0);
        assert!((gpu.memory_percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn gpu_zero_total_memory_percent_is_zero() {
        let gpu = GpuMetrics::from_bytes("x".into(), 0.0, 0, 0, 0.0);
        assert_eq!(gpu.memory_percent, 0.0);
    }

    #[test]
    fn gpu_uses_client_field_names() {
        let gpu = GpuMetrics::from_bytes("card0".into(), 5.0, 1024 * 1024, 0, 40.0);
        let v = serde_json::to_value(&gpu).unwrap();
        assert!(v.get("utilization").is_some());
        assert!(v.get("memory_total").is_some());
        assert!(v.get("memory_used").is_some());
        assert!(v.get("temperature").is_some());
        assert!(v.get("utilization_percent").is_none());
    }
}
