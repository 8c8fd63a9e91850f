/// Optional GPU monitoring capability.
///
/// Detection runs once at startup. When no usable GPU is found the monitor
/// holds nothing and every `sample()` is a no-op returning `None`. When a
/// probe is held, each query is guarded individually: a failure is logged
/// and degrades only the GPU section of that snapshot.
///
/// NVIDIA cards are read through NVML (first device). When the NVML
/// library cannot be initialised, the Linux DRM sysfs tree is tried
/// instead (amdgpu exposes busy percent, VRAM totals and hwmon temperature
/// there).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::Nvml;
use tracing::{debug, info, warn};

use monitorsys_protocol::snapshot::GpuMetrics;

pub trait GpuProbe: Send {
    fn name(&self) -> &str;
    fn query(&mut self) -> anyhow::Result<GpuMetrics>;
    /// Release any driver resource held by the probe.
    fn release(&mut self) {}
}

/// Capability handle: `None` inside means GPU monitoring is unavailable.
pub struct GpuMonitor {
    probe: Option<Box<dyn GpuProbe>>,
}

impl GpuMonitor {
    pub fn unavailable() -> Self {
        Self { probe: None }
    }

    pub fn with_probe(probe: Box<dyn GpuProbe>) -> Self {
        Self { probe: Some(probe) }
    }

    /// Look for a supported GPU: NVML first, then DRM sysfs. Returns an
    /// unavailable monitor when disabled or when nothing is found.
    pub fn detect(enabled: bool) -> Self {
        if !enabled {
            info!("GPU monitoring disabled");
            return Self::unavailable();
        }

        Self::detect_with(
            || NvmlGpu::init(0).map(|gpu| Box::new(gpu) as Box<dyn GpuProbe>),
            Path::new(DRM_ROOT),
        )
    }

    /// Detection with an injectable NVML initialiser and DRM root.
    pub fn detect_with<F>(nvml_init: F, drm_root: &Path) -> Self
    where
        F: FnOnce() -> anyhow::Result<Box<dyn GpuProbe>>,
    {
        match nvml_init() {
            Ok(probe) => {
                info!(gpu = %probe.name(), backend = "nvml", "GPU monitoring enabled");
                return Self::with_probe(probe);
            }
            Err(e) => debug!(error = %e, "NVML unavailable, trying DRM sysfs"),
        }

        match DrmGpu::discover(drm_root) {
            Some(gpu) => {
                info!(gpu = %gpu.name(), card = %gpu.card.display(), backend = "drm", "GPU monitoring enabled");
                Self::with_probe(Box::new(gpu))
            }
            None => {
                info!("No supported GPU found, GPU metrics will be absent");
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.probe.is_some()
    }

    pub fn sample(&mut self) -> Option<GpuMetrics> {
        let probe = self.probe.as_mut()?;
        match probe.query() {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                warn!(gpu = %probe.name(), error = %e, "GPU metrics error");
                None
            }
        }
    }

    /// Release the probe. Later samples return `None`.
    pub fn release(&mut self) {
        if let Some(mut probe) = self.probe.take() {
            probe.release();
            debug!(gpu = %probe.name(), "GPU monitoring released");
        }
    }
}

impl Drop for GpuMonitor {
    fn drop(&mut self) {
        self.release();
    }
}

/// NVML-backed probe for one NVIDIA device.
///
/// `Device` borrows the `Nvml` handle, so only the index is kept and the
/// device is looked up again per query.
pub struct NvmlGpu {
    nvml: Option<Nvml>,
    index: u32,
    name: String,
}

impl NvmlGpu {
    pub fn init(index: u32) -> anyhow::Result<Self> {
        let nvml = Nvml::init().context("initialising NVML")?;
        let name = nvml
            .device_by_index(index)
            .and_then(|device| device.name())
            .with_context(|| format!("opening NVML device {}", index))?;
        Ok(Self {
            nvml: Some(nvml),
            index,
            name,
        })
    }
}

impl GpuProbe for NvmlGpu {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&mut self) -> anyhow::Result<GpuMetrics> {
        let nvml = self.nvml.as_ref().context("NVML already shut down")?;
        let device = nvml.device_by_index(self.index)?;
        let utilization = device.utilization_rates()?;
        let memory = device.memory_info()?;
        let temperature = device.temperature(TemperatureSensor::Gpu)?;

        Ok(GpuMetrics::from_bytes(
            self.name.clone(),
            utilization.gpu as f32,
            memory.total,
            memory.used,
            temperature as f32,
        ))
    }

    fn release(&mut self) {
        if let Some(nvml) = self.nvml.take() {
            if let Err(e) = nvml.shutdown() {
                warn!(error = %e, "NVML shutdown failed");
            }
        }
    }
}

const DRM_ROOT: &str = "/sys/class/drm";

/// sysfs-backed probe for one DRM card.
pub struct DrmGpu {
    card: PathBuf,
    name: String,
}

impl DrmGpu {
    /// First `cardN` under `root` whose device reports `gpu_busy_percent`.
    pub fn discover(root: &Path) -> Option<Self> {
        let mut cards: Vec<PathBuf> = fs::read_dir(root)
            .ok()?
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("card") && !n.contains('-'))
                    .unwrap_or(false)
            })
            .collect();
        cards.sort();

        cards
            .into_iter()
            .find(|card| card.join("device/gpu_busy_percent").exists())
            .map(|card| {
                let name = device_name(&card.join("device"));
                Self { card, name }
            })
    }

    fn device(&self) -> PathBuf {
        self.card.join("device")
    }
}

impl GpuProbe for DrmGpu {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&mut self) -> anyhow::Result<GpuMetrics> {
        let device = self.device();
        let utilization: f32 = read_value(&device.join("gpu_busy_percent"))?;
        let memory_total: u64 = read_value(&device.join("mem_info_vram_total"))?;
        let memory_used: u64 = read_value(&device.join("mem_info_vram_used"))?;
        let temperature = find_hwmon(&device)
            .and_then(|hwmon| read_value::<f64>(&hwmon.join("temp1_input")).ok())
            .map(|milli| (milli / 1000.0) as f32)
            .unwrap_or(0.0);

        Ok(GpuMetrics::from_bytes(
            self.name.clone(),
            utilization,
            memory_total,
            memory_used,
            temperature,
        ))
    }
}

fn read_value<T>(path: &Path) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    raw.trim()
        .parse()
        .with_context(|| format!("parsing {}", path.display()))
}

fn find_hwmon(device: &Path) -> Option<PathBuf> {
    fs::read_dir(device.join("hwmon"))
        .ok()?
        .flatten()
        .map(|e| e.path())
        .find(|p| p.is_dir())
}

fn device_name(device: &Path) -> String {
    if let Ok(name) = fs::read_to_string(device.join("product_name")) {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }

    let vendor = fs::read_to_string(device.join("vendor")).unwrap_or_default();
    let id = fs::read_to_string(device.join("device")).unwrap_or_default();
    match vendor.trim() {
        "0x1002" => format!("AMD GPU {}", id.trim()),
        "0x8086" => format!("Intel GPU {}", id.trim()),
        "" => "GPU".to_string(),
        other => format!("GPU {}:{}", other, id.trim()),
    }
}
