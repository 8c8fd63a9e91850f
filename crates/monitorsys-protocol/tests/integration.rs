//! Integration tests for the monitorsys-protocol crate.
//!
//! These exercise the wire format the dashboard depends on: JSON round
//! trips, the exact field layout, and `null` for an absent GPU.

use std::collections::BTreeMap;

use monitorsys_protocol::snapshot::{
    CpuMetrics, DiskMetrics, GpuMetrics, InterfaceMetrics, NetworkMetrics, RamMetrics, Snapshot,
};

fn sample_snapshot(gpu: Option<GpuMetrics>) -> Snapshot {
    let mut interfaces = BTreeMap::new();
    interfaces.insert(
        "eth0".to_string(),
        InterfaceMetrics {
            bytes_sent: 1_500,
            bytes_recv: 2_800,
            speed_up: 500.0,
            speed_down: 800.0,
        },
    );
    interfaces.insert(
        "lo".to_string(),
        InterfaceMetrics {
            bytes_sent: u64::MAX,
            bytes_recv: 0,
            speed_up: 0.0,
            speed_down: 0.0,
        },
    );

    Snapshot {
        timestamp: 1_760_000_000.125,
        cpu: CpuMetrics::from_cores(vec![12.5, 37.5, 0.0, 100.0], 3_200),
        ram: RamMetrics {
            total: 16 * 1024 * 1024 * 1024,
            used: 6 * 1024 * 1024 * 1024,
            available: 10 * 1024 * 1024 * 1024,
            percent: 37.5,
        },
        network: NetworkMetrics { interfaces },
        disk: DiskMetrics {
            read_bytes: 987_654_321,
            write_bytes: 123_456_789,
            read_speed: 4096.5,
            write_speed: 0.0,
        },
        gpu,
    }
}

fn sample_gpu() -> GpuMetrics {
    GpuMetrics::from_bytes(
        "AMD Radeon RX 6800".to_string(),
        73.0,
        16 * 1024 * 1024 * 1024,
        4 * 1024 * 1024 * 1024,
        58.0,
    )
}

// ---------------------------------------------------------------------------
// 1. Round trips
// ---------------------------------------------------------------------------

#[test]
fn snapshot_roundtrip_with_gpu() {
    let original = sample_snapshot(Some(sample_gpu()));
    let json = original.to_json().expect("serialize");
    let decoded = Snapshot::from_json(&json).expect("deserialize");

    assert_eq!(decoded.ram, original.ram);
    assert_eq!(decoded.disk.read_bytes, original.disk.read_bytes);
    assert_eq!(decoded.disk.write_bytes, original.disk.write_bytes);
    assert_eq!(decoded.network.interfaces["lo"].bytes_sent, u64::MAX);
    assert!((decoded.timestamp - original.timestamp).abs() < 1e-6);
    assert_eq!(decoded, original);
}

#[test]
fn snapshot_roundtrip_without_gpu() {
    let original = sample_snapshot(None);
    let json = original.to_json().expect("serialize");
    let decoded = Snapshot::from_json(&json).expect("deserialize");

    assert!(decoded.gpu.is_none());
    assert_eq!(decoded, original);
}

// ---------------------------------------------------------------------------
// 2. Wire layout
// ---------------------------------------------------------------------------

#[test]
fn absent_gpu_serializes_as_null() {
    let value = serde_json::to_value(sample_snapshot(None)).unwrap();
    assert!(value["gpu"].is_null());
}

#[test]
fn wire_layout_matches_dashboard_contract() {
    let value = serde_json::to_value(sample_snapshot(Some(sample_gpu()))).unwrap();

    for key in ["timestamp", "cpu", "ram", "network", "disk", "gpu"] {
        assert!(value.get(key).is_some(), "missing top-level key {key}");
    }
    for key in ["cores", "average", "frequency"] {
        assert!(value["cpu"].get(key).is_some(), "missing cpu.{key}");
    }
    for key in ["total", "used", "available", "percent"] {
        assert!(value["ram"].get(key).is_some(), "missing ram.{key}");
    }
    for key in ["bytes_sent", "bytes_recv", "speed_up", "speed_down"] {
        assert!(
            value["network"]["interfaces"]["eth0"].get(key).is_some(),
            "missing interface field {key}"
        );
    }
    for key in ["read_bytes", "write_bytes", "read_speed", "write_speed"] {
        assert!(value["disk"].get(key).is_some(), "missing disk.{key}");
    }
    for key in ["name", "utilization", "memory_total", "memory_used", "memory_percent", "temperature"] {
        assert!(value["gpu"].get(key).is_some(), "missing gpu.{key}");
    }

    assert_eq!(value["network"]["interfaces"]["eth0"]["speed_up"], 500.0);
    assert_eq!(value["gpu"]["memory_total"], 16384.0);
    assert_eq!(value["gpu"]["memory_percent"], 25.0);
}

#[test]
fn parses_payload_from_dashboard_fixture() {
    let json = r#"{
        "timestamp": 1700000000.5,
        "cpu": {"cores": [1.0, 3.0], "average": 2.0, "frequency": 0},
        "ram": {"total": 100, "used": 40, "available": 60, "percent": 40.0},
        "network": {"interfaces": {}},
        "disk": {"read_bytes": 0, "write_bytes": 0, "read_speed": 0.0, "write_speed": 0.0},
        "gpu": null
    }"#;

    let snap = Snapshot::from_json(json).expect("fixture should parse");
    assert_eq!(snap.cpu.cores, vec![1.0, 3.0]);
    assert_eq!(snap.ram.used, 40);
    assert!(snap.network.interfaces.is_empty());
    assert!(snap.gpu.is_none());
}
