// Instantaneous disk, memory and network snapshots

use serde::{Deserialize, Serialize};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Rounds to 2 decimal places, the precision used across report payloads.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Disk usage of the monitored mount, sizes in GB.
/// `percent` is `None` when the disk could not be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub percent: Option<f64>,
}

impl DiskUsage {
    pub fn from_bytes(total: u64, used: u64, free: u64) -> Self {
        let percent = if total > 0 {
            Some(round2(used as f64 / total as f64 * 100.0))
        } else {
            None
        };
        Self {
            total_gb: round2(total as f64 / BYTES_PER_GB),
            used_gb: round2(used as f64 / BYTES_PER_GB),
            free_gb: round2(free as f64 / BYTES_PER_GB),
            percent,
        }
    }

    pub fn unknown() -> Self {
        Self {
            total_gb: 0.0,
            used_gb: 0.0,
            free_gb: 0.0,
            percent: None,
        }
    }
}

/// Memory usage, sizes in MB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total_mb: f64,
    pub used_mb: f64,
    pub available_mb: f64,
    pub percent: Option<f64>,
}

impl MemoryUsage {
    pub fn from_bytes(total: u64, used: u64, available: u64) -> Self {
        let percent = if total > 0 {
            Some(round2(used as f64 / total as f64 * 100.0))
        } else {
            None
        };
        Self {
            total_mb: round2(total as f64 / BYTES_PER_MB),
            used_mb: round2(used as f64 / BYTES_PER_MB),
            available_mb: round2(available as f64 / BYTES_PER_MB),
            percent,
        }
    }

    pub fn unknown() -> Self {
        Self {
            total_mb: 0.0,
            used_mb: 0.0,
            available_mb: 0.0,
            percent: None,
        }
    }
}

/// Wired interface state. `interface` is `None` when no ethernet interface exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthernetStatus {
    pub interface: Option<String>,
    pub connected: bool,
    pub ip_address: Option<String>,
}

impl EthernetStatus {
    pub fn absent() -> Self {
        Self {
            interface: None,
            connected: false,
            ip_address: None,
        }
    }
}

/// Wireless interface state. `signal_strength_dbm` is `None` when the level cannot be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WifiStatus {
    pub interface: Option<String>,
    pub connected: bool,
    pub ip_address: Option<String>,
    pub signal_strength_dbm: Option<i32>,
}

impl WifiStatus {
    pub fn absent() -> Self {
        Self {
            interface: None,
            connected: false,
            ip_address: None,
            signal_strength_dbm: None,
        }
    }
}

/// Snapshot taken at report build time; never averaged over the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantSnapshot {
    pub disk: DiskUsage,
    pub ethernet: EthernetStatus,
    pub wifi: WifiStatus,
    pub memory: MemoryUsage,
}
