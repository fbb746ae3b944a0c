// Aggregated report: one per aggregation window, persisted locally and delivered remotely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DiskUsage, EthernetStatus, MemoryUsage, WifiStatus};

/// CPU aggregate over the window. `max_percent` / `avg_percent` are `None` (JSON `null`)
/// when the window held no samples, so an empty window never reads as zero load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuAggregate {
    pub max_percent: Option<f64>,
    pub avg_percent: Option<f64>,
    pub samples: usize,
}

/// Memory aggregate over the window plus the reading taken at build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryAggregate {
    pub max_percent: Option<f64>,
    pub avg_percent: Option<f64>,
    pub current: MemoryUsage,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedReport {
    pub device_id: String,
    /// Build time (end of the window).
    pub timestamp: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub period_seconds: u64,
    pub samples_count: usize,
    pub disk: DiskUsage,
    pub ethernet: EthernetStatus,
    pub wifi: WifiStatus,
    pub cpu: CpuAggregate,
    pub memory: MemoryAggregate,
}

impl AggregatedReport {
    /// True when the window held no samples and cpu/memory aggregates are absent.
    pub fn has_no_data(&self) -> bool {
        self.samples_count == 0
    }
}
